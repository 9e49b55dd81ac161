use serde_json::json;

use crate::config::Config;

/// Destination for latency measurements.
pub trait MetricsSink {
    fn publish_latency(&self, function_name: &str, metric_name: &str, latency_ms: f64);
}

/// Writes CloudWatch Embedded Metric Format documents to stdout.
#[derive(Debug, Clone)]
pub struct EmfMetricsSink {
    namespace: String,
    environment: String,
}

impl EmfMetricsSink {
    pub fn new(config: &Config) -> Self {
        Self {
            namespace: config.application_name.clone(),
            environment: config.environment.clone(),
        }
    }

    pub fn document(&self, function_name: &str, metric_name: &str, latency_ms: f64) -> serde_json::Value {
        json!({
            "_aws": {
                "Timestamp": chrono::Utc::now().timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [["Environment", "FunctionName"]],
                    "Metrics": [{ "Name": metric_name, "Unit": "Milliseconds" }]
                }]
            },
            "Environment": self.environment,
            "FunctionName": function_name,
            metric_name: latency_ms
        })
    }
}

impl MetricsSink for EmfMetricsSink {
    fn publish_latency(&self, function_name: &str, metric_name: &str, latency_ms: f64) {
        match serde_json::to_string(&self.document(function_name, metric_name, latency_ms)) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(error = %error, metric = metric_name, "failed to encode metric"),
        }
    }
}
