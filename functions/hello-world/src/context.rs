//! Per-invocation request context.
//!
//! Every invocation gets a fresh correlation id. The context also carries the
//! request fields the router needs and the identity metadata attached to every
//! log line. Only the correlation id is echoed back to the caller.

use std::collections::HashMap;

use aws_lambda_events::event::apigw::ApiGatewayV2httpRequest;
use http::Method;
use tracing::Span;
use uuid::Uuid;

/// Identity of the invocation as seen by Lambda and API Gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub aws_request_id: String,
    pub function_name: String,
    pub xray_trace_id: Option<String>,
    pub api_request_id: Option<String>,
    pub stage: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&lambda_runtime::Context> for Identity {
    fn from(context: &lambda_runtime::Context) -> Self {
        Self {
            aws_request_id: context.request_id.clone(),
            function_name: context.env_config.function_name.clone(),
            xray_trace_id: context.xray_trace_id.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: Method,
    pub path: String,
    pub route_key: String,
    pub path_parameters: HashMap<String, String>,
    pub body: Option<String>,
    pub identity: Identity,
}

impl RequestContext {
    /// Builds a context with a freshly generated correlation id.
    pub fn new(method: Method, path: impl Into<String>, route_key: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            route_key: route_key.into(),
            path_parameters: HashMap::new(),
            body: None,
            identity: Identity::default(),
        }
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Extracts the request from an HTTP API (payload v2) event.
    pub fn from_event(event: ApiGatewayV2httpRequest, mut identity: Identity) -> Self {
        let request_context = event.request_context;

        identity.api_request_id = request_context.request_id;
        identity.stage = request_context.stage;
        identity.source_ip = request_context.http.source_ip;
        identity.user_agent = request_context.http.user_agent;

        let path = event
            .raw_path
            .or(request_context.http.path)
            .unwrap_or_default();

        Self {
            correlation_id: Uuid::new_v4().to_string(),
            method: request_context.http.method,
            path,
            route_key: event.route_key.unwrap_or_default(),
            path_parameters: event.path_parameters,
            body: event.body,
            identity,
        }
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    /// Span carrying the correlation fields; log lines emitted inside it inherit them.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            correlation_id = %self.correlation_id,
            method = %self.method,
            path = %self.path,
            route_key = %self.route_key,
            aws_request_id = %self.identity.aws_request_id,
            function_name = %self.identity.function_name,
            xray_trace_id = self.identity.xray_trace_id.as_deref(),
            api_request_id = self.identity.api_request_id.as_deref(),
            stage = self.identity.stage.as_deref(),
            source_ip = self.identity.source_ip.as_deref(),
            user_agent = self.identity.user_agent.as_deref(),
        )
    }
}
