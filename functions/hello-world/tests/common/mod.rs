#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use helloworld::config::Config;
use helloworld::metrics::MetricsSink;
use helloworld::router::Dispatcher;
use helloworld::storage::{Outcome, Record, StorageError, StorageGateway};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

pub const TABLE: &str = "hello-table";

/// Table-per-name map guarded by a mutex; records are keyed by `id`.
#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<BTreeMap<String, BTreeMap<String, Record>>>,
    calls: Mutex<Vec<String>>,
    failing: bool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation reports a storage failure.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_record(self, table: &str, record: Value) -> Self {
        let Value::Object(record) = record else {
            panic!("seed records must be objects");
        };
        let id = record["id"].as_str().expect("seed record needs a string id").to_string();
        self.tables
            .lock()
            .expect("poisoned mutex")
            .entry(table.to_string())
            .or_default()
            .insert(id, record);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn records(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .expect("poisoned mutex")
            .get(table)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn record_call(&self, operation: &str, table: &str) -> Result<(), StorageError> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push(format!("{operation}:{table}"));
        if self.failing {
            return Err(StorageError::Request("injected failure".to_string()));
        }
        Ok(())
    }
}

impl StorageGateway for InMemoryGateway {
    async fn create_or_update(&self, table: &str, record: Record) -> Outcome<Record> {
        if let Err(error) = self.record_call("create_or_update", table) {
            return Outcome::Failure(error);
        }
        let Some(id) = record.get("id").and_then(Value::as_str) else {
            return Outcome::Failure(StorageError::Request("missing key attribute id".to_string()));
        };
        self.tables
            .lock()
            .expect("poisoned mutex")
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), record.clone());
        Outcome::Success(record)
    }

    async fn list_all(&self, table: &str) -> Outcome<Vec<Record>> {
        if let Err(error) = self.record_call("list_all", table) {
            return Outcome::Failure(error);
        }
        Outcome::Success(self.records(table))
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Outcome<Record> {
        if let Err(error) = self.record_call("get_by_id", table) {
            return Outcome::Failure(error);
        }
        let found = self
            .tables
            .lock()
            .expect("poisoned mutex")
            .get(table)
            .and_then(|records| records.get(id).cloned());
        Outcome::from_lookup(Ok(found))
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Outcome<()> {
        if let Err(error) = self.record_call("delete_by_id", table) {
            return Outcome::Failure(error);
        }
        if let Some(records) = self.tables.lock().expect("poisoned mutex").get_mut(table) {
            records.remove(id);
        }
        Outcome::Success(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(String, String, f64)>>,
}

impl RecordingSink {
    pub fn metric_names(&self) -> Vec<String> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    pub fn function_names(&self) -> Vec<String> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(function, _, _)| function.clone())
            .collect()
    }
}

impl MetricsSink for RecordingSink {
    fn publish_latency(&self, function_name: &str, metric_name: &str, latency_ms: f64) {
        self.published.lock().expect("poisoned mutex").push((
            function_name.to_string(),
            metric_name.to_string(),
            latency_ms,
        ));
    }
}

pub fn config() -> Config {
    Config {
        environment: "test".to_string(),
        table_name: TABLE.to_string(),
        application_name: "HelloWorldApi".to_string(),
    }
}

pub fn dispatcher(storage: InMemoryGateway) -> Dispatcher<InMemoryGateway, RecordingSink> {
    Dispatcher::new(config(), storage, RecordingSink::default())
}

pub fn body_json(response: &ApiGatewayProxyResponse) -> Value {
    match &response.body {
        Some(Body::Text(text)) => serde_json::from_str(text).expect("body should be JSON"),
        other => panic!("expected a text body, got {other:?}"),
    }
}

pub fn correlation_header(response: &ApiGatewayProxyResponse) -> &str {
    response
        .headers
        .get("x-correlation-id")
        .expect("correlation header")
        .to_str()
        .expect("ascii header")
}

/// One captured log line: its level plus its own fields and those of every enclosing span.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl LogLine {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that keeps every event in memory.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<LogLine>>>,
    spans: Arc<Mutex<HashMap<Id, BTreeMap<String, String>>>>,
}

impl LogCapture {
    /// Installs the capture as the subscriber for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().expect("poisoned mutex").clone()
    }

    /// `(level, event)` for every line tagged with an `event` field.
    pub fn events(&self) -> Vec<(Level, String)> {
        self.lines()
            .into_iter()
            .filter_map(|line| line.field("event").map(|event| (line.level, event.to_string())))
            .collect()
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for LogCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        self.spans.lock().expect("poisoned mutex").insert(id.clone(), fields);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            let spans = self.spans.lock().expect("poisoned mutex");
            for span in scope.from_root() {
                if let Some(span_fields) = spans.get(&span.id()) {
                    fields.extend(span_fields.clone());
                }
            }
        }
        event.record(&mut FieldVisitor(&mut fields));
        self.lines.lock().expect("poisoned mutex").push(LogLine {
            level: *event.metadata().level(),
            fields,
        });
    }
}
