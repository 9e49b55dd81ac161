//! Request routing for the helloworld API.
//!
//! Every invocation ends in exactly one response and exactly one latency
//! measurement. Routing decides *which* checkpoint the request ended on; the
//! measurement itself happens once, in [`Dispatcher::handle`].
//!
//! Storage failures are surfaced as `400 Bad Request`, and a lookup that
//! finds nothing is `400 No Record Found` rather than a 404.

use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use http::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::Instrument;

use crate::config::Config;
use crate::context::RequestContext;
use crate::metrics::MetricsSink;
use crate::performance::PerformanceTracker;
use crate::response;
use crate::storage::{Outcome, Record, StorageError, StorageGateway};

pub const FUNCTION_NAME: &str = "helloworld";
const LOG_SOURCE: &str = "helloworld:index";

/// Errors that escape routing and become a 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("request body is missing")]
    MissingBody,
    #[error("request body is not a valid record: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("path parameter `{0}` is missing")]
    MissingPathParameter(&'static str),
}

/// Where a request finished; names the latency checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    CompletedSuccess,
    FailureLogic,
    FailureError,
}

impl Checkpoint {
    pub fn label(self) -> &'static str {
        match self {
            Checkpoint::CompletedSuccess => "handler:completed:success",
            Checkpoint::FailureLogic => "handler:failure:logic",
            Checkpoint::FailureError => "handler:failure:error",
        }
    }
}

/// Route table for one resource prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    prefix: String,
    get_by_id: String,
    put_by_id: String,
    delete_by_id: String,
}

impl Routes {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            get_by_id: format!("GET {prefix}/{{id}}"),
            put_by_id: format!("PUT {prefix}/{{id}}"),
            delete_by_id: format!("DELETE {prefix}/{{id}}"),
            prefix,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn resolve(&self, context: &RequestContext) -> Route {
        if !context.path.starts_with(&self.prefix) {
            return Route::Invalid;
        }

        let collection = context.path == self.prefix;
        let route_key = context.route_key.as_str();

        if collection && context.method == Method::POST {
            Route::Create
        } else if collection && context.method == Method::GET {
            Route::List
        } else if route_key == self.get_by_id {
            Route::Get
        } else if route_key == self.put_by_id {
            Route::Update
        } else if route_key == self.delete_by_id {
            Route::Delete
        } else {
            Route::Fallback
        }
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self::new(format!("/{FUNCTION_NAME}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Invalid,
    Create,
    List,
    Get,
    Update,
    Delete,
    Fallback,
}

type Routed = (Checkpoint, ApiGatewayProxyResponse);

pub struct Dispatcher<S, M> {
    config: Config,
    routes: Routes,
    storage: S,
    metrics: M,
}

impl<S, M> Dispatcher<S, M>
where
    S: StorageGateway,
    M: MetricsSink,
{
    pub fn new(config: Config, storage: S, metrics: M) -> Self {
        Self {
            config,
            routes: Routes::default(),
            storage,
            metrics,
        }
    }

    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Handles one request. Never fails: every error ends in a formatted response.
    pub async fn handle(&self, context: &RequestContext) -> ApiGatewayProxyResponse {
        async {
            let mut tracker = PerformanceTracker::start(FUNCTION_NAME, &self.metrics);

            tracing::info!(
                source = LOG_SOURCE,
                event = "request:received",
                body = context.body.as_deref(),
                "request received"
            );

            let (checkpoint, response) = match self.route(context).await {
                Ok(routed) => routed,
                Err(error) => {
                    tracing::error!(
                        source = LOG_SOURCE,
                        event = "request:failed:catch",
                        error = %error,
                        "request failed"
                    );
                    (
                        Checkpoint::FailureError,
                        response::error(&response::error_message("Internal Server Error"), context),
                    )
                }
            };

            tracker.measure_function_performance(checkpoint.label());
            response
        }
        .instrument(context.span())
        .await
    }

    async fn route(&self, context: &RequestContext) -> Result<Routed, HandlerError> {
        let table = self.config.table_name.as_str();

        match self.routes.resolve(context) {
            Route::Invalid => {
                tracing::warn!(
                    source = LOG_SOURCE,
                    event = "request:failed:logic",
                    "Invalid Endpoint"
                );
                Ok(failure(response::forbidden(&response::error_message("Invalid Endpoint"), context)))
            }
            Route::Create => {
                let record = parse_record(context)?;
                Ok(match settle(self.storage.create_or_update(table, record).await) {
                    Ok(stored) => success(response::created(&stored, context)),
                    Err(miss) => bad_request(miss, context),
                })
            }
            Route::List => Ok(match settle(self.storage.list_all(table).await) {
                Ok(records) => success(response::success(&records, context)),
                Err(miss) => bad_request(miss, context),
            }),
            Route::Get => {
                let id = path_id(context)?;
                Ok(match settle(self.storage.get_by_id(table, id).await) {
                    Ok(record) => success(response::success(&record, context)),
                    Err(miss) => bad_request(miss, context),
                })
            }
            Route::Update => {
                let id = path_id(context)?;
                let mut record = Record::new();
                record.insert("id".to_string(), Value::String(id.to_string()));
                record.extend(parse_fields(context)?);
                Ok(match settle(self.storage.create_or_update(table, record).await) {
                    Ok(stored) => success(response::success(&stored, context)),
                    Err(miss) => bad_request(miss, context),
                })
            }
            Route::Delete => {
                let id = path_id(context)?;
                Ok(match settle(self.storage.delete_by_id(table, id).await) {
                    Ok(()) => success(response::no_content(context)),
                    Err(miss) => bad_request(miss, context),
                })
            }
            Route::Fallback => Ok(success(response::success(&json!({ "success": true }), context))),
        }
    }
}

fn parse_record(context: &RequestContext) -> Result<Record, HandlerError> {
    let body = context.body.as_deref().ok_or(HandlerError::MissingBody)?;
    Ok(serde_json::from_str(body)?)
}

/// Body fields merged into an update. No body, or a JSON `null`, adds nothing.
fn parse_fields(context: &RequestContext) -> Result<Record, HandlerError> {
    match context.body.as_deref() {
        None => Ok(Record::new()),
        Some(body) => Ok(serde_json::from_str::<Option<Record>>(body)?.unwrap_or_default()),
    }
}

fn path_id(context: &RequestContext) -> Result<&str, HandlerError> {
    context
        .path_parameter("id")
        .ok_or(HandlerError::MissingPathParameter("id"))
}

fn success(response: ApiGatewayProxyResponse) -> Routed {
    (Checkpoint::CompletedSuccess, response)
}

fn failure(response: ApiGatewayProxyResponse) -> Routed {
    (Checkpoint::FailureLogic, response)
}

/// A storage call that produced no payload.
enum Miss {
    NotFound,
    Failed(StorageError),
}

fn settle<T>(outcome: Outcome<T>) -> Result<T, Miss> {
    match outcome {
        Outcome::Success(value) => Ok(value),
        Outcome::NotFound => Err(Miss::NotFound),
        Outcome::Failure(error) => Err(Miss::Failed(error)),
    }
}

/// Maps a storage miss to its 400 response.
fn bad_request(miss: Miss, context: &RequestContext) -> Routed {
    let (message, cause) = match miss {
        Miss::NotFound => ("No Record Found", None),
        Miss::Failed(error) => ("Bad Request", Some(error.to_string())),
    };
    tracing::warn!(
        source = LOG_SOURCE,
        event = "request:failed:logic",
        cause = cause.as_deref(),
        "{message}"
    );
    failure(response::bad_request(&response::error_message(message), context))
}
