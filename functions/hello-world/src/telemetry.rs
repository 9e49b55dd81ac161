use lambda_runtime::Error;
use tracing_subscriber::EnvFilter;

/// Installs the JSON log subscriber. Call once, before the runtime starts.
pub fn init() -> Result<(), Error> {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_env_filter(filter)
        // module names add noise to every line
        .with_target(false)
        // CloudWatch stamps ingestion time
        .without_time()
        .try_init()
        .map_err(|error| Error::from(format!("failed to install log subscriber: {error}")))
}
