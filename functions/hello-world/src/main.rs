use aws_lambda_events::event::apigw::{ApiGatewayProxyResponse, ApiGatewayV2httpRequest};
use helloworld::config::Config;
use helloworld::context::{Identity, RequestContext};
use helloworld::metrics::EmfMetricsSink;
use helloworld::router::Dispatcher;
use helloworld::storage::DynamoDbGateway;
use helloworld::telemetry;
use lambda_runtime::{service_fn, Error, LambdaEvent};

type HelloWorldDispatcher = Dispatcher<DynamoDbGateway, EmfMetricsSink>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init()?;

    let config = Config::from_env()?;
    let aws_config = aws_config::load_from_env().await;
    let storage = DynamoDbGateway::new(aws_sdk_dynamodb::Client::new(&aws_config));
    let metrics = EmfMetricsSink::new(&config);

    tracing::info!(
        environment = %config.environment,
        table = %config.table_name,
        application = %config.application_name,
        "helloworld function starting"
    );

    let dispatcher = Dispatcher::new(config, storage, metrics);
    lambda_runtime::run(service_fn(|event| handler(&dispatcher, event))).await
}

async fn handler(
    dispatcher: &HelloWorldDispatcher,
    event: LambdaEvent<ApiGatewayV2httpRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    let (request, lambda_context) = event.into_parts();
    let context = RequestContext::from_event(request, Identity::from(&lambda_context));

    Ok(dispatcher.handle(&context).await)
}
