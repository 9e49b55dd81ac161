use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::json;

use crate::context::RequestContext;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

pub fn success(payload: &impl Serialize, context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(200, Some(payload), context)
}

pub fn created(payload: &impl Serialize, context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(201, Some(payload), context)
}

pub fn no_content(context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(204, None::<&()>, context)
}

pub fn bad_request(payload: &impl Serialize, context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(400, Some(payload), context)
}

pub fn forbidden(payload: &impl Serialize, context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(403, Some(payload), context)
}

pub fn error(payload: &impl Serialize, context: &RequestContext) -> ApiGatewayProxyResponse {
    formulate(500, Some(payload), context)
}

/// `{"errorMessage": message}`, the body of every non-2xx response.
pub fn error_message(message: &str) -> serde_json::Value {
    json!({ "errorMessage": message })
}

fn formulate<T: Serialize + ?Sized>(
    status_code: i64,
    payload: Option<&T>,
    context: &RequestContext,
) -> ApiGatewayProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&context.correlation_id) {
        headers.insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }

    let body = payload.map(|payload| {
        let text = serde_json::to_string(payload).unwrap_or_else(|error| {
            tracing::error!(error = %error, status_code, "failed to serialize response payload");
            error_message("Internal Server Error").to_string()
        });
        Body::Text(text)
    });

    ApiGatewayProxyResponse {
        status_code,
        headers,
        multi_value_headers: Default::default(),
        body,
        is_base64_encoded: false,
    }
}
