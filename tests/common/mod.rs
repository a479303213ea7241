//! Event builders shared by the integration tests.

#![allow(dead_code)]

use aws_lambda_events::encodings::Body;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use docconv::{ApiGatewayProxyRequest, ApiGatewayProxyResponse, ResponseBody};
use std::collections::HashMap;

/// A POST proxy event for `source` → `target` with a raw (non-base64) body.
pub fn event(source: &str, target: &str, body: Option<&str>) -> ApiGatewayProxyRequest {
    ApiGatewayProxyRequest {
        http_method: http::Method::POST,
        path: Some("/convert".into()),
        query_string_parameters: HashMap::from([
            ("sourceFormat".to_string(), vec![source.to_string()]),
            ("targetFormat".to_string(), vec![target.to_string()]),
        ])
        .into(),
        body: body.map(str::to_string),
        ..Default::default()
    }
}

/// A proxy event whose body is `bytes`, base64-encoded as API Gateway does
/// for binary media types.
pub fn binary_event(source: &str, target: &str, bytes: &[u8]) -> ApiGatewayProxyRequest {
    let mut e = event(source, target, Some(&STANDARD.encode(bytes)));
    e.is_base64_encoded = true;
    e
}

pub fn body_text(resp: &ApiGatewayProxyResponse) -> &str {
    match resp.body.as_ref() {
        Some(Body::Text(s)) => s,
        other => panic!("expected a text body, got {other:?}"),
    }
}

pub fn body(resp: &ApiGatewayProxyResponse) -> ResponseBody {
    serde_json::from_str(body_text(resp)).expect("response body is JSON")
}
