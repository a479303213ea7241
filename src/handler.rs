//! The Lambda conversion handler: API Gateway event in, JSON response out.
//!
//! Events and responses are the REST proxy types from `aws_lambda_events`.
//! The handler reads the raw `body` string and `isBase64Encoded` flag itself
//! so that a malformed body is a 400 rather than a runtime error.
//!
//! One invocation is one linear pipeline:
//!
//! ```text
//! parse body ─▶ dispatch ─▶ put input ─▶ download to scratch ─▶ convert
//!            ─▶ put output ─▶ presign ─▶ 200
//! ```
//!
//! Request-shape problems short-circuit with a 400 before anything is
//! written. Every later failure becomes a single 500 whose message is the
//! error's [`ErrorClass`]; the full error is logged, never returned.

use crate::config::HandlerConfig;
use crate::convert::convert_file;
use crate::error::{ConvertError, ErrorClass};
use crate::format::Conversion;
use crate::pipeline::input::ScratchFile;
use crate::storage::BlobStore;
use aws_lambda_events::encodings::Body;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ── Wire types ───────────────────────────────────────────────────────────

pub use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};

/// JSON body of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_conversions: Option<Vec<String>>,
}

// ── Request model ────────────────────────────────────────────────────────

/// A decoded upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub payload: Vec<u8>,
    /// Lower-cased `sourceFormat` query parameter.
    pub source_format: String,
    /// Lower-cased `targetFormat` query parameter.
    pub target_format: String,
    /// Declared `Content-Type`; informational only.
    pub content_type: Option<String>,
}

impl ConversionRequest {
    /// Decode the event body and read the format parameters.
    pub fn from_event(event: &ApiGatewayProxyRequest) -> Result<Self, ConversionResult> {
        let body = event.body.as_deref().ok_or(ConversionResult::MissingBody)?;

        let payload = if event.is_base64_encoded {
            decode_base64_body(body)?
        } else {
            body.as_bytes().to_vec()
        };

        if payload.is_empty() {
            return Err(ConversionResult::MissingBody);
        }

        Ok(Self {
            payload,
            source_format: query_param(event, "sourceFormat"),
            target_format: query_param(event, "targetFormat"),
            content_type: event
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        })
    }

    /// The dispatch key, `"{source}-{target}"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source_format, self.target_format)
    }

    pub fn conversion(&self) -> Option<Conversion> {
        Conversion::from_key(&self.key())
    }
}

/// Lower-cased first value of a query parameter, `""` when absent.
fn query_param(event: &ApiGatewayProxyRequest, name: &str) -> String {
    event
        .query_string_parameters
        .first(name)
        .unwrap_or_default()
        .to_lowercase()
}

/// Decode a base64 body. Line breaks and other ASCII whitespace are skipped
/// (MIME encoders wrap at 76 columns); padding stays strict.
fn decode_base64_body(body: &str) -> Result<Vec<u8>, ConversionResult> {
    let compact: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|_| ConversionResult::InvalidBody)
}

// ── Outcomes ─────────────────────────────────────────────────────────────

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    /// Output stored; the URL is presigned for the configured lifetime.
    Converted { output_url: String },
    /// No body, or a body that decodes to zero bytes.
    MissingBody,
    /// `isBase64Encoded` was set but the body is not base64.
    InvalidBody,
    /// The (source, target) pair is not one of the supported keys.
    Unsupported { source: String, target: String },
    /// Storage or codec failure, reduced to its class.
    Failed(ErrorClass),
}

impl ConversionResult {
    pub fn status_code(&self) -> u16 {
        match self {
            ConversionResult::Converted { .. } => 200,
            ConversionResult::MissingBody
            | ConversionResult::InvalidBody
            | ConversionResult::Unsupported { .. } => 400,
            ConversionResult::Failed(_) => 500,
        }
    }

    pub fn body(&self) -> ResponseBody {
        let message = |m: String| ResponseBody {
            message: m,
            output_url: None,
            supported_conversions: None,
        };
        match self {
            ConversionResult::Converted { output_url } => ResponseBody {
                message: "File converted successfully".into(),
                output_url: Some(output_url.clone()),
                supported_conversions: None,
            },
            ConversionResult::MissingBody => message("No file content found".into()),
            ConversionResult::InvalidBody => message("Request body is not valid base64".into()),
            ConversionResult::Unsupported { source, target } => ResponseBody {
                message: format!("Unsupported conversion: {source} to {target}"),
                output_url: None,
                supported_conversions: Some(
                    Conversion::supported_keys()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                ),
            },
            ConversionResult::Failed(class) => {
                message(format!("Conversion error: {}", class.public_message()))
            }
        }
    }

    pub fn into_response(self) -> ApiGatewayProxyResponse {
        json_response(self.status_code(), &self.body())
    }
}

/// Build a JSON response with the fixed CORS header set.
pub fn json_response(status_code: u16, body: &ResponseBody) -> ApiGatewayProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("OPTIONS,POST,GET"),
    );

    let body = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialise response body: {}", e);
        r#"{"message":"Conversion error: internal error"}"#.to_string()
    });

    ApiGatewayProxyResponse {
        status_code: i64::from(status_code),
        headers,
        body: Some(Body::Text(body)),
        is_base64_encoded: false,
        ..Default::default()
    }
}

// ── Handler ──────────────────────────────────────────────────────────────

/// Process-wide handler state: config plus the two bucket clients.
///
/// Built once before the first event and shared by reference; it holds no
/// per-request state, so concurrent invocations never interact.
pub struct ConversionHandler {
    config: HandlerConfig,
    input: Arc<dyn BlobStore>,
    output: Arc<dyn BlobStore>,
}

impl ConversionHandler {
    pub fn new(config: HandlerConfig, input: Arc<dyn BlobStore>, output: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            input,
            output,
        }
    }

    /// Handle one API Gateway event.
    pub async fn handle(&self, event: ApiGatewayProxyRequest) -> ApiGatewayProxyResponse {
        self.process(&event).await.into_response()
    }

    /// Handle one event, returning the typed outcome.
    pub async fn process(&self, event: &ApiGatewayProxyRequest) -> ConversionResult {
        let request = match ConversionRequest::from_event(event) {
            Ok(r) => r,
            Err(rejection) => {
                warn!("Rejected request: {:?}", rejection);
                return rejection;
            }
        };

        let Some(conversion) = request.conversion() else {
            warn!("Unsupported conversion key '{}'", request.key());
            return ConversionResult::Unsupported {
                source: request.source_format,
                target: request.target_format,
            };
        };

        debug!(
            "Declared content type: {}",
            request.content_type.as_deref().unwrap_or("<none>")
        );

        match self.run(request.payload, conversion).await {
            Ok(output_url) => ConversionResult::Converted { output_url },
            Err(e) => {
                let class = e.class();
                error!(conversion = %conversion, class = ?class, "Conversion failed: {}", e);
                ConversionResult::Failed(class)
            }
        }
    }

    /// Storage + codec pipeline for an accepted request.
    async fn run(&self, payload: Vec<u8>, conversion: Conversion) -> Result<String, ConvertError> {
        let start = Instant::now();
        let input_key = format!("{}.{}", Uuid::new_v4(), conversion.source());
        let output_key = format!("{}.{}", Uuid::new_v4(), conversion.target());
        info!(
            "Starting {}: {} bytes → {}/{}",
            conversion,
            payload.len(),
            self.input.bucket(),
            input_key
        );

        self.input
            .put(&input_key, payload, Some(conversion.source().content_type()))
            .await
            .map_err(|e| ConvertError::storage(&input_key, e))?;

        // Removed when it goes out of scope, whatever happens below.
        let scratch = ScratchFile::reserve(self.config.scratch_dir.as_deref(), &input_key)?;
        self.input
            .download(&input_key, scratch.path())
            .await
            .map_err(|e| ConvertError::storage(&input_key, e))?;

        let converted = convert_file(scratch.path(), conversion, &self.config.render).await?;
        drop(scratch);

        self.output
            .put(&output_key, converted.bytes, Some(converted.content_type))
            .await
            .map_err(|e| ConvertError::storage(&output_key, e))?;

        let url = self
            .output
            .presign_get(&output_key, self.config.url_ttl())
            .await
            .map_err(|e| ConvertError::storage(&output_key, e))?;

        info!(
            "Finished {} → {}/{} in {}ms",
            conversion,
            self.output.bucket(),
            output_key,
            start.elapsed().as_millis()
        );
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn event(source: &str, target: &str, body: Option<&str>) -> ApiGatewayProxyRequest {
        ApiGatewayProxyRequest {
            http_method: http::Method::POST,
            query_string_parameters: HashMap::from([
                ("sourceFormat".to_string(), vec![source.to_string()]),
                ("targetFormat".to_string(), vec![target.to_string()]),
            ])
            .into(),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }

    fn binary_event(source: &str, target: &str, bytes: &[u8]) -> ApiGatewayProxyRequest {
        let mut e = event(source, target, Some(&STANDARD.encode(bytes)));
        e.is_base64_encoded = true;
        e
    }

    fn text(resp: &ApiGatewayProxyResponse) -> &str {
        match resp.body.as_ref() {
            Some(Body::Text(s)) => s,
            other => panic!("expected a text body, got {other:?}"),
        }
    }

    /// A REST API proxy event as Lambda delivers it.
    fn rest_event_json() -> serde_json::Value {
        serde_json::json!({
            "resource": "/convert",
            "path": "/convert",
            "httpMethod": "POST",
            "headers": {"Content-Type": "application/pdf"},
            "multiValueHeaders": {"Content-Type": ["application/pdf"]},
            "queryStringParameters": {"sourceFormat": "pdf", "targetFormat": "png"},
            "multiValueQueryStringParameters": {
                "sourceFormat": ["pdf"],
                "targetFormat": ["png"]
            },
            "pathParameters": null,
            "stageVariables": null,
            "requestContext": {
                "accountId": "123456789012",
                "resourceId": "abc123",
                "stage": "prod",
                "requestId": "c6af9ac6-7b61-11e6-9a41-93e8deadbeef",
                "requestTimeEpoch": 1700000000000_i64,
                "identity": {"sourceIp": "127.0.0.1"},
                "resourcePath": "/convert",
                "httpMethod": "POST",
                "apiId": "1234567890",
                "path": "/prod/convert"
            },
            "body": "aGk=",
            "isBase64Encoded": true
        })
    }

    #[test]
    fn base64_and_raw_bodies_converge() {
        let raw = event("png", "jpeg", Some("hello world"));
        let b64 = binary_event("png", "jpeg", b"hello world");
        let a = ConversionRequest::from_event(&raw).unwrap();
        let b = ConversionRequest::from_event(&b64).unwrap();
        assert_eq!(a.payload, b.payload);
        assert_eq!(a, b);
    }

    #[test]
    fn line_wrapped_base64_body_decodes() {
        let bytes: Vec<u8> = (0..=200).collect();
        let encoded = STANDARD.encode(&bytes);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(wrapped.contains('\n'));

        let mut req = event("png", "jpeg", Some(&format!("{wrapped}\r\n")));
        req.is_base64_encoded = true;
        let parsed = ConversionRequest::from_event(&req).unwrap();
        assert_eq!(parsed.payload, bytes);
    }

    #[test]
    fn base64_padding_stays_strict() {
        // "aGk=" is "hi"; dropping the pad or adding a stray one is rejected.
        for body in ["aGk", "aGk==", "aG=k"] {
            let mut req = event("png", "jpeg", Some(body));
            req.is_base64_encoded = true;
            assert_eq!(
                ConversionRequest::from_event(&req).unwrap_err(),
                ConversionResult::InvalidBody,
                "body: {body}"
            );
        }
    }

    #[test]
    fn absent_body_is_missing() {
        let req = event("pdf", "png", None);
        assert_eq!(
            ConversionRequest::from_event(&req).unwrap_err(),
            ConversionResult::MissingBody
        );
    }

    #[test]
    fn empty_body_is_missing() {
        let req = binary_event("pdf", "png", b"");
        assert_eq!(
            ConversionRequest::from_event(&req).unwrap_err(),
            ConversionResult::MissingBody
        );
    }

    #[test]
    fn bad_base64_is_invalid_body() {
        let mut req = event("pdf", "png", Some("***not base64***"));
        req.is_base64_encoded = true;
        assert_eq!(
            ConversionRequest::from_event(&req).unwrap_err(),
            ConversionResult::InvalidBody
        );
    }

    #[test]
    fn formats_are_lower_cased_and_default_empty() {
        let req = event("PDF", "JPEG", Some("x"));
        let parsed = ConversionRequest::from_event(&req).unwrap();
        assert_eq!(parsed.key(), "pdf-jpeg");
        assert_eq!(parsed.conversion(), Some(Conversion::PdfToJpeg));

        let req = ApiGatewayProxyRequest {
            body: Some("x".into()),
            ..Default::default()
        };
        let parsed = ConversionRequest::from_event(&req).unwrap();
        assert_eq!(parsed.key(), "-");
        assert_eq!(parsed.conversion(), None);
    }

    #[test]
    fn content_type_header_is_case_insensitive() {
        let mut req = event("png", "jpeg", Some("x"));
        req.headers.insert(
            http::header::HeaderName::from_static("content-type"),
            HeaderValue::from_static("image/png"),
        );
        let parsed = ConversionRequest::from_event(&req).unwrap();
        assert_eq!(parsed.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn event_deserialises_from_api_gateway_json() {
        let event: ApiGatewayProxyRequest = serde_json::from_value(rest_event_json()).unwrap();
        let parsed = ConversionRequest::from_event(&event).unwrap();
        assert_eq!(parsed.payload, b"hi");
        assert_eq!(parsed.conversion(), Some(Conversion::PdfToPng));
        assert_eq!(parsed.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn null_query_parameters_are_tolerated() {
        let mut json = rest_event_json();
        json["queryStringParameters"] = serde_json::Value::Null;
        json["multiValueQueryStringParameters"] = serde_json::Value::Null;
        let event: ApiGatewayProxyRequest = serde_json::from_value(json).unwrap();
        let parsed = ConversionRequest::from_event(&event).unwrap();
        assert_eq!(parsed.key(), "-");
    }

    #[test]
    fn unsupported_response_lists_keys_in_order() {
        let resp = ConversionResult::Unsupported {
            source: "gif".into(),
            target: "png".into(),
        }
        .into_response();
        assert_eq!(resp.status_code, 400);
        let body: ResponseBody = serde_json::from_str(text(&resp)).unwrap();
        assert_eq!(body.message, "Unsupported conversion: gif to png");
        assert_eq!(
            body.supported_conversions.unwrap(),
            vec!["pdf-png", "png-jpeg", "jpeg-png", "pdf-jpeg"]
        );
    }

    #[test]
    fn responses_carry_cors_headers() {
        let resp = ConversionResult::MissingBody.into_response();
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_METHODS], "OPTIONS,POST,GET");
        assert_eq!(text(&resp), r#"{"message":"No file content found"}"#);
    }

    #[test]
    fn failure_response_is_redacted() {
        let resp = ConversionResult::Failed(ErrorClass::Storage).into_response();
        assert_eq!(resp.status_code, 500);
        let body: ResponseBody = serde_json::from_str(text(&resp)).unwrap();
        assert_eq!(body.message, "Conversion error: storage service unavailable");
        assert!(body.output_url.is_none());
    }

    #[test]
    fn response_serialises_with_camel_case_keys() {
        let resp = ConversionResult::Converted {
            output_url: "https://x".into(),
        }
        .into_response();
        let v: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["statusCode"], 200);
        assert_eq!(v["isBase64Encoded"], false);
        assert_eq!(v["headers"]["content-type"], "application/json");
        let body: serde_json::Value = serde_json::from_str(v["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["output_url"], "https://x");
        assert_eq!(body["message"], "File converted successfully");
    }
}
