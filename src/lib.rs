//! # docconv
//!
//! Serverless file-format conversion: an uploaded PDF, PNG or JPEG comes in
//! through API Gateway, is converted, stored in S3, and handed back as a
//! presigned download link.
//!
//! ## Supported conversions
//!
//! | key | what happens |
//! |-----|--------------|
//! | `pdf-png`  | rasterise page 1 → PNG |
//! | `png-jpeg` | decode → flatten alpha onto white → JPEG (q 90) |
//! | `jpeg-png` | decode → PNG |
//! | `pdf-jpeg` | rasterise page 1 → flatten alpha → JPEG (q 90) |
//!
//! Only the first page of a PDF is ever rendered.
//!
//! ## Pipeline Overview
//!
//! ```text
//! API Gateway event
//!  │
//!  ├─ 1. Parse    body (base64-aware) + sourceFormat/targetFormat
//!  ├─ 2. Dispatch "{source}-{target}" → Conversion, else 400
//!  ├─ 3. Store    input bytes → INPUT bucket
//!  ├─ 4. Convert  scratch file → pdfium / image codec → output bytes
//!  ├─ 5. Store    output bytes → OUTPUT bucket (with content type)
//!  └─ 6. Presign  1-hour GET URL → 200
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use base64::{engine::general_purpose::STANDARD, Engine as _};
//! use docconv::{ApiGatewayProxyRequest, ConversionHandler, HandlerConfig, MemoryBlobStore};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HandlerConfig::builder()
//!         .input_bucket("uploads")
//!         .output_bucket("converted")
//!         .build()?;
//!     let handler = ConversionHandler::new(
//!         config,
//!         Arc::new(MemoryBlobStore::new("uploads")),
//!         Arc::new(MemoryBlobStore::new("converted")),
//!     );
//!
//!     let png = std::fs::read("logo.png")?;
//!     let event = ApiGatewayProxyRequest {
//!         query_string_parameters: HashMap::from([
//!             ("sourceFormat".to_string(), vec!["png".to_string()]),
//!             ("targetFormat".to_string(), vec!["jpeg".to_string()]),
//!         ])
//!         .into(),
//!         body: Some(STANDARD.encode(&png)),
//!         is_base64_encoded: true,
//!         ..Default::default()
//!     };
//!     let response = handler.handle(event).await;
//!     println!("{} {:?}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `docconv` binary (clap + anyhow + tracing-subscriber) |
//! | `lambda` | on      | Enables the `docconv-lambda` binary (adds lambda_runtime) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod handler;
pub mod pipeline;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{HandlerConfig, HandlerConfigBuilder, RenderOptions};
pub use convert::{convert_bytes, convert_file, ConvertedFile};
pub use error::{ConvertError, ErrorClass, StorageError};
pub use format::{Conversion, Format};
pub use handler::{
    ApiGatewayProxyRequest, ApiGatewayProxyResponse, ConversionHandler, ConversionRequest,
    ConversionResult, ResponseBody,
};
pub use storage::{BlobStore, MemoryBlobStore, ObjectBlobStore, UploadMetadata};
