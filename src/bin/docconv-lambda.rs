//! Lambda entry point for docconv.
//!
//! Configuration and both S3 bucket clients are built once at cold start and
//! shared by reference with every invocation.

use anyhow::{Context, Result};
use clap::Parser;
use docconv::config::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_RENDERED_PIXELS, DEFAULT_RENDER_DPI, DEFAULT_URL_TTL_SECS,
};
use docconv::{
    ApiGatewayProxyRequest, ApiGatewayProxyResponse, BlobStore, ConversionHandler, HandlerConfig,
    MemoryBlobStore, ObjectBlobStore,
};
use lambda_runtime::{run, service_fn, LambdaEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "docconv-lambda",
    version,
    about = "API Gateway → S3 file-format conversion handler"
)]
struct Args {
    /// Bucket receiving raw uploads.
    #[arg(long, env = "INPUT_BUCKET")]
    input_bucket: String,

    /// Bucket receiving converted files.
    #[arg(long, env = "OUTPUT_BUCKET")]
    output_bucket: String,

    /// Presigned URL lifetime in seconds.
    #[arg(long, env = "DOCCONV_URL_TTL_SECS", default_value_t = DEFAULT_URL_TTL_SECS)]
    url_ttl_secs: u64,

    /// JPEG quality (1–100).
    #[arg(long, env = "DOCCONV_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Rendering DPI for PDF pages.
    #[arg(long, env = "DOCCONV_RENDER_DPI", default_value_t = DEFAULT_RENDER_DPI)]
    dpi: u32,

    /// Longest rendered side in pixels.
    #[arg(long, env = "DOCCONV_MAX_PIXELS", default_value_t = DEFAULT_MAX_RENDERED_PIXELS)]
    max_pixels: u32,

    /// Parent directory for per-request scratch files.
    #[arg(long, env = "DOCCONV_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Directory holding the pdfium shared library (e.g. a Lambda layer).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Keep objects in memory instead of S3, for local `cargo lambda watch`.
    #[arg(long, env = "DOCCONV_MEMORY_STORE")]
    memory_store: bool,
}

impl Args {
    fn config(&self) -> Result<HandlerConfig> {
        let mut builder = HandlerConfig::builder()
            .input_bucket(&self.input_bucket)
            .output_bucket(&self.output_bucket)
            .url_ttl_secs(self.url_ttl_secs)
            .jpeg_quality(self.jpeg_quality)
            .dpi(self.dpi)
            .max_rendered_pixels(self.max_pixels);
        if let Some(ref dir) = self.scratch_dir {
            builder = builder.scratch_dir(dir);
        }
        if let Some(ref lib) = self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(lib);
        }
        builder.build().context("Invalid configuration")
    }

    fn stores(&self) -> Result<(Arc<dyn BlobStore>, Arc<dyn BlobStore>)> {
        if self.memory_store {
            return Ok((
                Arc::new(MemoryBlobStore::new(&self.input_bucket)),
                Arc::new(MemoryBlobStore::new(&self.output_bucket)),
            ));
        }
        let input = ObjectBlobStore::s3_from_env(&self.input_bucket)
            .with_context(|| format!("Failed to configure S3 bucket '{}'", self.input_bucket))?;
        let output = ObjectBlobStore::s3_from_env(&self.output_bucket)
            .with_context(|| format!("Failed to configure S3 bucket '{}'", self.output_bucket))?;
        Ok((Arc::new(input), Arc::new(output)))
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    // JSON lines for CloudWatch; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_current_span(false)
        .without_time()
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = args.config()?;
    let (input, output) = args.stores()?;
    tracing::info!(
        input_bucket = %config.input_bucket,
        output_bucket = %config.output_bucket,
        url_ttl_secs = config.url_ttl_secs,
        "docconv handler ready"
    );

    let handler = ConversionHandler::new(config, input, output);
    let handler = &handler;

    run(service_fn(move |event: LambdaEvent<ApiGatewayProxyRequest>| async move {
        let response: ApiGatewayProxyResponse = handler.handle(event.payload).await;
        Ok::<_, lambda_runtime::Error>(response)
    }))
    .await
}
