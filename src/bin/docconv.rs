//! CLI binary for docconv.
//!
//! A thin shim over the library crate that runs one local conversion through
//! the same render/encode stages as the Lambda handler, without object
//! storage.

use anyhow::{bail, Context, Result};
use clap::Parser;
use docconv::config::{DEFAULT_JPEG_QUALITY, DEFAULT_RENDER_DPI};
use docconv::{convert_file, Conversion, Format, RenderOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # First page of a PDF as PNG (writes report.png)
  docconv report.pdf --to png

  # PNG with transparency to JPEG on a white background
  docconv logo.png --to jpeg -o logo.jpg

  # Sharper PDF render
  docconv slides.pdf --to jpeg --dpi 150

SUPPORTED CONVERSIONS:
  pdf-png  png-jpeg  jpeg-png  pdf-jpeg

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory holding libpdfium (otherwise the system library)
  RUST_LOG          Log filter override (e.g. docconv=debug)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "docconv",
    version,
    about = "Convert PDF, PNG and JPEG files (PDF → first page only)",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local input file.
    input: PathBuf,

    /// Target format: png or jpeg (jpg also accepted).
    #[arg(long, short = 't')]
    to: Format,

    /// Source format; inferred from the input extension when omitted.
    #[arg(long)]
    from: Option<Format>,

    /// Output file. Default: input path with the target extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rendering DPI for PDF pages (36–600).
    #[arg(long, env = "DOCCONV_RENDER_DPI", default_value_t = DEFAULT_RENDER_DPI,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "DOCCONV_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let source = match cli.from {
        Some(f) => f,
        None => infer_format(&cli.input)?,
    };
    let Some(conversion) = Conversion::between(source, cli.to) else {
        bail!(
            "Unsupported conversion: {} to {} (supported: {})",
            source,
            cli.to,
            Conversion::supported_keys().join(", ")
        );
    };

    let options = RenderOptions {
        dpi: cli.dpi,
        jpeg_quality: cli.jpeg_quality,
        pdfium_lib_path: cli.pdfium_lib_path.clone(),
        ..RenderOptions::default()
    };

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(conversion.target().as_str()));

    let converted = convert_file(&cli.input, conversion, &options)
        .await
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    write_atomic(&output_path, &converted.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} → {}  {}x{}  {} bytes",
            conversion,
            output_path.display(),
            converted.width,
            converted.height,
            converted.bytes.len()
        );
    }

    Ok(())
}

/// Source format from the file extension.
fn infer_format(path: &Path) -> Result<Format> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("Cannot infer format of '{}'; pass --from", path.display()))?;
    Format::from_extension(ext)
        .with_context(|| format!("Unknown extension '.{ext}'; pass --from pdf|png|jpeg"))
}

/// Write to a sibling temp file, then rename, so a failed run never leaves a
/// truncated output behind.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
