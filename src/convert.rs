//! Conversion entry points that work on local files and bytes.
//!
//! These are storage-free: the Lambda handler wraps them with blob-store I/O,
//! the `docconv` CLI calls them directly. Every conversion follows the same
//! shape regardless of the pair:
//!
//! ```text
//! source file ──▶ rasterise page 1 (PDF only) ──▶ flatten alpha (JPEG only) ──▶ encode
//!                 or decode (PNG/JPEG)
//! ```

use crate::config::RenderOptions;
use crate::error::ConvertError;
use crate::format::Conversion;
use crate::pipeline::{encode, input::ScratchFile, render};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Bytes produced by a conversion, with the MIME type to store them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Convert the file at `path`, assumed to be in `conversion.source()` format.
pub async fn convert_file(
    path: &Path,
    conversion: Conversion,
    options: &RenderOptions,
) -> Result<ConvertedFile, ConvertError> {
    let start = Instant::now();

    let image = if conversion.needs_rasterisation() {
        render::render_first_page(path, options).await?
    } else {
        let path = path.to_path_buf();
        let source = conversion.source();
        run_blocking("Decode", move || encode::decode_file(&path, source)).await?
    };

    let (width, height) = (image.width(), image.height());
    let target = conversion.target();
    let quality = options.jpeg_quality;
    let bytes = run_blocking("Encode", move || encode::encode(image, target, quality)).await?;

    info!(
        "Converted {} → {} bytes ({}x{}) in {}ms",
        conversion,
        bytes.len(),
        width,
        height,
        start.elapsed().as_millis()
    );

    Ok(ConvertedFile {
        bytes,
        content_type: target.content_type(),
        width,
        height,
    })
}

/// Convert in-memory bytes.
///
/// The bytes are written to a managed scratch file under `scratch_base` (or
/// the OS temp dir) which is removed on return, error or panic.
pub async fn convert_bytes(
    bytes: &[u8],
    conversion: Conversion,
    options: &RenderOptions,
    scratch_base: Option<&Path>,
) -> Result<ConvertedFile, ConvertError> {
    let file_name = format!("input.{}", conversion.source());
    let scratch = ScratchFile::with_contents(scratch_base, &file_name, bytes).await?;
    convert_file(scratch.path(), conversion, options).await
}

/// Run CPU-bound codec work off the async worker threads.
async fn run_blocking<T, F>(stage: &'static str, f: F) -> Result<T, ConvertError>
where
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("{stage} task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        encode::encode_png(img).unwrap()
    }

    #[tokio::test]
    async fn png_to_jpeg_flattens_and_reports_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 0])));
        let out = convert_bytes(
            &png_bytes(&img),
            Conversion::PngToJpeg,
            &RenderOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(out.content_type, "image/jpeg");
        assert_eq!((out.width, out.height), (8, 4));
        let back = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert!(back.pixels().all(|p| p.0.iter().all(|&c| c >= 253)));
    }

    #[tokio::test]
    async fn jpeg_to_png_preserves_dimensions() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 9, Rgb([30, 90, 150])));
        let jpeg = encode::encode_jpeg(rgb, 90).unwrap();

        let out = convert_bytes(&jpeg, Conversion::JpegToPng, &RenderOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(out.content_type, "image/png");
        assert_eq!(&out.bytes[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((back.width(), back.height()), (5, 9));
    }

    #[tokio::test]
    async fn garbage_input_is_invalid_input() {
        let err = convert_bytes(
            b"not a png",
            Conversion::PngToJpeg,
            &RenderOptions::default(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn scratch_dir_is_empty_after_failure() {
        let base = tempfile::tempdir().unwrap();
        let _ = convert_bytes(
            b"still not a png",
            Conversion::PngToJpeg,
            &RenderOptions::default(),
            Some(base.path()),
        )
        .await;
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }
}
