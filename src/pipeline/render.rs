//! PDF rasterisation: render the first page to a `DynamicImage` via pdfium.
//!
//! Only page index 0 is ever rendered. Later pages are ignored without a
//! warning; a three-page upload produces exactly the image of its first page.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! The library binding, the open document and the page all live inside one
//! blocking closure, so they are released on every exit path.

use crate::config::RenderOptions;
use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Rasterise the first page of the PDF at `pdf_path`.
pub async fn render_first_page(
    pdf_path: &Path,
    options: &RenderOptions,
) -> Result<DynamicImage, ConvertError> {
    let path = pdf_path.to_path_buf();
    let options = options.clone();

    tokio::task::spawn_blocking(move || render_first_page_blocking(&path, &options))
        .await
        .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind pdfium from `lib_dir` when given, otherwise from the system library
/// search path.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let bindings = match lib_dir {
        Some(dir) => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(
    pdf_path: &Path,
    options: &RenderOptions,
) -> Result<DynamicImage, ConvertError> {
    let pdfium = bind_pdfium(options.pdfium_lib_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| rasterisation_failed(pdf_path, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering page 1", total_pages);

    if total_pages == 0 {
        return Err(ConvertError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }

    let page = pages.get(0).map_err(|e| rasterisation_failed(pdf_path, e))?;

    let (width, height) = target_size(
        page.width().value,
        page.height().value,
        options.dpi,
        options.max_rendered_pixels,
    );
    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| rasterisation_failed(pdf_path, e))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    Ok(image)
}

/// Pixel size for a page of `width_pts` × `height_pts` at `dpi`, scaled down
/// proportionally so neither side exceeds `max_pixels`.
pub(crate) fn target_size(width_pts: f32, height_pts: f32, dpi: u32, max_pixels: u32) -> (i32, i32) {
    let scale = dpi as f32 / PDF_POINTS_PER_INCH;
    let mut w = (width_pts * scale).max(1.0);
    let mut h = (height_pts * scale).max(1.0);

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }

    (w.round().max(1.0) as i32, h.round().max(1.0) as i32)
}

fn rasterisation_failed(path: &Path, e: PdfiumError) -> ConvertError {
    ConvertError::RasterisationFailed {
        path: PathBuf::from(path),
        detail: format!("{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_point_is_one_pixel_at_72_dpi() {
        assert_eq!(target_size(612.0, 792.0, 72, 10_000), (612, 792));
    }

    #[test]
    fn dpi_scales_both_sides() {
        assert_eq!(target_size(100.0, 50.0, 144, 10_000), (200, 100));
    }

    #[test]
    fn longest_side_is_capped() {
        let (w, h) = target_size(2000.0, 1000.0, 72, 500);
        assert_eq!((w, h), (500, 250));
    }

    #[test]
    fn degenerate_pages_still_render_one_pixel() {
        assert_eq!(target_size(0.0, 0.0, 72, 100), (1, 1));
    }

    #[test]
    fn binding_a_missing_library_fails_cleanly() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/pdfium"))).unwrap_err();
        assert!(matches!(err, ConvertError::PdfiumBindingFailed(_)));
    }
}
