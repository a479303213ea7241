//! Image codec stage: decode, flatten alpha, and encode PNG/JPEG bytes.
//!
//! JPEG has no alpha channel. Any image carrying one is composited over an
//! opaque white background, using its own alpha as the mask, before the JPEG
//! encoder sees it. PNG output keeps whatever channels the source had.

use crate::error::ConvertError;
use crate::format::Format;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Decode the image file at `path`, which was declared to be `format`.
///
/// The container is sniffed from the file content, so a mislabelled but
/// otherwise valid image still decodes.
pub fn decode_file(path: &Path, format: Format) -> Result<DynamicImage, ConvertError> {
    let invalid = |detail: String| ConvertError::InvalidInput { format, detail };

    let reader = ImageReader::open(path)
        .map_err(|e| ConvertError::Scratch {
            path: path.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| ConvertError::Scratch {
            path: path.to_path_buf(),
            source: e,
        })?;

    let reader = if reader.format().is_none() {
        let mut reader = reader;
        reader.set_format(image_format(format).ok_or_else(|| {
            invalid("no image decoder for this format".to_string())
        })?);
        reader
    } else {
        reader
    };

    let img = reader.decode().map_err(|e| invalid(e.to_string()))?;
    debug!(
        "Decoded {} → {}x{} {:?}",
        format,
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}

/// Composite `img` over opaque white and drop its alpha channel.
///
/// Images without alpha pass through unchanged. Grayscale+alpha flattens to
/// grayscale; everything else to 8-bit RGB.
pub fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }

    let is_gray = !img.color().has_color();
    if is_gray {
        let la = img.to_luma_alpha8();
        let out = GrayImage::from_fn(la.width(), la.height(), |x, y| {
            let [l, a] = la.get_pixel(x, y).0;
            image::Luma([over_white(l, a)])
        });
        DynamicImage::ImageLuma8(out)
    } else {
        let rgba = img.to_rgba8();
        let out = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            image::Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
        });
        DynamicImage::ImageRgb8(out)
    }
}

/// `src` blended over 255 with coverage `alpha`, rounded to nearest.
fn over_white(src: u8, alpha: u8) -> u8 {
    let src = src as u32;
    let alpha = alpha as u32;
    ((src * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}

/// Encode as PNG, keeping all channels.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ConvertError::EncodeFailed {
            format: Format::Png,
            source: e,
        })?;
    debug!("Encoded PNG → {} bytes", buf.len());
    Ok(buf)
}

/// Flatten alpha and encode as baseline JPEG at `quality` (1–100).
pub fn encode_jpeg(img: DynamicImage, quality: u8) -> Result<Vec<u8>, ConvertError> {
    let flat = flatten_alpha(img);
    // JPEG only takes 8-bit gray or RGB.
    let flat = match flat {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => flat,
        other if !other.color().has_color() => DynamicImage::ImageLuma8(other.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    flat.write_with_encoder(encoder)
        .map_err(|e| ConvertError::EncodeFailed {
            format: Format::Jpeg,
            source: e,
        })?;
    debug!("Encoded JPEG q={} → {} bytes", quality, buf.len());
    Ok(buf)
}

/// Encode `img` as `target`.
pub fn encode(img: DynamicImage, target: Format, jpeg_quality: u8) -> Result<Vec<u8>, ConvertError> {
    match target {
        Format::Png => encode_png(&img),
        Format::Jpeg => encode_jpeg(img, jpeg_quality),
        Format::Pdf => Err(ConvertError::Internal(
            "PDF is not an image encoding target".into(),
        )),
    }
}

fn image_format(format: Format) -> Option<ImageFormat> {
    match format {
        Format::Png => Some(ImageFormat::Png),
        Format::Jpeg => Some(ImageFormat::Jpeg),
        Format::Pdf => None,
    }
}
