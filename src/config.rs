//! Configuration types for the conversion handler.
//!
//! All handler behaviour is controlled through [`HandlerConfig`], built via
//! its [`HandlerConfigBuilder`]. The Lambda binary feeds the builder from its
//! environment-backed arguments, whose defaults are the constants below. The
//! config is constructed once before the first request and never mutated
//! afterwards; every invocation borrows it.
//!
//! The rendering knobs live in their own [`RenderOptions`] so the local CLI
//! can drive the same codec stages without any storage settings.

use crate::error::ConvertError;
use std::path::PathBuf;
use std::time::Duration;

/// Default lifetime of a presigned output URL: one hour.
pub const DEFAULT_URL_TTL_SECS: u64 = 3600;

/// Default JPEG quality for every `*-jpeg` conversion.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default PDF rendering resolution: one point per pixel.
pub const DEFAULT_RENDER_DPI: u32 = 72;

/// Default cap on the longest rendered side.
pub const DEFAULT_MAX_RENDERED_PIXELS: u32 = 10_000;

/// How PDF pages are rasterised and images re-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Rendering DPI for PDF pages. Range: 36–600. Default: 72.
    ///
    /// At 72 DPI one PDF point maps to one pixel, so a US-Letter page comes
    /// out as 612 × 792 px.
    pub dpi: u32,

    /// Maximum rendered width or height in pixels. Default: 10000.
    ///
    /// Caps poster-sized pages independently of DPI; the other dimension
    /// scales proportionally.
    pub max_rendered_pixels: u32,

    /// JPEG quality, 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Directory containing the pdfium shared library. `None` binds the
    /// system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_RENDER_DPI,
            max_rendered_pixels: DEFAULT_MAX_RENDERED_PIXELS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            pdfium_lib_path: None,
        }
    }
}

/// Configuration for the Lambda conversion handler.
///
/// # Example
/// ```rust
/// use docconv::HandlerConfig;
///
/// let config = HandlerConfig::builder()
///     .input_bucket("uploads")
///     .output_bucket("converted")
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.url_ttl_secs, 3600);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    /// Bucket receiving the raw uploads (`INPUT_BUCKET`).
    pub input_bucket: String,

    /// Bucket receiving converted files (`OUTPUT_BUCKET`).
    pub output_bucket: String,

    /// Lifetime of the presigned download URL in seconds. Default: 3600.
    pub url_ttl_secs: u64,

    /// Where per-request scratch directories are created. `None` uses the OS
    /// temp dir (`/tmp` on Lambda).
    pub scratch_dir: Option<PathBuf>,

    /// Codec settings.
    pub render: RenderOptions,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            input_bucket: String::new(),
            output_bucket: String::new(),
            url_ttl_secs: DEFAULT_URL_TTL_SECS,
            scratch_dir: None,
            render: RenderOptions::default(),
        }
    }
}

impl HandlerConfig {
    /// Create a new builder for `HandlerConfig`.
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The presigned URL lifetime as a [`Duration`].
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

/// Builder for [`HandlerConfig`].
#[derive(Debug)]
pub struct HandlerConfigBuilder {
    config: HandlerConfig,
}

impl HandlerConfigBuilder {
    pub fn input_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.input_bucket = bucket.into();
        self
    }

    pub fn output_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.output_bucket = bucket.into();
        self
    }

    pub fn url_ttl_secs(mut self, secs: u64) -> Self {
        self.config.url_ttl_secs = secs;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.render.dpi = dpi.clamp(36, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.render.max_rendered_pixels = px.max(16);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.render.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.render.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HandlerConfig, ConvertError> {
        let c = &self.config;
        if c.input_bucket.is_empty() {
            return Err(ConvertError::InvalidConfig("input bucket is required".into()));
        }
        if c.output_bucket.is_empty() {
            return Err(ConvertError::InvalidConfig("output bucket is required".into()));
        }
        if c.url_ttl_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "presigned URL lifetime must be at least 1 second".into(),
            ));
        }
        // S3 rejects presigned URLs valid for more than seven days.
        if c.url_ttl_secs > 7 * 24 * 3600 {
            return Err(ConvertError::InvalidConfig(format!(
                "presigned URL lifetime must be ≤ 604800s, got {}",
                c.url_ttl_secs
            )));
        }
        if !(1..=100).contains(&c.render.jpeg_quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.render.jpeg_quality
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lambda_contract() {
        let c = HandlerConfig::builder()
            .input_bucket("in")
            .output_bucket("out")
            .build()
            .unwrap();
        assert_eq!(c.url_ttl_secs, 3600);
        assert_eq!(c.render.jpeg_quality, 90);
        assert_eq!(c.render.dpi, 72);
        assert!(c.scratch_dir.is_none());
    }

    #[test]
    fn missing_buckets_fail_build() {
        let err = HandlerConfig::builder().output_bucket("out").build().unwrap_err();
        assert!(err.to_string().contains("input bucket"));
        let err = HandlerConfig::builder().input_bucket("in").build().unwrap_err();
        assert!(err.to_string().contains("output bucket"));
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = HandlerConfig::builder()
            .input_bucket("in")
            .output_bucket("out")
            .dpi(5)
            .jpeg_quality(0)
            .build()
            .unwrap();
        assert_eq!(c.render.dpi, 36);
        assert_eq!(c.render.jpeg_quality, 1);
    }

    #[test]
    fn ttl_over_seven_days_rejected() {
        let err = HandlerConfig::builder()
            .input_bucket("in")
            .output_bucket("out")
            .url_ttl_secs(8 * 24 * 3600)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }
}
