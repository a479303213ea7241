//! File formats and the conversion dispatch table.
//!
//! A conversion is named by its key, `"{source}-{target}"`, exactly as the
//! caller spells it in the query string (after lower-casing). Only four keys
//! exist; [`Conversion::ALL`] is the single source of truth for both dispatch
//! and the `supported_conversions` list echoed back on a 400.

use std::fmt;
use std::str::FromStr;

/// A file format the converter reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Pdf,
    Png,
    Jpeg,
}

impl Format {
    /// Lower-case name as used in query parameters and object-key extensions.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Png => "png",
            Format::Jpeg => "jpeg",
        }
    }

    /// MIME type attached to stored objects of this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Png => "image/png",
            Format::Jpeg => "image/jpeg",
        }
    }

    /// Guess a format from a file extension (case-insensitive, `jpg` accepted).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Format::Pdf),
            "png" => Some(Format::Png),
            "jpeg" | "jpg" => Some(Format::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the same names as [`Format::from_extension`], so `jpg` works on the
/// command line. Request dispatch never goes through this; it matches keys.
impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown format '{s}'"))
    }
}

/// One of the four supported conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    PdfToPng,
    PngToJpeg,
    JpegToPng,
    PdfToJpeg,
}

impl Conversion {
    /// Every supported conversion, in the order they are reported to callers.
    pub const ALL: [Conversion; 4] = [
        Conversion::PdfToPng,
        Conversion::PngToJpeg,
        Conversion::JpegToPng,
        Conversion::PdfToJpeg,
    ];

    pub fn source(self) -> Format {
        match self {
            Conversion::PdfToPng | Conversion::PdfToJpeg => Format::Pdf,
            Conversion::PngToJpeg => Format::Png,
            Conversion::JpegToPng => Format::Jpeg,
        }
    }

    pub fn target(self) -> Format {
        match self {
            Conversion::PdfToPng | Conversion::JpegToPng => Format::Png,
            Conversion::PngToJpeg | Conversion::PdfToJpeg => Format::Jpeg,
        }
    }

    /// The dispatch key, e.g. `"pdf-png"`.
    pub fn key(self) -> &'static str {
        match self {
            Conversion::PdfToPng => "pdf-png",
            Conversion::PngToJpeg => "png-jpeg",
            Conversion::JpegToPng => "jpeg-png",
            Conversion::PdfToJpeg => "pdf-jpeg",
        }
    }

    /// Look up a conversion by its dispatch key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Find the conversion between two parsed formats, if supported.
    pub fn between(source: Format, target: Format) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.source() == source && c.target() == target)
    }

    /// All dispatch keys in reporting order.
    pub fn supported_keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.key()).collect()
    }

    /// Whether the source must be rasterised by the PDF engine first.
    pub fn needs_rasterisation(self) -> bool {
        self.source() == Format::Pdf
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
