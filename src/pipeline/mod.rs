//! Pipeline stages for a single conversion.
//!
//! Each submodule implements exactly one transformation step, so the four
//! supported conversions collapse into one path:
//!
//! ```text
//! input ──▶ render? ──▶ encode (flatten? + PNG/JPEG)
//! (scratch)  (pdfium)    (image)
//! ```
//!
//! 1. [`input`]  — materialise the uploaded bytes as a scratch file that is
//!    removed when dropped
//! 2. [`render`] — rasterise page 1 of a PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`] — decode raster sources, flatten alpha for JPEG targets and
//!    produce the output bytes

pub mod encode;
pub mod input;
pub mod render;
