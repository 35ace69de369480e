//! Request and progress value types.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::DEFAULT_CORRECTION_LEVEL;
use crate::error::{GenerateError, Result};

/// Pixel density used by the text convenience constructor.
pub const DEFAULT_PIXEL_DENSITY: i32 = 300;

/// Barcode symbology to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    #[default]
    Qr,
    Aztec,
}

impl Symbology {
    /// Stable one-byte tag mixed into cache keys.
    pub(crate) fn tag(self) -> u8 {
        match self {
            Symbology::Qr => 0x51,
            Symbology::Aztec => 0x41,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Qr => f.write_str("QR"),
            Symbology::Aztec => f.write_str("Aztec"),
        }
    }
}

impl FromStr for Symbology {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qr" => Ok(Symbology::Qr),
            "aztec" => Ok(Symbology::Aztec),
            other => Err(GenerateError::invalid(
                "symbology",
                format!("unknown symbology `{other}`, expected QR or AZTEC"),
            )),
        }
    }
}

/// Character encoding applied to text payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// Little-endian UTF-16 without a byte order mark.
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }
}

/// One immutable generation request.
///
/// Validation happens in the generator, so any value can be constructed here; a
/// non-positive density or empty payload is rejected before encoding starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    payload: Vec<u8>,
    correction_level: i32,
    pixel_density: i32,
    symbology: Symbology,
}

impl GenerationRequest {
    /// Creates a QR request over raw bytes.
    pub fn new(payload: impl Into<Vec<u8>>, correction_level: i32, pixel_density: i32) -> Self {
        Self {
            payload: payload.into(),
            correction_level,
            pixel_density,
            symbology: Symbology::Qr,
        }
    }

    /// Creates a QR request over the UTF-8 bytes of `text` with the default level and density.
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with_encoding(text, TextEncoding::Utf8)
    }

    /// Like [`GenerationRequest::from_text`], with the payload bytes produced by `encoding`.
    pub fn from_text_with_encoding(text: &str, encoding: TextEncoding) -> Self {
        Self::new(encoding.encode(text), DEFAULT_CORRECTION_LEVEL, DEFAULT_PIXEL_DENSITY)
    }

    /// Creates a QR request from a Base64 payload.
    ///
    /// # Errors
    ///
    /// [`GenerateError::InvalidArgument`] when `encoded` is blank or not valid Base64.
    pub fn from_base64(encoded: &str, correction_level: i32, pixel_density: i32) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(GenerateError::invalid("payload", "Base64 string cannot be empty"));
        }
        let payload = STANDARD.decode(encoded).map_err(|err| {
            GenerateError::invalid("payload", format!("invalid Base64 string format: {err}"))
        })?;
        Ok(Self::new(payload, correction_level, pixel_density))
    }

    #[must_use]
    pub fn with_symbology(mut self, symbology: Symbology) -> Self {
        self.symbology = symbology;
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn correction_level(&self) -> i32 {
        self.correction_level
    }

    pub fn pixel_density(&self) -> i32 {
        self.pixel_density
    }

    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    pub(crate) fn with_correction_level(mut self, correction_level: i32) -> Self {
        self.correction_level = correction_level;
        self
    }
}

/// Cumulative progress of a batch, reported once per completed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    completed: usize,
    total: usize,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Completion percentage in `0.0..=100.0`; zero for an empty batch.
    pub fn percent(&self) -> f64 {
        if self.total > 0 {
            self.completed as f64 / self.total as f64 * 100.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.completed, self.total, self.percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_uses_defaults() {
        let request = GenerationRequest::from_text("Hello World!");
        assert_eq!(request.payload(), b"Hello World!");
        assert_eq!(request.correction_level(), 2);
        assert_eq!(request.pixel_density(), 300);
        assert_eq!(request.symbology(), Symbology::Qr);
    }

    #[test]
    fn test_from_text_with_utf16_encodings() {
        let le = GenerationRequest::from_text_with_encoding("Añ中", TextEncoding::Utf16Le);
        assert_eq!(le.payload(), &[0x41, 0x00, 0xF1, 0x00, 0x2D, 0x4E]);

        let be = GenerationRequest::from_text_with_encoding("Añ中", TextEncoding::Utf16Be);
        assert_eq!(be.payload(), &[0x00, 0x41, 0x00, 0xF1, 0x4E, 0x2D]);

        let utf8 = GenerationRequest::from_text_with_encoding("Añ中", TextEncoding::Utf8);
        assert_eq!(utf8, GenerationRequest::from_text("Añ中"));
        assert_eq!((le.correction_level(), le.pixel_density()), (2, 300));
    }

    #[test]
    fn test_from_base64_decodes_payload() {
        let request = GenerationRequest::from_base64("SGVsbG8gV29ybGQh", 1, 200).unwrap();
        assert_eq!(request.payload(), b"Hello World!");
        assert_eq!(request.correction_level(), 1);
        assert_eq!(request.pixel_density(), 200);
    }

    #[test]
    fn test_from_base64_rejects_malformed_and_blank() {
        let err = GenerationRequest::from_base64("not base64!!", 2, 300).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidArgument { param: "payload", .. }));

        let err = GenerationRequest::from_base64("   ", 2, 300).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidArgument { param: "payload", .. }));
    }

    #[test]
    fn test_symbology_parsing() {
        assert_eq!("QR".parse::<Symbology>().unwrap(), Symbology::Qr);
        assert_eq!(" aztec ".parse::<Symbology>().unwrap(), Symbology::Aztec);
        assert!("pdf417".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_batch_progress_percent_and_display() {
        let progress = BatchProgress::new(1, 4);
        assert_eq!(progress.percent(), 25.0);
        assert_eq!(progress.to_string(), "1/4 (25.0%)");
        assert_eq!(BatchProgress::new(0, 0).percent(), 0.0);
    }
}
