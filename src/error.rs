//! Error types shared by the generation pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::request::Symbology;

/// Result alias used across the crate.
pub type Result<T, E = GenerateError> = std::result::Result<T, E>;

/// Errors surfaced by [`Generator`](crate::generator::Generator) and the renderer.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The caller supplied an unusable argument. Raised before any encoding starts.
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument { param: &'static str, reason: String },

    /// The symbol encoder rejected the (normalised) input or failed internally.
    #[error("failed to generate {symbology} code matrix")]
    EncodingFailure {
        symbology: Symbology,
        #[source]
        source: EncodeError,
    },

    /// Cancellation was observed at a checkpoint.
    #[error("operation was cancelled")]
    Cancelled,

    /// Writing an image to disk failed.
    #[error("failed to write image to {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A background render task panicked or was aborted.
    #[error("render worker failed: {0}")]
    Worker(String),
}

impl GenerateError {
    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { param, reason: reason.into() }
    }

    /// Returns `true` for [`GenerateError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure reported by a [`SymbolEncoder`](crate::encoder::SymbolEncoder).
///
/// Ways to handle [`EncodeError::DataTooLong`]:
///
/// - Decrease the correction level if it was greater than the minimum.
/// - Split the payload over several symbols.
/// - Propagate the error upward to the caller/user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// The payload does not fit in the largest symbol at the requested level.
    #[error("data length = {used_bits} bits, max capacity = {capacity_bits} bits")]
    DataTooLong { used_bits: usize, capacity_bits: usize },

    /// A third-party encoder failed; the message is preserved verbatim.
    #[error("{0}")]
    Backend(String),
}

/// Errors raised while loading or validating [`GeneratorConfig`](crate::config::GeneratorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by [`init_logging`](crate::logging::init_logging).
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("a global subscriber is already installed: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
