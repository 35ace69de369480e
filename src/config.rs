//! Runtime configuration for the generation pipeline.
//!
//! Every section is optional in TOML; missing keys fall back to the defaults below.
//!
//! ```toml
//! default_correction_level = 2
//!
//! [cache]
//! capacity = 100
//! expiry_secs = 1800
//! max_cached_density = 1000
//!
//! [render]
//! parallel_threshold = 10000
//! max_pixel_density = 10000
//!
//! [output]
//! directory = "generated"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Correction level used when a request carries a negative one.
pub const DEFAULT_CORRECTION_LEVEL: i32 = 2;

/// Top-level configuration consumed by [`Generator`](crate::generator::Generator).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub default_correction_level: i32,
    pub cache: CacheConfig,
    pub render: RenderConfig,
    pub workers: WorkerConfig,
    pub output: OutputConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_correction_level: DEFAULT_CORRECTION_LEVEL,
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
            workers: WorkerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_correction_level < 0 {
            return Err(ConfigError::Invalid(format!(
                "default_correction_level must be non-negative, got {}",
                self.default_correction_level
            )));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache.capacity must be greater than zero while the cache is enabled".into(),
            ));
        }
        if !(self.cache.sweep_ratio > 0.0 && self.cache.sweep_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cache.sweep_ratio must be in (0, 1], got {}",
                self.cache.sweep_ratio
            )));
        }
        if self.render.max_pixel_density <= 0 {
            return Err(ConfigError::Invalid(format!(
                "render.max_pixel_density must be greater than zero, got {}",
                self.render.max_pixel_density
            )));
        }
        if self.workers.max_concurrent == 0 {
            return Err(ConfigError::Invalid("workers.max_concurrent must be at least 1".into()));
        }
        Ok(())
    }
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Hard cap on the number of cached images.
    pub capacity: usize,
    /// Entries older than this are expired.
    pub expiry_secs: u64,
    /// Fill ratio at which `put` sweeps expired entries first.
    pub sweep_ratio: f64,
    /// Images with a larger pixel density are never cached.
    pub max_cached_density: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            expiry_secs: 30 * 60,
            sweep_ratio: 0.8,
            max_cached_density: 1000,
        }
    }
}

impl CacheConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pixel count above which rows are rendered in parallel.
    pub parallel_threshold: usize,
    /// Largest accepted pixel density; larger requests are rejected before encoding.
    pub max_pixel_density: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { parallel_threshold: 10_000, max_pixel_density: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of encode+render jobs running on the blocking pool at once.
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives files saved under a relative path.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("generated") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml_str(
            r#"
            [cache]
            capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.cache.expiry_secs, 1800);
        assert_eq!(config.render.parallel_threshold, 10_000);
        assert_eq!(config.render.max_pixel_density, 10_000);
        assert_eq!(config.default_correction_level, DEFAULT_CORRECTION_LEVEL);
        assert_eq!(config.output.directory, PathBuf::from("generated"));
    }

    #[test]
    fn test_invalid_sweep_ratio_is_rejected() {
        let err = GeneratorConfig::from_toml_str("[cache]\nsweep_ratio = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_capacity_allowed_when_cache_disabled() {
        let config =
            GeneratorConfig::from_toml_str("[cache]\nenabled = false\ncapacity = 0\n").unwrap();
        assert!(!config.cache.enabled);

        let err = GeneratorConfig::from_toml_str("[cache]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_non_positive_max_density_is_rejected() {
        let err = GeneratorConfig::from_toml_str("[render]\nmax_pixel_density = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = GeneratorConfig::from_toml_str("[render]\nmax_pixel_density = 640\n").unwrap();
        assert_eq!(config.render.max_pixel_density, 640);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = GeneratorConfig::from_toml_str("cache = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GeneratorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
