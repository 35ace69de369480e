//! # aztecqr
//!
//! A Rust library for generating QR and Aztec barcode images, with a result cache, parallel
//! rendering and cancellable batch generation.
//!
//! `aztecqr` turns a payload into a square RGB image of exactly the requested pixel density.
//! QR symbols come from a built-in QR Code Model 2 encoder (versions 1 to 40, four error
//! correction levels); Aztec symbols come from `rxing`. Identical requests are served from an
//! in-memory cache with time-based expiry.
//!
//! ## Features
//!
//! - Encode raw bytes, text (UTF-8 or UTF-16) or Base64 as QR or Aztec.
//! - Render sequentially or across the rayon pool depending on image size.
//! - Cache rendered images with a capacity cap and an expiry window.
//! - Generate asynchronously on tokio's blocking pool with a bounded number of workers.
//! - Run ordered batches with progress reporting and cooperative cancellation.
//! - Save images as PNG, JPEG or BMP.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! aztecqr = "0.2" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Generate an image, then the same one again from the cache:
//!
//! ```rust
//! use aztecqr::{GenerationRequest, Generator};
//!
//! let generator = Generator::default();
//! let request = GenerationRequest::new("Hello World!", 2, 300);
//!
//! let image = generator.generate(&request).unwrap();
//! assert_eq!((image.width(), image.height()), (300, 300));
//!
//! let again = generator.generate(&request).unwrap();
//! assert_eq!(image, again);
//! assert_eq!(generator.cache_statistics().hits, 1);
//! ```
//!
//! Run a batch with progress reporting:
//!
//! ```rust
//! use aztecqr::{BatchProgress, GenerationRequest, Generator, Symbology};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let generator = Generator::default();
//! let requests = ["one", "two", "three"]
//!     .map(|text| GenerationRequest::new(text, 1, 120).with_symbology(Symbology::Aztec));
//!
//! let mut on_progress = |p: BatchProgress| println!("{p}");
//! let images = generator
//!     .generate_batch_async(requests, Some(&mut on_progress), &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(images.len(), 3);
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`generator`]: The generation facade, async wrapper and batch pipeline.
//! - [`cache`]: Thread-safe result cache with expiry.
//! - [`render`]: Grid to pixel buffer rendering.
//! - [`encoder`]: The encoder contract, the QR encoder and the Aztec adapter.
//! - [`output`]: Saving images to disk.
//! - [`config`]: TOML configuration.

pub mod cache;
pub mod config;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod logging;
pub mod output;
pub mod render;
pub mod request;

pub use cache::{CacheKey, CacheStatistics, Clock, ManualClock, ResultCache, SystemClock};
pub use config::GeneratorConfig;
pub use encoder::{DefaultEncoder, SymbolEncoder, SymbolGrid};
pub use error::{ConfigError, EncodeError, GenerateError, LoggingError, Result};
pub use generator::{BatchState, Generator, ProgressSink};
pub use output::ImageFormat;
pub use render::{PixelRenderer, RenderStrategy, RenderedImage};
pub use request::{BatchProgress, GenerationRequest, Symbology, TextEncoding};
