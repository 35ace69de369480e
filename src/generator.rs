//! The generation facade: validation, caching, encoding and rendering behind one call, plus
//! the async wrapper and the cancellable batch pipeline built on top of it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CacheStatistics, ResultCache};
use crate::config::{GeneratorConfig, DEFAULT_CORRECTION_LEVEL};
use crate::encoder::{DefaultEncoder, SymbolEncoder};
use crate::error::{GenerateError, Result};
use crate::output::{resolve_output_path, save_image, timestamped_file_name, ImageFormat};
use crate::render::{PixelRenderer, RenderedImage};
use crate::request::{BatchProgress, GenerationRequest, Symbology};

/// Receives cumulative progress after each completed batch item.
pub trait ProgressSink {
    fn report(&mut self, progress: BatchProgress);
}

impl<F: FnMut(BatchProgress)> ProgressSink for F {
    fn report(&mut self, progress: BatchProgress) {
        self(progress)
    }
}

impl ProgressSink for mpsc::UnboundedSender<BatchProgress> {
    fn report(&mut self, progress: BatchProgress) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.send(progress);
    }
}

/// Lifecycle of one batch. `Cancelled` and `Failed` release every image produced so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Pending => "pending",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Cancelled => "cancelled",
            BatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct BatchRun {
    state: BatchState,
    total: usize,
}

impl BatchRun {
    fn new(total: usize) -> Self {
        Self { state: BatchState::Pending, total }
    }

    fn advance(&mut self, next: BatchState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, total = self.total, "batch state");
            self.state = next;
        }
    }

    /// Moves to a terminal failure state and drops the partial results.
    fn abort(&mut self, next: BatchState, images: Vec<RenderedImage>) {
        self.advance(next);
        let released = images.len();
        drop(images);
        warn!(state = %next, released, total = self.total, "batch aborted");
    }
}

/// Turns [`GenerationRequest`]s into [`RenderedImage`]s.
///
/// Cloning is cheap: clones share the encoder, cache and worker limit.
pub struct Generator<E = DefaultEncoder> {
    encoder: Arc<E>,
    renderer: PixelRenderer,
    cache: Arc<ResultCache>,
    config: Arc<GeneratorConfig>,
    workers: Arc<Semaphore>,
}

impl<E> Clone for Generator<E> {
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            renderer: self.renderer,
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
            workers: Arc::clone(&self.workers),
        }
    }
}

impl Generator<DefaultEncoder> {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_encoder(config, DefaultEncoder)
    }
}

impl Default for Generator<DefaultEncoder> {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl<E: SymbolEncoder> Generator<E> {
    pub fn with_encoder(config: GeneratorConfig, encoder: E) -> Self {
        let cache = Arc::new(ResultCache::new(&config.cache));
        Self::with_parts(config, encoder, cache)
    }

    /// Builds a generator around an existing cache, e.g. one shared between generators.
    ///
    /// A negative `default_correction_level` is replaced by [`DEFAULT_CORRECTION_LEVEL`].
    pub fn with_parts(mut config: GeneratorConfig, encoder: E, cache: Arc<ResultCache>) -> Self {
        if config.default_correction_level < 0 {
            warn!(
                configured = config.default_correction_level,
                used = DEFAULT_CORRECTION_LEVEL,
                "negative default correction level"
            );
            config.default_correction_level = DEFAULT_CORRECTION_LEVEL;
        }
        Self {
            encoder: Arc::new(encoder),
            renderer: PixelRenderer::new(config.render.parallel_threshold),
            cache,
            workers: Arc::new(Semaphore::new(config.workers.max_concurrent.max(1))),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Snapshot of the cache; expired entries are swept as a side effect.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Generates one image, blocking the calling thread.
    ///
    /// Served from the cache when possible. On a miss the image is encoded and rendered with
    /// no lock held, then cached if caching is enabled and the density is within
    /// `cache.max_cached_density`.
    ///
    /// # Errors
    ///
    /// - [`GenerateError::InvalidArgument`] for an empty payload, a non-positive density or
    ///   a density above `render.max_pixel_density`. The encoder is never called in that case.
    /// - [`GenerateError::EncodingFailure`] when the encoder fails.
    #[instrument(
        skip(self, request),
        fields(
            symbology = %request.symbology(),
            level = request.correction_level(),
            density = request.pixel_density(),
            bytes = request.payload().len()
        )
    )]
    pub fn generate(&self, request: &GenerationRequest) -> Result<RenderedImage> {
        self.validate(request)?;

        let normalized;
        let request = if request.correction_level() < 0 {
            let level = self.config.default_correction_level;
            warn!(requested = request.correction_level(), used = level, "negative correction level");
            normalized = request.clone().with_correction_level(level);
            &normalized
        } else {
            request
        };

        let key = CacheKey::derive(request);
        let caching = self.config.cache.enabled;
        if caching {
            if let Some(image) = self.cache.get(&key) {
                debug!(%key, "served from cache");
                return Ok(image);
            }
        }

        let symbology = request.symbology();
        let side = request.pixel_density() as u32;
        let grid = self
            .encoder
            .encode(symbology, request.payload(), request.correction_level(), side, side)
            .map_err(|source| GenerateError::EncodingFailure { symbology, source })?;
        let image = self.renderer.render(&grid)?;

        if caching && request.pixel_density() <= self.config.cache.max_cached_density {
            self.cache.put(key, &image);
        } else if caching {
            debug!(%key, ceiling = self.config.cache.max_cached_density, "image too large to cache");
        }
        Ok(image)
    }

    /// Renders `request` to `path` in `format`.
    ///
    /// Relative paths land in `output.directory` under their file name; absolute paths are
    /// used as given. Returns the path written.
    pub fn generate_to_file(
        &self,
        request: &GenerationRequest,
        path: impl AsRef<Path>,
        format: ImageFormat,
    ) -> Result<PathBuf> {
        let path = self.output_path(path.as_ref())?;
        let image = self.generate(request)?;
        save_image(&image, path, format)
    }

    /// Saves a PNG named `<QRCode|AztecCode>_<timestamp>.png` in `output.directory`.
    pub fn generate_to_default_file(&self, request: &GenerationRequest) -> Result<PathBuf> {
        let name = timestamped_file_name(file_prefix(request.symbology()), ImageFormat::Png);
        self.generate_to_file(request, name, ImageFormat::Png)
    }

    fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if request.payload().is_empty() {
            return Err(GenerateError::invalid("payload", "payload cannot be empty"));
        }
        let density = request.pixel_density();
        if density <= 0 {
            return Err(GenerateError::invalid(
                "pixel_density",
                format!("pixel density must be greater than zero, got {density}"),
            ));
        }
        let ceiling = self.config.render.max_pixel_density;
        if density > ceiling {
            return Err(GenerateError::invalid(
                "pixel_density",
                format!("pixel density must be at most {ceiling}, got {density}"),
            ));
        }
        Ok(())
    }

    fn output_path(&self, path: &Path) -> Result<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(GenerateError::invalid("path", "file path cannot be empty"));
        }
        Ok(resolve_output_path(path, &self.config.output.directory))
    }
}

impl<E: SymbolEncoder + 'static> Generator<E> {
    /// Runs [`Generator::generate`] on the blocking pool.
    ///
    /// At most `workers.max_concurrent` of these run at once. Cancellation is checked while
    /// waiting for a worker slot and again just before the work starts; a render already in
    /// progress is not interrupted, its result is discarded.
    ///
    /// # Errors
    ///
    /// Everything [`Generator::generate`] returns, plus [`GenerateError::Cancelled`] and
    /// [`GenerateError::Worker`] if the blocking task panics.
    #[instrument(skip_all, fields(symbology = %request.symbology(), density = request.pixel_density()))]
    pub async fn generate_async(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<RenderedImage> {
        self.validate(&request)?;

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            permit = Arc::clone(&self.workers).acquire_owned() => {
                permit.map_err(|err| GenerateError::Worker(err.to_string()))?
            }
        };

        let this = self.clone();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            if token.is_cancelled() {
                return Err(GenerateError::Cancelled);
            }
            this.generate(&request)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerateError::Cancelled),
            joined = task => joined.map_err(|err| GenerateError::Worker(err.to_string()))?,
        }
    }

    /// Generates every request strictly in order and returns the images in the same order.
    ///
    /// Cancellation is checked before each item. `progress` is called after each completed
    /// item. On cancellation or any failure the images produced so far are dropped and the
    /// error is returned; there are no partial results.
    #[instrument(skip_all)]
    pub async fn generate_batch_async<I>(
        &self,
        requests: I,
        mut progress: Option<&mut (dyn ProgressSink + Send)>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RenderedImage>>
    where
        I: IntoIterator<Item = GenerationRequest>,
    {
        let requests: Vec<GenerationRequest> = requests.into_iter().collect();
        let total = requests.len();
        let mut run = BatchRun::new(total);
        let mut images = Vec::with_capacity(total);
        info!(total, "batch started");

        for request in requests {
            if cancel.is_cancelled() {
                run.abort(BatchState::Cancelled, images);
                return Err(GenerateError::Cancelled);
            }
            run.advance(BatchState::Running);

            match self.generate_async(request, cancel).await {
                Ok(image) => images.push(image),
                Err(err) => {
                    let state = if err.is_cancelled() {
                        BatchState::Cancelled
                    } else {
                        BatchState::Failed
                    };
                    run.abort(state, images);
                    return Err(err);
                }
            }

            if let Some(sink) = progress.as_deref_mut() {
                sink.report(BatchProgress::new(images.len(), total));
            }
        }

        run.advance(BatchState::Completed);
        info!(total, "batch completed");
        Ok(images)
    }

    /// Async form of [`Generator::generate_to_file`]; the file is written on the blocking pool.
    pub async fn generate_to_file_async(
        &self,
        request: GenerationRequest,
        path: impl AsRef<Path>,
        format: ImageFormat,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let path = self.output_path(path.as_ref())?;
        let image = self.generate_async(request, cancel).await?;
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }
        tokio::task::spawn_blocking(move || save_image(&image, path, format))
            .await
            .map_err(|err| GenerateError::Worker(err.to_string()))?
    }
}

impl<E> fmt::Debug for Generator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("renderer", &self.renderer)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn file_prefix(symbology: Symbology) -> &'static str {
    match symbology {
        Symbology::Qr => "QRCode",
        Symbology::Aztec => "AztecCode",
    }
}
