//! Grid to RGB pixel buffer conversion.

use rayon::prelude::*;
use tracing::debug;

use crate::encoder::SymbolGrid;
use crate::error::{GenerateError, Result};

const DARK: u8 = 0x00;
const LIGHT: u8 = 0xFF;
const CHANNELS: usize = 3;

/// An owned, packed RGB buffer (3 bytes per pixel, row-major).
///
/// Every holder owns its own copy: the cache clones on the way in and on the way out, so
/// mutating or dropping one image never affects another.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGB value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Copies the buffer into an [`image::RgbImage`] for encoding to a file format.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Deep clone that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> Option<Self> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(self.pixels.len()).ok()?;
        pixels.extend_from_slice(&self.pixels);
        Some(Self { width: self.width, height: self.height, pixels })
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for RenderedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Sequential,
    /// Rows are split across the rayon pool.
    Parallel,
}

/// Converts [`SymbolGrid`]s into [`RenderedImage`]s.
#[derive(Debug, Clone, Copy)]
pub struct PixelRenderer {
    parallel_threshold: usize,
}

impl Default for PixelRenderer {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl PixelRenderer {
    /// Grids with more than `parallel_threshold` pixels render in parallel.
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn strategy_for(&self, grid: &SymbolGrid) -> RenderStrategy {
        let pixels = grid.width() as usize * grid.height() as usize;
        if pixels > self.parallel_threshold {
            RenderStrategy::Parallel
        } else {
            RenderStrategy::Sequential
        }
    }

    /// Renders with the strategy chosen by [`PixelRenderer::strategy_for`].
    ///
    /// # Errors
    ///
    /// [`GenerateError::InvalidArgument`] if the grid has a zero dimension.
    pub fn render(&self, grid: &SymbolGrid) -> Result<RenderedImage> {
        let strategy = self.strategy_for(grid);
        debug!(width = grid.width(), height = grid.height(), ?strategy, "rendering grid");
        self.render_with(grid, strategy)
    }

    /// Renders with an explicit strategy. Both strategies produce identical bytes.
    pub fn render_with(&self, grid: &SymbolGrid, strategy: RenderStrategy) -> Result<RenderedImage> {
        if grid.width() == 0 || grid.height() == 0 {
            return Err(GenerateError::invalid(
                "grid",
                format!("grid must not be empty, got {}x{}", grid.width(), grid.height()),
            ));
        }

        let stride = grid.width() as usize * CHANNELS;
        let mut pixels = vec![0u8; stride * grid.height() as usize];
        match strategy {
            RenderStrategy::Sequential => {
                for (y, row) in pixels.chunks_exact_mut(stride).enumerate() {
                    render_row(grid.row(y as u32), row);
                }
            }
            RenderStrategy::Parallel => {
                pixels.par_chunks_exact_mut(stride).enumerate().for_each(|(y, row)| {
                    render_row(grid.row(y as u32), row);
                });
            }
        }

        Ok(RenderedImage { width: grid.width(), height: grid.height(), pixels })
    }
}

fn render_row(modules: &[bool], out: &mut [u8]) {
    for (&dark, px) in modules.iter().zip(out.chunks_exact_mut(CHANNELS)) {
        px.fill(if dark { DARK } else { LIGHT });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32) -> SymbolGrid {
        SymbolGrid::from_fn(size, size, |x, y| (x + y) % 2 == 0)
    }

    #[test]
    fn test_render_maps_modules_to_black_and_white() {
        let image = PixelRenderer::default().render(&checkerboard(4)).unwrap();
        assert_eq!((image.width(), image.height()), (4, 4));
        assert_eq!(image.byte_len(), 4 * 4 * 3);
        assert_eq!(image.pixel(0, 0), [0, 0, 0]);
        assert_eq!(image.pixel(1, 0), [255, 255, 255]);
        assert_eq!(image.pixel(3, 3), [0, 0, 0]);
    }

    #[test]
    fn test_strategy_selection_by_pixel_count() {
        let renderer = PixelRenderer::new(10_000);
        assert_eq!(renderer.strategy_for(&checkerboard(100)), RenderStrategy::Sequential);
        assert_eq!(renderer.strategy_for(&checkerboard(101)), RenderStrategy::Parallel);
    }

    #[test]
    fn test_strategies_are_bit_identical() {
        let grid = SymbolGrid::from_fn(157, 131, |x, y| (x * 7 + y * 13) % 5 < 2);
        let renderer = PixelRenderer::default();
        let sequential = renderer.render_with(&grid, RenderStrategy::Sequential).unwrap();
        let parallel = renderer.render_with(&grid, RenderStrategy::Parallel).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_empty_grid_is_invalid() {
        let err = PixelRenderer::default().render(&SymbolGrid::new(0, 10)).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidArgument { param: "grid", .. }));
    }

    #[test]
    fn test_clones_are_independent() {
        let original = PixelRenderer::default().render(&checkerboard(3)).unwrap();
        let mut copy = original.try_clone().unwrap();
        copy.pixels_mut()[0] = 0x7F;
        assert_eq!(original.pixel(0, 0), [0, 0, 0]);
        assert_ne!(original, copy);
    }

    #[test]
    fn test_to_rgb_image() {
        let image = PixelRenderer::default().render(&checkerboard(2)).unwrap();
        let rgb = image.to_rgb_image().unwrap();
        assert_eq!(rgb.dimensions(), (2, 2));
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
    }
}
