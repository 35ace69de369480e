//! Symbol encoding.
//!
//! The pipeline only talks to encoders through [`SymbolEncoder`]: payload, correction level
//! and target dimension in, a boolean [`SymbolGrid`] of exactly that dimension out. The crate
//! ships [`DefaultEncoder`], which dispatches to the native [`qr`] encoder or to the
//! [`aztec`] adapter.

pub mod aztec;
pub mod qr;

use crate::error::EncodeError;
use crate::request::Symbology;

/// Turns a payload into a module grid of the requested size.
///
/// Implementations may be slow and CPU-bound; the generator never calls them while holding
/// a lock and the async entry points run them on the blocking pool.
pub trait SymbolEncoder: Send + Sync {
    fn encode(
        &self,
        symbology: Symbology,
        payload: &[u8],
        correction_level: i32,
        width: u32,
        height: u32,
    ) -> Result<SymbolGrid, EncodeError>;
}

/// Encoder backed by the built-in QR encoder and `rxing`'s Aztec writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEncoder;

impl SymbolEncoder for DefaultEncoder {
    fn encode(
        &self,
        symbology: Symbology,
        payload: &[u8],
        correction_level: i32,
        width: u32,
        height: u32,
    ) -> Result<SymbolGrid, EncodeError> {
        match symbology {
            Symbology::Qr => qr::encode_grid(payload, correction_level, width, height),
            Symbology::Aztec => aztec::encode_grid(payload, correction_level, width, height),
        }
    }
}

/// A rectangular grid of dark (`true`) and light (`false`) modules, stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct SymbolGrid {
    width: u32,
    height: u32,
    modules: Vec<bool>,
}

impl SymbolGrid {
    /// Creates an all-light grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            modules: vec![false; width as usize * height as usize],
        }
    }

    /// Creates a grid whose module at `(x, y)` is `f(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut modules = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                modules.push(f(x, y));
            }
        }
        Self { width, height, modules }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the module at `(x, y)`; coordinates outside the grid read as light.
    pub fn module(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.modules[self.index(x as usize, y as usize)]
    }

    /// The modules of row `y`, left to right.
    pub fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.modules[start..start + self.width as usize]
    }

    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|&&dark| dark).count()
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width as usize + x
    }

    /// Scales a `src_width × src_height` symbol to exactly `width × height`.
    ///
    /// When the target is at least as large as the symbol, every module becomes an integer
    /// block and the symbol is centred on a light background. Smaller targets are sampled
    /// nearest-neighbour.
    pub(crate) fn fit(
        src_width: usize,
        src_height: usize,
        is_dark: impl Fn(usize, usize) -> bool,
        width: u32,
        height: u32,
    ) -> Self {
        let mut grid = Self::new(width, height);
        let (w, h) = (width as usize, height as usize);
        if src_width == 0 || src_height == 0 || w == 0 || h == 0 {
            return grid;
        }

        let multiple = (w / src_width).min(h / src_height);
        if multiple >= 1 {
            let left = (w - src_width * multiple) / 2;
            let top = (h - src_height * multiple) / 2;
            for sy in 0..src_height {
                for sx in 0..src_width {
                    if !is_dark(sx, sy) {
                        continue;
                    }
                    let x0 = left + sx * multiple;
                    for y in top + sy * multiple..top + (sy + 1) * multiple {
                        let start = grid.index(x0, y);
                        grid.modules[start..start + multiple].fill(true);
                    }
                }
            }
        } else {
            for y in 0..h {
                let sy = y * src_height / h;
                for x in 0..w {
                    if is_dark(x * src_width / w, sy) {
                        let i = grid.index(x, y);
                        grid.modules[i] = true;
                    }
                }
            }
        }
        grid
    }
}

impl std::fmt::Debug for SymbolGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dark", &self.dark_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_scales_and_centres() {
        // 2x2 symbol with a single dark module at (0, 0), fitted into 5x5:
        // multiple = 2, padding = 0 on the left/top and 1 on the right/bottom.
        let grid = SymbolGrid::fit(2, 2, |x, y| x == 0 && y == 0, 5, 5);
        assert_eq!((grid.width(), grid.height()), (5, 5));
        assert!(grid.module(0, 0) && grid.module(1, 1));
        assert!(!grid.module(2, 0) && !grid.module(0, 2));
        assert_eq!(grid.dark_count(), 4);
    }

    #[test]
    fn test_fit_downsamples_small_targets() {
        let grid = SymbolGrid::fit(4, 4, |x, _| x < 2, 2, 2);
        assert_eq!(grid.row(0), &[true, false]);
        assert_eq!(grid.row(1), &[true, false]);
    }

    #[test]
    fn test_module_outside_grid_is_light() {
        let grid = SymbolGrid::from_fn(3, 3, |_, _| true);
        assert!(grid.module(2, 2));
        assert!(!grid.module(3, 0));
        assert!(!grid.module(0, 3));
    }

    #[test]
    fn test_default_encoder_returns_requested_size() {
        let grid = DefaultEncoder
            .encode(Symbology::Qr, b"HELLO WORLD", 1, 120, 120)
            .unwrap();
        assert_eq!((grid.width(), grid.height()), (120, 120));
        assert!(grid.dark_count() > 0);
    }
}
