//! Aztec symbols via `rxing`.
//!
//! The writer is asked for the symbol at its native size and the result is scaled into the
//! target grid the same way as QR output. The Aztec writer picks its own error correction,
//! so the requested level is not forwarded.

use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
use tracing::debug;

use crate::error::EncodeError;

use super::SymbolGrid;

pub fn encode_grid(
    payload: &[u8],
    correction_level: i32,
    width: u32,
    height: u32,
) -> Result<SymbolGrid, EncodeError> {
    // Bytes map one-to-one onto ISO-8859-1 code points.
    let contents: String = payload.iter().map(|&b| char::from(b)).collect();

    debug!(correction_level, "aztec writer chooses its own correction level");
    let matrix = MultiFormatWriter::default()
        .encode(&contents, &BarcodeFormat::AZTEC, 1, 1)
        .map_err(|err| EncodeError::Backend(err.to_string()))?;

    let (src_width, src_height) = (matrix.getWidth() as usize, matrix.getHeight() as usize);
    Ok(SymbolGrid::fit(
        src_width,
        src_height,
        |x, y| matrix.get(x as u32, y as u32),
        width,
        height,
    ))
}
