//! QR Code Model 2 encoder.
//!
//! Supports versions 1 to 40, all four error correction levels and numeric, alphanumeric or
//! byte segments. The smallest version that holds the payload is chosen and the mask is
//! selected by penalty score. Payload bytes are encoded as-is, i.e. as ISO-8859-1 text.

use crate::error::EncodeError;

use super::SymbolGrid;

/// Encodes `payload` and fits the symbol into a `width × height` grid with no quiet zone.
pub fn encode_grid(
    payload: &[u8],
    correction_level: i32,
    width: u32,
    height: u32,
) -> Result<SymbolGrid, EncodeError> {
    let matrix = encode(payload, QrCodeEcc::from_level(correction_level))?;
    let size = matrix.size();
    Ok(SymbolGrid::fit(size, size, |x, y| matrix.module(x, y), width, height))
}

/// Encodes `payload` at the given error correction level.
pub fn encode(payload: &[u8], ecl: QrCodeEcc) -> Result<QrMatrix, EncodeError> {
    let segment = Segment::for_payload(payload);

    let mut version = Version::MIN;
    let used_bits = loop {
        let capacity_bits = num_data_codewords(version, ecl) * 8;
        let used = segment.total_bits(version);
        match used {
            Some(n) if n <= capacity_bits => break n,
            _ if version >= Version::MAX => {
                return Err(EncodeError::DataTooLong {
                    used_bits: used.unwrap_or(usize::MAX),
                    capacity_bits,
                });
            }
            _ => version = Version(version.0 + 1),
        }
    };

    let capacity_bits = num_data_codewords(version, ecl) * 8;
    let mut bb = BitBuffer::default();
    bb.append_bits(segment.mode.mode_bits(), 4);
    bb.append_bits(segment.numchars as u32, segment.mode.num_char_count_bits(version));
    bb.extend(&segment.bits);
    debug_assert_eq!(bb.len(), used_bits);

    // Terminator, then zero-pad to a byte boundary, then alternating pad bytes.
    let terminator = (capacity_bits - bb.len()).min(4);
    bb.append_bits(0, terminator as u8);
    let align = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, align as u8);
    for &pad in [0xEC, 0x11].iter().cycle() {
        if bb.len() >= capacity_bits {
            break;
        }
        bb.append_bits(pad, 8);
    }

    let data_codewords = bb.to_bytes();
    Ok(QrMatrix::from_codewords(version, ecl, &data_codewords))
}

/// Error correction level of a QR symbol.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    /// Maps a numeric correction level: 0 → L, 1 → M, 2 → Q, 3 and above → H.
    /// Negative levels are normalised by the generator before reaching this point.
    pub fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=0 => QrCodeEcc::Low,
            1 => QrCodeEcc::Medium,
            2 => QrCodeEcc::Quartile,
            _ => QrCodeEcc::High,
        }
    }

    fn ordinal(self) -> usize {
        match self {
            QrCodeEcc::Low => 0,
            QrCodeEcc::Medium => 1,
            QrCodeEcc::Quartile => 2,
            QrCodeEcc::High => 3,
        }
    }

    fn format_bits(self) -> u32 {
        match self {
            QrCodeEcc::Low => 1,
            QrCodeEcc::Medium => 0,
            QrCodeEcc::Quartile => 3,
            QrCodeEcc::High => 2,
        }
    }
}

/// A QR version number in `1..=40`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn value(self) -> u8 {
        self.0
    }

    fn size(self) -> i32 {
        i32::from(self.0) * 4 + 17
    }
}

/// A finished QR symbol.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrMatrix {
    version: Version,
    size: i32,
    ecl: QrCodeEcc,
    mask: u8,
    modules: Vec<bool>,
    function: Vec<bool>,
}

impl QrMatrix {
    pub fn version(&self) -> Version {
        self.version
    }

    /// Side length in modules (`version * 4 + 17`).
    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.ecl
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Returns `true` for a dark module; out-of-range coordinates read as light.
    pub fn module(&self, x: usize, y: usize) -> bool {
        x < self.size() && y < self.size() && self.modules[y * self.size() + x]
    }

    fn from_codewords(version: Version, ecl: QrCodeEcc, data: &[u8]) -> Self {
        let size = version.size();
        let cells = (size * size) as usize;
        let mut qr = Self {
            version,
            size,
            ecl,
            mask: 0,
            modules: vec![false; cells],
            function: vec![false; cells],
        };
        qr.draw_function_patterns();
        let all_codewords = qr.add_ecc_and_interleave(data);
        qr.draw_codewords(&all_codewords);

        let mut best = 0u8;
        let mut min_penalty = i32::MAX;
        for mask in 0u8..8 {
            qr.apply_mask(mask);
            qr.draw_format_bits(mask);
            let penalty = qr.penalty_score();
            if penalty < min_penalty {
                best = mask;
                min_penalty = penalty;
            }
            qr.apply_mask(mask); // XOR undoes the mask
        }
        qr.mask = best;
        qr.apply_mask(best);
        qr.draw_format_bits(best);
        qr.function = Vec::new();
        qr
    }

    fn get(&self, x: i32, y: i32) -> bool {
        self.modules[(y * self.size + x) as usize]
    }

    fn set_function_module(&mut self, x: i32, y: i32, dark: bool) {
        let i = (y * self.size + x) as usize;
        self.modules[i] = dark;
        self.function[i] = true;
    }

    fn draw_function_patterns(&mut self) {
        let size = self.size;
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        let positions = self.alignment_pattern_positions();
        let last = positions.len().saturating_sub(1);
        for (i, &px) in positions.iter().enumerate() {
            for (j, &py) in positions.iter().enumerate() {
                // The three corners already hold finder patterns.
                let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
                if !corner {
                    self.draw_alignment_pattern(px, py);
                }
            }
        }

        // Reserve the format area; the real bits are drawn once the mask is chosen.
        self.draw_format_bits(0);
        self.draw_version();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4..=4 {
            for dx in -4..=4 {
                let (xx, yy) = (x + dx, y + dy);
                if (0..self.size).contains(&xx) && (0..self.size).contains(&yy) {
                    let dist = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_format_bits(&mut self, mask: u8) {
        let bits = {
            let data = (self.ecl.format_bits() << 3) | u32::from(mask);
            let mut rem = data;
            for _ in 0..10 {
                rem = (rem << 1) ^ ((rem >> 9) * 0x537);
            }
            ((data << 10) | rem) ^ 0x5412
        };

        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i));
        }

        let size = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i));
        }
        self.set_function_module(8, size - 8, true);
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits = {
            let mut rem = ver;
            for _ in 0..12 {
                rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
            }
            (ver << 12) | rem
        };
        for i in 0..18 {
            let bit = get_bit(bits, i);
            let a = self.size - 11 + i % 3;
            let b = i / 3;
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    fn add_ecc_and_interleave(&self, data: &[u8]) -> Vec<u8> {
        let (ver, ecl) = (self.version, self.ecl);
        debug_assert_eq!(data.len(), num_data_codewords(ver, ecl));

        let num_blocks = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let block_ecc_len = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let raw_codewords = num_raw_data_modules(ver) / 8;
        let num_short_blocks = num_blocks - raw_codewords % num_blocks;
        let short_block_len = raw_codewords / num_blocks;

        let divisor = reed_solomon_divisor(block_ecc_len);
        let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
        let mut offset = 0;
        for i in 0..num_blocks {
            let data_len = short_block_len - block_ecc_len + usize::from(i >= num_short_blocks);
            let mut block = data[offset..offset + data_len].to_vec();
            offset += data_len;
            let ecc = reed_solomon_remainder(&block, &divisor);
            if i < num_short_blocks {
                block.push(0);
            }
            block.extend_from_slice(&ecc);
            blocks.push(block);
        }

        let mut result = Vec::with_capacity(raw_codewords);
        for i in 0..=short_block_len {
            for (j, block) in blocks.iter().enumerate() {
                // Skip the padding byte of short blocks.
                if i != short_block_len - block_ecc_len || j >= num_short_blocks {
                    result.push(block[i]);
                }
            }
        }
        debug_assert_eq!(result.len(), raw_codewords);
        result
    }

    fn draw_codewords(&mut self, data: &[u8]) {
        let size = self.size;
        let total_bits = data.len() * 8;
        let mut i = 0usize;
        let mut right = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x = right - j;
                    let upward = ((right + 1) & 2) == 0;
                    let y = if upward { size - 1 - vert } else { vert };
                    let idx = (y * size + x) as usize;
                    if !self.function[idx] && i < total_bits {
                        self.modules[idx] = get_bit(u32::from(data[i >> 3]), 7 - (i as i32 & 7));
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, total_bits);
    }

    fn apply_mask(&mut self, mask: u8) {
        let size = self.size;
        for y in 0..size {
            for x in 0..size {
                let idx = (y * size + x) as usize;
                if self.function[idx] {
                    continue;
                }
                let invert = match mask {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => x * y % 2 + x * y % 3 == 0,
                    6 => (x * y % 2 + x * y % 3) % 2 == 0,
                    _ => ((x + y) % 2 + x * y % 3) % 2 == 0,
                };
                self.modules[idx] ^= invert;
            }
        }
    }

    fn penalty_score(&self) -> i32 {
        let size = self.size;
        let mut result = 0;

        for y in 0..size {
            result += self.line_penalty((0..size).map(|x| self.get(x, y)));
        }
        for x in 0..size {
            result += self.line_penalty((0..size).map(|y| self.get(x, y)));
        }

        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color = self.get(x, y);
                if color == self.get(x + 1, y)
                    && color == self.get(x, y + 1)
                    && color == self.get(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        let dark = self.modules.iter().filter(|&&dark| dark).count() as i32;
        let total = size * size;
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result + k * PENALTY_N4
    }

    /// Run-length and finder-like penalties for one row or column.
    fn line_penalty(&self, line: impl Iterator<Item = bool>) -> i32 {
        let mut result = 0;
        let mut run_color = false;
        let mut run_len = 0;
        let mut history = FinderPenalty::new(self.size);
        for color in line {
            if color == run_color {
                run_len += 1;
                if run_len == 5 {
                    result += PENALTY_N1;
                } else if run_len > 5 {
                    result += 1;
                }
            } else {
                history.add_history(run_len);
                if !run_color {
                    result += history.count_patterns() * PENALTY_N3;
                }
                run_color = color;
                run_len = 1;
            }
        }
        result + history.terminate_and_count(run_color, run_len) * PENALTY_N3
    }

    fn alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let num_align = ver / 7 + 2;
        let step = if ver == 32 {
            26
        } else {
            (ver * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
        };
        let mut result: Vec<i32> = (0..num_align - 1).map(|i| self.size - 7 - i * step).collect();
        result.push(6);
        result.reverse();
        result
    }
}

/// A single encoded data segment.
struct Segment {
    mode: Mode,
    numchars: usize,
    bits: Vec<bool>,
}

impl Segment {
    /// Picks the densest mode that can represent every byte of `payload`.
    fn for_payload(payload: &[u8]) -> Self {
        if !payload.is_empty() && payload.iter().all(u8::is_ascii_digit) {
            Self::numeric(payload)
        } else if !payload.is_empty() && payload.iter().all(|&b| alphanumeric_index(b).is_some()) {
            Self::alphanumeric(payload)
        } else {
            Self::bytes(payload)
        }
    }

    fn numeric(digits: &[u8]) -> Self {
        let mut bb = BitBuffer::default();
        for chunk in digits.chunks(3) {
            let value = chunk.iter().fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
            bb.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        Self { mode: Mode::Numeric, numchars: digits.len(), bits: bb.0 }
    }

    fn alphanumeric(text: &[u8]) -> Self {
        let mut bb = BitBuffer::default();
        for pair in text.chunks(2) {
            let first = alphanumeric_index(pair[0]).unwrap_or(0);
            match pair.get(1).and_then(|&c| alphanumeric_index(c)) {
                Some(second) => bb.append_bits(first * 45 + second, 11),
                None => bb.append_bits(first, 6),
            }
        }
        Self { mode: Mode::Alphanumeric, numchars: text.len(), bits: bb.0 }
    }

    fn bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::default();
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        Self { mode: Mode::Byte, numchars: data.len(), bits: bb.0 }
    }

    /// Header plus data bits at `version`, or `None` if the character count overflows.
    fn total_bits(&self, version: Version) -> Option<usize> {
        let cc_bits = self.mode.num_char_count_bits(version);
        if self.numchars >= 1usize << cc_bits {
            return None;
        }
        Some(4 + usize::from(cc_bits) + self.bits.len())
    }
}

fn alphanumeric_index(c: u8) -> Option<u32> {
    ALPHANUMERIC_CHARSET.iter().position(|&a| a == c).map(|i| i as u32)
}

static ALPHANUMERIC_CHARSET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl Mode {
    fn mode_bits(self) -> u32 {
        match self {
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::Byte => 0x4,
        }
    }

    fn num_char_count_bits(self, ver: Version) -> u8 {
        let widths = match self {
            Mode::Numeric => [10, 12, 14],
            Mode::Alphanumeric => [9, 11, 13],
            Mode::Byte => [8, 16, 16],
        };
        widths[usize::from((ver.value() + 7) / 17)]
    }
}

#[derive(Default)]
struct BitBuffer(Vec<bool>);

impl BitBuffer {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn append_bits(&mut self, val: u32, len: u8) {
        debug_assert!(len <= 31 && (val >> len) == 0);
        self.0.extend((0..len).rev().map(|i| (val >> i) & 1 != 0));
    }

    fn extend(&mut self, bits: &[bool]) {
        self.0.extend_from_slice(bits);
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0
            .chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
            .collect()
    }
}

fn reed_solomon_divisor(degree: usize) -> Vec<u8> {
    debug_assert!((1..=255).contains(&degree));
    let mut result = vec![0u8; degree - 1];
    result.push(1);
    let mut root: u8 = 1;
    for _ in 0..degree {
        for j in 0..degree {
            result[j] = gf_multiply(result[j], root);
            if j + 1 < result.len() {
                result[j] ^= result[j + 1];
            }
        }
        root = gf_multiply(root, 0x02);
    }
    result
}

fn reed_solomon_remainder(data: &[u8], divisor: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; divisor.len()];
    for &b in data {
        let factor = b ^ result.remove(0);
        result.push(0);
        for (x, &y) in result.iter_mut().zip(divisor.iter()) {
            *x ^= gf_multiply(y, factor);
        }
    }
    result
}

/// Multiplication in GF(2^8 / 0x11D).
fn gf_multiply(x: u8, y: u8) -> u8 {
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7) * 0x1D);
        z ^= ((y >> i) & 1) * x;
    }
    z
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self { qr_size: size, run_history: [0; 7] }
    }

    fn add_history(&mut self, mut run_len: i32) {
        if self.run_history[0] == 0 {
            run_len += self.qr_size; // light border before the first run
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = run_len;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, run_color: bool, mut run_len: i32) -> i32 {
        if run_color {
            self.add_history(run_len);
            run_len = 0;
        }
        run_len += self.qr_size;
        self.add_history(run_len);
        self.count_patterns()
    }
}

fn num_raw_data_modules(ver: Version) -> usize {
    let ver = usize::from(ver.value());
    let mut result = (16 * ver + 128) * ver + 64;
    if ver >= 2 {
        let num_align = ver / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if ver >= 7 {
            result -= 36;
        }
    }
    result
}

fn num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
    num_raw_data_modules(ver) / 8
        - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl)
            * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
    table[ecl.ordinal()][usize::from(ver.value())] as usize
}

fn get_bit(x: u32, i: i32) -> bool {
    (x >> i) & 1 != 0
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payload_fits_version_1() {
        let qr = encode(b"Hello, world!", QrCodeEcc::Low).unwrap();
        assert_eq!(qr.version().value(), 1);
        assert_eq!(qr.size(), 21);
        assert_eq!(qr.error_correction_level(), QrCodeEcc::Low);
        assert!(qr.mask() < 8);
    }

    #[test]
    fn test_finder_and_timing_patterns() {
        let qr = encode(b"HELLO WORLD", QrCodeEcc::Medium).unwrap();
        let last = qr.size() - 1;
        for (x, y) in [(0, 0), (last, 0), (0, last)] {
            assert!(qr.module(x, y), "finder corner at ({x}, {y}) must be dark");
        }
        assert!(!qr.module(1, 1));
        assert!(qr.module(3, 3));
        assert!(qr.module(8, 6));
        assert!(!qr.module(9, 6));
        assert!(qr.module(8, qr.size() - 8), "dark module is always set");
    }

    #[test]
    fn test_segment_mode_selection() {
        assert_eq!(Segment::for_payload(b"0123456789").mode, Mode::Numeric);
        assert_eq!(Segment::for_payload(b"HELLO WORLD").mode, Mode::Alphanumeric);
        assert_eq!(Segment::for_payload(b"Hello World").mode, Mode::Byte);
        assert_eq!(Segment::for_payload(&[0xE9, 0x41]).mode, Mode::Byte);
    }

    #[test]
    fn test_numeric_bit_lengths() {
        // 3 digits -> 10 bits, trailing 2 digits -> 7 bits.
        assert_eq!(Segment::numeric(b"12345").bits.len(), 17);
        // Pairs -> 11 bits, trailing single -> 6 bits.
        assert_eq!(Segment::alphanumeric(b"ABC").bits.len(), 17);
    }

    #[test]
    fn test_higher_level_needs_larger_version() {
        let payload = [b'x'; 100];
        let low = encode(&payload, QrCodeEcc::Low).unwrap();
        let high = encode(&payload, QrCodeEcc::High).unwrap();
        assert!(high.version() > low.version());
    }

    #[test]
    fn test_large_versions_encode() {
        // Forces a version >= 7 so version information blocks are drawn.
        let payload = vec![b'a'; 400];
        let qr = encode(&payload, QrCodeEcc::Medium).unwrap();
        assert!(qr.version().value() >= 7);
        assert_eq!(qr.size(), usize::from(qr.version().value()) * 4 + 17);
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let payload = vec![0u8; 4000];
        let err = encode(&payload, QrCodeEcc::High).unwrap_err();
        assert!(matches!(err, EncodeError::DataTooLong { .. }));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode(b"Hello World!", QrCodeEcc::Quartile).unwrap();
        let b = encode(b"Hello World!", QrCodeEcc::Quartile).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reed_solomon_known_remainder() {
        // Version 1-M data codewords for "01234567" from ISO/IEC 18004 Annex I.
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let ecc = reed_solomon_remainder(&data, &reed_solomon_divisor(10));
        assert_eq!(ecc, [0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(QrCodeEcc::from_level(0), QrCodeEcc::Low);
        assert_eq!(QrCodeEcc::from_level(1), QrCodeEcc::Medium);
        assert_eq!(QrCodeEcc::from_level(2), QrCodeEcc::Quartile);
        assert_eq!(QrCodeEcc::from_level(7), QrCodeEcc::High);
    }
}
