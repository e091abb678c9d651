//! CRC-32 checksum as used by ZIP.
//!
//! Standard reflected CRC-32 (polynomial 0xEDB88320). The tables are
//! computed at compile time, so there is no lazy initialisation at runtime.
//! Inputs of 16 bytes or more are processed eight bytes per step with
//! slicing-by-8 tables; shorter inputs use the single table.

const POLYNOMIAL: u32 = 0xEDB88320;

/// Byte-at-a-time lookup table.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Slicing-by-8 tables derived from [`CRC32_TABLE`].
const CRC32_SLICES: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];
    tables[0] = CRC32_TABLE;
    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = CRC32_TABLE[(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }
    tables
};

/// Incremental CRC-32 calculator.
///
/// # Example
///
/// ```
/// use streamarc_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"hello ");
/// crc.update(b"world");
/// assert_eq!(crc.finalize(), 0x0D4A1185);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Feed more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= 16 {
            self.crc = update_slice8(self.crc, data);
        } else {
            self.crc = update_bytewise(self.crc, data);
        }
    }

    /// Checksum of everything fed so far.
    #[inline]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Consume the calculator and return the checksum.
    #[inline]
    pub fn finalize(self) -> u32 {
        self.value()
    }

    /// Checksum of a single slice.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn update_bytewise(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

#[inline]
fn update_slice8(mut crc: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let low = crc ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        crc = CRC32_SLICES[7][(low & 0xFF) as usize]
            ^ CRC32_SLICES[6][((low >> 8) & 0xFF) as usize]
            ^ CRC32_SLICES[5][((low >> 16) & 0xFF) as usize]
            ^ CRC32_SLICES[4][(low >> 24) as usize]
            ^ CRC32_SLICES[3][chunk[4] as usize]
            ^ CRC32_SLICES[2][chunk[5] as usize]
            ^ CRC32_SLICES[1][chunk[6] as usize]
            ^ CRC32_SLICES[0][chunk[7] as usize];
    }
    update_bytewise(crc, chunks.remainder())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_values() {
        assert_eq!(Crc32::compute(b""), 0);
        assert_eq!(Crc32::compute(b"hello world"), 0x0D4A1185);
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
        assert_eq!(
            Crc32::compute(b"The quick brown fox jumps over the lazy dog"),
            0x414FA339
        );
    }

    #[test]
    fn test_crc32_incremental() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        for piece in data.chunks(5) {
            crc.update(piece);
        }
        assert_eq!(crc.value(), Crc32::compute(data));
    }

    #[test]
    fn test_slice8_matches_bytewise() {
        let data: Vec<u8> = (0..1031u32).map(|i| (i * 7 + 3) as u8).collect();
        let expected = update_bytewise(0xFFFFFFFF, &data) ^ 0xFFFFFFFF;
        assert_eq!(Crc32::compute(&data), expected);
    }

    #[test]
    fn test_reset() {
        let mut crc = Crc32::new();
        crc.update(b"garbage");
        crc.reset();
        crc.update(b"123456789");
        assert_eq!(crc.finalize(), 0xCBF43926);
    }
}
