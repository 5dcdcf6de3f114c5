use crate::MAX_LEVEL;
use crate::error::LifeError;

/// Neighbourhood masks fed to [`Tables::bitcount`] never exceed this value.
const BITCOUNT_LEN: usize = 0x758;

/// Lookup tables built once per universe.
pub(crate) struct Tables {
    powers: [u64; 64],

    /// `bitcounts[m]` is the number of set bits in `m`
    bitcounts: Box<[u8]>,
}

impl Tables {
    pub fn new() -> Self {
        let mut powers = [1u64; 64];
        for i in 1..powers.len() {
            powers[i] = powers[i - 1] * 2;
        }

        let mut bitcounts = vec![0u8; BITCOUNT_LEN].into_boxed_slice();
        bitcounts[..16].copy_from_slice(&[0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4]);

        for i in 0x10..BITCOUNT_LEN {
            bitcounts[i] = bitcounts[i & 0xF] + bitcounts[i >> 4 & 0xF] + bitcounts[i >> 8];
        }

        Self { powers, bitcounts }
    }

    /// `2^exp`, refusing exponents past the largest level a universe may reach.
    pub fn pow2(&self, exp: u32) -> Result<u64, LifeError> {
        if exp > MAX_LEVEL as u32 {
            return Err(LifeError::LevelOverflow { level: exp });
        }

        Ok(self.powers[exp as usize])
    }

    /// Distance from the center of a node at `level` to the center of its children.
    ///
    /// Callers guarantee `level <= MAX_LEVEL`.
    pub fn child_offset(&self, level: u8) -> i64 {
        match level {
            0 => unreachable!("leaves have no children"),
            1 => 0,
            _ => self.powers[level as usize - 2] as i64,
        }
    }

    /// Half the side length of a node at `level`.
    pub fn half_side(&self, level: u8) -> i64 {
        debug_assert!(level >= 1);

        self.powers[level as usize - 1] as i64
    }

    pub fn bitcount(&self, mask: u16) -> u8 {
        self.bitcounts[mask as usize]
    }
}
