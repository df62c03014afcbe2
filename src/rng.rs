// PCG-LCG random number generator for the transport hot loop.
//
// Each particle history owns one generator seeded by striding from the run
// seed, so the random stream consumed by history i is the same no matter
// which worker thread executes it.

use rand::{Error, RngCore, SeedableRng};

const PRN_MULT: u64 = 6364136223846793005;
const PRN_ADD: u64 = 1442695040888963407;

/// Stride between per-history seeds. Large odd constant keeps neighboring
/// history streams far apart in the generator's period.
const HISTORY_STRIDE: u64 = 152917;

/// Minimal PCG (RXS-M-XS output permutation over an LCG) random generator.
///
/// 8 bytes of state, fully inlineable, deterministic for a given seed.
#[derive(Clone, Copy, Debug)]
pub struct HistoryRng {
    state: u64,
}

impl HistoryRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generator for history `index` of a run with base seed `seed`.
    #[inline]
    pub fn for_history(seed: u64, index: u64) -> Self {
        Self::new(seed.wrapping_add(index.wrapping_mul(HISTORY_STRIDE)))
    }

    /// Uniform f64 in [0, 1).
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        // ldexp(next_u64, -64)
        (self.next_u64() as f64) * 5.421010862427522e-20
    }
}

impl RngCore for HistoryRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            let n = left.len();
            left.copy_from_slice(&bytes[..n]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for HistoryRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}
