//! Seeded random numbers for style transforms and surface noise.
//!
//! Reconstruction must be reproducible from the options alone, so the
//! generator is a small PCG-style LCG with a fixed output mix rather than a
//! thread-local source.

/// Deterministic generator seeded from `ReconstructionOptions::seed`.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

/// Integer hash used by the output function and lattice noise.
#[inline]
pub(crate) fn mix32(mut h: u32) -> u32 {
    h = h.wrapping_mul(0x45d9f3b);
    h ^= h >> 16;
    h = h.wrapping_mul(0x45d9f3b);
    h ^= h >> 16;
    h
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    /// Advance state and return the next `u32`.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        mix32((self.state >> 32) as u32)
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform value in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Uniform value in `[-amplitude, amplitude)`.
    pub fn symmetric(&mut self, amplitude: f64) -> f64 {
        self.range(-amplitude, amplitude)
    }

    /// Independent generator for a sub-task, so adding draws in one stage
    /// does not shift the sequence of another.
    pub fn fork(&mut self, stream: u64) -> SeededRng {
        let base = (self.next_u32() as u64) << 32 | self.next_u32() as u64;
        SeededRng::new(base ^ stream.wrapping_mul(MULTIPLIER))
    }
}
