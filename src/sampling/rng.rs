use rand_core::RngCore;

const MULTIPLIER: u64 = 6364136223846793005;
const DEFAULT_STATE: u64 = 0x853c49e6748fea9b;
const DEFAULT_STREAM: u64 = 0xda3e39cb94b95bdb;

/// PCG32 (XSH-RR), matching the reference raytracer's `RNG` bit for bit under the default
/// stream. Implements [`RngCore`] so it plugs directly into `rand`/`rand_distr` sampling
/// helpers used elsewhere in the crate (camera lens/film jitter, BSDF direction sampling).
#[derive(Copy, Clone, Debug)]
pub struct Pcg32 {
    state: u64,
    increment: u64,
}

impl Pcg32 {
    pub fn new() -> Self {
        Pcg32 {
            state: DEFAULT_STATE,
            increment: DEFAULT_STREAM,
        }
    }

    /// Seeds an independent stream. `stream_id` selects which of the 2^63 PCG streams is
    /// used, so worker threads can each get a decorrelated sequence from one seed.
    pub fn seeded(seed: u64, stream_id: u64) -> Self {
        let mut rng = Pcg32 {
            state: 0,
            increment: (stream_id << 1) | 1,
        };
        rng.step();
        rng.state = rng.state.wrapping_add(seed);
        rng.step();
        rng
    }

    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(self.increment);
    }
}

impl Default for Pcg32 {
    fn default() -> Self {
        Pcg32::new()
    }
}

impl RngCore for Pcg32 {
    fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.step();
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut chunks = dest.chunks_exact_mut(4);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.next_u32().to_le_bytes());
        }
        let remainder = chunks.into_remainder();
        if !remainder.is_empty() {
            let bytes = self.next_u32().to_le_bytes();
            remainder.copy_from_slice(&bytes[..remainder.len()]);
        }
    }
}
