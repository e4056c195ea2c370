//! Fast PRNG for dice simulation. Uses SplitMix64 for throughput and good statistical quality.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.

use std::time::{SystemTime, UNIX_EPOCH};

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

#[derive(Debug, Clone, Copy)]
pub struct DiceRng {
    state: u64,
}

impl DiceRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds from the OS entropy source, falling back to the clock when it is unavailable.
    pub fn from_entropy() -> Self {
        let mut buf = [0_u8; 8];
        let seed = match getrandom::getrandom(&mut buf) {
            Ok(()) => u64::from_le_bytes(buf),
            Err(_) => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or(SPLITMIX64_GOLDEN),
        };
        Self::new(seed)
    }

    /// Independent stream for batch `index` of a run seeded with `seed`.
    pub fn for_batch(seed: u64, index: usize) -> Self {
        let mut mixer = Self::new(seed ^ (index as u64).wrapping_mul(SPLITMIX64_M1));
        Self::new(mixer.next_u64())
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    /// Uniform integer in `1..=sides`.
    #[inline]
    pub fn roll(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        (((self.next_u64() as u128) * (sides as u128)) >> 64) as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix64_deterministic() {
        let mut a = DiceRng::new(7);
        let mut b = DiceRng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn splitmix64_different_seeds_differ() {
        let mut a = DiceRng::new(1);
        let mut b = DiceRng::new(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn roll_stays_within_die_faces() {
        let mut rng = DiceRng::new(99);
        let mut seen = [false; 6];
        for _ in 0..10_000 {
            let face = rng.roll(6);
            assert!((1..=6).contains(&face), "rolled {face}");
            seen[(face - 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "every face should appear");
    }

    #[test]
    fn batch_streams_differ() {
        let mut a = DiceRng::for_batch(42, 0);
        let mut b = DiceRng::for_batch(42, 1);
        assert_ne!(a.next_u64(), b.next_u64());
    }
}
