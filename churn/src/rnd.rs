//! Seedable pseudorandom material for the fuzzing loop.
//!
//! Every process owns its own generator; seeds travel through the shared
//! block so the supervisor can re-emit a child's stream deterministically.
//! This is a plain xorshift32, which is plenty for a fuzzer: the point is
//! reproducibility from a 32-bit seed, not statistical quality.

use std::time::{SystemTime, UNIX_EPOCH};

/// Curated boundary values for 32-bit arguments.
const INTERESTING_U32: &[u32] = &[
    0,
    1,
    2,
    0x7f,
    0x80,
    0xff,
    0x100,
    0xfff,
    0x1000,
    0xffff,
    0x10000,
    1 << 20,
    1 << 24,
    0x0fff_ffff,
    0x5555_5555,
    0xaaaa_aaaa,
    0x7fff_ffff,
    0x8000_0000,
    0x8000_0001,
    0xffff_fffe,
    0xffff_ffff,
];

/// Curated boundary values for 64-bit arguments: the 32-bit set plus
/// sign-extended and high-half variants.
const INTERESTING_U64: &[u64] = &[
    0,
    1,
    0x1000,
    0x7fff_ffff,
    0x8000_0000,
    0xffff_ffff,
    0x1_0000_0000,
    0x5555_5555_5555_5555,
    0xaaaa_aaaa_aaaa_aaaa,
    0x7fff_ffff_ffff_ffff,
    0x8000_0000_0000_0000,
    0xffff_ffff_0000_0000,
    0xffff_ffff_ffff_fffe,
    0xffff_ffff_ffff_ffff,
];

/// xorshift32 has a fixed point at zero, so zero seeds get remapped here.
const SEED_FALLBACK: u32 = 0x2545_f491;

pub struct Rnd {
    state: u32,
}

impl Rnd {
    pub fn new(seed: u32) -> Self {
        let mut r = Rnd { state: 0 };
        r.reseed(seed);
        r
    }

    pub fn reseed(&mut self, seed: u32) {
        self.state = if seed == 0 { SEED_FALLBACK } else { seed };
    }

    pub fn u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    pub fn u64(&mut self) -> u64 {
        (self.u32() as u64) << 32 | self.u32() as u64
    }

    /// A uniform value in `0..n`. `range(0)` is defined as zero.
    pub fn range(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.u32() % n
        }
    }

    pub fn range_usize(&mut self, n: usize) -> usize {
        if n == 0 {
            0
        } else {
            (self.u64() % n as u64) as usize
        }
    }

    /// True with the given percent probability.
    pub fn chance(&mut self, pct: u32) -> bool {
        self.range(100) < pct
    }

    pub fn interesting_u32(&mut self) -> u32 {
        INTERESTING_U32[self.range_usize(INTERESTING_U32.len())]
    }

    pub fn interesting_u64(&mut self) -> u64 {
        INTERESTING_U64[self.range_usize(INTERESTING_U64.len())]
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        let mut chunks = buf.chunks_exact_mut(4);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.u32().to_ne_bytes());
        }
        let rest = chunks.into_remainder();
        if !rest.is_empty() {
            let bytes = self.u32().to_ne_bytes();
            rest.copy_from_slice(&bytes[..rest.len()]);
        }
    }
}

/// A fresh supervisor seed when none was given on the command line.
pub fn new_seed() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let pid = unsafe { churn_syscall::getpid() } as u64;
    let mixed = now ^ (pid << 17) ^ (now >> 32);
    let seed = mixed as u32;
    if seed == 0 {
        SEED_FALLBACK
    } else {
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Rnd::new(42);
        let mut b = Rnd::new(42);
        for _ in 0..1000 {
            assert_eq!(a.u32(), b.u32());
        }
    }

    #[test]
    fn reseed_restarts_stream() {
        let mut a = Rnd::new(7);
        let first: Vec<u32> = (0..16).map(|_| a.u32()).collect();
        a.reseed(7);
        let second: Vec<u32> = (0..16).map(|_| a.u32()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_seed_does_not_stick() {
        let mut r = Rnd::new(0);
        assert_ne!(r.u32(), 0);
        assert_ne!(r.u32(), r.u32());
    }

    #[test]
    fn interesting_values_come_from_the_sets() {
        let mut r = Rnd::new(99);
        for _ in 0..200 {
            assert!(INTERESTING_U32.contains(&r.interesting_u32()));
            assert!(INTERESTING_U64.contains(&r.interesting_u64()));
        }
    }

    #[test]
    fn fill_covers_whole_buffer() {
        let mut r = Rnd::new(3);
        let mut buf = [0u8; 37];
        // With 37 bytes, all-zero output would mean fill skipped something;
        // xorshift never emits a zero word.
        r.fill(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
        let mut tail = [0u8; 3];
        r.fill(&mut tail);
    }

    proptest! {
        #[test]
        fn range_stays_in_bounds(seed in any::<u32>(), n in 1u32..=1_000_000) {
            let mut r = Rnd::new(seed);
            for _ in 0..64 {
                prop_assert!(r.range(n) < n);
            }
        }

        #[test]
        fn chance_is_total(seed in any::<u32>(), pct in 0u32..=100) {
            let mut r = Rnd::new(seed);
            // Just must not panic, and pct=0 must never fire.
            let hit = r.chance(pct);
            if pct == 0 {
                prop_assert!(!hit);
            }
        }
    }
}
