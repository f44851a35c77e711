// Copyright 2025, 2026 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Striker for small sieving primes.
//!
//! A small prime has many multiples per segment, so the setup cost per
//! prime per segment is irrelevant; what matters is the instruction
//! count per multiple removed. The strike loop below is wheel
//! factorized: one revolution of the modulo 30 wheel removes the next
//! 8 multiples of a prime with 8 AND-mask stores at constant offsets
//! from a moving cursor, advancing the cursor by 30·(prime/30) +
//! (prime%30) bytes per revolution.
//!
//! Segments are tiled into L1-cache-sized sub-blocks and all primes are
//! run over one sub-block before moving to the next, so the
//! read-modify-write traffic of the strikes stays L1 resident.
//!
//! Per prime the striker keeps a 6-bit wheel state: the residue class
//! of the prime mod 30 (3 bits, fixed for the prime's lifetime) and the
//! phase within the current revolution (3 bits, cycling). A sub-block
//! ends mid-revolution for most primes; the state and the byte offset
//! of the next multiple are saved so the following sub-block resumes
//! exactly where this one stopped.

use crate::bits::{BIT0, BIT1, BIT2, BIT3, BIT4, BIT5, BIT6, BIT7};
use crate::params::prime_count_approx;
use crate::wheel::{first_multiple, SievingPrime};
use crate::ConfigError;

/// Strike program of one residue class: for phase k, clear `masks[k]`
/// at the cursor, then advance the cursor by `prime/30 * steps[k].0 +
/// steps[k].1` bytes. `offsets` are the cumulative positions of the 8
/// strikes of one revolution, used by the unrolled fast path.
struct WheelClass {
    residue: usize,
    masks: [u8; 8],
    steps: [(usize, usize); 8],
    offsets: [(usize, usize); 8],
}

const fn wheel_class(
    residue: usize,
    masks: [u8; 8],
    steps: [(usize, usize); 8],
) -> WheelClass {
    let mut offsets = [(0, 0); 8];
    let mut k = 1;
    while k < 8 {
        offsets[k].0 = offsets[k - 1].0 + steps[k - 1].0;
        offsets[k].1 = offsets[k - 1].1 + steps[k - 1].1;
        k += 1;
    }
    WheelClass {
        residue,
        masks,
        steps,
        offsets,
    }
}

#[rustfmt::skip]
static WHEEL_CLASSES: [WheelClass; 8] = [
    wheel_class( 7, [BIT0, BIT4, BIT3, BIT7, BIT6, BIT2, BIT1, BIT5],
        [(6, 1), (4, 1), (2, 0), (4, 1), (2, 1), (4, 1), (6, 1), (2, 1)]),
    wheel_class(11, [BIT1, BIT3, BIT7, BIT5, BIT0, BIT6, BIT2, BIT4],
        [(6, 2), (4, 1), (2, 1), (4, 2), (2, 0), (4, 2), (6, 2), (2, 1)]),
    wheel_class(13, [BIT2, BIT7, BIT5, BIT4, BIT1, BIT0, BIT6, BIT3],
        [(6, 2), (4, 2), (2, 1), (4, 2), (2, 1), (4, 1), (6, 3), (2, 1)]),
    wheel_class(17, [BIT3, BIT6, BIT0, BIT1, BIT4, BIT5, BIT7, BIT2],
        [(6, 3), (4, 3), (2, 1), (4, 2), (2, 1), (4, 2), (6, 4), (2, 1)]),
    wheel_class(19, [BIT4, BIT2, BIT6, BIT0, BIT5, BIT7, BIT3, BIT1],
        [(6, 4), (4, 2), (2, 2), (4, 2), (2, 1), (4, 3), (6, 4), (2, 1)]),
    wheel_class(23, [BIT5, BIT1, BIT2, BIT6, BIT7, BIT3, BIT4, BIT0],
        [(6, 5), (4, 3), (2, 1), (4, 3), (2, 2), (4, 3), (6, 5), (2, 1)]),
    wheel_class(29, [BIT6, BIT5, BIT4, BIT3, BIT2, BIT1, BIT0, BIT7],
        [(6, 6), (4, 4), (2, 2), (4, 4), (2, 2), (4, 4), (6, 5), (2, 2)]),
    wheel_class( 1, [BIT7, BIT0, BIT1, BIT2, BIT3, BIT4, BIT5, BIT6],
        [(6, 1), (4, 0), (2, 0), (4, 0), (2, 0), (4, 0), (6, 0), (2, 0)]),
];

/// Bit position cleared by the strike in wheel state `wheel_index`.
#[cfg(test)]
pub(crate) fn strike_bit(wheel_index: u8) -> usize {
    let cls = &WHEEL_CLASSES[(wheel_index >> 3) as usize];
    cls.masks[(wheel_index & 7) as usize].trailing_ones() as usize
}

/// Small-prime striker. Owns the sieving primes it was fed and their
/// per-segment strike state.
#[derive(Debug)]
pub struct Erat {
    stop: u64,
    l1_cache_size: u64,
    max_prime: u64,
    primes: Vec<SievingPrime>,
}

impl Erat {
    /// `stop` is the upper bound of the sieving interval,
    /// `l1_cache_size` the sub-block size in bytes, `max_prime` the
    /// largest prime that will be fed to [`Erat::add_sieving_prime`].
    /// Beyond 3 L1 sub-blocks per revolution the striker degrades
    /// badly, so larger primes are rejected outright.
    pub fn new(stop: u64, l1_cache_size: u64, max_prime: u64) -> Result<Erat, ConfigError> {
        if max_prime > l1_cache_size * 3 {
            return Err(ConfigError(format!(
                "max sieving prime {max_prime} > 3 * {l1_cache_size} (L1 cache bytes)"
            )));
        }
        Ok(Erat {
            stop,
            l1_cache_size,
            max_prime,
            primes: Vec::with_capacity(prime_count_approx(max_prime)),
        })
    }

    /// Registers a sieving prime. Its first strike is the least
    /// multiple of `prime` (the prime itself included) representable at
    /// or after `segment_low`; primes whose first strike falls beyond
    /// `stop` are dropped. `prime` must be coprime to 30.
    pub fn add_sieving_prime(&mut self, prime: u64, segment_low: u64) {
        debug_assert!(prime <= self.max_prime);
        if let Some((multiple_index, wheel_index)) = first_multiple(prime, segment_low, self.stop)
        {
            self.primes.push(SievingPrime::new(prime, multiple_index, wheel_index));
        }
    }

    pub fn prime_count(&self) -> usize {
        self.primes.len()
    }

    pub fn max_prime(&self) -> u64 {
        self.max_prime
    }

    /// Crosses off the multiples of every stored prime from one
    /// segment, tiling it into L1-sized sub-blocks.
    pub fn cross_off(&mut self, sieve: &mut [u8]) {
        let l1 = self.l1_cache_size as usize;
        let mut start = 0;
        while start < sieve.len() {
            let end = (start + l1).min(sieve.len());
            cross_off_block(&mut self.primes, &mut sieve[start..end]);
            start = end;
        }
    }
}

/// Runs every prime's strike machine over one sub-block. On return,
/// each record points at its first multiple at or past the end of the
/// sub-block, relative to the next sub-block's start.
fn cross_off_block(primes: &mut [SievingPrime], sieve: &mut [u8]) {
    for sp in primes.iter_mut() {
        let q = sp.sieving_prime as usize;
        let i = sp.multiple_index as usize;
        let phase = (sp.wheel_index & 7) as usize;
        let (i, wheel_index) = match sp.wheel_index >> 3 {
            0 => strike_run::<0>(sieve, q, i, phase),
            1 => strike_run::<1>(sieve, q, i, phase),
            2 => strike_run::<2>(sieve, q, i, phase),
            3 => strike_run::<3>(sieve, q, i, phase),
            4 => strike_run::<4>(sieve, q, i, phase),
            5 => strike_run::<5>(sieve, q, i, phase),
            6 => strike_run::<6>(sieve, q, i, phase),
            _ => strike_run::<7>(sieve, q, i, phase),
        };
        sp.set(i as u64, wheel_index);
    }
}

/// Strike machine of one prime over one sub-block, specialized per
/// residue class so that the mask and step tables are compile-time
/// constants in the loop bodies. Returns the saved state
/// (multiple_index relative to the next sub-block, wheel state).
#[inline]
fn strike_run<const CLASS: usize>(
    sieve: &mut [u8],
    q: usize,
    mut i: usize,
    mut phase: usize,
) -> (usize, u8) {
    let cls = &WHEEL_CLASSES[CLASS];
    let len = sieve.len();
    // Largest byte offset touched by one unrolled revolution.
    let max_loop_dist = q * 28 + 27;
    let fast_end = len.saturating_sub(max_loop_dist);

    // Finish the revolution left over from the previous sub-block.
    while phase != 0 {
        if i >= len {
            return (i - len, (CLASS * 8 + phase) as u8);
        }
        sieve[i] &= cls.masks[phase];
        i += q * cls.steps[phase].0 + cls.steps[phase].1;
        phase = (phase + 1) & 7;
    }
    loop {
        // Fast path: whole revolutions, no bounds checks. Each
        // iteration removes the next 8 multiples of the prime.
        while i < fast_end {
            debug_assert!(i + max_loop_dist < len);
            unsafe {
                for k in 0..8 {
                    let (m, c) = cls.offsets[k];
                    *sieve.get_unchecked_mut(i + q * m + c) &= cls.masks[k];
                }
            }
            i += q * 30 + cls.residue;
        }
        // Tail: one strike at a time until the sub-block end.
        for ph in 0..8 {
            if i >= len {
                return (i - len, (CLASS * 8 + ph) as u8);
            }
            sieve[i] &= cls.masks[ph];
            i += q * cls.steps[ph].0 + cls.steps[ph].1;
        }
    }
}

#[test]
fn test_wheel_class_tables() {
    for (c, cls) in WHEEL_CLASSES.iter().enumerate() {
        // One revolution advances by 30*q + (prime % 30) bytes.
        let (sm, sc) = cls
            .steps
            .iter()
            .fold((0, 0), |(m, b), s| (m + s.0, b + s.1));
        assert_eq!((sm, sc), (30, cls.residue), "class {c}");
        // Every mask clears a distinct bit.
        let mut seen = [false; 8];
        for &m in &cls.masks {
            let b = m.trailing_ones() as usize;
            assert_eq!(m, !(1u8 << b));
            assert!(!seen[b]);
            seen[b] = true;
        }
    }
}

#[cfg(test)]
fn erat_with(stop: u64, l1: u64, primes: &[u64], segment_low: u64) -> Erat {
    let mut erat = Erat::new(stop, l1, 100).unwrap();
    for &p in primes {
        erat.add_sieving_prime(p, segment_low);
    }
    erat
}

/// Brute-force check of one segment against trial division.
#[cfg(test)]
fn check_naive(sieve: &[u8], segment_low: u64, primes: &[u64]) {
    for (i, &byte) in sieve.iter().enumerate() {
        for (j, &r) in crate::bits::BIT_VALUES.iter().enumerate() {
            let v = segment_low + 30 * i as u64 + r;
            let expect = primes.iter().all(|&p| v % p != 0);
            let got = byte & (1 << j) != 0;
            assert_eq!(got, expect, "value {v}");
        }
    }
}

#[test]
fn test_cross_off_naive() {
    // All sieving primes below 100, one full L1 tile.
    let primes: Vec<u64> = vec![
        7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    ];
    let mut erat = erat_with(1_000_000, 32 << 10, &primes, 0);
    let mut sieve = vec![0xffu8; 32 << 10];
    erat.cross_off(&mut sieve);
    check_naive(&sieve, 0, &primes);
}

#[test]
fn test_cross_off_offset_segment() {
    let primes: Vec<u64> = vec![7, 13, 29, 97];
    let segment_low = 510510; // multiple of 30
    let mut erat = erat_with(2_000_000, 4096, &primes, segment_low);
    let mut sieve = vec![0xffu8; 8192];
    erat.cross_off(&mut sieve);
    check_naive(&sieve, segment_low, &primes);
}

#[test]
fn test_consecutive_segments() {
    // Strike state carries over from segment to segment.
    let primes: Vec<u64> = vec![7, 11, 41, 89];
    let mut erat = erat_with(10_000_000, 1024, &primes, 0);
    let mut low = 0u64;
    for len in [1024usize, 777, 4096, 1, 2048] {
        let mut sieve = vec![0xffu8; len];
        erat.cross_off(&mut sieve);
        check_naive(&sieve, low, &primes);
        low += 30 * len as u64;
    }
}

#[test]
fn test_resume_split() {
    // Crossing off [0, n) equals crossing off [0, m) then [m, n).
    let p = 29u64;
    // One wheel revolution of 29 spans 29 bytes; take ten of them.
    let n = 10 * 29usize;
    let mut whole = vec![0xffu8; n];
    let mut erat = erat_with(1 << 20, 1 << 20, &[p], 0);
    erat.cross_off(&mut whole);

    for m in [0usize, 1, 7, n / 3, n / 2, n - 1, n] {
        let mut split = vec![0xffu8; n];
        let mut erat = erat_with(1 << 20, 1 << 20, &[p], 0);
        let (a, b) = split.split_at_mut(m);
        erat.cross_off(a);
        erat.cross_off(b);
        assert_eq!(whole, split, "split at {m}");
    }
}

#[test]
fn test_resume_split_random() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);

    let primes: Vec<u64> = vec![7, 11, 13, 17, 19, 23, 29, 31, 37, 97];
    let n = 6000usize;
    let mut whole = vec![0xffu8; n];
    let mut erat = erat_with(1 << 21, 1 << 21, &primes, 0);
    erat.cross_off(&mut whole);

    for _ in 0..20 {
        let m = rng.gen_range(0..=n);
        let mut split = vec![0xffu8; n];
        let mut erat = erat_with(1 << 21, 1 << 21, &primes, 0);
        let (a, b) = split.split_at_mut(m);
        erat.cross_off(a);
        erat.cross_off(b);
        assert_eq!(whole, split, "split at {m}");
    }
}

#[test]
fn test_config_error() {
    let err = Erat::new(1 << 30, 1024, 4000).unwrap_err();
    eprintln!("{err}");
    assert!(err.0.contains("4000"));
}

#[test]
fn test_prime_beyond_stop_dropped() {
    let mut erat = Erat::new(50, 4096, 100).unwrap();
    erat.add_sieving_prime(53, 0);
    assert_eq!(erat.prime_count(), 0);
    erat.add_sieving_prime(43, 0);
    assert_eq!(erat.prime_count(), 1);
}
