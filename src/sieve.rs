// Copyright 2025, 2026 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Segment driver: enumerates the primes of an interval [start, stop].
//!
//! The driver owns one segment-sized byte array and walks it across the
//! interval. For each segment it asks the pre-sieve for the initial
//! pattern, then the striker for the remaining small primes, and
//! finally decodes the surviving bits. Sieving primes are fed to the
//! striker lazily, once the segment containing their square is reached.
//!
//! Because the striker crosses off every multiple of its primes
//! including the primes themselves, a base prime that lies inside the
//! segment where it is registered loses its own bit; the driver keeps
//! those primes on the side and merges them back into the output.
//!
//! With sieving primes limited to the small-prime striker, the driver
//! covers stop up to (3 × 4 MiB)², about 1.5·10^14. The primes 2, 3
//! and 5 are not representable in the wheel and are emitted directly.

use num_integer::sqrt as isqrt;

use crate::bits;
use crate::erat::Erat;
use crate::params::{
    FACTOR_ERATSMALL, L1_CACHE_DEFAULT, L1_CACHE_MAX, L1_CACHE_MIN, SEGMENT_BYTES,
};
use crate::presieve::PreSieve;
use crate::{ConfigError, Preferences, Verbosity};

/// Simple sieve of Eratosthenes over the odd numbers, used to
/// bootstrap the base primes up to sqrt(stop).
pub fn small_primes(limit: u64) -> Vec<u32> {
    assert!(limit <= u32::MAX as u64);
    if limit < 2 {
        return vec![];
    }
    let mut primes = vec![2u32];
    // composite[i] says that 2i+1 is composite
    let mut composite = vec![false; (limit as usize + 1) / 2];
    for i in 1..composite.len() {
        if !composite[i] {
            let p = 2 * i + 1;
            primes.push(p as u32);
            // First odd multiple not marked by a smaller prime is p².
            let mut k = p * p / 2;
            while k < composite.len() {
                composite[k] = true;
                k += p;
            }
        }
    }
    primes
}

/// A segmented sieve over [start, stop], yielding primes in increasing
/// order either in blocks of one segment ([`PrimeSieve::next_block`])
/// or one by one through [`Iterator`].
pub struct PrimeSieve {
    start: u64,
    stop: u64,
    segment_low: u64,
    sieve: Vec<u8>,
    pre: PreSieve,
    erat: Erat,
    base: Vec<u32>,
    base_idx: usize,
    // Base primes crossed off as their own first multiple in the
    // segment just sieved.
    carry: Vec<u64>,
    block: Vec<u64>,
    block_pos: usize,
    first: bool,
    done: bool,
}

impl PrimeSieve {
    pub fn new(start: u64, stop: u64, prefs: &Preferences) -> Result<PrimeSieve, ConfigError> {
        let mut pre = PreSieve::new();
        pre.init(start, stop);

        let sqrt_stop = isqrt(stop);
        let mut l1 = prefs
            .l1_cache_size
            .unwrap_or(L1_CACHE_DEFAULT)
            .clamp(L1_CACHE_MIN, L1_CACHE_MAX);
        // All sieving primes go to the small-prime striker here, so the
        // L1 tile must grow with sqrt(stop) to keep the striker in its
        // efficient regime.
        let wanted = (sqrt_stop as f64 / FACTOR_ERATSMALL) as u64;
        if wanted > l1 {
            l1 = wanted.min(L1_CACHE_MAX);
        }
        if sqrt_stop > l1 * 3 {
            return Err(ConfigError(format!(
                "sieving up to {stop} needs primes up to {sqrt_stop}, \
                 beyond the small-prime striker limit {}",
                l1 * 3
            )));
        }
        let segment = prefs.segment_size.unwrap_or(SEGMENT_BYTES).max(l1) as usize;
        let erat = Erat::new(stop, l1, sqrt_stop.max(7))?;
        let base = small_primes(sqrt_stop);
        let segment_low = (start.max(7) - 7) / 30 * 30;

        if prefs.verbose(Verbosity::Info) {
            eprintln!("Sieving [{start}, {stop}]");
            eprintln!(
                "Segment {}k (L1 tile {}k), {} base primes below {}",
                segment >> 10,
                l1 >> 10,
                base.len(),
                sqrt_stop.max(2),
            );
        }

        Ok(PrimeSieve {
            start,
            stop,
            segment_low,
            sieve: vec![0u8; segment],
            pre,
            erat,
            base,
            base_idx: 0,
            carry: vec![],
            block: vec![],
            block_pos: 0,
            first: true,
            done: start > stop || stop < 7,
        })
    }

    /// Sieves the next segment in place. Returns the value of its first
    /// byte and its length in bytes, or None when the interval is
    /// exhausted. Afterwards `self.carry` holds the base primes of this
    /// segment whose bits were just crossed off.
    fn sieve_segment(&mut self) -> Option<(u64, usize)> {
        if self.done {
            return None;
        }
        let low = self.segment_low;
        let bytes = (self.sieve.len() as u64).min((self.stop - low) / 30 + 1) as usize;
        let high = low + 30 * bytes as u64 + 6;

        self.carry.clear();
        while self.base_idx < self.base.len() {
            let p = self.base[self.base_idx] as u64;
            if p * p > high {
                break;
            }
            if p > self.pre.max_prime() {
                self.erat.add_sieving_prime(p, low);
                if p >= low + 7 && p >= self.start {
                    self.carry.push(p);
                }
            }
            self.base_idx += 1;
        }

        self.pre.apply(&mut self.sieve[..bytes], low);
        self.erat.cross_off(&mut self.sieve[..bytes]);

        self.segment_low += 30 * bytes as u64;
        if self.segment_low + 7 > self.stop {
            self.done = true;
        }
        Some((low, bytes))
    }

    /// Returns the primes of the next segment, an empty slice once the
    /// interval is exhausted. The first block also carries 2, 3, 5 and
    /// may span slightly more than one segment worth of values.
    pub fn next_block(&mut self) -> &[u64] {
        self.block.clear();
        self.block_pos = 0;
        if self.first {
            self.first = false;
            for p in [2u64, 3, 5] {
                if self.start <= p && p <= self.stop {
                    self.block.push(p);
                }
            }
        }
        if let Some((low, bytes)) = self.sieve_segment() {
            let merge = !self.carry.is_empty();
            self.block.extend_from_slice(&self.carry);
            let (start, stop) = (self.start, self.stop);
            let block = &mut self.block;
            bits::for_each_set_bit(&self.sieve[..bytes], low, |v| {
                if v >= start && v <= stop {
                    block.push(v);
                }
            });
            if merge {
                // Carried primes interleave with the decoded values.
                self.block.sort_unstable();
            }
        }
        &self.block
    }

    fn finished(&self) -> bool {
        self.done && !self.first
    }

    /// Counts the primes of the interval without materializing them:
    /// whole bytes are popcounted, only the boundary bytes are decoded.
    pub fn count(mut self) -> u64 {
        let mut n = 0u64;
        if self.first {
            self.first = false;
            n += [2u64, 3, 5]
                .iter()
                .filter(|&&p| self.start <= p && p <= self.stop)
                .count() as u64;
        }
        while let Some((low, bytes)) = self.sieve_segment() {
            n += self.carry.len() as u64;
            let s = &self.sieve[..bytes];
            let mut chunks = s.chunks_exact(8);
            for chunk in &mut chunks {
                n += u64::from_le_bytes(chunk.try_into().unwrap()).count_ones() as u64;
            }
            for &b in chunks.remainder() {
                n += b.count_ones() as u64;
            }
            // Boundary bytes may cover values outside [start, stop]:
            // byte 0 can reach below start, and the last two bytes can
            // reach past stop (the residue 31 of the second-to-last
            // byte exceeds stop when stop is a multiple of 30). Remove
            // their share again.
            let (start, stop) = (self.start, self.stop);
            let idxs = [0, bytes.saturating_sub(2), bytes - 1];
            for (k, &i) in idxs.iter().enumerate() {
                if idxs[..k].contains(&i) {
                    continue;
                }
                let mut out = 0u64;
                bits::for_each_set_bit(&s[i..i + 1], low + 30 * i as u64, |v| {
                    if v < start || v > stop {
                        out += 1;
                    }
                });
                n -= out;
            }
        }
        n
    }
}

impl Iterator for PrimeSieve {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.block_pos >= self.block.len() {
            if self.finished() {
                return None;
            }
            self.next_block();
        }
        let v = self.block[self.block_pos];
        self.block_pos += 1;
        Some(v)
    }
}

/// The primes of [start, stop], in increasing order.
pub fn primes_in(start: u64, stop: u64) -> Result<Vec<u64>, ConfigError> {
    let mut s = PrimeSieve::new(start, stop, &Preferences::default())?;
    let mut primes = vec![];
    loop {
        let block = s.next_block();
        if !block.is_empty() {
            primes.extend_from_slice(block);
        } else if s.finished() {
            return Ok(primes);
        }
    }
}

/// The number of primes in [start, stop].
pub fn count_primes(start: u64, stop: u64) -> Result<u64, ConfigError> {
    Ok(PrimeSieve::new(start, stop, &Preferences::default())?.count())
}

#[test]
fn test_small_primes() {
    assert!(small_primes(1).is_empty());
    assert_eq!(small_primes(2), vec![2]);
    let ps = small_primes(100);
    assert_eq!(ps.len(), 25);
    assert_eq!(ps.last(), Some(&97));
    // The 50000th prime.
    assert_eq!(small_primes(611953).len(), 50000);
}

#[test]
fn test_primes_below_100() {
    let expect: Vec<u64> = vec![
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
        89, 97,
    ];
    assert_eq!(primes_in(0, 100).unwrap(), expect);
}

#[test]
fn test_count_known_values() {
    for (stop, pi) in [
        (100u64, 25u64),
        (1_000, 168),
        (10_000, 1229),
        (100_000, 9592),
        (1_000_000, 78498),
        (10_000_000, 664579),
    ] {
        assert_eq!(count_primes(0, stop).unwrap(), pi, "pi({stop})");
    }
}

#[test]
fn test_against_simple_sieve() {
    for (start, stop) in [(0u64, 30000u64), (123_456, 234_567), (29_988, 30_072)] {
        let expect: Vec<u64> = small_primes(stop)
            .into_iter()
            .map(|p| p as u64)
            .filter(|&p| p >= start)
            .collect();
        assert_eq!(primes_in(start, stop).unwrap(), expect, "[{start}, {stop}]");
        assert_eq!(count_primes(start, stop).unwrap(), expect.len() as u64);
    }
}

#[test]
fn test_edge_windows() {
    assert_eq!(primes_in(0, 0).unwrap(), Vec::<u64>::new());
    assert_eq!(primes_in(0, 1).unwrap(), Vec::<u64>::new());
    assert_eq!(primes_in(2, 2).unwrap(), vec![2]);
    assert_eq!(primes_in(0, 6).unwrap(), vec![2, 3, 5]);
    assert_eq!(primes_in(5, 7).unwrap(), vec![5, 7]);
    assert_eq!(primes_in(8, 10).unwrap(), Vec::<u64>::new());
    assert_eq!(primes_in(97, 97).unwrap(), vec![97]);
    assert_eq!(primes_in(90, 96).unwrap(), Vec::<u64>::new());
    // Empty interval.
    assert_eq!(primes_in(100, 10).unwrap(), Vec::<u64>::new());
    assert_eq!(count_primes(100, 10).unwrap(), 0);
}

#[test]
fn test_offset_window() {
    // Around 10^9; checked by trial division over the base primes.
    let (start, stop) = (1_000_000_000u64, 1_000_003_000u64);
    let base = small_primes(isqrt(stop));
    let naive: Vec<u64> = (start..=stop)
        .filter(|&v| base.iter().all(|&p| v % p as u64 != 0))
        .collect();
    assert_eq!(primes_in(start, stop).unwrap(), naive);
    assert_eq!(count_primes(start, stop).unwrap(), naive.len() as u64);
}

#[test]
fn test_iterator_matches_blocks() {
    let all = primes_in(0, 100_000).unwrap();
    let s = PrimeSieve::new(0, 100_000, &Preferences::default()).unwrap();
    let iterated: Vec<u64> = s.collect();
    assert_eq!(iterated, all);

    let s = PrimeSieve::new(0, 1_000_000, &Preferences::default()).unwrap();
    let first: Vec<u64> = s.take(6).collect();
    assert_eq!(first, vec![2, 3, 5, 7, 11, 13]);
}

#[test]
fn test_multi_segment() {
    // Small segments force many refills and carry-over of striker
    // state across segment boundaries.
    let prefs = Preferences {
        l1_cache_size: Some(8 << 10),
        segment_size: Some(8 << 10),
        ..Preferences::default()
    };
    let mut s = PrimeSieve::new(0, 2_000_000, &prefs).unwrap();
    let mut n = 0u64;
    loop {
        let len = s.next_block().len();
        if len == 0 && s.finished() {
            break;
        }
        n += len as u64;
    }
    assert_eq!(n, 148933); // pi(2*10^6)
}

#[test]
fn test_count_matches_enumeration() {
    // Multiples of 30 as stop are delicate: the value stop+1 sits in
    // the second-to-last sieve byte.
    for (start, stop) in [
        (0u64, 3_999_990u64),
        (500_000, 4_500_000),
        (7, 7),
        (0, 30),
        (0, 60),
        (0, 30_030),
        (100, 2_310),
        (11, 121),
    ] {
        let n = count_primes(start, stop).unwrap();
        assert_eq!(n, primes_in(start, stop).unwrap().len() as u64, "[{start}, {stop}]");
    }
    assert_eq!(count_primes(0, 60).unwrap(), 17);
}