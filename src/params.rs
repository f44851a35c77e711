// Copyright 2025 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Tunable constants. The defaults below target x86-64 CPUs from the
//! last decade; older or smaller machines may want to lower them.

/// Sieving primes up to (L1 cache size × FACTOR_ERATSMALL) keep the
/// striker in its efficient regime, where each prime has many multiples
/// per L1 tile. Valid range is 0..3; the hard upper bound enforced by
/// [`crate::erat::Erat::new`] is 3 × L1.
pub const FACTOR_ERATSMALL: f64 = 0.4;

/// Default segment size in bytes, about half a typical L2 cache.
/// One byte covers 30 integers.
pub const SEGMENT_BYTES: u64 = 128 * 1024;

pub const L1_CACHE_MIN: u64 = 8 << 10;
pub const L1_CACHE_DEFAULT: u64 = 32 << 10;
pub const L1_CACHE_MAX: u64 = 4096 << 10;

/// The large pre-sieve buffers are only built once the cumulative
/// sieving distance exceeds this multiple of their combined period;
/// below that the fixed 7·11·13 pattern wins.
pub const PRESIEVE_RATIO: u64 = 20;

/// Upper estimate of the prime counting function π(n),
/// used to reserve capacity for sieving prime records.
pub fn prime_count_approx(n: u64) -> usize {
    if n < 10 {
        return 4;
    }
    // π(n) < n / (ln n − 1.1) for n ≥ 4
    let x = n as f64;
    (x / (x.ln() - 1.1)) as usize + 10
}

#[test]
fn test_prime_count_approx() {
    // Exact values: π(10^2) = 25, π(10^4) = 1229, π(10^6) = 78498.
    for (n, pi) in [(100u64, 25), (10_000, 1229), (1_000_000, 78498)] {
        let approx = prime_count_approx(n);
        eprintln!("pi({n}) = {pi}, estimate {approx}");
        assert!(approx >= pi);
        assert!(approx <= pi + pi / 4 + 10);
    }
}
