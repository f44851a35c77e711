// Copyright 2025, 2026 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Pre-sieving: initialize sieve segments with the multiples of all
//! primes below 100 already crossed off.
//!
//! Eight byte buffers are allocated, each assigned a few primes whose
//! product is its period; the buffer holds one full period of the
//! crossing-off pattern of its primes. Filling a segment is then a
//! bitwise AND of the eight buffers at period-aligned cursors, a pure
//! memory-bound loop that replaces millions of individual strikes.
//! The assignment below balances the products so that every buffer
//! stays around 32 KiB and L2 resident:
//!
//!   { 7, 67, 71}  {11, 41, 73}  {13, 43, 59}  {17, 37, 53}
//!   {19, 29, 61}  {23, 31, 47}  {79, 97}      {83, 89}
//!
//! Building the buffers costs a few milliseconds, which dwarfs small
//! sieving jobs. Those use a fixed 1001-byte pattern for {7, 11, 13}
//! instead, embedded below; the large buffers are only built once the
//! cumulative sieving distance justifies them. Pre-sieving all primes
//! below 100 saves about 30% of total sieving time around 10^10.

use num_integer::sqrt as isqrt;
use wide::u8x16;

use crate::erat::Erat;
use crate::params::PRESIEVE_RATIO;

/// Primes crossed off by each of the eight period buffers.
const BUFFER_PRIMES: [&[u64]; 8] = [
    &[7, 67, 71],
    &[11, 41, 73],
    &[13, 43, 59],
    &[17, 37, 53],
    &[19, 29, 61],
    &[23, 31, 47],
    &[79, 97],
    &[83, 89],
];

/// Combined distance of the eight buffers, in integers (each byte
/// covers 30 integers). This is the yardstick against which a sieving
/// job is judged large enough to build the buffers; it is not a period
/// of the combined pattern.
pub const BUFFERS_DIST: u64 = {
    let mut dist = 0u64;
    let mut i = 0;
    while i < BUFFER_PRIMES.len() {
        let mut product = 30u64;
        let mut j = 0;
        while j < BUFFER_PRIMES[i].len() {
            product *= BUFFER_PRIMES[i][j];
            j += 1;
        }
        dist += product;
        i += 1;
    }
    dist
};

/// One period (7·11·13 bytes, 30030 integers) of the crossing-off
/// pattern of the primes {7, 11, 13}, phase-aligned to multiples of
/// 30030. This is wire-format data: bit j of byte i is the candidate
/// 30*i + BIT_VALUES[j], cleared iff it is divisible by 7, 11 or 13.
#[rustfmt::skip]
static BUFFER_7_11_13: [u8; 7 * 11 * 13] = [
    0xf8, 0xef, 0x77, 0x3f, 0xdb, 0xed, 0x9e, 0xfc, 0xea, 0x37, 0xaf, 0xf9,
    0xf5, 0xd3, 0x7e, 0x4f, 0x77, 0x9e, 0xeb, 0xf9, 0xdd, 0xee, 0xad, 0x77,
    0xb7, 0x73, 0xd9, 0xdf, 0x3e, 0xef, 0x53, 0xaf, 0xeb, 0xfd, 0xde, 0xb6,
    0x6f, 0x57, 0xb7, 0xba, 0xfd, 0x5b, 0xfe, 0xcf, 0x65, 0xbf, 0xf1, 0x7c,
    0x9f, 0xfe, 0xae, 0x77, 0xbb, 0xfb, 0x6d, 0xdd, 0xde, 0xe7, 0x77, 0x9d,
    0xfa, 0xbc, 0xdf, 0xfa, 0xe7, 0x63, 0xbd, 0x7b, 0xf5, 0x5f, 0xce, 0xef,
    0x34, 0xbe, 0xbb, 0xfd, 0xcf, 0xf4, 0xeb, 0x77, 0x3f, 0xdb, 0xdd, 0x8e,
    0xfe, 0xe9, 0x76, 0xaf, 0xf9, 0xfd, 0xd7, 0x7a, 0xcf, 0x77, 0xbe, 0xdb,
    0xe9, 0xdf, 0xec, 0xec, 0x37, 0xb7, 0x7b, 0xd5, 0xdb, 0xbe, 0x6f, 0x73,
    0x9f, 0xeb, 0xfd, 0xdd, 0xf6, 0x2f, 0x57, 0xbf, 0xb2, 0xf9, 0xdb, 0x7e,
    0xef, 0x55, 0xaf, 0xf3, 0x7d, 0xde, 0xbe, 0xae, 0x77, 0xb3, 0xfb, 0xed,
    0x5d, 0xfe, 0xc7, 0x67, 0x9f, 0xf9, 0xbc, 0x9f, 0xfa, 0xef, 0x67, 0xb9,
    0xfb, 0x75, 0x5f, 0xde, 0xef, 0x36, 0xbd, 0xfa, 0xbd, 0xcf, 0xfc, 0xe7,
    0x73, 0x3f, 0x5b, 0xfd, 0x9e, 0xee, 0xeb, 0x75, 0xae, 0xb9, 0xfd, 0xd7,
    0x76, 0xcb, 0x77, 0x3e, 0xfb, 0xd9, 0xcf, 0xee, 0xed, 0x76, 0xb7, 0x7b,
    0xdd, 0xd7, 0xba, 0xef, 0x73, 0xbf, 0xcb, 0xed, 0xdf, 0xf4, 0x6e, 0x17,
    0xbf, 0xba, 0xf5, 0xdb, 0xfe, 0x6f, 0x75, 0x9f, 0xe3, 0x7d, 0xdd, 0xfe,
    0xae, 0x77, 0xbb, 0xf3, 0xe9, 0xdd, 0x7e, 0xe7, 0x57, 0x8f, 0xfb, 0xbc,
    0xde, 0xba, 0xef, 0x67, 0xb5, 0xfb, 0xf5, 0x5f, 0xde, 0xcf, 0x26, 0xbf,
    0xf9, 0xfc, 0x8f, 0xfc, 0xef, 0x77, 0x3b, 0xdb, 0x7d, 0x9e, 0xde, 0xeb,
    0x77, 0xad, 0xf8, 0xbd, 0xd7, 0x7e, 0xc7, 0x73, 0xbe, 0x7b, 0xf9, 0xdf,
    0xee, 0xed, 0x75, 0xb6, 0x3b, 0xdd, 0xdf, 0xb6, 0xeb, 0x73, 0x3f, 0xeb,
    0xdd, 0xcf, 0xf6, 0x6d, 0x56, 0xbf, 0xba, 0xfd, 0xd3, 0xfa, 0xef, 0x75,
    0xbf, 0xd3, 0x6d, 0xdf, 0xfc, 0xae, 0x37, 0xbb, 0xfb, 0xe5, 0xd9, 0xfe,
    0x67, 0x77, 0x9f, 0xeb, 0xbc, 0xdd, 0xfa, 0xaf, 0x67, 0xbd, 0xf3, 0xf1,
    0x5f, 0x5e, 0xef, 0x16, 0xaf, 0xfb, 0xfd, 0xce, 0xbc, 0xef, 0x77, 0x37,
    0xdb, 0xfd, 0x1e, 0xfe, 0xcb, 0x67, 0xaf, 0xf9, 0xfc, 0x97, 0x7e, 0xcf,
    0x77, 0xba, 0xfb, 0x79, 0xdf, 0xce, 0xed, 0x77, 0xb5, 0x7a, 0x9d, 0xdf,
    0xbe, 0xe7, 0x73, 0xbf, 0x6b, 0xfd, 0xdf, 0xe6, 0x6f, 0x55, 0xbe, 0xba,
    0xfd, 0xdb, 0xf6, 0xeb, 0x75, 0x3f, 0xf3, 0x5d, 0xcf, 0xfe, 0xac, 0x76,
    0xbb, 0xfb, 0xed, 0xd5, 0xfa, 0xe7, 0x77, 0x9f, 0xdb, 0xac, 0xdf, 0xf8,
    0xee, 0x27, 0xbd, 0xfb, 0xf5, 0x5b, 0xde, 0x6f, 0x36, 0x9f, 0xeb, 0xfd,
    0xcd, 0xfc, 0xaf, 0x77, 0x3f, 0xd3, 0xf9, 0x9e, 0x7e, 0xeb, 0x57, 0xaf,
    0xf9, 0xfd, 0xd6, 0x3e, 0xcf, 0x77, 0xb6, 0xfb, 0xf9, 0x5f, 0xee, 0xcd,
    0x67, 0xb7, 0x79, 0xdc, 0x9f, 0xbe, 0xef, 0x73, 0xbb, 0xeb, 0x7d, 0xdf,
    0xd6, 0x6f, 0x57, 0xbd, 0xba, 0xbd, 0xdb, 0xfe, 0xe7, 0x71, 0xbf, 0x73,
    0x7d, 0xdf, 0xee, 0xae, 0x75, 0xba, 0xbb, 0xed, 0xdd, 0xf6, 0xe3, 0x77,
    0x1f, 0xfb, 0x9c, 0xcf, 0xfa, 0xed, 0x66, 0xbd, 0xfb, 0xf5, 0x57, 0xda,
    0xef, 0x36, 0xbf, 0xdb, 0xed, 0xcf, 0xfc, 0xee, 0x37, 0x3f, 0xdb, 0xf5,
    0x9a, 0xfe, 0x6b, 0x77, 0x8f, 0xe9, 0xfd, 0xd5, 0x7e, 0x8f, 0x77, 0xbe,
    0xf3, 0xf9, 0xdf, 0x6e, 0xed, 0x57, 0xa7, 0x7b, 0xdd, 0xde, 0xbe, 0xef,
    0x73, 0xb7, 0xeb, 0xfd, 0x5f, 0xf6, 0x4f, 0x47, 0xbf, 0xb8, 0xfc, 0x9b,
    0xfe, 0xef, 0x75, 0xbb, 0xf3, 0x7d, 0xdf, 0xde, 0xae, 0x77, 0xb9, 0xfa,
    0xad, 0xdd, 0xfe, 0xe7, 0x73, 0x9f, 0x7b, 0xbc, 0xdf, 0xea, 0xef, 0x65,
    0xbc, 0xbb, 0xf5, 0x5f, 0xd6, 0xeb, 0x36, 0x3f, 0xfb, 0xdd, 0xcf, 0xfc,
    0xed, 0x76, 0x3f, 0xdb, 0xfd, 0x96, 0xfa, 0xeb, 0x77, 0xaf, 0xd9, 0xed,
    0xd7, 0x7c, 0xce, 0x37, 0xbe, 0xfb, 0xf1, 0xdb, 0xee, 0x6d, 0x77, 0x97,
    0x6b, 0xdd, 0xdd, 0xbe, 0xaf, 0x73, 0xbf, 0xe3, 0xf9, 0xdf, 0x76, 0x6f,
    0x57, 0xaf, 0xba, 0xfd, 0xda, 0xbe, 0xef, 0x75, 0xb7, 0xf3, 0x7d, 0x5f,
    0xfe, 0x8e, 0x67, 0xbb, 0xf9, 0xec, 0x9d, 0xfe, 0xe7, 0x77, 0x9b, 0xfb,
    0x3c, 0xdf, 0xda, 0xef, 0x67, 0xbd, 0xfa, 0xb5, 0x5f, 0xde, 0xe7, 0x32,
    0xbf, 0x7b, 0xfd, 0xcf, 0xec, 0xef, 0x75, 0x3e, 0x9b, 0xfd, 0x9e, 0xf6,
    0xeb, 0x77, 0x2f, 0xf9, 0xdd, 0xc7, 0x7e, 0xcd, 0x76, 0xbe, 0xfb, 0xf9,
    0xd7, 0xea, 0xed, 0x77, 0xb7, 0x5b, 0xcd, 0xdf, 0xbc, 0xee, 0x33, 0xbf,
    0xeb, 0xf5, 0xdb, 0xf6, 0x6f, 0x57, 0x9f, 0xaa, 0xfd, 0xd9, 0xfe, 0xaf,
    0x75, 0xbf, 0xf3, 0x79, 0xdf, 0x7e, 0xae, 0x57, 0xab, 0xfb, 0xed, 0xdc,
    0xbe, 0xe7, 0x77, 0x97, 0xfb, 0xbc, 0x5f, 0xfa, 0xcf, 0x67, 0xbd, 0xf9,
    0xf4, 0x1f, 0xde, 0xef, 0x36, 0xbb, 0xfb, 0x7d, 0xcf, 0xdc, 0xef, 0x77,
    0x3d, 0xda, 0xbd, 0x9e, 0xfe, 0xe3, 0x73, 0xaf, 0x79, 0xfd, 0xd7, 0x6e,
    0xcf, 0x75, 0xbe, 0xbb, 0xf9, 0xdf, 0xe6, 0xe9, 0x77, 0x37, 0x7b, 0xdd,
    0xcf, 0xbe, 0xed, 0x72, 0xbf, 0xeb, 0xfd, 0xd7, 0xf2, 0x6f, 0x57, 0xbf,
    0x9a, 0xed, 0xdb, 0xfc, 0xee, 0x35, 0xbf, 0xf3, 0x75, 0xdb, 0xfe, 0x2e,
    0x77, 0x9b, 0xeb, 0xed, 0xdd, 0xfe, 0xa7, 0x77, 0x9f, 0xf3, 0xb8, 0xdf,
    0x7a, 0xef, 0x47, 0xad, 0xfb, 0xf5, 0x5e, 0x9e, 0xef, 0x36, 0xb7, 0xfb,
    0xfd, 0x4f, 0xfc, 0xcf, 0x67, 0x3f, 0xd9, 0xfc, 0x9e, 0xfe, 0xeb, 0x77,
    0xab, 0xf9, 0x7d, 0xd7, 0x5e, 0xcf, 0x77, 0xbc, 0xfa, 0xb9, 0xdf, 0xee,
    0xe5, 0x73, 0xb7, 0x7b, 0xdd, 0xdf, 0xae, 0xef, 0x71, 0xbe, 0xab, 0xfd,
    0xdf, 0xf6, 0x6b, 0x57, 0x3f, 0xba, 0xdd, 0xcb, 0xfe, 0xed, 0x74, 0xbf,
    0xf3, 0x7d, 0xd7, 0xfa, 0xae, 0x77, 0xbb, 0xdb, 0xed, 0xdd, 0xfc, 0xe6,
    0x37, 0x9f, 0xfb, 0xb4, 0xdb, 0xfa, 0x6f, 0x67, 0x9d, 0xeb, 0xf5, 0x5d,
    0xde, 0xaf, 0x36, 0xbf, 0xf3, 0xf9, 0xcf, 0x7c, 0xef, 0x57, 0x2f, 0xdb,
    0xfd, 0x9e, 0xbe, 0xeb, 0x77, 0xa7, 0xf9, 0xfd, 0x57, 0x7e, 0xcf, 0x67,
    0xbe, 0xf9, 0xf8, 0x9f, 0xee, 0xed, 0x77, 0xb3, 0x7b, 0x5d, 0xdf, 0x9e,
    0xef, 0x73, 0xbd, 0xea, 0xbd, 0xdf, 0xf6, 0x67, 0x53, 0xbf, 0x3a, 0xfd,
    0xdb, 0xee, 0xef, 0x75, 0xbe, 0xb3, 0x7d, 0xdf, 0xf6, 0xaa, 0x77, 0x3b,
    0xfb, 0xcd, 0xcd, 0xfe, 0xe5, 0x76, 0x9f, 0xfb, 0xbc, 0xd7, 0xfa, 0xef,
    0x67, 0xbd, 0xdb, 0xe5, 0x5f, 0xdc, 0xee, 0x36, 0xbf, 0xfb, 0xf5, 0xcb,
    0xfc, 0x6f, 0x77, 0x1f, 0xcb, 0xfd, 0x9c, 0xfe, 0xab, 0x77, 0xaf, 0xf1,
    0xf9, 0xd7, 0x7e, 0xcf, 0x57, 0xae, 0xfb, 0xf9, 0xde, 0xae, 0xed, 0x77,
    0xb7, 0x7b, 0xdd, 0x5f, 0xbe, 0xcf, 0x63, 0xbf, 0xe9, 0xfc, 0x9f, 0xf6,
    0x6f, 0x57, 0xbb, 0xba, 0x7d, 0xdb, 0xde, 0xef, 0x75, 0xbd, 0xf2, 0x3d,
    0xdf, 0xfe, 0xa6, 0x73, 0xbb, 0x7b, 0xed, 0xdd, 0xee, 0xe7, 0x75, 0x9e,
    0xbb, 0xbc, 0xdf, 0xf2, 0xeb, 0x67, 0x3d, 0xfb, 0xd5, 0x4f, 0xde, 0xed,
    0x36, 0xbf, 0xfb, 0xfd, 0xc7,
];

/// Pre-sieve state. Buffers are built lazily by [`PreSieve::init`] and
/// read-only afterwards; a fresh instance uses the static pattern.
pub struct PreSieve {
    buffers: [Vec<u8>; 8],
    total_dist: u64,
    max_prime: u64,
}

impl Default for PreSieve {
    fn default() -> Self {
        Self::new()
    }
}

impl PreSieve {
    pub fn new() -> PreSieve {
        PreSieve {
            buffers: Default::default(),
            total_dist: 0,
            max_prime: 13,
        }
    }

    /// Largest prime the pre-sieve currently removes: 13 with the
    /// static pattern, 97 once the large buffers are built. Strikers
    /// only need to handle primes above this.
    pub fn max_prime(&self) -> u64 {
        self.max_prime
    }

    /// Prepares pre-sieving for a job over [start, stop]. Idempotent;
    /// cheap unless it decides to build the large buffers. Distances
    /// of successive calls accumulate, so a driver that subdivides a
    /// long job into chunks still gets the large buffers eventually.
    pub fn init(&mut self, start: u64, stop: u64) {
        if !self.buffers[0].is_empty() {
            return;
        }
        let dist = start.max(stop) - start;
        self.total_dist += dist.max(isqrt(stop));
        if self.total_dist < BUFFERS_DIST * PRESIEVE_RATIO {
            return;
        }
        self.init_buffers();
    }

    fn init_buffers(&mut self) {
        for (i, primes) in BUFFER_PRIMES.iter().enumerate() {
            let mut product = 30u64;
            for &p in *primes {
                product *= p;
            }
            // Sieve one period starting at the period itself: the
            // pattern is then aligned to multiples of the period, and
            // the first strike of each prime is a plain multiple, not
            // the prime itself.
            let start = product;
            let stop = start + product;
            let max_prime = *primes.last().unwrap();
            debug_assert!(start >= max_prime * max_prime);

            let size = (product / 30) as usize;
            self.buffers[i] = vec![0xff; size];
            let mut erat =
                Erat::new(stop, size as u64, max_prime).expect("pre-sieve buffer config");
            for &p in *primes {
                erat.add_sieving_prime(p, start);
            }
            erat.cross_off(&mut self.buffers[i]);
            self.max_prime = self.max_prime.max(max_prime);
        }
    }

    /// Fills `sieve` with the pre-sieve pattern for the segment
    /// starting at `segment_low` (a multiple of 30): every candidate
    /// divisible by a pre-sieved prime is cleared, every other bit is
    /// set. The pre-sieved primes themselves are prime: the first four
    /// bytes are patched back so that only 49, 77, 91, 119 and 121 stay
    /// crossed off below 128.
    pub fn apply(&self, sieve: &mut [u8], segment_low: u64) {
        debug_assert!(segment_low % 30 == 0);
        if self.buffers[0].is_empty() {
            Self::apply_small(sieve, segment_low);
        } else {
            self.apply_large(sieve, segment_low);
        }

        if segment_low < 120 {
            let bit49: u8 = 1 << 4;
            let bit77: u8 = 1 << 3;
            let bit91: u8 = 1 << 7;
            let bit119: u8 = 1 << 6;
            let bit121: u8 = 1 << 7;
            let first = [
                0xff,
                0xff ^ bit49,
                0xff ^ bit77 ^ bit91,
                0xff ^ bit119 ^ bit121,
            ];
            let skip = (segment_low / 30) as usize;
            for (i, &b) in first[skip..].iter().enumerate() {
                if i < sieve.len() {
                    sieve[i] = b;
                }
            }
        }
    }

    /// Tile the static {7, 11, 13} pattern over the segment.
    fn apply_small(sieve: &mut [u8], segment_low: u64) {
        let size = BUFFER_7_11_13.len();
        let period = 30 * size as u64;
        let i = ((segment_low % period) / 30) as usize;
        let size_left = size - i;

        if sieve.len() <= size_left {
            sieve.copy_from_slice(&BUFFER_7_11_13[i..i + sieve.len()]);
        } else {
            let (head, rest) = sieve.split_at_mut(size_left);
            head.copy_from_slice(&BUFFER_7_11_13[i..]);
            for chunk in rest.chunks_mut(size) {
                chunk.copy_from_slice(&BUFFER_7_11_13[..chunk.len()]);
            }
        }
    }

    /// AND the eight period buffers over the segment. Each buffer has
    /// its own cursor; the copy is chopped at whichever buffer wraps
    /// around first.
    fn apply_large(&self, sieve: &mut [u8], segment_low: u64) {
        let mut pos = [0usize; 8];
        for (i, buf) in self.buffers.iter().enumerate() {
            pos[i] = ((segment_low % (30 * buf.len() as u64)) / 30) as usize;
        }

        let mut offset = 0;
        while offset < sieve.len() {
            let mut bytes = sieve.len() - offset;
            for (i, buf) in self.buffers.iter().enumerate() {
                bytes = bytes.min(buf.len() - pos[i]);
            }

            let windows: [&[u8]; 8] =
                std::array::from_fn(|i| &self.buffers[i][pos[i]..pos[i] + bytes]);
            and_buffers(windows, &mut sieve[offset..offset + bytes]);

            offset += bytes;
            for (i, buf) in self.buffers.iter().enumerate() {
                pos[i] += bytes;
                if pos[i] >= buf.len() {
                    pos[i] = 0;
                }
            }
        }
    }
}

/// out = buf1 & buf2 & ... & buf8, 16 bytes per iteration.
/// This is the hot path of large pre-sieving.
fn and_buffers(bufs: [&[u8]; 8], out: &mut [u8]) {
    let n = out.len();
    for b in bufs {
        assert!(b.len() >= n);
    }
    let mut i = 0;
    while i + 16 <= n {
        unsafe {
            // Cast as [u8; 16] to avoid assuming alignment.
            let mut v = u8x16::new(*(bufs[0].as_ptr().add(i) as *const [u8; 16]));
            for buf in &bufs[1..] {
                v = v & u8x16::new(*(buf.as_ptr().add(i) as *const [u8; 16]));
            }
            *(out.as_mut_ptr().add(i) as *mut [u8; 16]) = v.to_array();
        }
        i += 16;
    }
    while i < n {
        out[i] = bufs.iter().fold(0xff, |acc, b| acc & b[i]);
        i += 1;
    }
}

#[cfg(test)]
const PRESIEVE_PRIMES: [u64; 22] = [
    7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Checks one applied segment bit by bit against trial division.
/// Bytes patched by the prime restoration (below 120) keep exactly
/// 49, 77, 91, 119 and 121 crossed off.
#[cfg(test)]
fn check_applied(sieve: &[u8], segment_low: u64, primes: &[u64]) {
    for (i, &byte) in sieve.iter().enumerate() {
        let patched = segment_low + 30 * (i as u64) < 120;
        for (j, &r) in crate::bits::BIT_VALUES.iter().enumerate() {
            let v = segment_low + 30 * i as u64 + r;
            let expect = if patched {
                ![49, 77, 91, 119, 121].contains(&v)
            } else {
                primes.iter().all(|&p| v % p != 0)
            };
            assert_eq!(byte & (1 << j) != 0, expect, "value {v}");
        }
    }
}

#[test]
fn test_buffers_dist() {
    // 8 products of the buffer primes, in units of 30 integers.
    let bytes: u64 = BUFFER_PRIMES
        .iter()
        .map(|ps| ps.iter().product::<u64>())
        .sum();
    assert_eq!(BUFFERS_DIST, 30 * bytes);
    assert_eq!(bytes, 214712);
}

#[test]
fn test_static_pattern_regenerated() {
    // The embedded table is one period of the {7, 11, 13} pattern,
    // aligned to 30030: rebuilding it with the striker must give the
    // same bytes.
    let mut buf = vec![0xffu8; BUFFER_7_11_13.len()];
    let mut erat = Erat::new(2 * 30030, buf.len() as u64, 13).unwrap();
    for p in [7u64, 11, 13] {
        erat.add_sieving_prime(p, 30030);
    }
    erat.cross_off(&mut buf);
    assert_eq!(buf[..], BUFFER_7_11_13[..]);
}

#[test]
fn test_apply_small() {
    // One full period at segment_low = 0.
    let pre = PreSieve::new();
    assert_eq!(pre.max_prime(), 13);
    let mut sieve = vec![0u8; 1001];
    pre.apply(&mut sieve, 0);
    check_applied(&sieve, 0, &[7, 11, 13]);
}

#[test]
fn test_apply_small_slices() {
    let pre = PreSieve::new();
    // Prefix shorter than the pattern.
    let mut sieve = vec![0u8; 100];
    pre.apply(&mut sieve, 0);
    check_applied(&sieve, 0, &[7, 11, 13]);
    // Offset window, no patched bytes.
    let mut sieve = vec![0u8; 57];
    pre.apply(&mut sieve, 900);
    check_applied(&sieve, 900, &[7, 11, 13]);
    // Wrap-around near the end of the period, then tile twice.
    let mut sieve = vec![0u8; 2500];
    pre.apply(&mut sieve, 29_970);
    check_applied(&sieve, 29_970, &[7, 11, 13]);
}

#[test]
fn test_small_pattern_periodicity() {
    let pre = PreSieve::new();
    let (mut a, mut b) = (vec![0u8; 512], vec![0u8; 512]);
    pre.apply(&mut a, 150);
    pre.apply(&mut b, 150 + 5 * 30030);
    assert_eq!(a, b);
}

#[cfg(test)]
fn built_presieve() -> PreSieve {
    let mut pre = PreSieve::new();
    pre.init(0, PRESIEVE_RATIO * BUFFERS_DIST);
    assert_eq!(pre.max_prime(), 97);
    pre
}

#[test]
fn test_apply_large() {
    let pre = built_presieve();
    // Long enough to wrap every buffer at least once
    // (the largest is 33611 bytes).
    let mut sieve = vec![0u8; 70_000];
    pre.apply(&mut sieve, 0);
    check_applied(&sieve, 0, &PRESIEVE_PRIMES);
}

#[test]
fn test_apply_large_offset() {
    let pre = built_presieve();
    let mut sieve = vec![0u8; 20_000];
    pre.apply(&mut sieve, 6_000_000);
    check_applied(&sieve, 6_000_000, &PRESIEVE_PRIMES);
    // Odd-sized window at an unaligned cursor position.
    let mut sieve = vec![0u8; 1313];
    pre.apply(&mut sieve, 999_990);
    check_applied(&sieve, 999_990, &PRESIEVE_PRIMES);
}

#[test]
fn test_apply_idempotent() {
    let small = PreSieve::new();
    let large = built_presieve();
    for (pre, low) in [(&small, 0u64), (&small, 60_060), (&large, 0), (&large, 360_360)] {
        let (mut a, mut b) = (vec![0u8; 4096], vec![0xffu8; 4096]);
        pre.apply(&mut a, low);
        pre.apply(&mut b, low);
        assert_eq!(a, b);
        pre.apply(&mut b, low);
        assert_eq!(a, b);
    }
}

#[test]
fn test_init_accumulates_distance() {
    let mut pre = PreSieve::new();
    pre.init(0, 1000);
    assert_eq!(pre.max_prime(), 13);
    // Three chunks of 7 × BUFFERS_DIST cross the 20× threshold.
    let chunk = 7 * BUFFERS_DIST;
    pre.init(0, chunk);
    assert_eq!(pre.max_prime(), 13);
    pre.init(0, chunk);
    pre.init(0, chunk);
    assert_eq!(pre.max_prime(), 97);
    // Further init calls are no-ops.
    pre.init(0, 1);
    assert_eq!(pre.max_prime(), 97);
}
