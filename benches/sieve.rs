use brunch::Bench;
use segesta::presieve::PreSieve;
use segesta::sieve::small_primes;
use segesta::{count_primes, primes_in};

brunch::benches! {
    // Bootstrap sieve
    Bench::new("small_primes(100_000)")
    .run_seeded(100_000u64, small_primes),
    Bench::new("small_primes(10_000_000)")
    .run_seeded(10_000_000u64, small_primes),

    // Segmented sieve end to end
    Bench::new("count_primes(0, 10^6) = 78498")
    .run_seeded(1_000_000u64, |n| count_primes(0, n).unwrap()),
    Bench::new("count_primes(0, 10^8)")
    .run_seeded(100_000_000u64, |n| count_primes(0, n).unwrap()),
    Bench::new("primes_in(10^9, 10^9 + 10^6)")
    .run_seeded(1_000_000_000u64, |n| primes_in(n, n + 1_000_000).unwrap()),

    // Pre-sieve pattern fill, static and large buffers
    {
        let pre = PreSieve::new();
        Bench::new("presieve apply small, 128 KiB")
        .run_seeded(vec![0u8; 128 << 10], move |mut sieve| {
            pre.apply(&mut sieve, 30_030_000);
            sieve
        })
    },
    {
        let mut pre = PreSieve::new();
        pre.init(0, u64::pow(10, 10));
        Bench::new("presieve apply large, 128 KiB")
        .run_seeded(vec![0u8; 128 << 10], move |mut sieve| {
            pre.apply(&mut sieve, 30_030_000);
            sieve
        })
    },
}
