use rand::Rng as _;

/// Source of uniform randomness for `limit_orphans`' overflow eviction.
/// Threaded through per call (unlike `Clock`, which is ambient) because its
/// statistical quality is exactly what the uniform-eviction defense depends
/// on, and callers benchmarking or testing that defense want to swap it in
/// per call.
pub trait OrphanRng {
    /// Returns a value in `[0, n)`. `n` is always non-zero when called.
    fn uniform(&mut self, n: usize) -> usize;
}

/// Default `rand`-backed implementation, suitable for production use: an
/// attacker connected as a peer cannot predict `rand::thread_rng()` output.
#[derive(Debug, Default)]
pub struct ThreadRandom;

impl OrphanRng for ThreadRandom {
    fn uniform(&mut self, n: usize) -> usize {
        rand::thread_rng().gen_range(0..n)
    }
}

impl<R: rand::Rng> OrphanRng for R {
    fn uniform(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }
}
