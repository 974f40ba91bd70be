//! Injected entropy.
//!
//! Every generator in this crate draws its randomness from a
//! [`RandomSource`] handed to it, never from a global. Production code
//! uses [`OsRandom`].

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// A cryptographically secure source of random bytes.
///
/// Implementations must be safe to share between threads and must not
/// produce correlated output for concurrent callers.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating-system CSPRNG.
///
/// Stateless: each call goes to the kernel, so concurrent use needs no
/// locking.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Adapter exposing a [`RandomSource`] as an `RngCore + CryptoRng`.
pub(crate) struct SourceRng<'a>(pub(crate) &'a dyn RandomSource);

impl RngCore for SourceRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.0.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.0.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for SourceRng<'_> {}

/// Deterministic source for tests, seeded through `StdRng`.
#[cfg(test)]
pub(crate) struct SeededRandom {
    rng: std::sync::Mutex<rand::rngs::StdRng>,
}

#[cfg(test)]
impl SeededRandom {
    pub(crate) fn new(seed: u64) -> Self {
        use rand::SeedableRng;

        Self {
            rng: std::sync::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

#[cfg(test)]
impl RandomSource for SeededRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(dest);
    }
}
