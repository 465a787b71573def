//! Injected randomness capability.
//!
//! Every component that needs randomness (salts, nonces, tokens,
//! identifiers) receives a `RandomSource` instead of reaching for an
//! ambient global. Production code uses [`OsRandom`]; tests substitute
//! a deterministic source.

use std::sync::Arc;

use crate::error::Result;

/// Cryptographically strong random byte source.
///
/// Implementations must fail loudly: if strong randomness is not
/// available, `fill_bytes` returns an error. There is no fallback to a
/// weaker source on any security-relevant path.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating-system random source (the default).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        getrandom::getrandom(dest)?;
        Ok(())
    }
}

/// Shared handle to a random source.
pub type SharedRandom = Arc<dyn RandomSource>;
