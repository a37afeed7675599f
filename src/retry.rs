//! The retry-interval algebra: constant/linear/exponential backoff with jitter.
//!
//! This is a pure function of `(attempt, base, scale, jitter)`, plus one injected source of
//! randomness so it stays testable without a real RNG.

use std::time::Duration;

/// How the base wait grows with the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryScale {
    /// Every retry waits `base_s`.
    Constant,
    /// Retry `n` (n > 0) waits `(n + 1) * base_s`.
    Linear,
    /// Retry `n` (n > 0) waits `base_s * 2^n`.
    Exponential,
}

impl Default for RetryScale {
    fn default() -> Self {
        RetryScale::Exponential
    }
}

/// Compute the wait before retry number `attempt` (0-indexed on the first failure), with the
/// default jitter fraction of `0.5` and a CSPRNG-backed source of randomness.
pub fn interval(attempt: u32, base_s: f64, scale: RetryScale) -> Duration {
    interval_jittered(attempt, base_s, scale, 0.5)
}

/// Same as [`interval`] but with an explicit jitter fraction in `[0, 1]`.
pub fn interval_jittered(attempt: u32, base_s: f64, scale: RetryScale, jitter: f64) -> Duration {
    interval_with_rand(attempt, base_s, scale, jitter, random_unit)
}

/// The pure core: `rand` must return a value uniform in `[0, 1)`.
pub(crate) fn interval_with_rand(
    attempt: u32,
    base_s: f64,
    scale: RetryScale,
    jitter: f64,
    rand: impl FnOnce() -> f64,
) -> Duration {
    if base_s == 0.0 {
        return Duration::ZERO;
    }

    let base = if attempt == 0 {
        base_s
    } else {
        let n = f64::from(attempt);
        match scale {
            RetryScale::Constant => base_s,
            RetryScale::Linear => (n + 1.0) * base_s,
            RetryScale::Exponential => base_s * 2f64.powf(n),
        }
    };

    let r = rand();
    let factor = 1.0 + jitter * (2.0 * r - 1.0);
    let secs = (base * factor).max(0.0).floor();
    Duration::from_secs_f64(secs)
}

/// A uniform `[0, 1)` sample from a CSPRNG, in the style of the corpus this crate is modeled on
/// (jitter derived from `ring::rand`, not a non-cryptographic PRNG).
fn random_unit() -> f64 {
    use ring::rand::{generate, SystemRandom};
    let rng = SystemRandom::new();
    let bytes: [u8; 4] = generate(&rng)
        .expect("failed to generate random bytes for retry jitter")
        .expose();
    f64::from(u32::from_ne_bytes(bytes)) / (f64::from(u32::MAX) + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(attempt: u32, base_s: f64, scale: RetryScale, jitter: f64) -> Duration {
        interval_with_rand(attempt, base_s, scale, jitter, || 0.0)
    }

    #[test]
    fn zero_base_is_always_zero() {
        for scale in [RetryScale::Constant, RetryScale::Linear, RetryScale::Exponential] {
            assert_eq!(iv(0, 0.0, scale, 0.5), Duration::ZERO);
            assert_eq!(iv(5, 0.0, scale, 0.5), Duration::ZERO);
        }
    }

    #[test]
    fn constant_is_flat() {
        for n in 0..5 {
            assert_eq!(iv(n, 3.0, RetryScale::Constant, 0.0), Duration::from_secs(3));
        }
    }

    #[test]
    fn linear_sequence() {
        assert_eq!(iv(0, 2.0, RetryScale::Linear, 0.0), Duration::from_secs(2));
        let expect = [4u64, 6, 8];
        for (i, want) in expect.iter().enumerate() {
            let attempt = (i + 1) as u32;
            assert_eq!(iv(attempt, 2.0, RetryScale::Linear, 0.0), Duration::from_secs(*want));
        }
    }

    #[test]
    fn exponential_sequence() {
        assert_eq!(iv(0, 2.0, RetryScale::Exponential, 0.0), Duration::from_secs(2));
        let expect = [4u64, 8, 16];
        for (i, want) in expect.iter().enumerate() {
            let attempt = (i + 1) as u32;
            assert_eq!(iv(attempt, 2.0, RetryScale::Exponential, 0.0), Duration::from_secs(*want));
        }
    }

    #[test]
    fn retry_ladder_scenario() {
        // first_retry_cooldown_s=2, exponential, jitter=0 -> waits 2,4,8,16,32 for attempts 0..4
        let expect = [2u64, 4, 8, 16, 32];
        for (attempt, want) in expect.into_iter().enumerate() {
            let got = iv(attempt as u32, 2.0, RetryScale::Exponential, 0.0);
            assert_eq!(got, Duration::from_secs(want), "attempt {attempt}");
        }
    }

    #[test]
    fn jitter_can_double_or_halve() {
        // r=1.0 -> factor = 1 + jitter; r=0.0 -> factor = 1 - jitter
        let high = interval_with_rand(0, 10.0, RetryScale::Constant, 0.5, || 1.0);
        let low = interval_with_rand(0, 10.0, RetryScale::Constant, 0.5, || 0.0);
        assert_eq!(high, Duration::from_secs(15));
        assert_eq!(low, Duration::from_secs(5));
    }

    #[test]
    fn never_negative() {
        let got = interval_with_rand(0, 1.0, RetryScale::Constant, 1.0, || 0.0);
        assert_eq!(got, Duration::ZERO);
    }
}
