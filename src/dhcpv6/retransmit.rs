use rand::{Rng, RngCore};

use crate::event::TimerHandle;
use crate::time::Duration;
use crate::wire::dhcpv6::{SOL_MAX_RT, SOL_TIMEOUT};

/// How late a retransmission may be sent.
pub const RESEND_ACCURACY: Duration = Duration::from_millis(10);
/// How late the retransmission deadline may be enforced.
pub const EXPIRE_ACCURACY: Duration = Duration::from_secs(1);

const SECOND: u64 = 1_000_000;

/// Retransmission parameters of a message exchange, RFC 3315 section 14.
///
/// A zero `max`, `max_count` or `max_duration` means the corresponding
/// limit does not apply.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryConfig {
    /// Initial retransmission time (IRT).
    pub initial: Duration,
    /// Maximum retransmission time (MRT).
    pub max: Duration,
    /// Maximum retransmission count (MRC).
    pub max_count: u8,
    /// Maximum retransmission duration (MRD).
    pub max_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial: SOL_TIMEOUT,
            max: SOL_MAX_RT,
            max_count: 0,
            max_duration: Duration::ZERO,
        }
    }
}

/// Apply a random factor in `[-0.1, 0.1)` to `value`.
///
/// Saturates at [Duration::MAX] instead of overflowing.
pub fn compute_random<R: RngCore + ?Sized>(value: Duration, rng: &mut R) -> Duration {
    let value = u128::from(value.total_micros());
    let random = u128::from(rng.gen_range(0..2 * SECOND));
    let micros = value - value / 10 + random * value / 10 / u128::from(SECOND);
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}

/// Retransmission progress of the current exchange.
#[derive(Debug, Default)]
pub(crate) struct Retransmit {
    /// Current retransmission timeout, zero before the first transmission.
    pub(crate) time: Duration,
    pub(crate) count: u8,
    pub(crate) resend: Option<TimerHandle>,
    pub(crate) resend_expire: Option<TimerHandle>,
}

impl Retransmit {
    /// Compute the next retransmission timeout and make it current.
    pub(crate) fn advance<R: RngCore + ?Sized>(
        &mut self,
        config: &RetryConfig,
        rng: &mut R,
    ) -> Duration {
        self.time = if self.time.is_zero() {
            compute_random(config.initial, rng)
        } else if !config.max.is_zero() && self.time > config.max / 2 {
            compute_random(config.max, rng)
        } else {
            self.time + compute_random(self.time, rng)
        };
        self.time
    }

    /// Forget all progress, handing back the timers that were armed.
    pub(crate) fn reset(&mut self) -> [Option<TimerHandle>; 2] {
        let timers = [self.resend.take(), self.resend_expire.take()];
        self.time = Duration::ZERO;
        self.count = 0;
        timers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::thread_rng;

    fn assert_jittered(value: Duration, result: Duration) {
        let v = value.total_micros();
        let r = result.total_micros();
        assert!(r >= v - v / 10, "{} below range of {}", result, value);
        assert!(r <= v - v / 10 + v / 5, "{} above range of {}", result, value);
    }

    #[test]
    fn test_compute_random_range() {
        let mut rng = thread_rng();
        for value in [
            Duration::from_millis(1),
            Duration::from_secs(1),
            Duration::from_secs(120),
            Duration::from_secs(3600),
        ] {
            for _ in 0..1000 {
                assert_jittered(value, compute_random(value, &mut rng));
            }
        }
    }

    #[test]
    fn test_compute_random_huge_values() {
        let mut rng = thread_rng();
        let value = Duration::from_secs(1_000_000_000);
        for _ in 0..1000 {
            assert_jittered(value, compute_random(value, &mut rng));
        }

        let max = compute_random(Duration::MAX, &mut rng);
        assert!(max >= Duration::MAX - Duration::MAX / 10);
    }

    #[test]
    fn test_advance_without_max_saturates() {
        let mut retransmit = Retransmit::default();
        let config = RetryConfig {
            max: Duration::ZERO,
            ..RetryConfig::default()
        };
        let mut rng = thread_rng();
        let mut prev = Duration::ZERO;
        for _ in 0..64 {
            let next = retransmit.advance(&config, &mut rng);
            assert!(next >= prev);
            prev = next;
        }
        assert_eq!(prev, Duration::MAX);
    }

    #[test]
    fn test_compute_random_zero() {
        assert_eq!(
            compute_random(Duration::ZERO, &mut thread_rng()),
            Duration::ZERO
        );
    }

    #[test]
    fn test_advance_starts_at_initial() {
        let mut retransmit = Retransmit::default();
        let config = RetryConfig::default();
        let time = retransmit.advance(&config, &mut thread_rng());
        assert_jittered(config.initial, time);
        assert_eq!(retransmit.time, time);
    }

    #[test]
    fn test_advance_doubles_then_clamps() {
        let mut retransmit = Retransmit::default();
        let config = RetryConfig::default();
        let mut rng = thread_rng();

        let mut prev = retransmit.advance(&config, &mut rng);
        for _ in 0..20 {
            let next = retransmit.advance(&config, &mut rng);
            if prev > config.max / 2 {
                assert_jittered(config.max, next);
            } else {
                // growth is prev plus a jittered copy of prev
                assert!(next >= prev + prev * 9 / 10);
            }
            prev = next;
        }
        assert_jittered(config.max, prev);
    }

    #[test]
    fn test_advance_without_max_keeps_growing() {
        let mut retransmit = Retransmit::default();
        let config = RetryConfig {
            max: Duration::ZERO,
            ..RetryConfig::default()
        };
        let mut rng = thread_rng();
        let mut prev = retransmit.advance(&config, &mut rng);
        for _ in 0..10 {
            let next = retransmit.advance(&config, &mut rng);
            assert!(next > prev);
            prev = next;
        }
        assert!(prev > Duration::from_secs(500));
    }

    #[test]
    fn test_reset() {
        let mut retransmit = Retransmit {
            time: Duration::from_secs(4),
            count: 3,
            resend: None,
            resend_expire: None,
        };
        assert_eq!(retransmit.reset(), [None, None]);
        assert_eq!(retransmit.time, Duration::ZERO);
        assert_eq!(retransmit.count, 0);
    }
}
