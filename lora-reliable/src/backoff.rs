//! Retry intervals.

use rand_core::RngCore;

/// Exponential backoff growing by 5/4 per failed attempt, plus random jitter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    /// Interval after the first failed attempt, in ms.
    pub base_ms: u32,
    /// Exclusive upper bound of the added jitter, in ms. Zero disables it.
    pub jitter_ms: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            jitter_ms: 500,
        }
    }
}

impl Backoff {
    /// Interval before jitter after failed attempt `attempt` (counted from 1).
    ///
    /// Truncates at every step, so the result is exactly what repeated
    /// integer multiplication by 5/4 yields.
    pub fn base_for_attempt(&self, attempt: u8) -> u32 {
        (1..attempt.max(1)).fold(self.base_ms, |ms, _| ms.saturating_mul(5) / 4)
    }

    /// Interval to wait after failed attempt `attempt`, jitter included.
    pub fn interval<R: RngCore>(&self, attempt: u8, rng: &mut R) -> u32 {
        let jitter = match self.jitter_ms {
            0 => 0,
            bound => rng.next_u32() % bound,
        };
        self.base_for_attempt(attempt).saturating_add(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_base_growth_truncates() {
        let backoff = Backoff {
            base_ms: 1_000,
            jitter_ms: 0,
        };
        let got: std::vec::Vec<u32> = (1..=6).map(|n| backoff.base_for_attempt(n)).collect();
        assert_eq!(got, [1_000, 1_250, 1_562, 1_952, 2_440, 3_050]);

        let odd = Backoff {
            base_ms: 7,
            jitter_ms: 0,
        };
        // 7 -> 8 -> 10 -> 12
        assert_eq!(odd.base_for_attempt(4), 12);
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = Backoff {
            base_ms: 200,
            jitter_ms: 50,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=8 {
            let base = backoff.base_for_attempt(attempt);
            for _ in 0..100 {
                let ms = backoff.interval(attempt, &mut rng);
                assert!((base..base + 50).contains(&ms), "{attempt}: {ms}");
            }
        }
    }

    #[test]
    fn test_no_jitter() {
        let backoff = Backoff {
            base_ms: 100,
            jitter_ms: 0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(backoff.interval(2, &mut rng), 125);
    }
}
