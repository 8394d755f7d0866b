//! Licensed transmitter occupancy patterns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Half-open integer range `[low, high)` of step counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
}

impl IntRange {
    pub fn new(low: i64, high: i64) -> Result<Self> {
        if low >= high {
            return Err(SimError::InvalidRange { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.low..self.high)
    }
}

/// How a primary user occupies its licensed band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimaryPattern {
    /// Never changes band after construction.
    Constant,
    /// Alternates between transmitting and silent for random durations.
    DutyCycle {
        licensed_band: usize,
        time_in: IntRange,
        time_out: IntRange,
        /// Steps left in the current state.
        timer: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryUser {
    pattern: PrimaryPattern,
}

impl PrimaryUser {
    pub fn constant() -> Self {
        Self {
            pattern: PrimaryPattern::Constant,
        }
    }

    /// A duty-cycled primary. It starts silent, with the first silent
    /// period drawn from `time_out`.
    pub fn duty_cycle<R: Rng + ?Sized>(
        licensed_band: usize,
        time_in: IntRange,
        time_out: IntRange,
        rng: &mut R,
    ) -> Self {
        let timer = time_out.sample(rng);
        Self {
            pattern: PrimaryPattern::DutyCycle {
                licensed_band,
                time_in,
                time_out,
                timer,
            },
        }
    }

    pub fn pattern(&self) -> &PrimaryPattern {
        &self.pattern
    }

    /// Advance the duty cycle by one step and return the band to occupy.
    ///
    /// Only called on pass 0, so the timer ticks exactly once per step.
    pub(crate) fn advance<R: Rng + ?Sized>(
        &mut self,
        band: Option<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        match &mut self.pattern {
            PrimaryPattern::Constant => band,
            PrimaryPattern::DutyCycle {
                licensed_band,
                time_in,
                time_out,
                timer,
            } => {
                *timer -= 1;
                if *timer > 0 {
                    return band;
                }
                match band {
                    None => {
                        *timer = time_in.sample(rng);
                        Some(*licensed_band)
                    }
                    Some(_) => {
                        *timer = time_out.sample(rng);
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_range_rejects_empty() {
        assert_eq!(
            IntRange::new(5, 5).unwrap_err(),
            SimError::InvalidRange { low: 5, high: 5 }
        );
    }

    #[test]
    fn test_constant_never_moves() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut pu = PrimaryUser::constant();
        for _ in 0..100 {
            assert_eq!(pu.advance(Some(2), &mut rng), Some(2));
            assert_eq!(pu.advance(None, &mut rng), None);
        }
    }

    #[test]
    fn test_duty_cycle_alternates_within_ranges() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let time_in = IntRange::new(3, 6).unwrap();
        let time_out = IntRange::new(2, 4).unwrap();
        let mut pu = PrimaryUser::duty_cycle(1, time_in, time_out, &mut rng);

        let mut band = None;
        let mut runs: Vec<(Option<usize>, i64)> = Vec::new();
        let mut run_len = 0;
        let mut run_band = band;
        for _ in 0..500 {
            band = pu.advance(band, &mut rng);
            if band == run_band {
                run_len += 1;
            } else {
                runs.push((run_band, run_len));
                run_band = band;
                run_len = 1;
            }
        }

        // Skip the first run: it started before the first draw was consumed.
        for &(state, len) in runs.iter().skip(1) {
            match state {
                Some(b) => {
                    assert_eq!(b, 1);
                    assert!((3..6).contains(&len), "on for {}", len);
                }
                None => assert!((2..4).contains(&len), "off for {}", len),
            }
        }
        assert!(runs.len() > 10);
    }
}
