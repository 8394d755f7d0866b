//! Path-loss sensing model and the malicious report override.
//!
//! An honest reading of a primary user at distance `d` is
//!
//! ```text
//! reading = P_tx - 10 * alpha * log10(d) - power_loss - multipath
//! ```
//!
//! where `power_loss ~ N(0, sigma)` is drawn fresh per call. With no primary
//! user in the band the reading is the noise floor.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::agent::{Peer, PeerKind};
use crate::error::{Result, SimError};
use crate::geometry::Point2D;

#[cfg(feature = "cli")]
use clap::Args;

/// Reading reported when no primary user is heard, in dBm.
pub const NOISE_FLOOR_DBM: f64 = -111.0;

/// Nominal primary-user transmit power, in dBm.
pub const PU_TRANSMIT_POWER_DBM: f64 = 80.0;

/// Standard deviation of the shadowing power loss, in dB.
pub const POWER_LOSS_SIGMA_DB: f64 = 3.0;

/// Path-loss exponent. 1.0 lines up with published ReDiSen results better
/// than the free-space 2.0.
pub const PATH_LOSS_EXPONENT: f64 = 1.0;

/// Distances below this are clamped before taking `log10`, in metres.
pub const MIN_SENSING_DISTANCE: f64 = 1.0;

/// Radio environment constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Args))]
#[serde(default)]
pub struct SensingParams {
    /// Reading when no primary user is present (dBm)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = NOISE_FLOOR_DBM, allow_hyphen_values = true))]
    pub noise_floor: f64,

    /// Nominal primary transmit power used by adversarial reports (dBm)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = PU_TRANSMIT_POWER_DBM))]
    pub pu_transmit_power: f64,

    /// Standard deviation of the Gaussian power loss (dB)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = POWER_LOSS_SIGMA_DB))]
    pub power_loss_sigma: f64,

    /// Path-loss exponent (alpha)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = PATH_LOSS_EXPONENT))]
    pub path_loss_exponent: f64,

    /// Multipath fading term subtracted from every reading (dB)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 0.0))]
    pub multipath_fading: f64,

    /// Lower clamp on observer/primary distance (m)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = MIN_SENSING_DISTANCE))]
    pub min_distance: f64,
}

impl Default for SensingParams {
    fn default() -> Self {
        Self {
            noise_floor: NOISE_FLOOR_DBM,
            pu_transmit_power: PU_TRANSMIT_POWER_DBM,
            power_loss_sigma: POWER_LOSS_SIGMA_DB,
            path_loss_exponent: PATH_LOSS_EXPONENT,
            multipath_fading: 0.0,
            min_distance: MIN_SENSING_DISTANCE,
        }
    }
}

/// First primary user in a band view, in snapshot order.
///
/// Several primaries sharing a band are not averaged; only the first one
/// encountered is heard.
pub fn first_primary(band: Option<&[Peer]>) -> Option<&Peer> {
    band?.iter().find(|p| p.kind == PeerKind::Primary)
}

/// Anything that can turn a band view into a power reading.
pub trait Sense {
    fn sense<R: Rng + ?Sized>(
        &self,
        observer: Point2D,
        band: Option<&[Peer]>,
        rng: &mut R,
    ) -> f64;
}

/// Honest log-distance path-loss model.
#[derive(Debug, Clone, Copy)]
pub struct PathLossModel {
    params: SensingParams,
    power_loss: Normal<f64>,
}

impl PathLossModel {
    pub fn new(params: SensingParams) -> Result<Self> {
        for (name, value) in [
            ("noise_floor", params.noise_floor),
            ("pu_transmit_power", params.pu_transmit_power),
            ("path_loss_exponent", params.path_loss_exponent),
            ("multipath_fading", params.multipath_fading),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        // rand_distr only rejects a non-finite std_dev, not a negative one.
        if !(params.power_loss_sigma >= 0.0 && params.power_loss_sigma.is_finite()) {
            return Err(SimError::InvalidParameter {
                name: "power_loss_sigma",
                value: params.power_loss_sigma,
            });
        }
        if !(params.min_distance > 0.0 && params.min_distance.is_finite()) {
            return Err(SimError::InvalidParameter {
                name: "min_distance",
                value: params.min_distance,
            });
        }
        let power_loss = Normal::new(0.0, params.power_loss_sigma).map_err(|_| {
            SimError::InvalidParameter {
                name: "power_loss_sigma",
                value: params.power_loss_sigma,
            }
        })?;
        Ok(Self { params, power_loss })
    }

    pub fn params(&self) -> &SensingParams {
        &self.params
    }

    /// Received power from `primary` at `observer`, before random loss.
    pub fn expected_reading(&self, observer: Point2D, primary: &Peer) -> f64 {
        let distance = observer
            .distance_to(&primary.position)
            .max(self.params.min_distance);
        primary.transmit_power
            - 10.0 * self.params.path_loss_exponent * distance.log10()
            - self.params.multipath_fading
    }

    /// The lie a malicious agent tells: silence when a primary is present,
    /// full nominal power when it is not.
    pub fn adversarial_reading(&self, band: Option<&[Peer]>) -> f64 {
        if first_primary(band).is_some() {
            self.params.noise_floor
        } else {
            self.params.pu_transmit_power
        }
    }
}

impl Sense for PathLossModel {
    fn sense<R: Rng + ?Sized>(
        &self,
        observer: Point2D,
        band: Option<&[Peer]>,
        rng: &mut R,
    ) -> f64 {
        match first_primary(band) {
            Some(primary) => {
                let power_loss = self.power_loss.sample(rng);
                self.expected_reading(observer, primary) - power_loss
            }
            None => self.params.noise_floor,
        }
    }
}

/// Wraps an honest model and, per observation, replaces its reading with the
/// adversarial one with probability `attack_likelihood`.
#[derive(Debug, Clone, Copy)]
pub struct MaliciousSensor {
    honest: PathLossModel,
    attack_likelihood: f64,
}

impl MaliciousSensor {
    pub fn new(honest: PathLossModel, attack_likelihood: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&attack_likelihood) {
            return Err(SimError::InvalidProbability(attack_likelihood));
        }
        Ok(Self {
            honest,
            attack_likelihood,
        })
    }

    pub fn attack_likelihood(&self) -> f64 {
        self.attack_likelihood
    }
}

impl Sense for MaliciousSensor {
    fn sense<R: Rng + ?Sized>(
        &self,
        observer: Point2D,
        band: Option<&[Peer]>,
        rng: &mut R,
    ) -> f64 {
        // One uniform draw per observation, even when the outcome is certain.
        let draw: f64 = rng.gen();
        if draw < self.attack_likelihood {
            self.honest.adversarial_reading(band)
        } else {
            self.honest.sense(observer, band, rng)
        }
    }
}

/// Sensor carried by an agent: honest or probabilistically lying.
#[derive(Debug, Clone, Copy)]
pub enum Sensor {
    Honest(PathLossModel),
    Malicious(MaliciousSensor),
}

impl Sensor {
    pub fn honest(params: SensingParams) -> Result<Self> {
        Ok(Self::Honest(PathLossModel::new(params)?))
    }

    pub fn malicious(params: SensingParams, attack_likelihood: f64) -> Result<Self> {
        let honest = PathLossModel::new(params)?;
        Ok(Self::Malicious(MaliciousSensor::new(
            honest,
            attack_likelihood,
        )?))
    }

    pub fn is_honest(&self) -> bool {
        matches!(self, Sensor::Honest(_))
    }

    pub fn attack_likelihood(&self) -> f64 {
        match self {
            Sensor::Honest(_) => 0.0,
            Sensor::Malicious(m) => m.attack_likelihood(),
        }
    }
}

impl Sense for Sensor {
    fn sense<R: Rng + ?Sized>(
        &self,
        observer: Point2D,
        band: Option<&[Peer]>,
        rng: &mut R,
    ) -> f64 {
        match self {
            Sensor::Honest(model) => model.sense(observer, band, rng),
            Sensor::Malicious(model) => model.sense(observer, band, rng),
        }
    }
}
