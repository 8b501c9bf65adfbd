mod activation;
mod bias;
mod dense;
mod dropout;
mod guard;

pub use activation::{
    Activation, ActivationConfig, identity, leaky_relu, self_normalizing_zed, sharp_tanh, sigmoid,
    swoop,
};
pub use bias::{Bias, BiasConfig, bias};
pub use dense::{Dense, DenseConfig, dense};
pub use dropout::{Dropout, DropoutConfig, dropout};
pub use guard::{Guard, GuardConfig, guard};

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{NetErr, Result};

/// The hyperparameters of the momentum update shared by the parametric layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub learning_rate: f64,
    #[serde(default)]
    pub inertia: f64,
}

impl Learning {
    /// Creates a new `Learning` without inertia.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            inertia: 0.,
        }
    }

    /// Sets the fraction of the accumulated deltas carried over to the next batch.
    pub fn with_inertia(self, inertia: f64) -> Self {
        Self { inertia, ..self }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() {
            return Err(NetErr::invalid_config(
                "learning rate",
                format!("{} is not finite", self.learning_rate),
            ));
        }

        if !(0. ..1.).contains(&self.inertia) {
            return Err(NetErr::invalid_config(
                "inertia",
                format!("{} is outside [0, 1)", self.inertia),
            ));
        }

        Ok(())
    }

    /// `1 / (1 - inertia)`.
    pub(crate) fn dilation(&self) -> f64 {
        1. / (1. - self.inertia)
    }

    /// The factor applied to the deltas on each update.
    pub(crate) fn step(&self) -> f64 {
        self.learning_rate / self.dilation()
    }

    /// The fraction of the deltas that survives an update.
    pub(crate) fn carry(&self) -> f64 {
        let dilation = self.dilation();
        (dilation - 1.) / dilation
    }
}

/// How the weights of a fresh layer are seeded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Init {
    /// Standard normal samples scaled by `1 / sqrt(fan_in)`.
    #[default]
    Normal,
    Constant(f64),
}

impl Init {
    pub(crate) fn sample<R: Rng>(self, fan_in: usize, rng: &mut R) -> f64 {
        match self {
            Init::Normal => {
                let z: f64 = rng.sample(StandardNormal);
                z / (fan_in.max(1) as f64).sqrt()
            }
            Init::Constant(c) => c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrKind;

    #[test]
    fn inertia_must_be_below_one() {
        assert!(Learning::new(0.1).with_inertia(0.9).validate().is_ok());

        let err = Learning::new(0.1).with_inertia(1.).validate().unwrap_err();
        assert_eq!(err.kind(), ErrKind::Configuration);
        assert!(Learning::new(0.1).with_inertia(-0.1).validate().is_err());
        assert!(Learning::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn momentum_factors() {
        let learning = Learning::new(0.2).with_inertia(0.75);
        assert!((learning.dilation() - 4.).abs() < 1e-12);
        assert!((learning.step() - 0.05).abs() < 1e-12);
        assert!((learning.carry() - 0.75).abs() < 1e-12);

        let plain = Learning::new(0.2);
        assert_eq!(plain.carry(), 0.);
        assert_eq!(plain.step(), 0.2);
    }

    #[test]
    fn constant_init_ignores_the_rng() {
        let mut rng = rand::rng();
        assert_eq!(Init::Constant(0.5).sample(10, &mut rng), 0.5);
        assert!(Init::Normal.sample(10, &mut rng).is_finite());
    }
}
