use ndarray::{ArrayView1, Zip};
use rand::Rng;

use crate::{
    NetErr, Result,
    arch::transform::{
        Backward, Factory, Forward, History, Mode, Record, Trace, Transformation, Uniform,
        check_size, parse_state,
    },
    math::Vector,
};

/// Randomly attenuates elements while training.
///
/// Each element is dropped with probability `frequency`. A dropped element is scaled by
/// `1 - totality` (so `totality = 1` zeroes it), and the kept ones are scaled by
/// `c = 1 / (1 - frequency * totality)` to preserve the expected magnitude. In inference mode
/// the input passes through unchanged.
///
/// The backward pass divides the error by `c` instead, and further scales the dropped
/// elements by `1 - totality`.
#[derive(Debug, Clone)]
pub struct Dropout {
    size: usize,
    frequency: f64,
    totality: f64,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Arguments
    /// * `size` - The size of both the input and the output.
    /// * `frequency` - The probability of dropping an element, in `[0, 1)`.
    /// * `totality` - How much of a dropped element is removed, in `[0, 1]`.
    pub fn new(size: usize, frequency: f64, totality: f64) -> Result<Self> {
        if !(0. ..1.).contains(&frequency) {
            return Err(NetErr::invalid_config(
                "dropout frequency",
                format!("{frequency} is outside [0, 1)"),
            ));
        }

        if !(0. ..=1.).contains(&totality) {
            return Err(NetErr::invalid_config(
                "dropout totality",
                format!("{totality} is outside [0, 1]"),
            ));
        }

        Ok(Self {
            size,
            frequency,
            totality,
        })
    }

    fn kept_scale(&self) -> f64 {
        1. / (1. - self.frequency * self.totality)
    }

    fn dropped_scale(&self) -> f64 {
        1. - self.totality
    }

    fn apply_mask(mut values: Vector, mask: &[bool], kept: f64, dropped: f64) -> Vector {
        Zip::from(&mut values).and(ArrayView1::from(mask)).for_each(|v, &keep| {
            *v *= if keep { kept } else { dropped };
        });

        values
    }
}

impl Uniform for Dropout {
    fn size(&self) -> usize {
        self.size
    }

    fn pass_forward(&mut self, input: Vector, history: History, mode: Mode) -> Result<Forward> {
        check_size("dropout input", input.len(), self.size)?;

        if mode == Mode::Inference {
            return Ok(Forward {
                output: input,
                trace: Trace::new(history, Record::Mask(None)),
            });
        }

        let mut rng = rand::rng();
        let mask: Vec<bool> = (0..self.size)
            .map(|_| rng.random::<f64>() >= self.frequency)
            .collect();

        let output = Self::apply_mask(input, &mask, self.kept_scale(), self.dropped_scale());
        Ok(Forward {
            output,
            trace: Trace::new(history, Record::Mask(Some(mask))),
        })
    }

    fn pass_back(&mut self, trace: Trace, error: Vector) -> Result<Backward> {
        check_size("dropout error", error.len(), self.size)?;

        let (history, record) = trace.into_parts();
        let mask = match record {
            Record::Mask(Some(mask)) => mask,
            Record::Mask(None) => {
                return Err(NetErr::InvalidState {
                    what: "dropout backward pass on an inference trace",
                });
            }
            _ => {
                return Err(NetErr::ProtocolViolation {
                    what: "trace was not produced by a dropout",
                });
            }
        };

        check_size("dropout mask", mask.len(), self.size)?;

        let unscale = 1. / self.kept_scale();
        let gradient = Self::apply_mask(error, &mask, unscale, unscale * self.dropped_scale());
        Ok(Backward { history, gradient })
    }

    fn apply_learning(&mut self) {}

    fn clean(&mut self) {}

    fn serialize(&self) -> Result<String> {
        Ok("null".to_string())
    }
}

/// Builds [`Dropout`] layers.
#[derive(Debug, Clone, Copy)]
pub struct DropoutConfig {
    pub frequency: f64,
    pub totality: f64,
}

impl Factory for DropoutConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        parse_state::<()>(serialized)?;
        let dropout = Dropout::new(size, self.frequency, self.totality)?;
        Ok(Transformation::Uniform(Box::new(dropout)))
    }
}

pub fn dropout(frequency: f64, totality: f64) -> Box<dyn Factory> {
    Box::new(DropoutConfig {
        frequency,
        totality,
    })
}
