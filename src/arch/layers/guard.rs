use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    NetErr, Result,
    arch::transform::{Factory, Mode, Simplified, Transformation, check_size, parse_state},
    math::{self, Vector},
};

/// Adaptive normalization: rescales each dimension from the observed `[min, max]` range into
/// `[floor, ceil]`.
///
/// Observations made while training are staged, and only become the range used by the forward
/// pass when `apply_learning` commits them. A dimension with no usable range (`min >= max`)
/// outputs a uniform sample from `[floor, ceil)`.
#[derive(Debug, Clone)]
pub struct Guard {
    floor: f64,
    ceil: f64,
    min: Vector,
    max: Vector,
    staged_min: Vector,
    staged_max: Vector,
}

/// The serialized form of the committed range. JSON has no infinities, they travel as `null`.
#[derive(Debug, Serialize, Deserialize)]
struct GuardState {
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
}

fn encode(bounds: &Vector) -> Vec<Option<f64>> {
    bounds
        .iter()
        .map(|&b| if b.is_finite() { Some(b) } else { None })
        .collect()
}

fn decode(bounds: Vec<Option<f64>>, missing: f64) -> Vector {
    bounds.into_iter().map(|b| b.unwrap_or(missing)).collect()
}

impl Guard {
    /// Creates a new `Guard`.
    ///
    /// # Arguments
    /// * `size` - The size of both the input and the output.
    /// * `floor` - The lower end of the output range.
    /// * `ceil` - The upper end of the output range.
    /// * `serialized` - The committed `{min, max}` range.
    ///
    /// # Returns
    /// A new `Guard`, or an error if `floor >= ceil` or the serialized range has the wrong size.
    pub fn new(size: usize, floor: f64, ceil: f64, serialized: Option<&str>) -> Result<Self> {
        if !(floor < ceil) {
            return Err(NetErr::invalid_config(
                "guard range",
                format!("floor {floor} must be below ceil {ceil}"),
            ));
        }

        let (min, max) = match parse_state::<GuardState>(serialized)? {
            Some(GuardState { min, max }) => {
                check_size("guard min", min.len(), size)?;
                check_size("guard max", max.len(), size)?;
                (decode(min, f64::INFINITY), decode(max, f64::NEG_INFINITY))
            }
            None => (
                Array1::from_elem(size, f64::INFINITY),
                Array1::from_elem(size, f64::NEG_INFINITY),
            ),
        };

        Ok(Self {
            floor,
            ceil,
            staged_min: min.clone(),
            staged_max: max.clone(),
            min,
            max,
        })
    }

    fn span(&self) -> f64 {
        self.ceil - self.floor
    }
}

impl Simplified for Guard {
    fn size(&self) -> usize {
        self.min.len()
    }

    fn pass_forward(&mut self, input: ArrayView1<f64>, mode: Mode) -> Result<Vector> {
        check_size("guard input", input.len(), self.min.len())?;

        if mode == Mode::Training {
            Zip::from(&mut self.staged_min)
                .and(&mut self.staged_max)
                .and(&input)
                .for_each(|lo, hi, &x| {
                    *lo = lo.min(x);
                    *hi = hi.max(x);
                });
        }

        let (floor, span) = (self.floor, self.span());
        let (min, max) = (&self.min, &self.max);
        let mut rng = rand::rng();

        let output = math::map_row(
            input,
            |x, i| {
                if min[i] >= max[i] {
                    rng.random::<f64>() * span + floor
                } else {
                    span * (x - min[i]) / (max[i] - min[i]) + floor
                }
            },
            None,
        );

        Ok(output)
    }

    fn pass_back(
        &mut self,
        error: Vector,
        input: ArrayView1<f64>,
        _output: ArrayView1<f64>,
    ) -> Result<Vector> {
        check_size("guard error", error.len(), self.min.len())?;
        check_size("guard input", input.len(), self.min.len())?;

        let span = self.span();
        let (min, max) = (&self.min, &self.max);

        let gradient = math::map_row(
            error.view(),
            |e, i| {
                let saturated_low = input[i] == min[i] && e < 0.;
                let saturated_high = input[i] == max[i] && e > 0.;

                if min[i] >= max[i] || saturated_low || saturated_high {
                    0.
                } else {
                    e * (max[i] - min[i]) / span
                }
            },
            None,
        );

        Ok(gradient)
    }

    fn apply_learning(&mut self) {
        self.min.assign(&self.staged_min);
        self.max.assign(&self.staged_max);
    }

    fn clean(&mut self) {
        self.staged_min.assign(&self.min);
        self.staged_max.assign(&self.max);
    }

    fn serialize(&self) -> Result<String> {
        let state = GuardState {
            min: encode(&self.min),
            max: encode(&self.max),
        };

        Ok(serde_json::to_string(&state)?)
    }
}

/// Builds [`Guard`] layers.
#[derive(Debug, Clone, Copy)]
pub struct GuardConfig {
    pub floor: f64,
    pub ceil: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            floor: 0.,
            ceil: 1.,
        }
    }
}

impl Factory for GuardConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        let guard = Guard::new(size, self.floor, self.ceil, serialized)?;
        Ok(Transformation::Simplified(Box::new(guard)))
    }
}

/// A guard that maps every input dimension into `[floor, ceil]`.
pub fn guard(floor: f64, ceil: f64) -> Box<dyn Factory> {
    Box::new(GuardConfig { floor, ceil })
}
