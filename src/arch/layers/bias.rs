use ndarray::{Array1, ArrayView1};

use super::{Init, Learning};
use crate::{
    Result,
    arch::transform::{Factory, Mode, Simplified, Transformation, check_size, parse_state},
    math::{self, Vector},
};

/// Adds a trainable offset to every element: `output = input + weights`.
#[derive(Debug, Clone)]
pub struct Bias {
    weights: Vector,
    deltas: Vector,
    learning: Learning,
}

impl Bias {
    /// Creates a new `Bias`.
    ///
    /// # Arguments
    /// * `size` - The size of both the input and the output.
    /// * `learning` - The update hyperparameters.
    /// * `init` - How to seed the weights when there is no serialized state.
    /// * `serialized` - The weights as a flat JSON array.
    pub fn new(size: usize, learning: Learning, init: Init, serialized: Option<&str>) -> Result<Self> {
        learning.validate()?;

        let weights = match parse_state::<Vec<f64>>(serialized)? {
            Some(weights) => {
                check_size("bias weights", weights.len(), size)?;
                Array1::from_vec(weights)
            }
            None => {
                let mut rng = rand::rng();
                math::vector(size, |_| init.sample(size, &mut rng))
            }
        };

        Ok(Self {
            deltas: Array1::zeros(size),
            weights,
            learning,
        })
    }
}

impl Simplified for Bias {
    fn size(&self) -> usize {
        self.weights.len()
    }

    fn pass_forward(&mut self, input: ArrayView1<f64>, _mode: Mode) -> Result<Vector> {
        check_size("bias input", input.len(), self.weights.len())?;
        Ok(math::row_zip(input, self.weights.view(), |x, b, _| x + b, None))
    }

    fn pass_back(
        &mut self,
        error: Vector,
        _input: ArrayView1<f64>,
        _output: ArrayView1<f64>,
    ) -> Result<Vector> {
        check_size("bias error", error.len(), self.weights.len())?;

        self.deltas += &error;
        Ok(error)
    }

    fn apply_learning(&mut self) {
        self.weights.scaled_add(self.learning.step(), &self.deltas);
        let carry = self.learning.carry();
        self.deltas.mapv_inplace(|d| d * carry);
    }

    fn clean(&mut self) {
        self.deltas.fill(0.);
    }

    fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.weights.to_vec())?)
    }
}

/// Builds [`Bias`] layers.
#[derive(Debug, Clone, Copy)]
pub struct BiasConfig {
    pub learning: Learning,
    pub init: Init,
}

impl Factory for BiasConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        let bias = Bias::new(size, self.learning, self.init, serialized)?;
        Ok(Transformation::Simplified(Box::new(bias)))
    }
}

/// A bias layer with normally seeded weights.
pub fn bias(learning: Learning) -> Box<dyn Factory> {
    Box::new(BiasConfig {
        learning,
        init: Init::Normal,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{ErrKind, NetErr};

    #[test]
    fn forward_adds_and_backward_passes_through() {
        let mut bias = Bias::new(2, Learning::new(0.1), Init::Normal, Some("[1.0,-2.0]")).unwrap();
        let x = array![3., 3.];

        let y = bias.pass_forward(x.view(), Mode::Training).unwrap();
        assert_eq!(y, array![4., 1.]);

        let grad = bias.pass_back(array![0.5, -0.5], x.view(), y.view()).unwrap();
        assert_eq!(grad, array![0.5, -0.5]);
        assert_eq!(bias.deltas, array![0.5, -0.5]);
    }

    #[test]
    fn gradients_match_finite_differences() {
        const EPS: f64 = 1e-6;
        let mut bias = Bias::new(3, Learning::new(0.1), Init::Normal, None).unwrap();
        let x = array![0.1, -0.3, 0.8];
        let e = array![1.5, -0.5, 0.25];

        let y = bias.pass_forward(x.view(), Mode::Training).unwrap();
        let grad = bias.pass_back(e.clone(), x.view(), y.view()).unwrap();

        // L(b, x) = e · (x + b), so dL/dx = dL/db = e.
        let loss = |b: &Vector, x: &Vector| math::dot(e.view(), (x + b).view());

        for i in 0..x.len() {
            let (mut hi, mut lo) = (x.clone(), x.clone());
            hi[i] += EPS;
            lo[i] -= EPS;
            let numeric = (loss(&bias.weights, &hi) - loss(&bias.weights, &lo)) / (2. * EPS);
            assert!((numeric - grad[i]).abs() < 1e-4);

            let (mut hi, mut lo) = (bias.weights.clone(), bias.weights.clone());
            hi[i] += EPS;
            lo[i] -= EPS;
            let numeric = (loss(&hi, &x) - loss(&lo, &x)) / (2. * EPS);
            assert!((numeric - bias.deltas[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn learning_keeps_a_fraction_of_the_deltas() {
        let learning = Learning::new(1.).with_inertia(0.75);
        let mut bias = Bias::new(2, learning, Init::Constant(0.), None).unwrap();
        let x = array![0., 0.];
        let y = bias.pass_forward(x.view(), Mode::Training).unwrap();
        bias.pass_back(array![4., -8.], x.view(), y.view()).unwrap();

        bias.apply_learning();
        assert_eq!(bias.weights, array![1., -2.]);
        assert_eq!(bias.deltas, array![3., -6.]);

        bias.clean();
        assert_eq!(bias.deltas, array![0., 0.]);
    }

    #[test]
    fn serialized_length_is_checked() {
        let err = Bias::new(3, Learning::new(0.1), Init::Normal, Some("[1.0]")).unwrap_err();
        assert_eq!(err.kind(), ErrKind::Configuration);
        assert!(matches!(err, NetErr::SizeMismatch { got: 1, expected: 3, .. }));
    }
}
