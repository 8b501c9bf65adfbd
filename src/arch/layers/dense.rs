use ndarray::{Array2, ArrayView1};

use super::{Init, Learning};
use crate::{
    NetErr, Result,
    arch::transform::{Factory, Mode, Simplified, Transformation, check_size, parse_state},
    math::{self, Matrix, Vector},
};

/// A fully connected layer without bias: `output = weights · input`.
#[derive(Debug, Clone)]
pub struct Dense {
    weights: Matrix,
    deltas: Matrix,
    learning: Learning,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `input_size` - The size of the input.
    /// * `output_size` - The size of the output.
    /// * `learning` - The update hyperparameters.
    /// * `init` - How to seed the weights when there is no serialized state.
    /// * `serialized` - The weights as a JSON array of `output_size` rows of `input_size` columns.
    ///
    /// # Returns
    /// A new `Dense` instance, or an error if the hyperparameters or the serialized shape are invalid.
    pub fn new(
        input_size: usize,
        output_size: usize,
        learning: Learning,
        init: Init,
        serialized: Option<&str>,
    ) -> Result<Self> {
        learning.validate()?;

        let weights = match parse_state::<Vec<Vec<f64>>>(serialized)? {
            Some(rows) => from_rows(rows, output_size, input_size)?,
            None => {
                let mut rng = rand::rng();
                math::matrix(output_size, input_size, |_, _| {
                    init.sample(input_size, &mut rng)
                })
            }
        };

        Ok(Self {
            deltas: Array2::zeros(weights.dim()),
            weights,
            learning,
        })
    }
}

fn from_rows(rows: Vec<Vec<f64>>, output_size: usize, input_size: usize) -> Result<Matrix> {
    check_size("dense rows", rows.len(), output_size)?;

    let mut flat = Vec::with_capacity(output_size * input_size);
    for row in rows {
        check_size("dense columns", row.len(), input_size)?;
        flat.extend(row);
    }

    let got = flat.len();
    Array2::from_shape_vec((output_size, input_size), flat).map_err(|_| NetErr::SizeMismatch {
        what: "dense weights",
        got,
        expected: output_size * input_size,
    })
}

impl Simplified for Dense {
    fn size(&self) -> usize {
        self.weights.nrows()
    }

    fn pass_forward(&mut self, input: ArrayView1<f64>, _mode: Mode) -> Result<Vector> {
        check_size("dense input", input.len(), self.weights.ncols())?;
        Ok(math::mat_mul_vec(self.weights.view(), input, None))
    }

    fn pass_back(
        &mut self,
        error: Vector,
        input: ArrayView1<f64>,
        _output: ArrayView1<f64>,
    ) -> Result<Vector> {
        check_size("dense error", error.len(), self.weights.nrows())?;
        check_size("dense input", input.len(), self.weights.ncols())?;

        math::add_outer(1., error.view(), input, &mut self.deltas);
        Ok(math::vec_mul_mat(error.view(), self.weights.view(), None))
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
        let rows: Vec<Vec<f64>> = self.weights.outer_iter().map(|row| row.to_vec()).collect();
        Ok(serde_json::to_string(&rows)?)
    }
}

/// Builds [`Dense`] layers.
#[derive(Debug, Clone, Copy)]
pub struct DenseConfig {
    pub output_size: usize,
    pub learning: Learning,
    pub init: Init,
}

impl Factory for DenseConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        let dense = Dense::new(size, self.output_size, self.learning, self.init, serialized)?;
        Ok(Transformation::Simplified(Box::new(dense)))
    }
}

/// A dense layer with `output_size` outputs and normally seeded weights.
pub fn dense(output_size: usize, learning: Learning) -> Box<dyn Factory> {
    Box::new(DenseConfig {
        output_size,
        learning,
        init: Init::Normal,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::ErrKind;

    const EPS: f64 = 1e-6;

    fn layer(weights: &str, learning: Learning) -> Dense {
        let rows: Vec<Vec<f64>> = serde_json::from_str(weights).unwrap();
        let (out, inp) = (rows.len(), rows[0].len());
        Dense::new(inp, out, learning, Init::Normal, Some(weights)).unwrap()
    }

    #[test]
    fn forward_multiplies_by_the_weights() {
        let mut dense = layer("[[1.0,2.0],[0.0,-1.0],[3.0,1.0]]", Learning::new(0.1));
        let y = dense.pass_forward(array![1., 2.].view(), Mode::Training).unwrap();
        assert_eq!(y, array![5., -2., 5.]);
        assert_eq!(dense.size(), 3);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let weights = "[[0.3,-0.2,0.5],[0.1,0.4,-0.6]]";
        let mut dense = layer(weights, Learning::new(0.1));
        let x = array![0.2, -0.4, 0.7];
        let e = array![0.5, -1.5];

        // L(W, x) = e · (W x), so dL/dx = Wᵗ e and dL/dW = e ⊗ x.
        let y = dense.pass_forward(x.view(), Mode::Training).unwrap();
        let grad = dense.pass_back(e.clone(), x.view(), y.view()).unwrap();

        let loss = |w: &Matrix, x: &Vector| math::dot(e.view(), w.dot(x).view());

        for j in 0..x.len() {
            let (mut hi, mut lo) = (x.clone(), x.clone());
            hi[j] += EPS;
            lo[j] -= EPS;
            let numeric = (loss(&dense.weights, &hi) - loss(&dense.weights, &lo)) / (2. * EPS);
            assert!((numeric - grad[j]).abs() < 1e-4);
        }

        for ((i, j), &delta) in dense.deltas.indexed_iter() {
            let (mut hi, mut lo) = (dense.weights.clone(), dense.weights.clone());
            hi[(i, j)] += EPS;
            lo[(i, j)] -= EPS;
            let numeric = (loss(&hi, &x) - loss(&lo, &x)) / (2. * EPS);
            assert!((numeric - delta).abs() < 1e-4);
        }
    }

    #[test]
    fn a_replayed_input_of_another_size_is_rejected() {
        let mut dense = layer("[[1.0,1.0]]", Learning::new(0.1));
        let x = array![1., 2., 3.];
        let err = dense
            .pass_back(array![1.], x.view(), array![0.].view())
            .unwrap_err();
        assert!(matches!(err, NetErr::SizeMismatch { what: "dense input", .. }));
        assert_eq!(dense.deltas, array![[0., 0.]]);
    }

    #[test]
    fn deltas_accumulate_across_backward_calls() {
        let mut dense = layer("[[1.0,1.0]]", Learning::new(0.1));
        let x = array![1., 2.];
        let y = dense.pass_forward(x.view(), Mode::Training).unwrap();

        dense.pass_back(array![1.], x.view(), y.view()).unwrap();
        dense.pass_back(array![1.], x.view(), y.view()).unwrap();

        assert_eq!(dense.deltas, array![[2., 4.]]);
    }

    #[test]
    fn learning_decays_the_deltas() {
        let learning = Learning::new(0.5).with_inertia(0.5);
        let mut dense = layer("[[1.0,1.0]]", learning);
        let x = array![1., 2.];
        let y = dense.pass_forward(x.view(), Mode::Training).unwrap();
        dense.pass_back(array![2.], x.view(), y.view()).unwrap();

        let before = dense.deltas.clone();
        dense.apply_learning();

        // dilation = 2: weights += 0.5 * deltas / 2, deltas *= 1/2.
        assert_eq!(dense.weights, array![[1.5, 2.]]);
        assert_eq!(dense.deltas, before * 0.5);

        dense.clean();
        assert_eq!(dense.deltas, array![[0., 0.]]);
    }

    #[test]
    fn serialized_shape_is_checked() {
        let err = Dense::new(3, 1, Learning::new(0.1), Init::Normal, Some("[[1.0,2.0]]"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrKind::Configuration);

        let err = Dense::new(2, 2, Learning::new(0.1), Init::Normal, Some("[[1.0,2.0]]"))
            .unwrap_err();
        assert!(matches!(err, NetErr::SizeMismatch { what: "dense rows", .. }));
    }

    #[test]
    fn serialize_restores_the_same_weights() {
        let dense = Dense::new(3, 2, Learning::new(0.1), Init::Normal, None).unwrap();
        let state = dense.serialize().unwrap();
        let restored = Dense::new(3, 2, Learning::new(0.1), Init::Normal, Some(&state)).unwrap();
        assert_eq!(dense.weights, restored.weights);
    }

    #[test]
    fn wrong_input_size_is_rejected() {
        let mut dense = layer("[[1.0,1.0]]", Learning::new(0.1));
        let err = dense.pass_forward(array![1.].view(), Mode::Training).unwrap_err();
        assert!(matches!(err, NetErr::SizeMismatch { what: "dense input", .. }));
    }
}
