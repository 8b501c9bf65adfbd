use ndarray::ArrayView1;

use crate::{
    Result,
    arch::{
        activations::ActFn,
        transform::{Factory, Mode, Simplified, Transformation, check_size, parse_state},
    },
    math::{self, Vector},
};

/// Applies an [`ActFn`] to every element.
#[derive(Debug, Clone, Copy)]
pub struct Activation {
    act_fn: ActFn,
    size: usize,
}

impl Activation {
    pub fn new(act_fn: ActFn, size: usize) -> Self {
        Self { act_fn, size }
    }
}

impl Simplified for Activation {
    fn size(&self) -> usize {
        self.size
    }

    fn pass_forward(&mut self, input: ArrayView1<f64>, _mode: Mode) -> Result<Vector> {
        check_size("activation input", input.len(), self.size)?;
        let act_fn = self.act_fn;
        Ok(math::map_row(input, |x, _| act_fn.f(x), None))
    }

    fn pass_back(
        &mut self,
        error: Vector,
        input: ArrayView1<f64>,
        output: ArrayView1<f64>,
    ) -> Result<Vector> {
        check_size("activation error", error.len(), self.size)?;
        check_size("activation input", input.len(), self.size)?;
        check_size("activation output", output.len(), self.size)?;
        let act_fn = self.act_fn;
        Ok(math::row_zip(
            input,
            output,
            |x, y, i| act_fn.df(x, y) * error[i],
            None,
        ))
    }
}

/// Builds [`Activation`] layers.
#[derive(Debug, Clone, Copy)]
pub struct ActivationConfig(pub ActFn);

impl Factory for ActivationConfig {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        parse_state::<()>(serialized)?;
        Ok(Transformation::Simplified(Box::new(Activation::new(self.0, size))))
    }
}

pub fn sigmoid() -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::sigmoid()))
}

pub fn leaky_relu(slope: f64) -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::leaky_relu(slope)))
}

pub fn sharp_tanh(slope: f64) -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::sharp_tanh(slope)))
}

pub fn swoop() -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::swoop()))
}

pub fn self_normalizing_zed() -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::zed()))
}

pub fn identity() -> Box<dyn Factory> {
    Box::new(ActivationConfig(ActFn::identity()))
}
