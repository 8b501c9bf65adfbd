use serde::{Deserialize, Serialize};

use super::{LeakyRelu, SharpTanh, Sigmoid, Swoop, Zed};

/// An element-wise, parameterless nonlinearity.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    LeakyRelu(LeakyRelu),
    SharpTanh(SharpTanh),
    Swoop(Swoop),
    Zed(Zed),
    Identity,
}

impl ActFn {
    pub fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid::new())
    }

    pub fn leaky_relu(slope: f64) -> Self {
        Self::LeakyRelu(LeakyRelu::new(slope))
    }

    pub fn sharp_tanh(slope: f64) -> Self {
        Self::SharpTanh(SharpTanh::new(slope))
    }

    pub fn swoop() -> Self {
        Self::Swoop(Swoop::new())
    }

    pub fn zed() -> Self {
        Self::Zed(Zed::new())
    }

    pub fn identity() -> Self {
        Self::Identity
    }

    /// Evaluates the function at `x`.
    pub fn f(&self, x: f64) -> f64 {
        match self {
            Self::Sigmoid(a) => a.f(x),
            Self::LeakyRelu(a) => a.f(x),
            Self::SharpTanh(a) => a.f(x),
            Self::Swoop(a) => a.f(x),
            Self::Zed(a) => a.f(x),
            Self::Identity => x,
        }
    }

    /// Evaluates the derivative at `x`, where `y = f(x)`.
    pub fn df(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Sigmoid(a) => a.df(x, y),
            Self::LeakyRelu(a) => a.df(x),
            Self::SharpTanh(a) => a.df(x),
            Self::Swoop(a) => a.df(x),
            Self::Zed(a) => a.df(x),
            Self::Identity => 1.,
        }
    }
}

/// The declarative form of an [`ActFn`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid,
    LeakyRelu {
        #[serde(default = "default_slope")]
        slope: f64,
    },
    SharpTanh {
        #[serde(default = "default_slope")]
        slope: f64,
    },
    Swoop,
    SelfNormalizingZed,
    Identity,
}

fn default_slope() -> f64 {
    0.05
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Sigmoid => ActFn::sigmoid(),
            ActFnSpec::LeakyRelu { slope } => ActFn::leaky_relu(slope),
            ActFnSpec::SharpTanh { slope } => ActFn::sharp_tanh(slope),
            ActFnSpec::Swoop => ActFn::swoop(),
            ActFnSpec::SelfNormalizingZed => ActFn::zed(),
            ActFnSpec::Identity => ActFn::identity(),
        }
    }
}
