use serde::{Deserialize, Serialize};

use super::{
    activations::{ActFn, ActFnSpec},
    combinators::{PipeConfig, SplitConfig},
    layers::{ActivationConfig, BiasConfig, DenseConfig, DropoutConfig, GuardConfig, Init, Learning},
    logical::logical,
    transform::{Factory, Transformation},
};
use crate::Result;

fn one() -> f64 {
    1.
}

/// The specification for a transform tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpec {
    Dense {
        output_size: usize,
        #[serde(flatten)]
        learning: Learning,
        #[serde(default)]
        init: Init,
    },
    Bias {
        #[serde(flatten)]
        learning: Learning,
        #[serde(default)]
        init: Init,
    },
    Guard {
        #[serde(default)]
        floor: f64,
        #[serde(default = "one")]
        ceil: f64,
    },
    Dropout {
        frequency: f64,
        #[serde(default = "one")]
        totality: f64,
    },
    Activation(ActFnSpec),
    Logical {
        output_size: usize,
        #[serde(flatten)]
        learning: Learning,
    },
    Pipe(Vec<TransformSpec>),
    Split(Vec<TransformSpec>),
}

impl TransformSpec {
    /// Parses a spec from JSON. Unknown transform kinds are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn factories(specs: &[TransformSpec]) -> Vec<Box<dyn Factory>> {
    specs
        .iter()
        .map(|spec| Box::new(spec.clone()) as Box<dyn Factory>)
        .collect()
}

impl Factory for TransformSpec {
    fn build(&self, size: usize, serialized: Option<&str>) -> Result<Transformation> {
        match self {
            TransformSpec::Dense {
                output_size,
                learning,
                init,
            } => DenseConfig {
                output_size: *output_size,
                learning: *learning,
                init: *init,
            }
            .build(size, serialized),
            TransformSpec::Bias { learning, init } => BiasConfig {
                learning: *learning,
                init: *init,
            }
            .build(size, serialized),
            TransformSpec::Guard { floor, ceil } => GuardConfig {
                floor: *floor,
                ceil: *ceil,
            }
            .build(size, serialized),
            TransformSpec::Dropout {
                frequency,
                totality,
            } => DropoutConfig {
                frequency: *frequency,
                totality: *totality,
            }
            .build(size, serialized),
            TransformSpec::Activation(act_fn) => {
                ActivationConfig(ActFn::from(*act_fn)).build(size, serialized)
            }
            TransformSpec::Logical {
                output_size,
                learning,
            } => logical(*output_size, *learning).build(size, serialized),
            TransformSpec::Pipe(specs) => PipeConfig {
                factories: factories(specs),
            }
            .build(size, serialized),
            TransformSpec::Split(specs) => SplitConfig {
                factories: factories(specs),
            }
            .build(size, serialized),
        }
    }
}

/// The specification for a `Network`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub input_size: usize,
    pub transform: TransformSpec,
}

impl NetworkSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
