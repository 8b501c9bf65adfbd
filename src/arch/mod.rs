pub mod activations;
pub mod combinators;
pub mod layers;
mod logical;
mod regularize;
mod spec;
pub mod transform;

pub use combinators::{pipe, split};
pub use logical::logical;
pub use regularize::regularize;
pub use spec::{NetworkSpec, TransformSpec};
pub use transform::{
    Backward, Factory, Forward, History, Mode, Record, Simplified, Trace, Transformation, Uniform,
};
