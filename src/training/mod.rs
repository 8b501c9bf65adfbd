mod loss;
mod model;
mod throttle;

pub use loss::{LossFn, SquaredError};
pub use model::{BatchSource, Model, Sample, TrainOutcome};
