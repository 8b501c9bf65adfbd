mod act_fn;
mod leaky_relu;
mod sharp_tanh;
mod sigmoid;
mod swoop;
mod zed;

pub use act_fn::{ActFn, ActFnSpec};
pub use leaky_relu::LeakyRelu;
pub use sharp_tanh::SharpTanh;
pub use sigmoid::Sigmoid;
pub use swoop::Swoop;
pub use zed::Zed;
