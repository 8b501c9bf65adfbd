pub mod arch;
pub mod error;
pub mod math;
pub mod network;
pub mod training;

pub use error::{ErrKind, NetErr, Result};
pub use network::Network;
