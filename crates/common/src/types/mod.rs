mod cycle;
mod device;
mod liveness;
mod sample;

pub use cycle::*;
pub use device::*;
pub use liveness::*;
pub use sample::*;
