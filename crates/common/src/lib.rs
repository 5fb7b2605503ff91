pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::EngineThresholds;
pub use error::{DwpError, Result, TransportErrorKind};
pub use ids::DeviceId;
pub use types::*;
