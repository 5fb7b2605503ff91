use std::fmt;

use serde::{Deserialize, Serialize};

/// Typed wrapper for the `ins_dwp_devices.id` primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub i64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<DeviceId> for i64 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
