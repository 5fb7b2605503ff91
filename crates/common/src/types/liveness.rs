use crate::ids::DeviceId;

/// Liveness state of one physical device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivenessStatus {
    Online,
    Offline,
    Timeout,
}

impl LivenessStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LivenessStatus::Online => "online",
            LivenessStatus::Offline => "offline",
            LivenessStatus::Timeout => "timeout",
        }
    }
}

/// Tracker-owned liveness record for one device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LivenessState {
    pub status: LivenessStatus,
    pub last_change_wall_time: f64,
    pub last_successful_read_time: Option<f64>,
}

impl LivenessState {
    pub fn new(status: LivenessStatus, now: f64) -> Self {
        Self {
            status,
            last_change_wall_time: now,
            last_successful_read_time: None,
        }
    }
}

/// One status-change log entry, emitted on every liveness transition.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusChangeEntry {
    pub device_id: DeviceId,
    pub new_status: LivenessStatus,
    pub message: String,
    pub duration_in_previous_state_seconds: i64,
    pub wall_time: f64,
}
