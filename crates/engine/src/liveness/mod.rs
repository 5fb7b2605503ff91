//! Per-device online/offline/timeout tracking with change-log semantics.

use std::collections::HashMap;

use dwp_common::{DeviceId, LivenessState, LivenessStatus, StatusChangeEntry};

/// Owns the liveness view for every known device. Mutated only by the
/// Scheduler's poll task and heartbeat task; see module docs in
/// `scheduler` for how concurrent access is guarded.
#[derive(Default)]
pub struct LivenessTracker {
    states: HashMap<DeviceId, LivenessState>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, device_id: DeviceId) -> Option<LivenessStatus> {
        self.states.get(&device_id).map(|s| s.status)
    }

    /// Establishes the initial state at connect time. Always emits a
    /// status-change entry, since there is no prior state to compare
    /// against.
    pub fn initialize(&mut self, device_id: DeviceId, connected: bool, now: f64) -> StatusChangeEntry {
        let status = if connected {
            LivenessStatus::Online
        } else {
            LivenessStatus::Offline
        };
        let message = if connected {
            "Initial connection established".to_string()
        } else {
            "Initial connection failed".to_string()
        };

        let mut state = LivenessState::new(status, now);
        if connected {
            state.last_successful_read_time = Some(now);
        }
        self.states.insert(device_id, state);

        StatusChangeEntry {
            device_id,
            new_status: status,
            message,
            duration_in_previous_state_seconds: 0,
            wall_time: now,
        }
    }

    /// A successful Transport Adapter read. Transitions to `online` if
    /// the device wasn't already, and always refreshes
    /// `last_successful_read_time`.
    pub fn record_success(&mut self, device_id: DeviceId, now: f64) -> Option<StatusChangeEntry> {
        let state = self
            .states
            .entry(device_id)
            .or_insert_with(|| LivenessState::new(LivenessStatus::Online, now));
        state.last_successful_read_time = Some(now);

        if state.status != LivenessStatus::Online {
            Some(self.transition(device_id, LivenessStatus::Online, "Connection restored".to_string(), now))
        } else {
            None
        }
    }

    /// A failed Transport Adapter read, already classified timeout vs
    /// offline by the caller.
    pub fn record_failure(
        &mut self,
        device_id: DeviceId,
        new_status: LivenessStatus,
        detail: &str,
        now: f64,
    ) -> Option<StatusChangeEntry> {
        self.states
            .entry(device_id)
            .or_insert_with(|| LivenessState::new(new_status, now));

        let current = self.states.get(&device_id).map(|s| s.status);
        if current == Some(new_status) {
            return None;
        }
        Some(self.transition(device_id, new_status, format!("Read failed: {detail}"), now))
    }

    /// Heartbeat-driven offline transition. Only applies if the device
    /// is currently `online`.
    pub fn mark_offline_if_stale(
        &mut self,
        device_id: DeviceId,
        now: f64,
        offline_threshold_s: f64,
    ) -> Option<StatusChangeEntry> {
        let state = self.states.get(&device_id)?;
        if state.status != LivenessStatus::Online {
            return None;
        }
        let last_read = state.last_successful_read_time.unwrap_or(state.last_change_wall_time);
        if now - last_read < offline_threshold_s {
            return None;
        }
        let elapsed = now - last_read;
        Some(self.transition(
            device_id,
            LivenessStatus::Offline,
            format!("No successful read in {:.0}s", elapsed),
            now,
        ))
    }

    fn transition(
        &mut self,
        device_id: DeviceId,
        new_status: LivenessStatus,
        message: String,
        now: f64,
    ) -> StatusChangeEntry {
        let state = self
            .states
            .get_mut(&device_id)
            .expect("transition called for unknown device");
        let duration = (now - state.last_change_wall_time).floor().max(0.0) as i64;
        state.status = new_status;
        state.last_change_wall_time = now;

        StatusChangeEntry {
            device_id,
            new_status,
            message,
            duration_in_previous_state_seconds: duration,
            wall_time: now,
        }
    }
}
