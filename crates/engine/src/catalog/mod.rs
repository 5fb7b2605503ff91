//! Builds the immutable device map the Scheduler iterates every tick.

use dwp_common::{DeviceId, DeviceSpec, MachineSpec};

use crate::store::{StoreClient, StoreError};

/// Loads the active device catalog. If zero devices load and
/// `allow_fallback_device_config` is set, falls back to a single
/// built-in device so the process still comes up.
pub async fn load_catalog(
    store: &StoreClient,
    allow_fallback: bool,
) -> Result<Vec<DeviceSpec>, StoreError> {
    let devices = store.load_devices().await?;

    if !devices.is_empty() {
        return Ok(devices);
    }

    if allow_fallback {
        tracing::warn!("device catalog is empty, falling back to built-in single-device config");
        Ok(vec![fallback_device()])
    } else {
        tracing::error!("device catalog is empty and fallback is disabled");
        Ok(Vec::new())
    }
}

fn fallback_device() -> DeviceSpec {
    let mut lines = std::collections::HashMap::new();
    lines.insert(
        "A".to_string(),
        vec![MachineSpec {
            name: "mc1".to_string(),
            addr_th_l: 0,
            addr_th_r: 1,
            addr_side_l: 2,
            addr_side_r: 3,
        }],
    );

    DeviceSpec {
        id: DeviceId(0),
        name: "fallback".to_string(),
        ip: "127.0.0.1".to_string(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_device_has_one_machine_on_line_a() {
        let device = fallback_device();
        assert_eq!(device.lines.get("A").map(|m| m.len()), Some(1));
    }
}
