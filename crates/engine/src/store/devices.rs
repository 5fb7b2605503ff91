use std::collections::HashMap;

use dwp_common::{DeviceId, DeviceSpec, MachineSpec};
use serde::Deserialize;

use super::{StoreClient, StoreError};

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    name: String,
    ip_address: String,
    config: serde_json::Value,
}

#[derive(Deserialize)]
struct LineConfig {
    line: String,
    #[serde(alias = "list_mechine", alias = "machines", default)]
    machines: Vec<MachineConfig>,
}

#[derive(Deserialize)]
struct MachineConfig {
    name: String,
    addr_th_l: u16,
    addr_th_r: u16,
    addr_side_l: u16,
    addr_side_r: u16,
}

impl StoreClient {
    /// Loads every active device from `ins_dwp_devices`. A malformed
    /// `config` column on one row is logged and that device is
    /// skipped; it does not abort the whole load.
    pub async fn load_devices(&self) -> Result<Vec<DeviceSpec>, StoreError> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT id, name, ip_address, config
            FROM ins_dwp_devices
            WHERE is_active = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_device(&row) {
                Ok(device) => devices.push(device),
                Err(reason) => {
                    tracing::warn!(device_id = row.id, name = %row.name, reason = %reason, "skipping device with malformed config");
                }
            }
        }

        Ok(devices)
    }
}

fn parse_device(row: &DeviceRow) -> Result<DeviceSpec, String> {
    let lines_config: Vec<LineConfig> =
        serde_json::from_value(row.config.clone()).map_err(|e| e.to_string())?;

    let mut lines: HashMap<String, Vec<MachineSpec>> = HashMap::new();
    for line in lines_config {
        if line.machines.is_empty() {
            continue;
        }
        let machines = line
            .machines
            .into_iter()
            .map(|m| MachineSpec {
                name: m.name,
                addr_th_l: m.addr_th_l,
                addr_th_r: m.addr_th_r,
                addr_side_l: m.addr_side_l,
                addr_side_r: m.addr_side_r,
            })
            .collect();
        lines.insert(line.line.to_uppercase(), machines);
    }

    Ok(DeviceSpec {
        id: DeviceId(row.id),
        name: row.name.clone(),
        ip: row.ip_address.clone(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_config_with_machines_key() {
        let row = DeviceRow {
            id: 1,
            name: "press-a".to_string(),
            ip_address: "10.0.0.1".to_string(),
            config: serde_json::json!([
                {"line": "a", "machines": [
                    {"name": "mc1", "addr_th_l": 0, "addr_th_r": 1, "addr_side_l": 2, "addr_side_r": 3}
                ]}
            ]),
        };

        let device = parse_device(&row).expect("should parse");
        assert_eq!(device.lines.len(), 1);
        assert!(device.lines.contains_key("A"));
    }

    #[test]
    fn parses_legacy_list_mechine_key() {
        let row = DeviceRow {
            id: 2,
            name: "press-b".to_string(),
            ip_address: "10.0.0.2".to_string(),
            config: serde_json::json!([
                {"line": "b", "list_mechine": [
                    {"name": "mc2", "addr_th_l": 0, "addr_th_r": 1, "addr_side_l": 2, "addr_side_r": 3}
                ]}
            ]),
        };

        let device = parse_device(&row).expect("should parse");
        assert!(device.lines.contains_key("B"));
    }

    #[test]
    fn drops_lines_with_no_machines() {
        let row = DeviceRow {
            id: 3,
            name: "press-c".to_string(),
            ip_address: "10.0.0.3".to_string(),
            config: serde_json::json!([{"line": "c", "machines": []}]),
        };

        let device = parse_device(&row).expect("should parse");
        assert!(device.lines.is_empty());
    }

    #[test]
    fn rejects_malformed_config() {
        let row = DeviceRow {
            id: 4,
            name: "press-d".to_string(),
            ip_address: "10.0.0.4".to_string(),
            config: serde_json::json!({"not": "a list"}),
        };

        assert!(parse_device(&row).is_err());
    }
}
