use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::DeviceId;

/// One physical DWP device, loaded from `ins_dwp_devices` and immutable for
/// the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub name: String,
    pub ip: String,
    /// Uppercased line name -> ordered list of machines on that line.
    pub lines: HashMap<String, Vec<MachineSpec>>,
}

/// One press machine, with its four Modbus input-register addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub name: String,
    pub addr_th_l: u16,
    pub addr_th_r: u16,
    pub addr_side_l: u16,
    pub addr_side_r: u16,
}

impl MachineSpec {
    /// The numeric machine id derived from this machine's decimal digits,
    /// e.g. "mc2" -> 2, "machine_5" -> 5, "mc" -> 0.
    pub fn machine_id(&self) -> u32 {
        let digits: String = self.name.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_id_extracts_digits() {
        let m = |name: &str| MachineSpec {
            name: name.to_string(),
            addr_th_l: 0,
            addr_th_r: 0,
            addr_side_l: 0,
            addr_side_r: 0,
        };

        assert_eq!(m("mc2").machine_id(), 2);
        assert_eq!(m("machine_5").machine_id(), 5);
        assert_eq!(m("mc").machine_id(), 0);
        assert_eq!(m("mc12").machine_id(), 12);
    }
}
