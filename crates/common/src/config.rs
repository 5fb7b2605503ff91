use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from `system.toml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub polling: PollingConfig,
    pub modbus: ModbusConfig,
    pub thresholds: EngineThresholds,
    pub safety: SafetyConfig,
    pub database: DatabaseConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            modbus: ModbusConfig::default(),
            thresholds: EngineThresholds::default(),
            safety: SafetyConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Poll cadence and liveness-check cadence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Nominal interval between poll ticks, in milliseconds.
    pub poll_interval_ms: u64,
    /// How often the heartbeat task checks for stalled devices, in seconds.
    pub heartbeat_check_interval_s: u64,
    /// How long a device can go without a successful read before it is
    /// marked offline by the heartbeat task, in seconds.
    pub offline_threshold_s: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            heartbeat_check_interval_s: 10,
            offline_threshold_s: 60,
        }
    }
}

/// Modbus/TCP transport parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModbusConfig {
    pub port: u16,
    pub unit_id: u8,
    pub timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            port: 503,
            unit_id: 1,
            timeout_ms: 1_000,
        }
    }
}

/// Numeric thresholds governing the Cycle Engine's state machine, splitter,
/// validator and grader. Injected into every engine at construction rather
/// than read from process-wide constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineThresholds {
    /// Sample value at or above which idle->active fires.
    pub start: i64,
    /// Sample value strictly above which a sample counts as "nonzero" for
    /// the purpose of resetting the end-of-cycle timer, and above which the
    /// splitter considers a combined sample "high".
    pub end: i64,
    pub min_cycle_duration_ms: i64,
    pub cycle_timeout_s: f64,
    pub max_buffer_length: usize,
    pub split_peak_distance: usize,
    pub split_min_zero_gap: usize,
    pub min_duration_s: f64,

    pub good_min: i64,
    pub good_max: i64,
    pub extended_min: i64,
    pub extended_max: i64,
    pub marginal_min: i64,
    pub marginal_max: i64,
    pub sensor_low: i64,
    pub pressure_high: i64,
}

impl Default for EngineThresholds {
    fn default() -> Self {
        Self {
            start: 1,
            end: 2,
            min_cycle_duration_ms: 200,
            cycle_timeout_s: 30.0,
            max_buffer_length: 500,
            split_peak_distance: 3,
            split_min_zero_gap: 3,
            min_duration_s: 5.0,
            good_min: 30,
            good_max: 45,
            extended_min: 25,
            extended_max: 55,
            marginal_min: 15,
            marginal_max: 70,
            sensor_low: 10,
            pressure_high: 80,
        }
    }
}

/// Startup-failure policy knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// If device-catalog loading yields zero devices, fall back to a
    /// built-in single-device configuration instead of exiting. Set to
    /// `false` to exit instead.
    pub allow_fallback_device_config: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            allow_fallback_device_config: true,
        }
    }
}

/// Postgres connection pool parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { max_connections: 10 }
    }
}
