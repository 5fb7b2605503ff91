use super::loader::{ConfigError, EngineConfig};

/// Validates the complete engine configuration. The engine refuses to
/// start on validation failure.
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_polling(config, &mut errors);
    validate_modbus(config, &mut errors);
    validate_thresholds(config, &mut errors);
    validate_database(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_polling(config: &EngineConfig, errors: &mut Vec<String>) {
    let p = &config.system.polling;

    if p.poll_interval_ms == 0 {
        errors.push("polling.poll_interval_ms must be > 0".into());
    }
    if p.heartbeat_check_interval_s == 0 {
        errors.push("polling.heartbeat_check_interval_s must be > 0".into());
    }
    if p.offline_threshold_s == 0 {
        errors.push("polling.offline_threshold_s must be > 0".into());
    }
}

fn validate_modbus(config: &EngineConfig, errors: &mut Vec<String>) {
    let m = &config.system.modbus;

    if m.timeout_ms == 0 {
        errors.push("modbus.timeout_ms must be > 0".into());
    }
}

fn validate_thresholds(config: &EngineConfig, errors: &mut Vec<String>) {
    let t = &config.system.thresholds;

    if t.end < t.start {
        errors.push("thresholds.end must be >= thresholds.start".into());
    }
    if t.max_buffer_length == 0 {
        errors.push("thresholds.max_buffer_length must be > 0".into());
    }
    if t.split_peak_distance == 0 {
        errors.push("thresholds.split_peak_distance must be > 0".into());
    }
    if t.cycle_timeout_s <= 0.0 {
        errors.push("thresholds.cycle_timeout_s must be > 0".into());
    }
    if t.min_duration_s < 0.0 {
        errors.push("thresholds.min_duration_s must be >= 0".into());
    }
    if t.good_min > t.good_max {
        errors.push("thresholds.good_min must be <= thresholds.good_max".into());
    }
    if t.extended_min > t.extended_max {
        errors.push("thresholds.extended_min must be <= thresholds.extended_max".into());
    }
    if t.marginal_min > t.marginal_max {
        errors.push("thresholds.marginal_min must be <= thresholds.marginal_max".into());
    }
}

fn validate_database(config: &EngineConfig, errors: &mut Vec<String>) {
    if config.system.database.max_connections == 0 {
        errors.push("database.max_connections must be > 0".into());
    }
    if config.database_url.is_empty() {
        errors.push("database connection parameters are incomplete".into());
    }
}
