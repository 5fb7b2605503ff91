//! The per-channel cycle-extraction engine: state machine, splitter,
//! waveform validator and quality grader.

mod grader;
mod splitter;
mod state_machine;
mod validator;

pub use state_machine::CycleEngine;

use dwp_common::{ChannelKey, CycleRecord, CycleType, EngineThresholds, QualityGrade, SensorValidity};

pub(crate) fn compute_timestamps_ms(t_buf: &[f64]) -> Vec<i64> {
    t_buf.iter().map(|t| (t * 1000.0).round() as i64).collect()
}

pub(crate) fn duration_from_timestamps(timestamps_ms: &[i64], fallback_ms: f64) -> f64 {
    if timestamps_ms.len() > 1 {
        (timestamps_ms[timestamps_ms.len() - 1] - timestamps_ms[0]) as f64 / 1000.0
    } else {
        fallback_ms / 1000.0
    }
}

fn all_same(values: &[i64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => false,
    }
}

pub(crate) fn sensor_validity(
    th: &[i64],
    side: &[i64],
    max_th: i64,
    max_side: i64,
    thresholds: &EngineThresholds,
) -> SensorValidity {
    let mut th_ok = max_th >= thresholds.good_min && max_th <= thresholds.good_max;
    let mut side_ok = max_side >= thresholds.good_min && max_side <= thresholds.good_max;

    let side_gt5 = side.iter().filter(|&&v| v > 5).count();
    let th_gt5 = th.iter().filter(|&&v| v > 5).count();

    if max_th >= thresholds.good_min && max_side <= 3 && side_gt5 <= 1 {
        side_ok = false;
    }
    if max_side >= thresholds.good_min && max_th <= 3 && th_gt5 <= 1 {
        th_ok = false;
    }

    if th.len() > 2 && all_same(th) {
        th_ok = false;
    }
    if side.len() > 2 && all_same(side) {
        side_ok = false;
    }

    SensorValidity { th_ok, side_ok }
}

/// Validates, grades and assembles a finalized (non-split) candidate.
/// Invalid waveforms are *kept* as `DEFECTIVE` / `INVALID_WAVEFORM`
/// records, unlike split sub-cycles which are dropped (see `splitter`).
pub(crate) fn build_record(
    key: &ChannelKey,
    machine_id: u32,
    th: Vec<i64>,
    side: Vec<i64>,
    timestamps_ms: Vec<i64>,
    duration_s: f64,
    cycle_type: CycleType,
    thresholds: &EngineThresholds,
) -> CycleRecord {
    let sample_count = th.len();
    let max_th = th.iter().copied().max().unwrap_or(0);
    let max_side = side.iter().copied().max().unwrap_or(0);
    let duration_ms = (duration_s * 1000.0).round() as i64;

    let (cycle_type, quality_grade) =
        match validator::validate(&th, &side, sample_count, duration_ms, &timestamps_ms) {
            Ok(()) => (cycle_type, grader::grade(max_th, max_side, cycle_type, thresholds)),
            Err(reason) => {
                tracing::warn!(
                    line = %key.line,
                    machine = %key.machine_name,
                    position = %key.side,
                    reason = %reason,
                    "waveform failed sanity validation"
                );
                (CycleType::InvalidWaveform, QualityGrade::Defective)
            }
        };

    let sensor_validity = sensor_validity(&th, &side, max_th, max_side, thresholds);

    CycleRecord {
        line: key.line.clone(),
        machine_id,
        position: key.side,
        th_waveform: th,
        side_waveform: side,
        timestamps_ms,
        duration_s,
        max_th,
        max_side,
        sample_count,
        cycle_type,
        quality_grade,
        sensor_validity,
    }
}
