use serde::{Deserialize, Serialize};

use super::sample::Side;

/// How a cycle candidate reached finalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleType {
    Complete,
    Split,
    Timeout,
    Overflow,
    InvalidWaveform,
}

impl CycleType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CycleType::Complete => "COMPLETE",
            CycleType::Split => "SPLIT",
            CycleType::Timeout => "TIMEOUT",
            CycleType::Overflow => "OVERFLOW",
            CycleType::InvalidWaveform => "INVALID_WAVEFORM",
        }
    }
}

/// The final quality label assigned to a cycle record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    Excellent,
    Good,
    Marginal,
    Defective,
    SensorLow,
    PressureHigh,
    ShortCycle,
    Timeout,
    Overflow,
    InvalidWaveform,
    Split,
}

impl QualityGrade {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "EXCELLENT",
            QualityGrade::Good => "GOOD",
            QualityGrade::Marginal => "MARGINAL",
            QualityGrade::Defective => "DEFECTIVE",
            QualityGrade::SensorLow => "SENSOR_LOW",
            QualityGrade::PressureHigh => "PRESSURE_HIGH",
            QualityGrade::ShortCycle => "SHORT_CYCLE",
            QualityGrade::Timeout => "TIMEOUT",
            QualityGrade::Overflow => "OVERFLOW",
            QualityGrade::InvalidWaveform => "INVALID_WAVEFORM",
            QualityGrade::Split => "SPLIT",
        }
    }
}

/// Two 0/1 flags, `[[th_ok], [side_ok]]`, as stored in the `std_error` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SensorValidity {
    pub th_ok: bool,
    pub side_ok: bool,
}

impl SensorValidity {
    /// The `[[th_ok], [side_ok]]` shape the sink serializes into `std_error`.
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::json!([[self.th_ok as u8], [self.side_ok as u8]])
    }
}

/// One finalized, accepted press-stroke cycle, ready for the relational sink.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleRecord {
    pub line: String,
    pub machine_id: u32,
    pub position: Side,
    pub th_waveform: Vec<i64>,
    pub side_waveform: Vec<i64>,
    pub timestamps_ms: Vec<i64>,
    pub duration_s: f64,
    pub max_th: i64,
    pub max_side: i64,
    pub sample_count: usize,
    pub cycle_type: CycleType,
    pub quality_grade: QualityGrade,
    pub sensor_validity: SensorValidity,
}

impl CycleRecord {
    /// The compact `pv` JSON document the sink stores for this record.
    pub fn pv_json(&self) -> serde_json::Value {
        let mut pv = serde_json::json!({
            "waveforms": [self.th_waveform, self.side_waveform],
            "quality": {
                "grade": self.quality_grade.as_db_str(),
                "peaks": { "th": self.max_th, "side": self.max_side },
                "cycle_type": self.cycle_type.as_db_str(),
                "sample_count": self.sample_count,
            },
        });

        if !self.timestamps_ms.is_empty() {
            pv["timestamps"] = serde_json::json!(self.timestamps_ms);
        }

        pv
    }
}
