//! Assigns the final quality grade to a validated cycle candidate.

use dwp_common::{CycleType, EngineThresholds, QualityGrade};

/// Rules are evaluated in order; the first match wins.
pub(super) fn grade(
    max_th: i64,
    max_side: i64,
    cycle_type: CycleType,
    t: &EngineThresholds,
) -> QualityGrade {
    match cycle_type {
        CycleType::Overflow => return QualityGrade::Overflow,
        CycleType::Timeout => return QualityGrade::Timeout,
        _ => {}
    }

    let in_range = |v: i64, lo: i64, hi: i64| v >= lo && v <= hi;

    if in_range(max_th, t.good_min, t.good_max) && in_range(max_side, t.good_min, t.good_max) {
        return QualityGrade::Excellent;
    }
    if in_range(max_th, t.extended_min, t.extended_max) && in_range(max_side, t.extended_min, t.extended_max) {
        return QualityGrade::Good;
    }
    let one_good_one_marginal = (in_range(max_th, t.good_min, t.good_max)
        && in_range(max_side, t.marginal_min, t.marginal_max))
        || (in_range(max_side, t.good_min, t.good_max) && in_range(max_th, t.marginal_min, t.marginal_max));
    if one_good_one_marginal {
        return QualityGrade::Marginal;
    }
    if max_th < t.sensor_low && max_side < t.sensor_low {
        return QualityGrade::SensorLow;
    }
    if max_th > t.pressure_high || max_side > t.pressure_high {
        return QualityGrade::PressureHigh;
    }
    QualityGrade::Defective
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> EngineThresholds {
        EngineThresholds::default()
    }

    #[test]
    fn excellent_when_both_in_good_band() {
        assert_eq!(grade(38, 40, CycleType::Complete, &t()), QualityGrade::Excellent);
    }

    #[test]
    fn good_when_both_in_extended_band() {
        assert_eq!(grade(26, 54, CycleType::Complete, &t()), QualityGrade::Good);
    }

    #[test]
    fn marginal_when_one_good_one_wide() {
        assert_eq!(grade(32, 16, CycleType::Complete, &t()), QualityGrade::Marginal);
    }

    #[test]
    fn sensor_low_when_both_tiny() {
        assert_eq!(grade(2, 3, CycleType::Complete, &t()), QualityGrade::SensorLow);
    }

    #[test]
    fn pressure_high_when_either_too_high() {
        assert_eq!(grade(90, 10, CycleType::Complete, &t()), QualityGrade::PressureHigh);
    }

    #[test]
    fn overflow_and_timeout_echo_cycle_type() {
        assert_eq!(grade(38, 40, CycleType::Overflow, &t()), QualityGrade::Overflow);
        assert_eq!(grade(38, 40, CycleType::Timeout, &t()), QualityGrade::Timeout);
    }

    #[test]
    fn defective_otherwise() {
        assert_eq!(grade(60, 5, CycleType::Complete, &t()), QualityGrade::Defective);
    }
}
