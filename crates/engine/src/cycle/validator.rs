//! Physical-plausibility checks run against every finalized waveform
//! before it is handed to the grader.

/// Returns `Ok(())` if the waveform is physically plausible, otherwise
/// `Err(reason)` naming the rule that rejected it.
pub(super) fn validate(
    th: &[i64],
    side: &[i64],
    sample_count: usize,
    duration_ms: i64,
    timestamps_ms: &[i64],
) -> Result<(), String> {
    if th.is_empty() || side.is_empty() || th.len() != side.len() {
        return Err("empty or length-mismatched waveform".to_string());
    }

    let max_th = *th.iter().max().unwrap();
    let min_th = *th.iter().min().unwrap();
    let max_side = *side.iter().max().unwrap();
    let min_side = *side.iter().min().unwrap();

    // Dead side sensor: TH clearly pressurized but side reads near zero.
    if max_th >= 30 && max_side <= 3 {
        let nonzero_side = side.iter().filter(|&&v| v > 5).count();
        let ratio = nonzero_side as f64 / sample_count as f64;
        if ratio < 0.2 {
            return Err(format!(
                "Side sensor likely disconnected (only {:.1}% of samples exceed 5)",
                ratio * 100.0
            ));
        }
    }

    for i in 1..th.len() {
        let dth = (th[i] - th[i - 1]).abs();
        let dside = (side[i] - side[i - 1]).abs();
        if dth > 40 || dside > 40 {
            return Err(format!("impossible sample jump (dTH={dth}, dSide={dside})"));
        }
        if dth > 30 || dside > 30 {
            tracing::debug!(dth, dside, "elevated sample-to-sample jump");
        }
    }

    if max_th - min_th <= 1 && max_side - min_side <= 1 && sample_count > 3 {
        if max_th == 0 && max_side == 0 {
            return Err("zero flatline".to_string());
        }
        return Err("pressure flatline".to_string());
    }

    let mut diffs: Vec<i64> = timestamps_ms
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0)
        .collect();
    let median_ms = if diffs.is_empty() {
        100.0
    } else {
        diffs.sort_unstable();
        let mid = diffs.len() / 2;
        if diffs.len() % 2 == 0 {
            (diffs[mid - 1] + diffs[mid]) as f64 / 2.0
        } else {
            diffs[mid] as f64
        }
    };
    let expected = ((duration_ms as f64 / median_ms).round() as i64).max(1);
    if (sample_count as f64) < 0.15 * expected as f64 || sample_count < 1 || expected == 0 {
        return Err(format!(
            "insufficient sample density: got {sample_count}, expected ~{expected}"
        ));
    }

    if min_th < 0 || min_side < 0 {
        return Err("negative sample values".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dead_side_sensor() {
        let th = vec![35; 60];
        let side = vec![0; 60];
        let ts: Vec<i64> = (0..60).map(|i| i * 100).collect();
        let err = validate(&th, &side, 60, 5900, &ts).unwrap_err();
        assert!(err.contains("disconnected"));
    }

    #[test]
    fn rejects_impossible_jump() {
        let mut th = vec![35; 30];
        th.push(95);
        th.extend(vec![35; 30]);
        let side = vec![35; 61];
        let ts: Vec<i64> = (0..61).map(|i| i * 100).collect();
        assert!(validate(&th, &side, 61, 6000, &ts).is_err());
    }

    #[test]
    fn rejects_flatline() {
        let th = vec![0; 10];
        let side = vec![0; 10];
        let ts: Vec<i64> = (0..10).map(|i| i * 100).collect();
        let err = validate(&th, &side, 10, 900, &ts).unwrap_err();
        assert_eq!(err, "zero flatline");
    }

    #[test]
    fn accepts_plausible_waveform() {
        let th: Vec<i64> = (0..40).map(|i| 30 + (i % 5)).collect();
        let side: Vec<i64> = (0..40).map(|i| 32 + (i % 4)).collect();
        let ts: Vec<i64> = (0..40).map(|i| i * 100).collect();
        assert!(validate(&th, &side, 40, 3900, &ts).is_ok());
    }

    #[test]
    fn rejects_sparse_samples() {
        let th = vec![35, 36];
        let side = vec![35, 36];
        let ts = vec![0, 30_000];
        assert!(validate(&th, &side, 2, 30_000, &ts).is_err());
    }
}
