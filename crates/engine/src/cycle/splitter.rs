//! Multi-peak splitting: detects event-brackets that contain more than
//! one physical press stroke and slices them into independent cycles.

use dwp_common::{ChannelKey, CycleRecord, CycleType, EngineThresholds};

/// Attempts to split a finalized (non-timeout) candidate into multiple
/// `SPLIT` cycles. Returns `None` if fewer than two peaks survive, or
/// if no sub-cycle group commits — in both cases the caller should
/// finalize the whole buffer under its original `cycle_type` instead.
pub(super) fn try_split(
    key: &ChannelKey,
    machine_id: u32,
    th_buf: &[i64],
    side_buf: &[i64],
    t_buf: &[f64],
    thresholds: &EngineThresholds,
) -> Option<Vec<CycleRecord>> {
    let combined: Vec<i64> = th_buf.iter().zip(side_buf).map(|(&a, &b)| a.max(b)).collect();

    let peaks = find_peaks(&combined, thresholds.start, thresholds.split_peak_distance);
    if peaks.len() <= 1 {
        return None;
    }

    let groups = group_peaks(&combined, &peaks, thresholds);
    if groups.len() < 2 {
        return None;
    }

    let mut out = Vec::new();
    for (start, end) in groups {
        let th_sub = th_buf[start..=end].to_vec();
        let side_sub = side_buf[start..=end].to_vec();
        let t_sub = t_buf[start..=end].to_vec();
        if let Some(record) = finalize_subcycle(key, machine_id, th_sub, side_sub, t_sub, thresholds) {
            out.push(record);
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Unlike `build_record`, an invalid sub-cycle is dropped entirely
/// rather than kept as a `DEFECTIVE` / `INVALID_WAVEFORM` record.
fn finalize_subcycle(
    key: &ChannelKey,
    machine_id: u32,
    th: Vec<i64>,
    side: Vec<i64>,
    t: Vec<f64>,
    thresholds: &EngineThresholds,
) -> Option<CycleRecord> {
    if th.len() < 4 {
        return None;
    }

    let timestamps_ms = super::compute_timestamps_ms(&t);
    let fallback_ms = (t.last().copied().unwrap_or(0.0) - t.first().copied().unwrap_or(0.0)) * 1000.0;
    let duration_s = super::duration_from_timestamps(&timestamps_ms, fallback_ms);
    if duration_s < thresholds.min_duration_s {
        return None;
    }

    let sample_count = th.len();
    let max_th = th.iter().copied().max().unwrap_or(0);
    let max_side = side.iter().copied().max().unwrap_or(0);
    let duration_ms = (duration_s * 1000.0).round() as i64;

    super::validator::validate(&th, &side, sample_count, duration_ms, &timestamps_ms).ok()?;

    let quality_grade = super::grader::grade(max_th, max_side, CycleType::Split, thresholds);
    let sensor_validity = super::sensor_validity(&th, &side, max_th, max_side, thresholds);

    Some(CycleRecord {
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
        cycle_type: CycleType::Split,
        quality_grade,
        sensor_validity,
    })
}

fn find_peaks(combined: &[i64], height: i64, distance: usize) -> Vec<usize> {
    let mut candidates: Vec<usize> = local_maxima(combined)
        .into_iter()
        .filter(|&i| combined[i] >= height)
        .collect();
    select_by_distance(&mut candidates, combined, distance);
    candidates
}

/// Plateau-aware local maxima: a flat-topped run counts as one peak at
/// its midpoint, the same way `scipy.signal.find_peaks` treats
/// plateaus, without pulling in a signal-processing dependency.
fn local_maxima(combined: &[i64]) -> Vec<usize> {
    let n = combined.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if combined[i - 1] < combined[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && combined[ahead] == combined[i] {
                ahead += 1;
            }
            if combined[ahead] < combined[i] {
                peaks.push(i + (ahead - 1 - i) / 2);
                i = ahead;
                continue;
            }
            i = ahead;
        } else {
            i += 1;
        }
    }
    peaks
}

/// Greedy highest-first suppression of peaks closer than `distance`,
/// mirroring `scipy`'s `_select_by_peak_distance`.
fn select_by_distance(peaks: &mut Vec<usize>, combined: &[i64], distance: usize) {
    if distance <= 1 || peaks.len() < 2 {
        return;
    }
    let n = peaks.len();
    let mut keep = vec![true; n];
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| combined[peaks[i]]);

    for &i in order.iter().rev() {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 {
            j -= 1;
            if keep[j] && peaks[i].abs_diff(peaks[j]) < distance {
                keep[j] = false;
            } else if keep[j] {
                break;
            }
        }
        let mut j = i;
        while j + 1 < n {
            j += 1;
            if keep[j] && peaks[j].abs_diff(peaks[i]) < distance {
                keep[j] = false;
            } else if keep[j] {
                break;
            }
        }
    }

    let mut kept: Vec<usize> = peaks
        .iter()
        .zip(keep.iter())
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect();
    kept.sort_unstable();
    *peaks = kept;
}

fn walk_outward(combined: &[i64], peak: usize, end: i64) -> (usize, usize) {
    let mut start = peak;
    while start > 0 && combined[start - 1] > end {
        start -= 1;
    }
    let mut stop = peak;
    while stop + 1 < combined.len() && combined[stop + 1] > end {
        stop += 1;
    }
    (start, stop)
}

fn has_min_zero_gap(combined: &[i64], lo: usize, hi: usize, min_gap: usize, end: i64) -> bool {
    if hi >= combined.len() {
        return false;
    }
    let mut run = 0usize;
    for &v in &combined[lo..=hi] {
        if v <= end {
            run += 1;
            if run >= min_gap {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Walks peaks in order, merging peaks too close to their predecessor
/// into the running group and committing a group boundary whenever a
/// sufficient low-pressure gap separates two peaks.
fn group_peaks(combined: &[i64], peaks: &[usize], thresholds: &EngineThresholds) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut prev_peak: Option<usize> = None;

    for &p in peaks {
        let (p_start, p_end) = walk_outward(combined, p, thresholds.end);

        match (prev_peak, current) {
            (Some(pp), Some((cs, ce))) => {
                let gap_ok = p > pp + 1
                    && has_min_zero_gap(combined, pp + 1, p - 1, thresholds.split_min_zero_gap, thresholds.end);
                if gap_ok {
                    groups.push((cs, ce));
                    current = Some((p_start, p_end));
                } else {
                    current = Some((cs.min(p_start), ce.max(p_end)));
                }
            }
            _ => current = Some((p_start, p_end)),
        }
        prev_peak = Some(p);
    }

    if let Some(c) = current {
        groups.push(c);
    }
    groups
}
