//! Trailing moving average used to smooth noisy hashrate samples.

/// Default averaging window: 10 minutes.
pub const DEFAULT_SMOOTHING_WINDOW_SECS: u64 = 600;

/// Simple moving average evaluated at the last sample.
///
/// Averages every value whose timestamp lies within `window_secs` before the
/// final timestamp (inclusive). Only the value "as of now" is produced; chart
/// history uses the raw samples.
///
/// Gaps (`NaN` values) are skipped. Returns `0.0` for empty input. If no
/// sample qualifies the raw final value is returned, which is itself a gap
/// when every value in the window is one.
/// Series of unequal length are truncated to the shorter one.
pub fn trailing_moving_average(timestamps: &[f64], values: &[f64], window_secs: u64) -> f64 {
    let len = timestamps.len().min(values.len());
    if len == 0 {
        return 0.0;
    }

    let last = len - 1;
    let start = timestamps[last] - window_secs as f64;

    let (sum, count) = timestamps[..len]
        .iter()
        .zip(&values[..len])
        .filter(|&(&t, &v)| t >= start && v.is_finite())
        .fold((0.0, 0usize), |(sum, count), (_, &v)| (sum + v, count + 1));

    if count == 0 {
        values[last]
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_samples_inside_window() {
        let ts = [0.0, 600.0, 1200.0];
        let vals = [100.0, 200.0, 300.0];
        // samples at 600 and 1200 fall within 600s of the last one
        assert_eq!(trailing_moving_average(&ts, &vals, 600), 250.0);
    }

    #[test]
    fn test_empty_series_is_zero() {
        assert_eq!(trailing_moving_average(&[], &[], 600), 0.0);
    }

    #[test]
    fn test_single_sample_ignores_window() {
        for window in [0, 1, 600, 86_400] {
            assert_eq!(trailing_moving_average(&[42.0], &[7.5], window), 7.5);
        }
    }

    #[test]
    fn test_constant_series() {
        let ts: Vec<f64> = (0..500).map(|i| i as f64 * 5.0).collect();
        let vals = vec![1234.5; ts.len()];
        assert_eq!(trailing_moving_average(&ts, &vals, 600), 1234.5);
    }

    #[test]
    fn test_result_within_window_bounds() {
        let ts: Vec<f64> = (0..300).map(|i| i as f64 * 5.0).collect();
        let vals: Vec<f64> = (0..300)
            .map(|i| 1_000.0 + ((i * 7919) % 113) as f64 * 10.0)
            .collect();

        for window in [0u64, 5, 60, 600, 10_000] {
            let avg = trailing_moving_average(&ts, &vals, window);
            let start = ts[ts.len() - 1] - window as f64;
            let in_window: Vec<f64> = ts
                .iter()
                .zip(&vals)
                .filter(|&(&t, &v)| t >= start && v.is_finite())
                .map(|(_, &v)| v)
                .collect();
            let min = in_window.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = in_window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(avg >= min && avg <= max, "window {window}: {avg} not in [{min}, {max}]");
        }
    }

    #[test]
    fn test_zero_window_uses_last_timestamp_only() {
        let ts = [0.0, 5.0, 10.0, 10.0];
        let vals = [1.0, 2.0, 3.0, 5.0];
        assert_eq!(trailing_moving_average(&ts, &vals, 0), 4.0);
    }

    #[test]
    fn test_nan_timestamp_falls_back_to_raw_value() {
        let ts = [0.0, f64::NAN];
        let vals = [1.0, 9.0];
        assert_eq!(trailing_moving_average(&ts, &vals, 600), 9.0);
    }

    #[test]
    fn test_gaps_are_skipped() {
        let ts = [0.0, 600.0, 1200.0];
        let vals = [100.0, f64::NAN, 300.0];
        assert_eq!(trailing_moving_average(&ts, &vals, 600), 300.0);
        assert_eq!(trailing_moving_average(&ts, &vals, 1200), 200.0);
    }

    #[test]
    fn test_window_of_gaps_is_not_finite() {
        let ts = [0.0, 600.0, 1200.0];
        let vals = [100.0, f64::NAN, f64::NAN];
        assert!(!trailing_moving_average(&ts, &vals, 600).is_finite());
    }

    #[test]
    fn test_unequal_lengths_truncate() {
        let ts = [0.0, 10.0, 20.0];
        let vals = [4.0, 6.0];
        assert_eq!(trailing_moving_average(&ts, &vals, 600), 5.0);
    }
}
