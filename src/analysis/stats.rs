//! Small numeric helpers shared by the analysis stages.
//!
//! All helpers are total: empty input yields 0 rather than NaN so callers can
//! feed them raw slices without pre-checking.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}
/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = mean(data);
    let variance = data
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / data.len() as f64;
    variance.sqrt()
}
/// `std / |mean|`, 0 when the mean vanishes.
pub fn coefficient_of_variation(data: &[f64]) -> f64 {
    let m = mean(data).abs();
    if m <= f64::EPSILON {
        return 0.0;
    }
    std_dev(data) / m
}
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut values = data.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}
pub fn median(data: &[f64]) -> f64 {
    percentile(data, 50.0)
}
/// Linear-interpolated percentile, `q` in `[0, 100]`.
pub fn percentile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let values = sorted(data);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    values[lo] + (values[hi] - values[lo]) * frac
}
pub fn max_abs(data: &[f64]) -> f64 {
    data.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}
pub fn min_max(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
/// Trapezoidal integral of `y` over `x`.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| 0.5 * (yy[0] + yy[1]) * (xx[1] - xx[0]))
        .sum()
}
/// Point-to-point derivative `dy/dx`, skipping steps with `dx == 0`.
/// Each entry carries the index of the step's first sample.
pub fn gradient(y: &[f64], x: &[f64]) -> Vec<(usize, f64)> {
    y.windows(2)
        .zip(x.windows(2))
        .enumerate()
        .filter_map(|(idx, (yy, xx))| {
            let dx = xx[1] - xx[0];
            if dx == 0.0 {
                return None;
            }
            let g = (yy[1] - yy[0]) / dx;
            g.is_finite().then_some((idx, g))
        })
        .collect()
}
/// Log10 with a floor so tiny or zero inputs map to a finite value.
pub fn log10_floor(value: f64, floor: f64) -> f64 {
    value.max(floor).log10()
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn percentile_interpolates_between_ranks() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&data, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&data, 99.0) - 3.97).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
    #[test]
    fn trapz_matches_triangle_area() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 2.0];
        assert!((trapz(&y, &x) - 2.0).abs() < 1e-12);
        let reversed: Vec<f64> = x.iter().rev().copied().collect();
        let y_rev: Vec<f64> = y.iter().rev().copied().collect();
        assert!((trapz(&y_rev, &reversed) + 2.0).abs() < 1e-12);
    }
    #[test]
    fn gradient_skips_flat_steps() {
        let x = [0.0, 0.0, 1.0];
        let y = [0.0, 5.0, 7.0];
        assert_eq!(gradient(&y, &x), vec![(1, 2.0)]);
    }
    #[test]
    fn std_dev_of_known_waveform() {
        let samples = [0.0, 2.0, -2.0, 0.0];
        assert!((std_dev(&samples) - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(coefficient_of_variation(&samples), 0.0);
    }
}
