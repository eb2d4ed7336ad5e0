use ndarray::Array2;
use serde::Serialize;
use crate::analysis::error::{AnalysisError, Diagnostics};
use crate::analysis::fit::{self, LinearFit};
use crate::analysis::hysteresis::LoopMetrics;
use crate::analysis::phase;
use crate::analysis::record::SweepRecord;
use crate::analysis::segment::Segmentation;
use crate::analysis::stats;
use crate::config::AnalyzerConfig;
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassificationFeatures {
    pub has_hysteresis: bool,
    pub pinched_hysteresis: bool,
    pub switching_behavior: bool,
    pub linear_iv: bool,
    pub nonlinear_iv: bool,
    pub ohmic_behavior: bool,
    pub polarity_dependent: bool,
    pub elliptical_hysteresis: bool,
    pub phase_shift_deg: f64,
    pub median_normalized_area: f64,
    /// Median of `normalized_area / peak|I|` across loops.
    pub median_relative_area: f64,
    /// Mean |I| inside the zero-voltage window.
    pub pinch_offset: f64,
    /// 1 when the pinch could not be measured.
    pub pinch_ratio: f64,
    pub max_current: f64,
    pub linear_r_squared: f64,
    pub eccentricity: f64,
    pub polarity_difference: f64,
    pub mean_on_off_ratio: f64,
    pub compliance_current: Option<f64>,
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchMeasure {
    pub offset: f64,
    pub reference: f64,
    pub ratio: f64,
}
/// Mean near-zero |I| relative to the 99th-percentile |I|.
pub fn pinch_measure(
    voltage: &[f64],
    current: &[f64],
    window_fraction: f64,
) -> Result<PinchMeasure, AnalysisError> {
    let (v_min, v_max) = stats::min_max(voltage);
    let half_width = window_fraction * (v_max - v_min);
    let near: Vec<f64> = voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| v.abs() <= half_width)
        .map(|(_, i)| i.abs())
        .collect();
    if near.is_empty() {
        return Err(AnalysisError::EmptyWindow("pinched_hysteresis"));
    }
    let magnitudes: Vec<f64> = current.iter().map(|i| i.abs()).collect();
    let reference = stats::percentile(&magnitudes, 99.0);
    if reference <= 0.0 {
        return Err(AnalysisError::ZeroVariance("pinched_hysteresis"));
    }
    let offset = stats::mean(&near);
    Ok(PinchMeasure {
        offset,
        reference,
        ratio: offset / reference,
    })
}
/// Peak current when a flat high-bias plateau (compliance limit) is present.
pub fn detect_compliance(voltage: &[f64], current: &[f64]) -> Option<f64> {
    let peak = stats::max_abs(current);
    if peak <= 0.0 {
        return None;
    }
    let v_peak = stats::max_abs(voltage);
    let plateau: Vec<f64> = voltage
        .iter()
        .zip(current)
        .filter(|(_, i)| i.abs() >= 0.99 * peak)
        .map(|(v, _)| v.abs())
        .collect();
    let enough = plateau.len() >= 3 && plateau.len() as f64 >= 0.05 * voltage.len() as f64;
    let high_bias = plateau.iter().all(|v| *v >= 0.5 * v_peak);
    (enough && high_bias).then_some(peak)
}
/// Linear regression over the series with any compliance plateau removed.
pub fn linearity(
    voltage: &[f64],
    current: &[f64],
    compliance: Option<f64>,
) -> Result<LinearFit, AnalysisError> {
    let (v, i): (Vec<f64>, Vec<f64>) = voltage
        .iter()
        .zip(current)
        .filter(|(_, i)| compliance.map_or(true, |c| i.abs() < 0.99 * c))
        .map(|(v, i)| (*v, *i))
        .unzip();
    fit::linear_fit(&v, &i)
}
/// Low-bias window is linear and passes through the origin.
pub fn low_bias_ohmic(
    voltage: &[f64],
    current: &[f64],
    window: f64,
    min_r2: f64,
) -> Result<bool, AnalysisError> {
    let (v, i): (Vec<f64>, Vec<f64>) = voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| v.abs() < window)
        .map(|(v, i)| (*v, *i))
        .unzip();
    let line = fit::linear_fit(&v, &i)?;
    let scale = stats::mean(&i.iter().map(|x| x.abs()).collect::<Vec<_>>());
    if scale <= 0.0 {
        return Ok(false);
    }
    Ok(line.r_squared > min_r2 && line.intercept.abs() <= 0.1 * scale)
}
/// Relative difference of mean conductance on the two polarities.
pub fn polarity_difference(voltage: &[f64], current: &[f64]) -> Result<f64, AnalysisError> {
    let floor = 0.1 * stats::max_abs(voltage);
    let conductance = |positive: bool| -> Vec<f64> {
        voltage
            .iter()
            .zip(current)
            .filter(|(v, _)| v.abs() >= floor && (**v > 0.0) == positive && **v != 0.0)
            .map(|(v, i)| i / v)
            .filter(|g| g.is_finite())
            .collect()
    };
    let (pos, neg) = (conductance(true), conductance(false));
    if pos.is_empty() || neg.is_empty() {
        return Err(AnalysisError::EmptyWindow("polarity_dependent"));
    }
    let (gp, gn) = (stats::mean(&pos), stats::mean(&neg));
    let reference = gp.abs().max(gn.abs());
    if reference <= 0.0 {
        return Err(AnalysisError::ZeroVariance("polarity_dependent"));
    }
    Ok((gp - gn).abs() / reference)
}
/// Eccentricity of the covariance ellipse of the std-normalized loop.
pub fn eccentricity(voltage: &[f64], current: &[f64]) -> Result<f64, AnalysisError> {
    let n = voltage.len().min(current.len());
    if n < 3 {
        return Err(AnalysisError::insufficient("elliptical_hysteresis", 3, n));
    }
    let (sv, si) = (stats::std_dev(&voltage[..n]), stats::std_dev(&current[..n]));
    if sv == 0.0 || si == 0.0 {
        return Err(AnalysisError::ZeroVariance("elliptical_hysteresis"));
    }
    let (mv, mi) = (stats::mean(&voltage[..n]), stats::mean(&current[..n]));
    let data = Array2::from_shape_fn((2, n), |(row, col)| {
        if row == 0 {
            (voltage[col] - mv) / sv
        } else {
            (current[col] - mi) / si
        }
    });
    let cov = data.dot(&data.t()) / n as f64;
    let trace = cov[[0, 0]] + cov[[1, 1]];
    let det = cov[[0, 0]] * cov[[1, 1]] - cov[[0, 1]] * cov[[1, 0]];
    let disc = (trace * trace / 4.0 - det).max(0.0).sqrt();
    let (major, minor) = (trace / 2.0 + disc, (trace / 2.0 - disc).max(0.0));
    if major <= 0.0 {
        return Err(AnalysisError::ZeroVariance("elliptical_hysteresis"));
    }
    let e = (1.0 - minor / major).max(0.0).sqrt();
    if e.is_finite() {
        Ok(e)
    } else {
        Err(AnalysisError::NonFinite("elliptical_hysteresis"))
    }
}
pub struct FeatureExtractor<'a> {
    config: &'a AnalyzerConfig,
}
impl<'a> FeatureExtractor<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }
    pub fn extract(
        &self,
        record: &SweepRecord,
        segmentation: &Segmentation,
        metrics: &[LoopMetrics],
        diags: &mut Diagnostics,
    ) -> ClassificationFeatures {
        let cfg = self.config;
        let (v, i) = (record.voltage(), record.current());
        let relative: Vec<f64> = metrics.iter().map(|m| m.relative_area.abs()).collect();
        let normalized: Vec<f64> = metrics.iter().map(|m| m.normalized_area.abs()).collect();
        let median_relative_area = stats::median(&relative);
        let on_off: Vec<f64> = metrics.iter().map(|m| m.on_off_ratio).collect();
        let pinch = diags.recover(
            "pinched_hysteresis",
            pinch_measure(v, i, cfg.pinch_window_fraction),
            PinchMeasure {
                offset: 0.0,
                reference: 0.0,
                ratio: 1.0,
            },
        );
        let compliance_current = detect_compliance(v, i);
        let line = diags.recover("linear_iv", linearity(v, i, compliance_current).map(Some), None);
        let ohmic_behavior = diags.recover(
            "ohmic_behavior",
            low_bias_ohmic(v, i, cfg.ohmic_voltage_window, cfg.ohmic_r2),
            false,
        );
        let polarity_difference =
            diags.recover("polarity_dependent", polarity_difference(v, i), 0.0);
        let phase_shift_deg = diags.recover("phase_shift", phase::phase_shift_deg(v, i), 0.0);
        let eccentricity = match segmentation.loops.first() {
            Some(first) => diags.recover(
                "elliptical_hysteresis",
                eccentricity(&first.voltage, &first.current),
                0.0,
            ),
            None => 0.0,
        };
        let (lo, hi) = cfg.ellipse_eccentricity;
        let features = ClassificationFeatures {
            has_hysteresis: median_relative_area > cfg.hysteresis_threshold,
            pinched_hysteresis: pinch.ratio < cfg.pinch_ratio,
            switching_behavior: on_off.iter().any(|r| *r > cfg.switching_on_off),
            linear_iv: line.map_or(false, |l| l.r_squared > cfg.linear_r2),
            nonlinear_iv: line.map_or(false, |l| l.r_squared <= cfg.linear_r2),
            ohmic_behavior,
            polarity_dependent: polarity_difference > cfg.polarity_threshold,
            elliptical_hysteresis: eccentricity > lo && eccentricity < hi,
            phase_shift_deg,
            median_normalized_area: stats::median(&normalized),
            median_relative_area,
            pinch_offset: pinch.offset,
            pinch_ratio: pinch.ratio,
            max_current: stats::max_abs(i),
            linear_r_squared: line.map_or(0.0, |l| l.r_squared),
            eccentricity,
            polarity_difference,
            mean_on_off_ratio: stats::mean(&on_off),
            compliance_current,
        };
        log::debug!("features: {features:?}");
        features
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::record::AnalysisLevel;
    use crate::analysis::segment::LoopSegmenter;
    #[test]
    fn line_through_origin_is_pinched_and_linear() {
        let v: Vec<f64> = (0..=100).map(|k| -1.0 + 0.02 * k as f64).collect();
        let i: Vec<f64> = v.iter().map(|x| x * 1e-3).collect();
        let pinch = pinch_measure(&v, &i, 0.02).unwrap();
        assert!(pinch.ratio < 0.05);
        assert!(linearity(&v, &i, None).unwrap().r_squared > 0.999);
        assert!(low_bias_ohmic(&v, &i, 0.1, 0.9).unwrap());
        assert!(polarity_difference(&v, &i).unwrap() < 1e-9);
    }
    #[test]
    fn offset_line_is_not_pinched() {
        let v: Vec<f64> = (0..=100).map(|k| -1.0 + 0.02 * k as f64).collect();
        let i: Vec<f64> = v.iter().map(|x| x * 1e-3 + 5e-4).collect();
        assert!(pinch_measure(&v, &i, 0.02).unwrap().ratio > 0.05);
        assert!(!low_bias_ohmic(&v, &i, 0.1, 0.9).unwrap());
    }
    #[test]
    fn compliance_plateau_is_detected_and_excluded() {
        let v: Vec<f64> = (0..=100).map(|k| 0.02 * k as f64).collect();
        let i: Vec<f64> = v.iter().map(|x| (x * x * 1e-3).min(1e-3)).collect();
        let compliance = detect_compliance(&v, &i);
        assert_eq!(compliance, Some(1e-3));
        let ramp: Vec<f64> = v.iter().map(|x| x * 1e-3).collect();
        assert_eq!(detect_compliance(&v, &ramp), None);
    }
    #[test]
    fn rectifying_branches_are_polarity_dependent() {
        let v: Vec<f64> = (0..=100).map(|k| -1.0 + 0.02 * k as f64).collect();
        let i: Vec<f64> = v
            .iter()
            .map(|x| if *x > 0.0 { x * 1e-3 } else { x * 1e-4 })
            .collect();
        assert!(polarity_difference(&v, &i).unwrap() > 0.2);
    }
    #[test]
    fn circle_and_line_eccentricities() {
        let n = 200;
        let theta: Vec<f64> = (0..n).map(|k| 2.0 * std::f64::consts::PI * k as f64 / n as f64).collect();
        let v: Vec<f64> = theta.iter().map(|t| t.cos()).collect();
        let i: Vec<f64> = theta.iter().map(|t| t.sin() * 1e-6).collect();
        assert!(eccentricity(&v, &i).unwrap() < 0.05);
        let line: Vec<f64> = v.iter().map(|x| x * 2e-3).collect();
        assert!(eccentricity(&v, &line).unwrap() > 0.99);
    }
    #[test]
    fn tilted_ellipse_sits_in_the_capacitive_band() {
        let n = 200;
        let theta: Vec<f64> = (0..n).map(|k| 2.0 * std::f64::consts::PI * k as f64 / n as f64).collect();
        let v: Vec<f64> = theta.iter().map(|t| t.sin()).collect();
        let i: Vec<f64> = theta.iter().map(|t| (t + 1.2).sin()).collect();
        let e = eccentricity(&v, &i).unwrap();
        assert!(e > 0.3 && e < 0.8, "e = {e}");
    }
    #[test]
    fn unmeasurable_pinch_reports_neutral_ratio() {
        let voltage: Vec<f64> = (0..=20).map(|k| (k as f64 - 10.0) / 10.0).collect();
        let record =
            SweepRecord::new(voltage, vec![0.0; 21], None, None, AnalysisLevel::Full).unwrap();
        let config = AnalyzerConfig::default();
        let segmentation = LoopSegmenter::from_config(&config).segment(&record);
        let mut diags = Diagnostics::new();
        let features = FeatureExtractor::new(&config).extract(&record, &segmentation, &[], &mut diags);
        assert_eq!(features.pinch_ratio, 1.0);
        assert!(!features.pinched_hysteresis);
        assert!(diags.entries().iter().any(|d| d.stage == "pinched_hysteresis"));
    }
}
