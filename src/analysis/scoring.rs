//! Continuous memristivity score with shape and plausibility diagnostics.
//!
//! The scorer never changes the discrete classification. It grades how
//! convincingly a record shows the memristor fingerprint and collects
//! warnings about physically implausible values.
use serde::Serialize;
use crate::analysis::classifier::{ClassificationResult, DeviceType};
use crate::analysis::error::Diagnostic;
use crate::analysis::features::{self, ClassificationFeatures};
use crate::analysis::hysteresis::{self, LoopMetrics};
use crate::analysis::record::SweepRecord;
use crate::analysis::segment::{Loop, Segmentation};
use crate::analysis::stats;
use crate::config::AnalyzerConfig;

const MIN_PLAUSIBLE_RON: f64 = 1.0;
const MAX_PLAUSIBLE_ROFF: f64 = 1e12;
const MAX_PLAUSIBLE_ON_OFF: f64 = 1e6;
const MAX_PLAUSIBLE_VOLTAGE: f64 = 10.0;
const MAX_PLAUSIBLE_CURRENT: f64 = 0.1;
const MIN_MEASURABLE_CURRENT: f64 = 1e-12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MemristivityBreakdown {
    pub pinched_hysteresis: f64,
    pub hysteresis: f64,
    pub switching: f64,
    pub memory_window: f64,
    pub nonlinearity: f64,
    pub polarity: f64,
}
impl MemristivityBreakdown {
    pub fn total(&self) -> f64 {
        self.pinched_hysteresis
            + self.hysteresis
            + self.switching
            + self.memory_window
            + self.nonlinearity
            + self.polarity
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AdaptiveThresholds {
    /// Relative-area threshold scaled by `(V_range / 2)²`; the log scale of
    /// the hysteresis component starts here.
    pub hysteresis_area: f64,
    pub noise_floor: f64,
    /// Sample-count confidence in `[0, 1]`.
    pub confidence_factor: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MemoryWindowQuality {
    pub ron_stability: f64,
    pub roff_stability: f64,
    pub separation_ratio: f64,
    pub reproducibility: f64,
    pub switching_voltage_efficiency: f64,
    pub has_intermediate_states: bool,
    pub intermediate_state_fraction: f64,
    pub overall_quality: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HysteresisShapeFeatures {
    pub figure_eight_quality: f64,
    pub lobe_asymmetry: f64,
    pub smoothness: f64,
    pub kink_count: usize,
    pub width_at_25: f64,
    pub width_at_50: f64,
    pub width_at_75: f64,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnhancedClassification {
    pub device_type: DeviceType,
    pub confidence: f64,
    pub memristivity_score: f64,
    pub memristivity_breakdown: MemristivityBreakdown,
    pub memory_window_quality: MemoryWindowQuality,
    pub hysteresis_shape: HysteresisShapeFeatures,
    pub adaptive_thresholds: AdaptiveThresholds,
    pub warnings: Vec<String>,
}
/// Everything the scorer reads, borrowed from the analyzer's caches.
pub struct ScoringInput<'a> {
    pub record: &'a SweepRecord,
    pub segmentation: &'a Segmentation,
    pub metrics: &'a [LoopMetrics],
    pub features: &'a ClassificationFeatures,
    pub classification: &'a ClassificationResult,
    pub diagnostics: &'a [Diagnostic],
}
pub struct EnhancedScorer<'a> {
    config: &'a AnalyzerConfig,
}
impl<'a> EnhancedScorer<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }
    pub fn score(&self, input: &ScoringInput<'_>) -> EnhancedClassification {
        let thresholds = self.adaptive_thresholds(input.record);
        let breakdown = memristivity_breakdown(input.features, input.metrics, &thresholds);
        let memory_window_quality = memory_window_quality(input.record, input.metrics, self.config);
        let hysteresis_shape = input
            .segmentation
            .loops
            .first()
            .map(|first| hysteresis_shape(first, self.config))
            .unwrap_or_default();
        let warnings = self.warnings(input);
        let memristivity_score = breakdown.total();
        log::debug!("memristivity {memristivity_score:.1} from {breakdown:?}");
        EnhancedClassification {
            device_type: input.classification.device_type,
            confidence: input.classification.confidence * thresholds.confidence_factor,
            memristivity_score,
            memristivity_breakdown: breakdown,
            memory_window_quality,
            hysteresis_shape,
            adaptive_thresholds: thresholds,
            warnings,
        }
    }
    pub fn adaptive_thresholds(&self, record: &SweepRecord) -> AdaptiveThresholds {
        let (v_min, v_max) = stats::min_max(record.voltage());
        let half_range = (v_max - v_min) / 2.0;
        let magnitudes = stats::sorted(
            &record.current().iter().map(|i| i.abs()).collect::<Vec<_>>(),
        );
        let decile = (magnitudes.len() / 10).max(1).min(magnitudes.len());
        AdaptiveThresholds {
            hysteresis_area: self.config.hysteresis_threshold * half_range * half_range,
            noise_floor: stats::mean(&magnitudes[..decile]),
            confidence_factor: (record.len() as f64 / self.config.low_point_count as f64).min(1.0),
        }
    }
    fn warnings(&self, input: &ScoringInput<'_>) -> Vec<String> {
        let mut warnings = Vec::new();
        let record = input.record;
        let ron = input.metrics.iter().map(|m| m.ron).filter(|r| *r > 0.0).fold(f64::INFINITY, f64::min);
        let roff = input.metrics.iter().fold(0.0f64, |acc, m| acc.max(m.roff));
        let on_off = input.metrics.iter().fold(0.0f64, |acc, m| acc.max(m.on_off_ratio));
        if ron.is_finite() && ron < MIN_PLAUSIBLE_RON {
            warnings.push(format!("Ron of {ron:.3e} Ω is below 1 Ω, check for a short"));
        }
        if roff > MAX_PLAUSIBLE_ROFF {
            warnings.push(format!("Roff of {roff:.3e} Ω exceeds 1e12 Ω, check for an open circuit"));
        }
        if on_off > MAX_PLAUSIBLE_ON_OFF {
            warnings.push(format!("on/off ratio of {on_off:.3e} is implausibly large"));
        }
        let v_peak = stats::max_abs(record.voltage());
        if v_peak > MAX_PLAUSIBLE_VOLTAGE {
            warnings.push(format!("voltage reaches {v_peak:.2} V, beyond typical sweep range"));
        }
        let i_peak = stats::max_abs(record.current());
        if i_peak > MAX_PLAUSIBLE_CURRENT {
            warnings.push(format!("current reaches {i_peak:.3e} A, units may be wrong"));
        }
        if i_peak < MIN_MEASURABLE_CURRENT {
            warnings.push("current stays below 1 pA, signal is likely noise".to_string());
        }
        if let Some(limit) = input.features.compliance_current {
            warnings.push(format!("compliance plateau detected at {limit:.3e} A"));
        }
        if record.len() < self.config.low_point_count {
            warnings.push(format!(
                "only {} points, classification confidence is reduced",
                record.len()
            ));
        }
        if !input.segmentation.valid {
            warnings.push("loop boundaries estimated from turning points".to_string());
        }
        if let Some(requested) = record.degraded_from() {
            warnings.push(format!(
                "{} measurement without time data analyzed as iv_sweep",
                requested.as_str()
            ));
        }
        warnings.extend(input.diagnostics.iter().map(|d| d.to_string()));
        warnings
    }
}
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
pub fn memristivity_breakdown(
    features: &ClassificationFeatures,
    metrics: &[LoopMetrics],
    thresholds: &AdaptiveThresholds,
) -> MemristivityBreakdown {
    let mut breakdown = MemristivityBreakdown::default();
    if features.pinched_hysteresis && features.max_current > 0.0 {
        let offset = if features.pinch_offset <= thresholds.noise_floor {
            0.0
        } else {
            features.pinch_offset
        };
        breakdown.pinched_hysteresis = 30.0 * unit(1.0 - offset / features.max_current);
    }
    let relative = features.median_relative_area;
    let floor = thresholds.hysteresis_area;
    if relative > 0.0 && floor > 0.0 {
        // Three decades above the amplitude-scaled threshold earn full marks.
        let mut score = 20.0 * unit((relative / floor).log10() / 3.0);
        let areas: Vec<f64> = metrics.iter().map(|m| m.relative_area.abs()).collect();
        if areas.len() >= 2 {
            let consistency = 1.0 - stats::coefficient_of_variation(&areas).min(1.0);
            score *= 1.0 + 0.2 * consistency;
        }
        breakdown.hysteresis = score.min(20.0);
    }
    let ratios: Vec<f64> = metrics.iter().map(|m| m.on_off_ratio).filter(|r| *r > 0.0).collect();
    let mean_ratio = stats::mean(&ratios);
    if mean_ratio > 1.0 {
        breakdown.switching = 20.0 * unit(mean_ratio.log10() / 2.0);
    }
    let margins: Vec<f64> = metrics.iter().map(|m| m.window_margin).filter(|w| *w > 0.0).collect();
    let margin = stats::mean(&margins);
    if margin > 0.0 {
        breakdown.memory_window = 15.0 * unit((1.0 + margin).log10() / 2.0);
    }
    if features.nonlinear_iv {
        breakdown.nonlinearity = if features.elliptical_hysteresis { 5.0 } else { 10.0 };
    }
    if features.polarity_dependent {
        breakdown.polarity = 5.0;
    }
    breakdown
}
fn stability(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    100.0 * (1.0 - stats::coefficient_of_variation(values).min(1.0))
}
pub fn memory_window_quality(
    record: &SweepRecord,
    metrics: &[LoopMetrics],
    config: &AnalyzerConfig,
) -> MemoryWindowQuality {
    let ron: Vec<f64> = metrics.iter().map(|m| m.ron).filter(|r| *r > 0.0).collect();
    let roff: Vec<f64> = metrics.iter().map(|m| m.roff).filter(|r| *r > 0.0).collect();
    let ratios: Vec<f64> = metrics.iter().map(|m| m.on_off_ratio).filter(|r| *r > 0.0).collect();
    let (ron_mean, roff_mean) = (stats::mean(&ron), stats::mean(&roff));
    let separation_ratio = if ron_mean > 0.0 { roff_mean / ron_mean } else { 0.0 };
    let v_peak = stats::max_abs(record.voltage());
    let switching_voltage_efficiency = if v_peak > 0.0 && !metrics.is_empty() {
        let used: Vec<f64> = metrics
            .iter()
            .map(|m| m.von.abs().max(m.voff.abs()) / v_peak)
            .collect();
        100.0 * (1.0 - stats::mean(&used).min(1.0))
    } else {
        0.0
    };
    let intermediate_state_fraction = intermediate_fraction(
        record.voltage(),
        record.current(),
        config.resistance_window_fraction,
        ron_mean,
        roff_mean,
    );
    let separation_score = if separation_ratio > 1.0 {
        100.0 * unit(separation_ratio.log10() / 2.0)
    } else {
        0.0
    };
    let ron_stability = stability(&ron);
    let roff_stability = stability(&roff);
    let reproducibility = stability(&ratios);
    let overall_quality = ((ron_stability + roff_stability) / 2.0
        + reproducibility
        + separation_score
        + switching_voltage_efficiency)
        / 4.0;
    MemoryWindowQuality {
        ron_stability,
        roff_stability,
        separation_ratio,
        reproducibility,
        switching_voltage_efficiency,
        has_intermediate_states: separation_ratio > config.switching_on_off
            && intermediate_state_fraction > 0.1,
        intermediate_state_fraction,
        overall_quality,
    }
}
/// Share of read-window resistances lying well inside the `[ron, roff]`
/// log window.
fn intermediate_fraction(
    voltage: &[f64],
    current: &[f64],
    window_fraction: f64,
    ron: f64,
    roff: f64,
) -> f64 {
    if ron <= 0.0 || roff <= ron {
        return 0.0;
    }
    let limit = window_fraction * stats::max_abs(voltage);
    let (lo, hi) = (ron.log10(), roff.log10());
    let positions: Vec<f64> = voltage
        .iter()
        .zip(current)
        .filter(|(v, i)| v.abs() <= limit && **v != 0.0 && **i != 0.0)
        .map(|(v, i)| ((v / i).abs().log10() - lo) / (hi - lo))
        .filter(|p| p.is_finite())
        .collect();
    if positions.is_empty() {
        return 0.0;
    }
    let inside = positions.iter().filter(|p| **p > 0.1 && **p < 0.9).count();
    inside as f64 / positions.len() as f64
}
/// Voltage gap between the outbound and return halves of the positive lobe at
/// `level` of the lobe's peak current.
fn width_at(sweep: &Loop, level: f64) -> f64 {
    let lobe = hysteresis::positive_lobe(&sweep.voltage, &sweep.current);
    let peak = lobe
        .outbound
        .iter()
        .chain(&lobe.ret)
        .fold(0.0f64, |acc, p| acc.max(p.1.abs()));
    if !lobe.is_closed() || peak <= 0.0 {
        return 0.0;
    }
    let target = level * peak;
    let crossing = |section: &[(f64, f64)]| {
        section
            .iter()
            .min_by(|a, b| (a.1.abs() - target).abs().total_cmp(&(b.1.abs() - target).abs()))
            .map(|p| p.0)
    };
    match (crossing(&lobe.outbound), crossing(&lobe.ret)) {
        (Some(out), Some(back)) => (out - back).abs(),
        _ => 0.0,
    }
}
pub fn hysteresis_shape(sweep: &Loop, config: &AnalyzerConfig) -> HysteresisShapeFeatures {
    let (v, i) = (sweep.voltage.as_slice(), sweep.current.as_slice());
    let areas = hysteresis::area_under_curves(v, i);
    let (ps, ng) = (areas.ps_area.abs(), areas.ng_area.abs());
    let balance = if ps > 0.0 && ng > 0.0 { ps.min(ng) / ps.max(ng) } else { 0.0 };
    let crossing = features::pinch_measure(v, i, config.pinch_window_fraction)
        .map(|p| 1.0 - (p.offset / stats::max_abs(i)).min(1.0))
        .unwrap_or(0.0);
    let lobe_asymmetry = if ps + ng > 0.0 { (ps - ng) / (ps + ng) } else { 0.0 };

    // Curvature of the differential resistance along the trace.
    let dvdi: Vec<f64> = stats::gradient(v, i).into_iter().map(|(_, g)| g).collect();
    let curvature: Vec<f64> = dvdi.windows(2).map(|w| w[1] - w[0]).collect();
    let magnitudes: Vec<f64> = curvature.iter().map(|c| c.abs()).collect();
    let smoothness = if magnitudes.is_empty() {
        0.0
    } else {
        1.0 / (1.0 + stats::coefficient_of_variation(&magnitudes))
    };
    let (mu, sigma) = (stats::mean(&curvature), stats::std_dev(&curvature));
    let kink_count = if sigma > 0.0 {
        curvature.iter().filter(|c| (*c - mu).abs() > 3.0 * sigma).count()
    } else {
        0
    };
    HysteresisShapeFeatures {
        figure_eight_quality: unit(balance * crossing),
        lobe_asymmetry,
        smoothness,
        kink_count,
        width_at_25: width_at(sweep, 0.25),
        width_at_50: width_at(sweep, 0.5),
        width_at_75: width_at(sweep, 0.75),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::record::AnalysisLevel;
    fn metrics(relative_area: f64, on_off_ratio: f64, window_margin: f64) -> LoopMetrics {
        LoopMetrics {
            relative_area,
            on_off_ratio,
            window_margin,
            ron: 1e3,
            roff: 1e3 * on_off_ratio,
            ..Default::default()
        }
    }
    fn unit_sweep() -> AdaptiveThresholds {
        AdaptiveThresholds {
            hysteresis_area: 1e-3,
            noise_floor: 0.0,
            confidence_factor: 1.0,
        }
    }
    #[test]
    fn breakdown_saturates_at_one_hundred() {
        let features = ClassificationFeatures {
            pinched_hysteresis: true,
            nonlinear_iv: true,
            polarity_dependent: true,
            max_current: 1e-3,
            median_relative_area: 1.0,
            ..Default::default()
        };
        let loops = [metrics(1.0, 100.0, 99.0), metrics(1.0, 100.0, 99.0)];
        let breakdown = memristivity_breakdown(&features, &loops, &unit_sweep());
        assert_eq!(breakdown.pinched_hysteresis, 30.0);
        assert_eq!(breakdown.hysteresis, 20.0);
        assert!((breakdown.switching - 20.0).abs() < 1e-9);
        assert!((breakdown.memory_window - 15.0).abs() < 1e-9);
        assert!((breakdown.total() - 100.0).abs() < 1e-9);
    }
    #[test]
    fn elliptical_loops_halve_nonlinearity() {
        let features = ClassificationFeatures {
            nonlinear_iv: true,
            elliptical_hysteresis: true,
            ..Default::default()
        };
        let breakdown = memristivity_breakdown(&features, &[], &AdaptiveThresholds::default());
        assert_eq!(breakdown.nonlinearity, 5.0);
        assert_eq!(breakdown.total(), 5.0);
    }
    #[test]
    fn tiny_areas_earn_no_hysteresis_points() {
        let features = ClassificationFeatures {
            median_relative_area: 1e-4,
            ..Default::default()
        };
        let breakdown = memristivity_breakdown(&features, &[metrics(1e-4, 1.0, 0.0)], &unit_sweep());
        assert_eq!(breakdown.hysteresis, 0.0);
        assert_eq!(breakdown.switching, 0.0);
        assert_eq!(breakdown.memory_window, 0.0);
    }
    #[test]
    fn wider_sweeps_need_larger_loops() {
        let features = ClassificationFeatures {
            median_relative_area: 1e-2,
            ..Default::default()
        };
        let loops = [metrics(1e-2, 1.0, 0.0)];
        let narrow = memristivity_breakdown(&features, &loops, &unit_sweep());
        assert!((narrow.hysteresis - 20.0 / 3.0).abs() < 1e-9);
        let wide = AdaptiveThresholds {
            hysteresis_area: 1e-2,
            ..unit_sweep()
        };
        assert_eq!(memristivity_breakdown(&features, &loops, &wide).hysteresis, 0.0);
    }
    #[test]
    fn adaptive_thresholds_follow_amplitude_and_length() {
        let voltage: Vec<f64> = (0..=20).map(|k| (k as f64 - 10.0) / 5.0).collect();
        let current: Vec<f64> = voltage.iter().map(|v| v * 1e-3).collect();
        let record = SweepRecord::new(voltage, current, None, None, AnalysisLevel::Full).unwrap();
        let config = AnalyzerConfig::default();
        let thresholds = EnhancedScorer::new(&config).adaptive_thresholds(&record);
        assert!((thresholds.hysteresis_area - 4e-3).abs() < 1e-12);
        assert!((thresholds.confidence_factor - 21.0 / 50.0).abs() < 1e-12);
        assert!((thresholds.noise_floor - 1e-4).abs() < 1e-12);
    }
    #[test]
    fn stable_states_score_full_stability() {
        let record = SweepRecord::new(
            vec![0.0, 0.5, 1.0, 0.5, 0.0],
            vec![0.0, 1e-4, 2e-4, 1e-4, 0.0],
            None,
            None,
            AnalysisLevel::Full,
        )
        .unwrap();
        let loops = [metrics(0.1, 10.0, 9.0), metrics(0.1, 10.0, 9.0)];
        let quality = memory_window_quality(&record, &loops, &AnalyzerConfig::default());
        assert!((quality.ron_stability - 100.0).abs() < 1e-9);
        assert!((quality.reproducibility - 100.0).abs() < 1e-9);
        assert!((quality.separation_ratio - 10.0).abs() < 1e-9);
    }
    #[test]
    fn shape_of_a_straight_line_has_no_lobes() {
        let v: Vec<f64> = (0..=40).map(|k| (k as f64 - 20.0) / 20.0).collect();
        let i: Vec<f64> = v.iter().map(|x| x * 1e-3).collect();
        let sweep = Loop {
            index: 0,
            start: 0,
            voltage: v,
            current: i,
            time: None,
        };
        let shape = hysteresis_shape(&sweep, &AnalyzerConfig::default());
        assert_eq!(shape.figure_eight_quality, 0.0);
        assert_eq!(shape.lobe_asymmetry, 0.0);
        assert!(shape.smoothness > 0.0 && shape.smoothness <= 1.0);
    }
}
