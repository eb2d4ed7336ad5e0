//! Tunable thresholds for the analysis pipeline.
//!
//! Every field defaults to the constant the classifier was calibrated with.
//! A JSON file only needs to name the fields it overrides.
use serde::{Deserialize, Serialize};
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Upward zero crossings closer than this many samples form one group.
    pub crossing_group_gap: usize,
    /// Loops shorter than this are discarded after segmentation.
    pub min_loop_points: usize,
    /// Resistance window as a fraction of the sweep's peak |V|.
    pub resistance_window_fraction: f64,
    /// Median area / peak current above which a loop counts as hysteretic.
    pub hysteresis_threshold: f64,
    /// Half-width of the zero-voltage window as a fraction of the V range.
    pub pinch_window_fraction: f64,
    /// Near-zero current / p99 current below which the loop is pinched.
    pub pinch_ratio: f64,
    pub linear_r2: f64,
    /// |V| below which the low-bias ohmic check is evaluated.
    pub ohmic_voltage_window: f64,
    pub ohmic_r2: f64,
    /// Relative branch-conductance difference for polarity dependence.
    pub polarity_threshold: f64,
    pub switching_on_off: f64,
    pub phase_shift_deg: f64,
    pub ellipse_eccentricity: (f64, f64),
    /// Samples at or below this voltage are excluded from conduction fits.
    pub fit_min_voltage: f64,
    pub fit_min_points: usize,
    /// Hard cap on Levenberg-Marquardt iterations.
    pub fit_max_iterations: usize,
    /// Scores strictly below this classify as `uncertain`.
    pub uncertain_score: f64,
    /// Sweeps with fewer points get attenuated confidence.
    pub low_point_count: usize,
}
impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            crossing_group_gap: 10,
            min_loop_points: 10,
            resistance_window_fraction: 0.2,
            hysteresis_threshold: 1e-3,
            pinch_window_fraction: 0.02,
            pinch_ratio: 0.05,
            linear_r2: 0.95,
            ohmic_voltage_window: 0.1,
            ohmic_r2: 0.9,
            polarity_threshold: 0.2,
            switching_on_off: 2.0,
            phase_shift_deg: 45.0,
            ellipse_eccentricity: (0.3, 0.8),
            fit_min_voltage: 0.1,
            fit_min_points: 10,
            fit_max_iterations: 200,
            uncertain_score: 30.0,
            low_point_count: 50,
        }
    }
}
impl AnalyzerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
