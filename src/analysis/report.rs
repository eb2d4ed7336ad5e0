//! Level-appropriate result documents.
use serde::{Deserialize, Serialize};
use crate::analysis::classifier::{ClassificationResult, DeviceType};
use crate::analysis::conduction::ConductionAnalysis;
use crate::analysis::error::Diagnostic;
use crate::analysis::features::ClassificationFeatures;
use crate::analysis::hysteresis::LoopMetrics;
use crate::analysis::record::{AnalysisLevel, MeasurementType};
use crate::analysis::scoring::EnhancedClassification;
use crate::analysis::segment::Segmentation;
use crate::analysis::stats;
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub analysis_level: AnalysisLevel,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsSection>,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub measurement_type: MeasurementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_measurement_type: Option<MeasurementType>,
    pub num_points: usize,
    pub num_loops: usize,
    pub voltage_range: (f64, f64),
    pub current_range: (f64, f64),
    pub mean_normalized_area: f64,
    pub mean_on_off_ratio: f64,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationSection {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub features: ClassificationFeatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conduction: Option<ConductionAnalysis>,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Validation {
    pub segmentation_valid: bool,
    pub estimated_loops: usize,
    pub turning_point_loops: usize,
    pub whole_record_fallback: bool,
    pub shortest_loop: usize,
    pub sufficient_points: bool,
    pub recovered_failures: usize,
}
/// Spread of one metric across loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
impl Stats {
    pub fn of(values: &[f64]) -> Self {
        let (min, max) = stats::min_max(values);
        Self {
            mean: stats::mean(values),
            std: stats::std_dev(values),
            min,
            max,
        }
    }
    pub fn over(metrics: &[LoopMetrics], field: impl Fn(&LoopMetrics) -> f64) -> Self {
        Self::of(&metrics.iter().map(field).collect::<Vec<_>>())
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Performance {
    pub ron: Stats,
    pub roff: Stats,
    pub on_off_ratio: Stats,
    pub von: Stats,
    pub voff: Stats,
    pub normalized_area: Stats,
    pub switching_ratio: Stats,
    pub power: Stats,
    pub energy_per_switch: Stats,
    pub loops: Vec<LoopMetrics>,
}
impl Performance {
    pub fn from_metrics(metrics: &[LoopMetrics]) -> Self {
        Self {
            ron: Stats::over(metrics, |m| m.ron),
            roff: Stats::over(metrics, |m| m.roff),
            on_off_ratio: Stats::over(metrics, |m| m.on_off_ratio),
            von: Stats::over(metrics, |m| m.von),
            voff: Stats::over(metrics, |m| m.voff),
            normalized_area: Stats::over(metrics, |m| m.normalized_area),
            switching_ratio: Stats::over(metrics, |m| m.switching_ratio),
            power: Stats::over(metrics, |m| m.power),
            energy_per_switch: Stats::over(metrics, |m| m.energy_per_switch),
            loops: metrics.to_vec(),
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticsSection {
    pub recovered: Vec<Diagnostic>,
    pub segmentation: Segmentation,
    pub enhanced: EnhancedClassification,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotClassification {
    pub device_type: DeviceType,
    pub confidence: f64,
    pub memristivity_score: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResistance {
    pub ron: f64,
    pub roff: f64,
    pub on_off_ratio: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVoltage {
    pub von: f64,
    pub voff: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHysteresis {
    pub normalized_area: f64,
    pub pinched: bool,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotQuality {
    pub memory_window: f64,
    pub confidence_factor: f64,
}
/// One cycle's condensed state, suitable for a device history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub timestamp: String,
    pub cycle_number: u32,
    pub classification: SnapshotClassification,
    pub resistance: SnapshotResistance,
    pub voltage: SnapshotVoltage,
    pub hysteresis: SnapshotHysteresis,
    pub quality: SnapshotQuality,
    pub warnings: Vec<String>,
}
