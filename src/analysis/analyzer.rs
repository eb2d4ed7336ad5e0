use once_cell::unsync::OnceCell;
use crate::analysis::classifier::{ClassificationResult, Classifier};
use crate::analysis::conduction::{ConductionAnalysis, ConductionModelFitter};
use crate::analysis::error::{AnalysisError, Diagnostic, Diagnostics};
use crate::analysis::features::{ClassificationFeatures, FeatureExtractor};
use crate::analysis::hysteresis::{self, LoopMetrics};
use crate::analysis::record::{AnalysisLevel, MeasurementType, SweepRecord};
use crate::analysis::report::{
    AnalysisReport, ClassificationSection, DeviceSnapshot, DiagnosticsSection, Performance,
    SnapshotClassification, SnapshotHysteresis, SnapshotQuality, SnapshotResistance,
    SnapshotVoltage, Stats, Summary, Validation,
};
use crate::analysis::scoring::{EnhancedClassification, EnhancedScorer, ScoringInput};
use crate::analysis::segment::{LoopSegmenter, Segmentation};
use crate::analysis::stats;
use crate::config::AnalyzerConfig;
/// A stage result together with the failures recovered while computing it.
type Staged<T> = (T, Diagnostics);
/// Owns one sweep and lazily computes every derived stage at most once.
///
/// Caches are single-threaded cells: the analyzer can move between threads
/// but cannot be shared by reference across them.
pub struct SweepAnalyzer {
    record: SweepRecord,
    config: AnalyzerConfig,
    intake: Diagnostics,
    segmentation: OnceCell<Segmentation>,
    loop_metrics: OnceCell<Staged<Vec<LoopMetrics>>>,
    conduction: OnceCell<Staged<Option<ConductionAnalysis>>>,
    features: OnceCell<Staged<ClassificationFeatures>>,
    classification: OnceCell<ClassificationResult>,
    enhanced: OnceCell<EnhancedClassification>,
}
impl SweepAnalyzer {
    pub fn new(
        voltage: Vec<f64>,
        current: Vec<f64>,
        time: Option<Vec<f64>>,
        measurement_type: Option<&str>,
        level: &str,
    ) -> Result<Self, AnalysisError> {
        Self::with_config(
            voltage,
            current,
            time,
            measurement_type,
            level,
            AnalyzerConfig::default(),
        )
    }
    pub fn with_config(
        voltage: Vec<f64>,
        current: Vec<f64>,
        time: Option<Vec<f64>>,
        measurement_type: Option<&str>,
        level: &str,
        config: AnalyzerConfig,
    ) -> Result<Self, AnalysisError> {
        let mut intake = Diagnostics::new();
        let suggested = match measurement_type {
            Some(name) => {
                let parsed = MeasurementType::parse(name);
                if parsed.is_none() {
                    intake.push("measurement_type", format!("unknown type {name:?}, detecting"));
                }
                parsed
            }
            None => None,
        };
        let record = SweepRecord::new(voltage, current, time, suggested, AnalysisLevel::parse(level))?;
        Ok(Self::assemble(record, config, intake))
    }
    pub fn from_record(record: SweepRecord, config: AnalyzerConfig) -> Self {
        Self::assemble(record, config, Diagnostics::new())
    }
    fn assemble(record: SweepRecord, config: AnalyzerConfig, mut intake: Diagnostics) -> Self {
        if let Some(requested) = record.degraded_from() {
            intake.push(
                "measurement_type",
                format!("{} requires time data, analyzed as iv_sweep", requested.as_str()),
            );
        }
        log::info!(
            "analyzing {} points as {} at {:?} level",
            record.len(),
            record.measurement_type().as_str(),
            record.analysis_level()
        );
        Self {
            record,
            config,
            intake,
            segmentation: OnceCell::new(),
            loop_metrics: OnceCell::new(),
            conduction: OnceCell::new(),
            features: OnceCell::new(),
            classification: OnceCell::new(),
            enhanced: OnceCell::new(),
        }
    }
    pub fn record(&self) -> &SweepRecord {
        &self.record
    }
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
    pub fn segmentation(&self) -> &Segmentation {
        self.segmentation.get_or_init(|| {
            let segmentation = LoopSegmenter::from_config(&self.config).segment(&self.record);
            log::debug!(
                "segmented into {} loops (valid: {})",
                segmentation.num_loops,
                segmentation.valid
            );
            segmentation
        })
    }
    pub fn loop_metrics(&self) -> &[LoopMetrics] {
        let (metrics, _) = self.loop_metrics.get_or_init(|| {
            let mut diags = Diagnostics::new();
            let metrics = self
                .segmentation()
                .loops
                .iter()
                .map(|sweep| {
                    hysteresis::loop_metrics(sweep, self.config.resistance_window_fraction, &mut diags)
                })
                .collect();
            (metrics, diags)
        });
        metrics
    }
    pub fn conduction(&self) -> Option<&ConductionAnalysis> {
        let (analysis, _) = self.conduction.get_or_init(|| {
            let mut diags = Diagnostics::new();
            let analysis = ConductionModelFitter::from_config(&self.config).fit(
                self.record.voltage(),
                self.record.current(),
                &mut diags,
            );
            (analysis, diags)
        });
        analysis.as_ref()
    }
    pub fn features(&self) -> &ClassificationFeatures {
        let (features, _) = self.features.get_or_init(|| {
            let mut diags = Diagnostics::new();
            let features = FeatureExtractor::new(&self.config).extract(
                &self.record,
                self.segmentation(),
                self.loop_metrics(),
                &mut diags,
            );
            (features, diags)
        });
        features
    }
    pub fn classification(&self) -> &ClassificationResult {
        self.classification.get_or_init(|| {
            Classifier::new(&self.config).classify(self.features(), self.conduction())
        })
    }
    pub fn enhanced_classification(&self) -> &EnhancedClassification {
        self.enhanced.get_or_init(|| {
            // Run every upstream stage first so their recovered failures are
            // part of the warning list regardless of call order.
            let classification = self.classification();
            let diagnostics = self.diagnostics();
            let input = ScoringInput {
                record: &self.record,
                segmentation: self.segmentation(),
                metrics: self.loop_metrics(),
                features: self.features(),
                classification,
                diagnostics: &diagnostics,
            };
            EnhancedScorer::new(&self.config).score(&input)
        })
    }
    /// Every recovered failure so far, in pipeline order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut all = self.intake.clone();
        if let Some((_, d)) = self.loop_metrics.get() {
            all.extend(d);
        }
        if let Some((_, d)) = self.conduction.get() {
            all.extend(d);
        }
        if let Some((_, d)) = self.features.get() {
            all.extend(d);
        }
        all.into_vec()
    }
    /// Report at the level the analyzer was created with.
    pub fn results(&self) -> AnalysisReport {
        self.get_results(self.record.analysis_level())
    }
    pub fn get_results(&self, level: AnalysisLevel) -> AnalysisReport {
        let summary = self.summary();
        let mut report = AnalysisReport {
            analysis_level: level,
            summary,
            classification: None,
            validation: None,
            performance: None,
            diagnostics: None,
        };
        if level >= AnalysisLevel::Classification {
            report.classification = Some(ClassificationSection {
                result: self.classification().clone(),
                features: self.features().clone(),
                conduction: self.conduction().cloned(),
            });
            report.validation = Some(self.validation());
        }
        if level >= AnalysisLevel::Full {
            report.performance = Some(Performance::from_metrics(self.loop_metrics()));
        }
        if level >= AnalysisLevel::Research {
            let enhanced = self.enhanced_classification().clone();
            report.diagnostics = Some(DiagnosticsSection {
                recovered: self.diagnostics(),
                segmentation: self.segmentation().clone(),
                enhanced,
            });
        }
        report
    }
    fn summary(&self) -> Summary {
        let metrics = self.loop_metrics();
        Summary {
            measurement_type: self.record.measurement_type(),
            requested_measurement_type: self.record.degraded_from(),
            num_points: self.record.len(),
            num_loops: self.segmentation().num_loops,
            voltage_range: stats::min_max(self.record.voltage()),
            current_range: stats::min_max(self.record.current()),
            mean_normalized_area: Stats::over(metrics, |m| m.normalized_area).mean,
            mean_on_off_ratio: Stats::over(metrics, |m| m.on_off_ratio).mean,
        }
    }
    fn validation(&self) -> Validation {
        let segmentation = self.segmentation();
        // Force every stage so the failure count is complete.
        self.classification();
        Validation {
            segmentation_valid: segmentation.valid,
            estimated_loops: segmentation.estimated_loops,
            turning_point_loops: segmentation.turning_point_loops,
            whole_record_fallback: segmentation.whole_record,
            shortest_loop: segmentation.loops.iter().map(|l| l.len()).min().unwrap_or(0),
            sufficient_points: self.record.len() >= self.config.low_point_count,
            recovered_failures: self.diagnostics().len(),
        }
    }
    /// Condensed state of this sweep as one entry of a device history.
    pub fn device_snapshot(&self, cycle_number: u32, timestamp: impl Into<String>) -> DeviceSnapshot {
        let metrics = self.loop_metrics();
        let enhanced = self.enhanced_classification();
        let mean = |field: fn(&LoopMetrics) -> f64| Stats::over(metrics, field).mean;
        DeviceSnapshot {
            timestamp: timestamp.into(),
            cycle_number,
            classification: SnapshotClassification {
                device_type: enhanced.device_type,
                confidence: enhanced.confidence,
                memristivity_score: enhanced.memristivity_score,
            },
            resistance: SnapshotResistance {
                ron: mean(|m| m.ron),
                roff: mean(|m| m.roff),
                on_off_ratio: mean(|m| m.on_off_ratio),
            },
            voltage: SnapshotVoltage {
                von: mean(|m| m.von),
                voff: mean(|m| m.voff),
            },
            hysteresis: SnapshotHysteresis {
                normalized_area: mean(|m| m.normalized_area),
                pinched: self.features().pinched_hysteresis,
            },
            quality: SnapshotQuality {
                memory_window: enhanced.memory_window_quality.overall_quality,
                confidence_factor: enhanced.adaptive_thresholds.confidence_factor,
            },
            warnings: enhanced.warnings.clone(),
        }
    }
}
