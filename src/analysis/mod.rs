// src/analysis/mod.rs
pub mod analyzer;
pub mod classifier;
pub mod conduction;
pub mod error;
pub mod features;
pub mod fit;
pub mod hysteresis;
pub mod phase;
pub mod record;
pub mod report;
pub mod scoring;
pub mod segment;
pub mod stats;
// Re-exported so callers can stay at `ivsweep::analysis::*`.
pub use analyzer::SweepAnalyzer;
pub use classifier::{ClassificationResult, Classifier, DeviceType, ScoreBreakdown};
pub use conduction::{ConductionAnalysis, ConductionFit, ConductionMechanism, ConductionModelFitter};
pub use error::{AnalysisError, Diagnostic, Diagnostics};
pub use features::{ClassificationFeatures, FeatureExtractor};
pub use hysteresis::LoopMetrics;
pub use record::{AnalysisLevel, MeasurementType, SweepRecord};
pub use report::{AnalysisReport, DeviceSnapshot};
pub use scoring::{
    AdaptiveThresholds, EnhancedClassification, EnhancedScorer, HysteresisShapeFeatures,
    MemoryWindowQuality, MemristivityBreakdown,
};
pub use segment::{Loop, LoopSegmenter, Segmentation};
