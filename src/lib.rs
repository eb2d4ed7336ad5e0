//! Voltage/current sweep analysis for two-terminal switching devices.
//!
//! [`analysis::SweepAnalyzer`] owns one sweep and derives loop metrics,
//! conduction fits, classification features, a four-class device type and a
//! continuous memristivity score from it. The core never touches the file
//! system; [`loader`] and the `ivsweep` binary sit on top of it.
pub mod analysis;
pub mod config;
pub mod history;
pub mod loader;
pub use analysis::{AnalysisError, AnalysisLevel, SweepAnalyzer};
pub use config::AnalyzerConfig;
