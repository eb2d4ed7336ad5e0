use serde::Serialize;
use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{stage}: need at least {needed} points, got {actual}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        actual: usize,
    },
    #[error("{0}: input has zero variance")]
    ZeroVariance(&'static str),
    #[error("{0}: evaluation window is empty")]
    EmptyWindow(&'static str),
    #[error("{stage}: least-squares solve failed ({reason})")]
    SingularFit { stage: &'static str, reason: String },
    #[error("{0}: result is not finite")]
    NonFinite(&'static str),
}
impl AnalysisError {
    pub(crate) fn insufficient(stage: &'static str, needed: usize, actual: usize) -> Self {
        AnalysisError::InsufficientData {
            stage,
            needed,
            actual,
        }
    }
    pub(crate) fn singular(stage: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::SingularFit {
            stage,
            reason: reason.into(),
        }
    }
}
/// A soft failure that was replaced by its neutral default.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: String,
    pub message: String,
}
impl Diagnostic {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}
/// Per-call collector for recovered failures.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}
impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, stage: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(stage, message);
        log::debug!("recorded diagnostic {diagnostic}");
        self.entries.push(diagnostic);
    }
    /// Unwraps `result`, or records the error and falls back to `default`.
    pub fn recover<T>(&mut self, stage: &str, result: Result<T, AnalysisError>, default: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{stage} failed, using neutral default: {err}");
                self.entries.push(Diagnostic::new(stage, err.to_string()));
                default
            }
        }
    }
    pub fn extend(&mut self, other: &Diagnostics) {
        self.entries.extend(other.entries.iter().cloned());
    }
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn recover_records_failure_and_returns_default() {
        let mut diags = Diagnostics::new();
        let value = diags.recover("ellipse", Err(AnalysisError::ZeroVariance("ellipse")), 0.0);
        assert_eq!(value, 0.0);
        assert_eq!(diags.entries().len(), 1);
        assert_eq!(diags.entries()[0].stage, "ellipse");
        assert!(diags.entries()[0].message.contains("zero variance"));
    }
    #[test]
    fn recover_passes_successful_values_through() {
        let mut diags = Diagnostics::new();
        let value = diags.recover("fit", Ok(3.5), 0.0);
        assert_eq!(value, 3.5);
        assert!(diags.is_empty());
    }
}
