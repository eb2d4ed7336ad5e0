use ndarray::{ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use crate::analysis::error::AnalysisError;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    IvSweep,
    Pulse,
    Endurance,
    Retention,
}
impl MeasurementType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "iv_sweep" | "iv" | "sweep" => Some(Self::IvSweep),
            "pulse" => Some(Self::Pulse),
            "endurance" => Some(Self::Endurance),
            "retention" => Some(Self::Retention),
            _ => None,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IvSweep => "iv_sweep",
            Self::Pulse => "pulse",
            Self::Endurance => "endurance",
            Self::Retention => "retention",
        }
    }
    /// Pulse, endurance and retention data are meaningless without timestamps.
    pub fn needs_time(&self) -> bool {
        !matches!(self, Self::IvSweep)
    }
}
/// Output depth. Each level is a superset of the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisLevel {
    Basic,
    Classification,
    Full,
    Research,
}
impl AnalysisLevel {
    /// Unrecognized names fall back to `Full`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "classification" => Self::Classification,
            "research" => Self::Research,
            _ => Self::Full,
        }
    }
}
impl Default for AnalysisLevel {
    fn default() -> Self {
        Self::Full
    }
}
/// One validated voltage/current sweep. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct SweepRecord {
    voltage: Vec<f64>,
    current: Vec<f64>,
    time: Option<Vec<f64>>,
    measurement_type: MeasurementType,
    analysis_level: AnalysisLevel,
    degraded_from: Option<MeasurementType>,
}
impl SweepRecord {
    pub fn new(
        voltage: Vec<f64>,
        current: Vec<f64>,
        time: Option<Vec<f64>>,
        suggested: Option<MeasurementType>,
        analysis_level: AnalysisLevel,
    ) -> Result<Self, AnalysisError> {
        let mut len = voltage.len().min(current.len());
        if let Some(t) = &time {
            len = len.min(t.len());
        }
        let keep: Vec<usize> = (0..len)
            .filter(|&k| voltage[k].is_finite() && current[k].is_finite())
            .collect();
        if keep.len() < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "need at least 2 finite voltage/current points, got {}",
                keep.len()
            )));
        }
        let pick = |data: &[f64]| keep.iter().map(|&k| data[k]).collect::<Vec<f64>>();
        let v = pick(&voltage);
        let i = pick(&current);
        let t = time.as_deref().map(pick);
        let detected = match suggested {
            Some(MeasurementType::IvSweep) => MeasurementType::IvSweep,
            other => detect_measurement_type(&v, t.is_some())
                .unwrap_or(other.unwrap_or(MeasurementType::IvSweep)),
        };
        let (measurement_type, degraded_from) = if detected.needs_time() && t.is_none() {
            log::debug!(
                "{} data without a time axis, analyzing as iv_sweep",
                detected.as_str()
            );
            (MeasurementType::IvSweep, Some(detected))
        } else {
            (detected, None)
        };
        Ok(Self {
            voltage: v,
            current: i,
            time: t,
            measurement_type,
            analysis_level,
            degraded_from,
        })
    }
    /// Builds a record from arrays of any rank.
    pub fn from_arrays(
        voltage: ArrayViewD<'_, f64>,
        current: ArrayViewD<'_, f64>,
        time: Option<ArrayViewD<'_, f64>>,
        suggested: Option<MeasurementType>,
        analysis_level: AnalysisLevel,
    ) -> Result<Self, AnalysisError> {
        Self::new(
            to_vector(voltage),
            to_vector(current),
            time.map(to_vector),
            suggested,
            analysis_level,
        )
    }
    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }
    pub fn current(&self) -> &[f64] {
        &self.current
    }
    pub fn time(&self) -> Option<&[f64]> {
        self.time.as_deref()
    }
    pub fn len(&self) -> usize {
        self.voltage.len()
    }
    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
    pub fn measurement_type(&self) -> MeasurementType {
        self.measurement_type
    }
    pub fn analysis_level(&self) -> AnalysisLevel {
        self.analysis_level
    }
    /// The time-dependent type that was requested or detected but had to be
    /// downgraded because no time axis was supplied.
    pub fn degraded_from(&self) -> Option<MeasurementType> {
        self.degraded_from
    }
}
/// Flattens an array of any rank; 2-D single-row/column arrays yield that row/column.
pub fn to_vector(array: ArrayViewD<'_, f64>) -> Vec<f64> {
    if array.ndim() == 2 {
        let shape = array.shape();
        if shape[0] == 1 {
            return array.index_axis(Axis(0), 0).iter().copied().collect();
        }
        if shape[1] == 1 {
            return array.index_axis(Axis(1), 0).iter().copied().collect();
        }
    }
    array.iter().copied().collect()
}
/// Returns a non-sweep type when the voltage program looks like one.
/// The zero-crossing rule for endurance only applies to untimed data.
pub fn detect_measurement_type(voltage: &[f64], has_time: bool) -> Option<MeasurementType> {
    let n = voltage.len();
    if n < 2 {
        return None;
    }
    let steps: Vec<f64> = voltage.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let median_step = crate::analysis::stats::median(&steps);
    let max_step = steps.iter().fold(0.0f64, |acc, s| acc.max(*s));
    if max_step > 0.0 && max_step > 10.0 * median_step {
        return Some(MeasurementType::Pulse);
    }
    let mut unique = crate::analysis::stats::sorted(voltage);
    unique.dedup();
    if (unique.len() as f64) < n as f64 / 10.0 {
        return Some(MeasurementType::Retention);
    }
    let crossings = voltage
        .windows(2)
        .filter(|w| (w[0] < 0.0 && w[1] >= 0.0) || (w[0] > 0.0 && w[1] <= 0.0))
        .count();
    if !has_time && crossings > 8 {
        return Some(MeasurementType::Endurance);
    }
    None
}
