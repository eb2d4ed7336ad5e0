//! Competing transport models fitted to the positive-bias branch.
//!
//! Every model is fitted on currents normalized by the branch's peak |I| so
//! the R² guard term stays negligible for nA and mA devices alike. Reported
//! parameters are converted back to physical units.
use std::collections::BTreeMap;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use crate::analysis::error::{AnalysisError, Diagnostics};
use crate::analysis::fit::{self, LevenbergMarquardt};
use crate::analysis::stats;
use crate::config::AnalyzerConfig;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductionMechanism {
    Ohmic,
    Sclc,
    TrapSclc,
    PooleFrenkel,
    Schottky,
    FowlerNordheim,
}
impl ConductionMechanism {
    /// Fit order and R² tie-break order: the simpler model wins a tie.
    pub const PRIORITY: [ConductionMechanism; 6] = [
        ConductionMechanism::Ohmic,
        ConductionMechanism::Sclc,
        ConductionMechanism::TrapSclc,
        ConductionMechanism::PooleFrenkel,
        ConductionMechanism::Schottky,
        ConductionMechanism::FowlerNordheim,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ohmic => "ohmic",
            Self::Sclc => "sclc",
            Self::TrapSclc => "trap_sclc",
            Self::PooleFrenkel => "poole_frenkel",
            Self::Schottky => "schottky",
            Self::FowlerNordheim => "fowler_nordheim",
        }
    }
    pub fn is_non_ohmic(&self) -> bool {
        !matches!(self, Self::Ohmic)
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConductionFit {
    pub mechanism: ConductionMechanism,
    pub params: BTreeMap<&'static str, f64>,
    pub r_squared: f64,
    /// Why the fit failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl ConductionFit {
    fn failed(mechanism: ConductionMechanism, err: &AnalysisError) -> Self {
        Self {
            mechanism,
            params: BTreeMap::new(),
            r_squared: 0.0,
            error: Some(err.to_string()),
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConductionAnalysis {
    /// `None` when no model explains any variance.
    pub conduction_mechanism: Option<ConductionMechanism>,
    pub model_parameters: BTreeMap<&'static str, f64>,
    pub best_r_squared: f64,
    /// All six fits in priority order.
    pub fits: Vec<ConductionFit>,
}
impl ConductionAnalysis {
    pub fn fit_for(&self, mechanism: ConductionMechanism) -> Option<&ConductionFit> {
        self.fits.iter().find(|f| f.mechanism == mechanism)
    }
    pub fn r_squared(&self, mechanism: ConductionMechanism) -> f64 {
        self.fit_for(mechanism).map(|f| f.r_squared).unwrap_or(0.0)
    }
}
/// Positive-branch sample with currents scaled to unit peak.
struct Branch {
    v: Vec<f64>,
    y: Vec<f64>,
    scale: f64,
}
impl Branch {
    fn r_squared(&self, predicted: &[f64]) -> Result<f64, AnalysisError> {
        if predicted.iter().any(|p| !p.is_finite()) {
            return Err(AnalysisError::NonFinite("conduction_fit"));
        }
        Ok(fit::r_squared(&self.y, predicted))
    }
    /// Points usable by log-linearized models.
    fn positive(&self) -> (Vec<f64>, Vec<f64>) {
        self.v
            .iter()
            .zip(&self.y)
            .filter(|(_, y)| **y > 0.0)
            .map(|(v, y)| (*v, *y))
            .unzip()
    }
}
#[derive(Clone, Copy, Debug)]
pub struct ConductionModelFitter {
    min_voltage: f64,
    min_points: usize,
    solver: LevenbergMarquardt,
}
impl ConductionModelFitter {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            min_voltage: config.fit_min_voltage,
            min_points: config.fit_min_points,
            solver: LevenbergMarquardt::with_max_iterations(config.fit_max_iterations),
        }
    }
    /// Fits all models, or returns `None` when the record is too small or has
    /// no sample above the voltage floor.
    pub fn fit(
        &self,
        voltage: &[f64],
        current: &[f64],
        diags: &mut Diagnostics,
    ) -> Option<ConductionAnalysis> {
        if voltage.len() < self.min_points {
            diags.push(
                "conduction_fit",
                format!("skipped: {} points, need {}", voltage.len(), self.min_points),
            );
            return None;
        }
        let (v, i): (Vec<f64>, Vec<f64>) = voltage
            .iter()
            .zip(current)
            .filter(|(v, _)| **v > self.min_voltage)
            .map(|(v, i)| (*v, *i))
            .unzip();
        if v.is_empty() {
            diags.push(
                "conduction_fit",
                format!("skipped: no samples above {} V", self.min_voltage),
            );
            return None;
        }
        let scale = stats::max_abs(&i);
        let branch = Branch {
            y: i.iter().map(|x| if scale > 0.0 { x / scale } else { 0.0 }).collect(),
            v,
            scale,
        };
        let fits: Vec<ConductionFit> = ConductionMechanism::PRIORITY
            .iter()
            .map(|&mechanism| {
                let result = if branch.scale > 0.0 {
                    self.fit_model(mechanism, &branch)
                } else {
                    Err(AnalysisError::ZeroVariance("conduction_fit"))
                };
                match result {
                    Ok(fit) => fit,
                    Err(err) => {
                        diags.push(
                            &format!("conduction_fit::{}", mechanism.as_str()),
                            err.to_string(),
                        );
                        ConductionFit::failed(mechanism, &err)
                    }
                }
            })
            .collect();
        let winner = select_best(&fits).map(|f| (f.mechanism, f.params.clone(), f.r_squared));
        log::debug!("conduction: best {:?}", winner.as_ref().map(|w| (w.0, w.2)));
        let (conduction_mechanism, model_parameters, best_r_squared) = match winner {
            Some((mechanism, params, r2)) => (Some(mechanism), params, r2),
            None => (None, BTreeMap::new(), 0.0),
        };
        Some(ConductionAnalysis {
            conduction_mechanism,
            model_parameters,
            best_r_squared,
            fits,
        })
    }
    fn fit_model(
        &self,
        mechanism: ConductionMechanism,
        branch: &Branch,
    ) -> Result<ConductionFit, AnalysisError> {
        let (params, r_squared) = match mechanism {
            ConductionMechanism::Ohmic => fit_ohmic(branch)?,
            ConductionMechanism::Sclc => fit_sclc(branch)?,
            ConductionMechanism::TrapSclc => self.fit_trap_sclc(branch)?,
            ConductionMechanism::PooleFrenkel => fit_poole_frenkel(branch)?,
            ConductionMechanism::Schottky => fit_schottky(branch)?,
            ConductionMechanism::FowlerNordheim => fit_fowler_nordheim(branch)?,
        };
        if params.values().any(|p| !p.is_finite()) {
            return Err(AnalysisError::NonFinite("conduction_fit"));
        }
        Ok(ConductionFit {
            mechanism,
            params,
            r_squared,
            error: None,
        })
    }
    /// `I = a·Vⁿ` by bounded Levenberg-Marquardt, starting at `n = 3`.
    fn fit_trap_sclc(&self, b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
        let a0 = through_origin(&b.v, &b.y, |v| v.powi(3))?;
        let outcome = self
            .solver
            .minimize(DVector::from_vec(vec![a0, 3.0]), |p| {
                let (a, n) = (p[0], p[1]);
                let residuals = DVector::from_iterator(
                    b.v.len(),
                    b.v.iter().zip(&b.y).map(|(v, y)| a * v.powf(n) - y),
                );
                let jacobian = DMatrix::from_fn(b.v.len(), 2, |row, col| {
                    let v = b.v[row];
                    if col == 0 {
                        v.powf(n)
                    } else {
                        a * v.powf(n) * v.ln()
                    }
                });
                let finite = residuals.iter().chain(jacobian.iter()).all(|x| x.is_finite());
                finite.then_some((residuals, jacobian))
            })?;
        if !outcome.converged {
            log::debug!("trap_sclc stopped after {} iterations", outcome.iterations);
        }
        let (a, n) = (outcome.params[0], outcome.params[1]);
        let predicted: Vec<f64> = b.v.iter().map(|v| a * v.powf(n)).collect();
        let r2 = b.r_squared(&predicted)?;
        Ok((params([("a", a * b.scale), ("n", n)]), r2))
    }
}
fn params<const N: usize>(entries: [(&'static str, f64); N]) -> BTreeMap<&'static str, f64> {
    entries.into_iter().collect()
}
/// Least-squares `a` for `y = a·basis(v)`.
fn through_origin(v: &[f64], y: &[f64], basis: impl Fn(f64) -> f64) -> Result<f64, AnalysisError> {
    let (num, den) = v.iter().zip(y).fold((0.0, 0.0), |(num, den), (v, y)| {
        let b = basis(*v);
        (num + b * y, den + b * b)
    });
    let a = num / den;
    if den == 0.0 || !a.is_finite() {
        return Err(AnalysisError::singular("conduction_fit", "degenerate basis"));
    }
    Ok(a)
}
fn fit_ohmic(b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
    let g = through_origin(&b.v, &b.y, |v| v)?;
    if g == 0.0 {
        return Err(AnalysisError::NonFinite("ohmic"));
    }
    let predicted: Vec<f64> = b.v.iter().map(|v| g * v).collect();
    let r2 = b.r_squared(&predicted)?;
    Ok((params([("resistance", 1.0 / (g * b.scale))]), r2))
}
fn fit_sclc(b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
    let a = through_origin(&b.v, &b.y, |v| v * v)?;
    let predicted: Vec<f64> = b.v.iter().map(|v| a * v * v).collect();
    let r2 = b.r_squared(&predicted)?;
    Ok((params([("a", a * b.scale)]), r2))
}
/// Degree-1 fit on linearized data; needs three positive-current samples.
fn linearized(
    b: &Branch,
    x: impl Fn(f64) -> f64,
    y: impl Fn(f64, f64) -> f64,
    stage: &'static str,
) -> Result<(f64, f64), AnalysisError> {
    let (v, i) = b.positive();
    if v.len() < 3 {
        return Err(AnalysisError::insufficient(stage, 3, v.len()));
    }
    let xs: Vec<f64> = v.iter().map(|&v| x(v)).collect();
    let ys: Vec<f64> = v.iter().zip(&i).map(|(&v, &i)| y(v, i)).collect();
    let poly = fit::polyfit(&xs, &ys, 1)?;
    Ok((poly.coeffs[0], poly.coeffs[1]))
}
fn fit_poole_frenkel(b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
    let (ln_a, beta) = linearized(b, f64::sqrt, |v, i| i.ln() - v.ln(), "poole_frenkel")?;
    let a = ln_a.exp();
    let predicted: Vec<f64> = b.v.iter().map(|v| a * v * (beta * v.sqrt()).exp()).collect();
    let r2 = b.r_squared(&predicted)?;
    Ok((params([("a", a * b.scale), ("beta", beta)]), r2))
}
fn fit_schottky(b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
    let (ln_a, beta) = linearized(b, f64::sqrt, |_, i| i.ln(), "schottky")?;
    let a = ln_a.exp();
    let predicted: Vec<f64> = b.v.iter().map(|v| a * (beta * v.sqrt()).exp()).collect();
    let r2 = b.r_squared(&predicted)?;
    Ok((params([("a", a * b.scale), ("beta", beta)]), r2))
}
fn fit_fowler_nordheim(b: &Branch) -> Result<(BTreeMap<&'static str, f64>, f64), AnalysisError> {
    let (ln_a, slope) = linearized(b, |v| 1.0 / v, |v, i| (i / (v * v)).ln(), "fowler_nordheim")?;
    let a = ln_a.exp();
    let b_coeff = -slope;
    let predicted: Vec<f64> = b.v.iter().map(|v| a * v * v * (-b_coeff / v).exp()).collect();
    let r2 = b.r_squared(&predicted)?;
    Ok((params([("a", a * b.scale), ("b", b_coeff)]), r2))
}
/// A later (more complex) model must beat the incumbent by more than this.
const TIE_TOLERANCE: f64 = 1e-9;
fn select_best(fits: &[ConductionFit]) -> Option<&ConductionFit> {
    let mut best: Option<&ConductionFit> = None;
    for fit in fits {
        match best {
            Some(current) if fit.r_squared <= current.r_squared + TIE_TOLERANCE => {}
            _ => best = Some(fit),
        }
    }
    best.filter(|f| f.r_squared > 0.0)
}
#[cfg(test)]
mod tests {
    use super::*;
    fn fitter() -> ConductionModelFitter {
        ConductionModelFitter::from_config(&AnalyzerConfig::default())
    }
    fn ramp(n: usize, v_max: f64) -> Vec<f64> {
        (0..n).map(|k| v_max * (k as f64 + 1.0) / n as f64).collect()
    }
    #[test]
    fn ohmic_data_selects_ohmic() {
        let v = ramp(40, 1.0);
        let i: Vec<f64> = v.iter().map(|x| x / 1000.0).collect();
        let mut diags = Diagnostics::new();
        let result = fitter().fit(&v, &i, &mut diags).unwrap();
        assert_eq!(result.conduction_mechanism, Some(ConductionMechanism::Ohmic));
        assert!(result.best_r_squared > 0.98);
        assert!((result.model_parameters["resistance"] - 1000.0).abs() < 1e-6);
        assert_eq!(result.fits.len(), 6);
    }
    #[test]
    fn quadratic_data_selects_sclc() {
        let v = ramp(40, 2.0);
        let i: Vec<f64> = v.iter().map(|x| 3e-6 * x * x).collect();
        let mut diags = Diagnostics::new();
        let result = fitter().fit(&v, &i, &mut diags).unwrap();
        assert_eq!(result.conduction_mechanism, Some(ConductionMechanism::Sclc));
        assert!((result.model_parameters["a"] - 3e-6).abs() < 1e-12);
    }
    #[test]
    fn trap_sclc_recovers_exponent() {
        let v = ramp(40, 2.0);
        let i: Vec<f64> = v.iter().map(|x| 1e-7 * x.powf(4.5)).collect();
        let mut diags = Diagnostics::new();
        let result = fitter().fit(&v, &i, &mut diags).unwrap();
        let trap = result.fit_for(ConductionMechanism::TrapSclc).unwrap();
        assert!((trap.params["n"] - 4.5).abs() < 1e-3);
        assert!(trap.r_squared > 0.999);
    }
    #[test]
    fn schottky_data_prefers_schottky() {
        let v = ramp(40, 4.0);
        let i: Vec<f64> = v.iter().map(|x| 1e-9 * (3.0 * x.sqrt()).exp()).collect();
        let mut diags = Diagnostics::new();
        let result = fitter().fit(&v, &i, &mut diags).unwrap();
        let schottky = result.fit_for(ConductionMechanism::Schottky).unwrap();
        assert!((schottky.params["beta"] - 3.0).abs() < 1e-6);
        assert!(schottky.r_squared > 0.9999);
    }
    #[test]
    fn negative_currents_fail_log_models_softly() {
        let v = ramp(20, 1.0);
        let i: Vec<f64> = v.iter().map(|x| -x / 1000.0).collect();
        let mut diags = Diagnostics::new();
        let result = fitter().fit(&v, &i, &mut diags).unwrap();
        assert_eq!(result.r_squared(ConductionMechanism::Schottky), 0.0);
        assert!(result.fit_for(ConductionMechanism::Schottky).unwrap().error.is_some());
        assert!(!diags.is_empty());
    }
    #[test]
    fn short_records_are_skipped() {
        let mut diags = Diagnostics::new();
        assert!(fitter().fit(&[0.5; 5], &[1e-3; 5], &mut diags).is_none());
        assert!(fitter().fit(&[-0.5; 20], &[1e-3; 20], &mut diags).is_none());
        assert_eq!(diags.entries().len(), 2);
    }
    #[test]
    fn ties_go_to_the_simpler_model() {
        let fit = |mechanism, r_squared| ConductionFit {
            mechanism,
            params: BTreeMap::new(),
            r_squared,
            error: None,
        };
        let fits = vec![
            fit(ConductionMechanism::Ohmic, 0.99),
            fit(ConductionMechanism::Sclc, 0.5),
            fit(ConductionMechanism::TrapSclc, 0.99 + 1e-12),
        ];
        assert_eq!(select_best(&fits).unwrap().mechanism, ConductionMechanism::Ohmic);
    }
}
