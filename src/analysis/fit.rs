//! Least-squares building blocks: polynomial fits, R² and a bounded
//! Levenberg-Marquardt minimizer.
use nalgebra::{DMatrix, DVector};
use crate::analysis::error::AnalysisError;
/// Guard added to the total sum of squares.
pub const R2_EPSILON: f64 = 1e-12;
/// Polynomial coefficients in ascending order (`c0 + c1·x + ...`).
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    pub coeffs: Vec<f64>,
}
impl Polynomial {
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, AnalysisError> {
    let n = x.len().min(y.len());
    if n < degree + 1 {
        return Err(AnalysisError::insufficient("polyfit", degree + 1, n));
    }
    let a = DMatrix::from_fn(n, degree + 1, |r, c| x[r].powi(c as i32));
    let b = DVector::from_column_slice(&y[..n]);
    let svd = a.svd(true, true);
    let solution = svd
        .solve(&b, 1e-14)
        .map_err(|reason| AnalysisError::singular("polyfit", reason))?;
    let coeffs: Vec<f64> = solution.iter().copied().collect();
    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(AnalysisError::NonFinite("polyfit"));
    }
    Ok(Polynomial { coeffs })
}
/// `1 − SS_res / (SS_tot + 1e-12)`.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = observed[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = observed[..n]
        .iter()
        .zip(&predicted[..n])
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let ss_tot: f64 = observed[..n].iter().map(|o| (o - mean).powi(2)).sum();
    let r2 = 1.0 - ss_res / (ss_tot + R2_EPSILON);
    if r2.is_finite() {
        r2
    } else {
        0.0
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}
/// Ordinary least-squares line with its coefficient of determination.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit, AnalysisError> {
    let n = x.len().min(y.len());
    if n < 3 {
        return Err(AnalysisError::insufficient("linear_fit", 3, n));
    }
    let x_spread = x[..n].iter().any(|v| *v != x[0]);
    let y_spread = y[..n].iter().any(|v| *v != y[0]);
    if !x_spread || !y_spread {
        return Err(AnalysisError::ZeroVariance("linear_fit"));
    }
    let poly = polyfit(&x[..n], &y[..n], 1)?;
    let predicted: Vec<f64> = x[..n].iter().map(|&v| poly.eval(v)).collect();
    Ok(LinearFit {
        slope: poly.coeffs[1],
        intercept: poly.coeffs[0],
        r_squared: r_squared(&y[..n], &predicted),
    })
}
#[derive(Clone, Debug)]
pub struct LmOutcome {
    pub params: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub cost: f64,
}
/// Levenberg-Marquardt with Marquardt diagonal scaling and a hard iteration cap.
#[derive(Clone, Copy, Debug)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub tolerance: f64,
}
impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-12,
        }
    }
}
impl LevenbergMarquardt {
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }
    /// `eval` returns the residual vector (model − data) and the Jacobian of
    /// the model with respect to the parameters, or `None` when the model is
    /// not finite at `params`.
    pub fn minimize<F>(&self, initial: DVector<f64>, eval: F) -> Result<LmOutcome, AnalysisError>
    where
        F: Fn(&DVector<f64>) -> Option<(DVector<f64>, DMatrix<f64>)>,
    {
        let mut params = initial;
        let (mut residuals, mut jacobian) =
            eval(&params).ok_or(AnalysisError::NonFinite("levenberg_marquardt"))?;
        let mut cost = residuals.norm_squared();
        let mut lambda = 1e-3;
        let mut converged = false;
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            let jt = jacobian.transpose();
            let mut normal = &jt * &jacobian;
            let rhs = -(&jt * &residuals);
            for i in 0..normal.nrows() {
                let d = normal[(i, i)].max(1e-30);
                normal[(i, i)] += lambda * d;
            }
            let Some(step) = normal.lu().solve(&rhs) else {
                lambda *= 10.0;
                if lambda > 1e12 {
                    break;
                }
                continue;
            };
            let candidate = &params + &step;
            match eval(&candidate) {
                Some((r_new, j_new)) if r_new.norm_squared() < cost => {
                    let new_cost = r_new.norm_squared();
                    let improvement = (cost - new_cost) / cost.max(1e-300);
                    params = candidate;
                    residuals = r_new;
                    jacobian = j_new;
                    cost = new_cost;
                    lambda = (lambda / 10.0).max(1e-12);
                    if improvement < self.tolerance || cost < 1e-30 {
                        converged = true;
                        break;
                    }
                }
                _ => {
                    lambda *= 10.0;
                    if lambda > 1e12 {
                        converged = true;
                        break;
                    }
                }
            }
        }
        if !cost.is_finite() || params.iter().any(|p| !p.is_finite()) {
            return Err(AnalysisError::NonFinite("levenberg_marquardt"));
        }
        Ok(LmOutcome {
            params,
            iterations,
            converged,
            cost,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn polyfit_recovers_a_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let poly = polyfit(&x, &y, 1).unwrap();
        assert!((poly.coeffs[0] - 1.0).abs() < 1e-9);
        assert!((poly.coeffs[1] - 2.0).abs() < 1e-9);
        assert!((poly.eval(4.0) - 9.0).abs() < 1e-9);
    }
    #[test]
    fn linear_fit_rejects_constant_series() {
        let err = linear_fit(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap_err();
        assert_eq!(err, AnalysisError::ZeroVariance("linear_fit"));
    }
    #[test]
    fn r_squared_is_one_for_exact_prediction() {
        let y = [1.0, 2.0, 4.0];
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);
    }
    #[test]
    fn levenberg_marquardt_fits_power_law() {
        let x: Vec<f64> = (1..=20).map(|k| k as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v.powf(1.7)).collect();
        let outcome = LevenbergMarquardt::default()
            .minimize(DVector::from_vec(vec![1.0, 3.0]), |p| {
                let (a, n) = (p[0], p[1]);
                let r = DVector::from_iterator(
                    x.len(),
                    x.iter().zip(&y).map(|(v, i)| a * v.powf(n) - i),
                );
                let j = DMatrix::from_fn(x.len(), 2, |row, col| {
                    let v = x[row];
                    if col == 0 {
                        v.powf(n)
                    } else {
                        a * v.powf(n) * v.ln()
                    }
                });
                Some((r, j))
            })
            .unwrap();
        assert!((outcome.params[0] - 2.0).abs() < 1e-4);
        assert!((outcome.params[1] - 1.7).abs() < 1e-4);
    }
    #[test]
    fn levenberg_marquardt_respects_iteration_cap() {
        let outcome = LevenbergMarquardt::with_max_iterations(3)
            .minimize(DVector::from_vec(vec![10.0]), |p| {
                let r = DVector::from_vec(vec![p[0] - 1.0, p[0] - 1.0]);
                let j = DMatrix::from_vec(2, 1, vec![1.0, 1.0]);
                Some((r, j))
            })
            .unwrap();
        assert!(outcome.iterations <= 3);
    }
}
