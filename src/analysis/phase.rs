use rustfft::{num_complex::Complex64, FftPlanner};
use crate::analysis::error::AnalysisError;
use crate::analysis::stats;
use std::f64::consts::PI;
/// Analytic signal via the FFT method.
pub fn analytic_signal(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);
    let mut buffer: Vec<Complex64> = signal.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    forward.process(&mut buffer);
    for (k, bin) in buffer.iter_mut().enumerate() {
        let h = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < (n + 1) / 2 {
            2.0
        } else {
            0.0
        };
        *bin *= h;
    }
    inverse.process(&mut buffer);
    let scale = 1.0 / n as f64;
    buffer.iter().map(|c| *c * scale).collect()
}
pub fn instantaneous_phase(signal: &[f64]) -> Vec<f64> {
    analytic_signal(signal).iter().map(|c| c.arg()).collect()
}
fn standardize(signal: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    let mean = stats::mean(signal);
    let std = stats::std_dev(signal);
    if std <= f64::EPSILON * mean.abs().max(1e-300) || std == 0.0 {
        return Err(AnalysisError::ZeroVariance("phase_shift"));
    }
    Ok(signal.iter().map(|v| (v - mean) / std).collect())
}
/// Maps an angle difference into `(-π, π]`.
fn wrap_angle(delta: f64) -> f64 {
    let wrapped = delta.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}
/// Mean absolute difference of the instantaneous phases of V and I, degrees mod 180.
pub fn phase_shift_deg(voltage: &[f64], current: &[f64]) -> Result<f64, AnalysisError> {
    let n = voltage.len().min(current.len());
    if n < 4 {
        return Err(AnalysisError::insufficient("phase_shift", 4, n));
    }
    let v = standardize(&voltage[..n])?;
    let i = standardize(&current[..n])?;
    let phase_v = instantaneous_phase(&v);
    let phase_i = instantaneous_phase(&i);
    let diffs: Vec<f64> = phase_v
        .iter()
        .zip(&phase_i)
        .map(|(a, b)| wrap_angle(a - b).abs())
        .collect();
    let shift = stats::mean(&diffs).to_degrees() % 180.0;
    if shift.is_finite() {
        Ok(shift)
    } else {
        Err(AnalysisError::NonFinite("phase_shift"))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn analytic_signal_of_cosine_is_unit_phasor() {
        let n = 64;
        let signal: Vec<f64> = (0..n).map(|k| (2.0 * PI * 4.0 * k as f64 / n as f64).cos()).collect();
        let analytic = analytic_signal(&signal);
        for (k, c) in analytic.iter().enumerate() {
            let expected = (2.0 * PI * 4.0 * k as f64 / n as f64).sin();
            assert!((c.re - signal[k]).abs() < 1e-9);
            assert!((c.im - expected).abs() < 1e-9);
        }
    }
    #[test]
    fn proportional_signals_have_no_shift() {
        let v: Vec<f64> = (0..100).map(|k| (k as f64 * 0.2).sin()).collect();
        let i: Vec<f64> = v.iter().map(|x| x * 1e-3).collect();
        assert!(phase_shift_deg(&v, &i).unwrap() < 1e-6);
    }
    #[test]
    fn quadrature_signals_shift_by_ninety_degrees() {
        let n = 128;
        let v: Vec<f64> = (0..n).map(|k| (2.0 * PI * 8.0 * k as f64 / n as f64).sin()).collect();
        let i: Vec<f64> = (0..n).map(|k| (2.0 * PI * 8.0 * k as f64 / n as f64).cos()).collect();
        let shift = phase_shift_deg(&v, &i).unwrap();
        assert!((shift - 90.0).abs() < 1.0, "shift = {shift}");
    }
    #[test]
    fn constant_current_is_rejected() {
        let v = [0.0, 1.0, 2.0, 3.0];
        assert!(phase_shift_deg(&v, &[1.0; 4]).is_err());
    }
}
