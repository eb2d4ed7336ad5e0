//! Per-loop hysteresis and resistance-state metrics.
//!
//! Areas are trapezoidal integrals of current over voltage on four quadrant
//! sections:
//! - `sect1`/`sect2`: outbound/return half of the `V ≥ 0` samples
//! - `sect3`/`sect4`: outbound/return half of the `V ≤ 0` samples
//!
//! Each half is split at the peak-|V| sample of its polarity.
use serde::Serialize;
use crate::analysis::error::{AnalysisError, Diagnostics};
use crate::analysis::segment::Loop;
use crate::analysis::stats;
/// Read voltages for the fixed-bias resistance readings.
pub const READ_VOLTAGE_LOW: f64 = 0.2;
pub const READ_VOLTAGE_HIGH: f64 = 0.5;
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LoopMetrics {
    pub ps_area: f64,
    pub ng_area: f64,
    pub area: f64,
    pub normalized_area: f64,
    /// `normalized_area` divided by the loop's peak |I|.
    pub relative_area: f64,
    pub ron: f64,
    pub roff: f64,
    pub von: f64,
    pub voff: f64,
    pub on_off_ratio: f64,
    pub r_at_0_2v: f64,
    pub r_at_0_5v: f64,
    pub switching_ratio: f64,
    pub window_margin: f64,
    pub rectification_ratio: f64,
    pub nonlinearity_factor: f64,
    pub asymmetry_factor: f64,
    pub power: f64,
    pub energy_per_switch: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HysteresisAreas {
    pub ps_area: f64,
    pub ng_area: f64,
    pub area: f64,
    pub normalized_area: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OnOffValues {
    pub ron: f64,
    pub roff: f64,
    pub von: f64,
    pub voff: f64,
}
type Section = Vec<(f64, f64)>;
/// Outbound and return halves of one polarity.
#[derive(Clone, Debug, Default)]
pub struct Lobe {
    pub outbound: Section,
    pub ret: Section,
}
impl Lobe {
    fn split(points: Section) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let peak = points
            .iter()
            .enumerate()
            .fold(0, |best, (k, p)| if p.0.abs() > points[best].0.abs() { k } else { best });
        Self {
            outbound: points[..=peak].to_vec(),
            ret: points[peak..].to_vec(),
        }
    }
    /// A lobe encloses area only when both halves trace a path.
    pub fn is_closed(&self) -> bool {
        self.outbound.len() >= 2 && self.ret.len() >= 2
    }
}
pub fn positive_lobe(voltage: &[f64], current: &[f64]) -> Lobe {
    Lobe::split(select(voltage, current, |v| v >= 0.0))
}
pub fn negative_lobe(voltage: &[f64], current: &[f64]) -> Lobe {
    Lobe::split(select(voltage, current, |v| v <= 0.0))
}
fn select(voltage: &[f64], current: &[f64], keep: impl Fn(f64) -> bool) -> Section {
    voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| keep(**v))
        .map(|(v, i)| (*v, *i))
        .collect()
}
/// Repeats the last point until `len`; empty sections become `(0, 0)` runs.
fn pad(section: &Section, len: usize) -> Section {
    let mut padded = section.clone();
    let last = section.last().copied().unwrap_or((0.0, 0.0));
    padded.resize(len.max(section.len()), last);
    padded
}
fn section_area(section: &Section) -> f64 {
    let v: Vec<f64> = section.iter().map(|p| p.0).collect();
    let i: Vec<f64> = section.iter().map(|p| p.1).collect();
    stats::trapz(&i, &v).abs()
}
pub fn area_under_curves(voltage: &[f64], current: &[f64]) -> HysteresisAreas {
    let pos = positive_lobe(voltage, current);
    let neg = negative_lobe(voltage, current);
    let common = [&pos.outbound, &pos.ret, &neg.outbound, &neg.ret]
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(0);
    let [a1, a2, a3, a4] = [&pos.outbound, &pos.ret, &neg.outbound, &neg.ret]
        .map(|s| section_area(&pad(s, common)));
    let ps_area = if pos.is_closed() { a2 - a1 } else { 0.0 };
    let ng_area = if neg.is_closed() { a3 - a4 } else { 0.0 };
    let area = ps_area.abs() + ng_area.abs();
    let (v_min, v_max) = stats::min_max(voltage);
    let span = v_max.abs() + v_min.abs();
    let normalized = if span > 0.0 { area / span } else { 0.0 };
    HysteresisAreas {
        ps_area,
        ng_area,
        area,
        normalized_area: if normalized.is_finite() { normalized } else { 0.0 },
    }
}
/// `ron`/`roff` as the min/max `|V/I|` in the low-bias window.
pub fn resistance_states(
    voltage: &[f64],
    current: &[f64],
    window_fraction: f64,
) -> Result<(f64, f64), AnalysisError> {
    let peak = stats::max_abs(voltage);
    let limit = window_fraction * peak;
    let resistances: Vec<f64> = voltage
        .iter()
        .zip(current)
        .filter(|(v, i)| v.abs() <= limit && **v != 0.0 && **i != 0.0)
        .map(|(v, i)| (v / i).abs())
        .filter(|r| r.is_finite())
        .collect();
    if resistances.is_empty() {
        return Err(AnalysisError::EmptyWindow("resistance_window"));
    }
    let (ron, roff) = stats::min_max(&resistances);
    Ok((ron, roff))
}
/// Voltages at the min/max `dI/dV` over the first half of the gradient list.
pub fn switching_voltages(voltage: &[f64], current: &[f64]) -> Result<(f64, f64), AnalysisError> {
    let gradients = stats::gradient(current, voltage);
    if gradients.is_empty() {
        return Err(AnalysisError::EmptyWindow("switching_voltages"));
    }
    let half = &gradients[..(gradients.len() / 2).max(1)];
    let min = half.iter().fold(half[0], |a, b| if b.1 < a.1 { *b } else { a });
    let max = half.iter().fold(half[0], |a, b| if b.1 > a.1 { *b } else { a });
    Ok((voltage[min.0], voltage[max.0]))
}
pub fn on_off_values(
    voltage: &[f64],
    current: &[f64],
    window_fraction: f64,
    diags: &mut Diagnostics,
) -> OnOffValues {
    let (ron, roff) = diags.recover(
        "on_off_values",
        resistance_states(voltage, current, window_fraction),
        (0.0, 0.0),
    );
    let (von, voff) = diags.recover(
        "on_off_values",
        switching_voltages(voltage, current),
        (0.0, 0.0),
    );
    OnOffValues {
        ron,
        roff,
        von,
        voff,
    }
}
/// `|V/I|` at the positive sample nearest `target`.
pub fn resistance_at(voltage: &[f64], current: &[f64], target: f64) -> f64 {
    let nearest = voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| **v > 0.0)
        .min_by(|a, b| (a.0 - target).abs().total_cmp(&(b.0 - target).abs()));
    match nearest {
        Some((v, i)) if *i != 0.0 => {
            let r = (v / i).abs();
            if r.is_finite() {
                r
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}
/// Max/min `|V/I|` away from the zero crossing, 1 when not measurable.
pub fn switching_ratio(voltage: &[f64], current: &[f64]) -> f64 {
    let floor = 0.1 * stats::max_abs(voltage);
    let resistances: Vec<f64> = voltage
        .iter()
        .zip(current)
        .filter(|(v, i)| v.abs() >= floor && **v != 0.0 && **i != 0.0)
        .map(|(v, i)| (v / i).abs())
        .filter(|r| r.is_finite())
        .collect();
    if resistances.len() < 2 {
        return 1.0;
    }
    let (lo, hi) = stats::min_max(&resistances);
    if lo > 0.0 {
        hi / lo
    } else {
        1.0
    }
}
fn peak_current(voltage: &[f64], current: &[f64], positive: bool) -> f64 {
    voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| if positive { **v > 0.0 } else { **v < 0.0 })
        .fold(0.0f64, |acc, (_, i)| acc.max(i.abs()))
}
fn nonlinearity_factor(voltage: &[f64], current: &[f64]) -> f64 {
    let Some((v_peak, i_peak)) = voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| **v > 0.0)
        .max_by(|a, b| a.0.total_cmp(b.0))
    else {
        return 0.0;
    };
    let half = voltage
        .iter()
        .zip(current)
        .filter(|(v, _)| **v > 0.0)
        .min_by(|a, b| (a.0 - v_peak / 2.0).abs().total_cmp(&(b.0 - v_peak / 2.0).abs()));
    match half {
        Some((_, i_half)) if *i_half != 0.0 => (i_peak / i_half).abs(),
        _ => 0.0,
    }
}
/// Computes the full metric set for one loop.
pub fn loop_metrics(sweep: &Loop, window_fraction: f64, diags: &mut Diagnostics) -> LoopMetrics {
    let (v, i) = (sweep.voltage.as_slice(), sweep.current.as_slice());
    let areas = area_under_curves(v, i);
    let states = on_off_values(v, i, window_fraction, diags);
    let i_scale = stats::max_abs(i);
    let relative_area = if i_scale > 0.0 {
        areas.normalized_area / i_scale
    } else {
        0.0
    };
    let on_off_ratio = if states.ron > 0.0 {
        states.roff / states.ron
    } else {
        0.0
    };
    let window_margin = if states.ron > 0.0 {
        (states.roff - states.ron) / states.ron
    } else {
        0.0
    };
    let i_pos = peak_current(v, i, true);
    let i_neg = peak_current(v, i, false);
    let rectification_ratio = if i_pos > 0.0 && i_neg > 0.0 {
        i_pos / i_neg
    } else {
        1.0
    };
    let asymmetry_factor = if i_pos + i_neg > 0.0 {
        (i_pos - i_neg) / (i_pos + i_neg)
    } else {
        0.0
    };
    let instantaneous: Vec<f64> = v.iter().zip(i).map(|(a, b)| a * b).collect();
    let power = stats::mean(&instantaneous.iter().map(|p| p.abs()).collect::<Vec<_>>());
    let energy_per_switch = match &sweep.time {
        Some(t) if t.len() >= 2 => (stats::trapz(&instantaneous, t) / 2.0).abs(),
        _ => 0.0,
    };
    LoopMetrics {
        ps_area: areas.ps_area,
        ng_area: areas.ng_area,
        area: areas.area,
        normalized_area: areas.normalized_area,
        relative_area: if relative_area.is_finite() { relative_area } else { 0.0 },
        ron: states.ron,
        roff: states.roff,
        von: states.von,
        voff: states.voff,
        on_off_ratio,
        r_at_0_2v: resistance_at(v, i, READ_VOLTAGE_LOW),
        r_at_0_5v: resistance_at(v, i, READ_VOLTAGE_HIGH),
        switching_ratio: switching_ratio(v, i),
        window_margin,
        rectification_ratio,
        nonlinearity_factor: nonlinearity_factor(v, i),
        asymmetry_factor,
        power,
        energy_per_switch,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sweep(voltage: Vec<f64>, current: Vec<f64>) -> Loop {
        Loop {
            index: 0,
            start: 0,
            voltage,
            current,
            time: None,
        }
    }
    #[test]
    fn symmetric_loop_areas_do_not_cancel() {
        let v = [0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0];
        let i = [0.0, 1e-6, 2e-6, 1.5e-6, 0.0, -1e-6, -2e-6, -1.5e-6, 0.0];
        let areas = area_under_curves(&v, &i);
        assert!((areas.ps_area - 0.5e-6).abs() < 1e-15);
        assert!((areas.ng_area + 0.5e-6).abs() < 1e-15);
        assert!((areas.area - 1e-6).abs() < 1e-15);
        assert!((areas.normalized_area - 0.25e-6).abs() < 1e-15);
    }
    #[test]
    fn one_way_ramp_encloses_nothing() {
        let v: Vec<f64> = (0..50).map(|k| -1.0 + 2.0 * k as f64 / 49.0).collect();
        let i: Vec<f64> = v.iter().map(|x| x / 1000.0).collect();
        let areas = area_under_curves(&v, &i);
        assert_eq!(areas.area, 0.0);
    }
    #[test]
    fn zero_span_gives_zero_normalized_area() {
        let areas = area_under_curves(&[0.0; 12], &[1e-3; 12]);
        assert_eq!(areas.normalized_area, 0.0);
    }
    #[test]
    fn ron_never_exceeds_roff() {
        let v = [0.0, 0.1, 0.2, 0.1, 0.0, 1.0];
        let i = [0.0, 1e-4, 1e-4, 4e-4, 0.0, 1e-3];
        let (ron, roff) = resistance_states(&v, &i, 0.2).unwrap();
        assert!((ron - 250.0).abs() < 1e-9);
        assert!((roff - 2000.0).abs() < 1e-9);
    }
    #[test]
    fn empty_window_defaults_to_zero() {
        let mut diags = Diagnostics::new();
        let states = on_off_values(&[0.0, 1.0], &[0.0, 1.0], 0.2, &mut diags);
        assert_eq!(states.ron, 0.0);
        assert_eq!(states.roff, 0.0);
        assert_eq!(diags.entries().len(), 1);
    }
    #[test]
    fn linear_loop_metrics() {
        let v: Vec<f64> = (0..=40).map(|k| k as f64 * 0.025).collect();
        let i: Vec<f64> = v.iter().map(|x| x / 100.0).collect();
        let mut diags = Diagnostics::new();
        let m = loop_metrics(&sweep(v, i), 0.2, &mut diags);
        assert!((m.ron - 100.0).abs() < 1e-6);
        assert!((m.on_off_ratio - 1.0).abs() < 1e-6);
        assert!((m.r_at_0_2v - 100.0).abs() < 1e-6);
        assert!((m.nonlinearity_factor - 2.0).abs() < 1e-6);
        assert_eq!(m.rectification_ratio, 1.0);
        assert!((m.switching_ratio - 1.0).abs() < 1e-6);
    }
}
