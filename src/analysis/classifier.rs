//! Weighted four-class device classifier.
//!
//! Every feature adds or removes a fixed number of points from one or more
//! classes; the class with the most points wins.
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::analysis::conduction::{ConductionAnalysis, ConductionMechanism};
use crate::analysis::features::ClassificationFeatures;
use crate::config::AnalyzerConfig;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Memristive,
    Capacitive,
    Conductive,
    Ohmic,
    Uncertain,
}
impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memristive => "memristive",
            Self::Capacitive => "capacitive",
            Self::Conductive => "conductive",
            Self::Ohmic => "ohmic",
            Self::Uncertain => "uncertain",
        }
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub memristive: f64,
    pub capacitive: f64,
    pub conductive: f64,
    pub ohmic: f64,
}
impl ScoreBreakdown {
    /// Scores in tie-break order.
    pub fn ranked(&self) -> [(DeviceType, f64); 4] {
        [
            (DeviceType::Memristive, self.memristive),
            (DeviceType::Capacitive, self.capacitive),
            (DeviceType::Conductive, self.conductive),
            (DeviceType::Ohmic, self.ohmic),
        ]
    }
    /// Sum of the positive class scores.
    pub fn total(&self) -> f64 {
        self.ranked().iter().map(|(_, s)| s.max(0.0)).sum()
    }
    /// First class holding the maximum score.
    pub fn leader(&self) -> (DeviceType, f64) {
        self.ranked()
            .into_iter()
            .fold((DeviceType::Memristive, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            })
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub device_type: DeviceType,
    pub confidence: f64,
    pub score_breakdown: ScoreBreakdown,
    pub explanation: BTreeMap<String, Value>,
}
pub struct Classifier<'a> {
    config: &'a AnalyzerConfig,
}
impl<'a> Classifier<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }
    pub fn classify(
        &self,
        features: &ClassificationFeatures,
        conduction: Option<&ConductionAnalysis>,
    ) -> ClassificationResult {
        let f = features;
        let mechanism = conduction.and_then(|c| c.conduction_mechanism);
        let ohmic_r2 = conduction.map_or(0.0, |c| c.r_squared(ConductionMechanism::Ohmic));
        let mut scores = ScoreBreakdown::default();
        let mut reasons: Vec<String> = Vec::new();
        let mut award = |slot: &mut f64, points: f64, why: &str| {
            *slot += points;
            reasons.push(format!("{points:+} {why}"));
        };

        if f.has_hysteresis {
            award(&mut scores.memristive, 25.0, "memristive: hysteresis");
        }
        if f.pinched_hysteresis {
            award(&mut scores.memristive, 30.0, "memristive: pinched at origin");
        }
        if f.switching_behavior {
            award(&mut scores.memristive, 25.0, "memristive: resistive switching");
        }
        if f.nonlinear_iv {
            award(&mut scores.memristive, 10.0, "memristive: nonlinear I-V");
        }
        if f.polarity_dependent {
            award(&mut scores.memristive, 10.0, "memristive: polarity dependent");
        }
        if f.linear_iv {
            award(&mut scores.memristive, -20.0, "memristive: linear I-V");
        }
        if f.ohmic_behavior {
            award(&mut scores.memristive, -30.0, "memristive: ohmic at low bias");
        }

        if f.has_hysteresis && !f.pinched_hysteresis {
            award(&mut scores.capacitive, 40.0, "capacitive: unpinched hysteresis");
        }
        if f.phase_shift_deg > self.config.phase_shift_deg {
            award(&mut scores.capacitive, 40.0, "capacitive: V/I phase shift");
        }
        if f.elliptical_hysteresis {
            award(&mut scores.capacitive, 20.0, "capacitive: elliptical loop");
        }

        if !f.has_hysteresis {
            award(&mut scores.conductive, 30.0, "conductive: no hysteresis");
        }
        if f.nonlinear_iv && !f.switching_behavior {
            award(&mut scores.conductive, 40.0, "conductive: nonlinear without switching");
        }
        if mechanism.map_or(false, |m| m.is_non_ohmic()) {
            award(&mut scores.conductive, 30.0, "conductive: non-ohmic transport");
        }

        let ohmic_guards = f.linear_iv
            && !f.has_hysteresis
            && !f.switching_behavior
            && f.median_relative_area < self.config.hysteresis_threshold
            && f.mean_on_off_ratio < 1.5
            && f.compliance_current.is_none();
        if ohmic_guards {
            award(&mut scores.ohmic, 60.0, "ohmic: linear without memory");
            if ohmic_r2 > 0.98 {
                award(&mut scores.ohmic, 20.0, "ohmic: resistor model fits");
            }
        }

        let (leader, max_score) = scores.leader();
        let (device_type, confidence) =
            if scores.total() <= 0.0 || max_score < self.config.uncertain_score {
                (DeviceType::Uncertain, 0.0)
            } else {
                (leader, (max_score / 100.0).clamp(0.0, 1.0))
            };
        log::debug!("classified as {} ({confidence:.2}) from {scores:?}", device_type.as_str());

        let mut explanation = BTreeMap::new();
        explanation.insert("features".to_string(), json!(f));
        explanation.insert("reasons".to_string(), json!(reasons));
        explanation.insert(
            "conduction_mechanism".to_string(),
            json!(mechanism.map(|m| m.as_str())),
        );
        explanation.insert("max_score".to_string(), json!(max_score));
        ClassificationResult {
            device_type,
            confidence,
            score_breakdown: scores,
            explanation,
        }
    }
}
