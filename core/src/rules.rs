//! Deterministic diabetes-risk classifier.
//!
//! The thresholds here are illustrative screening cut-offs, not validated
//! clinical criteria. They are the single source of truth for tiering: the
//! advice generator, the heuristic interpreter stage and the prompt text all
//! read [`THRESHOLDS`].

use crate::advice::build_advice;
use crate::model::{DiagnosisResult, DiagnosisSource, PatientData, RiskTier};

/// Liver-enzyme markers that trigger the hormone-panel recommendation.
pub const LIVER_MARKERS: &[&str] = &["alt", "ast", "sgpt", "sgot"];

/// Lower bounds of the glycemic tiers. Both readings are compared with `>=`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlycemicThresholds {
    /// HbA1c (%) at or above which the tier is high.
    pub hba1c_high: f64,
    /// Fasting glucose (mmol/L) at or above which the tier is high.
    pub fbg_high: f64,
    pub hba1c_moderate: f64,
    pub fbg_moderate: f64,
}

pub const THRESHOLDS: GlycemicThresholds = GlycemicThresholds {
    hba1c_high: 6.5,
    fbg_high: 7.0,
    hba1c_moderate: 6.0,
    fbg_moderate: 6.1,
};

impl GlycemicThresholds {
    /// Tier for a pair of readings. Either reading crossing a bound raises the
    /// tier; tiers are checked high first.
    pub fn tier(&self, hba1c: f64, fbg: f64) -> RiskTier {
        if hba1c >= self.hba1c_high || fbg >= self.fbg_high {
            RiskTier::High
        } else if hba1c >= self.hba1c_moderate || fbg >= self.fbg_moderate {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }
}

/// Tier for a patient, `Indeterminate` when either required reading is
/// missing or unusable.
pub fn assess(patient: &PatientData) -> RiskTier {
    match (patient.hba1c_value(), patient.fbg_value()) {
        (Some(hba1c), Some(fbg)) => THRESHOLDS.tier(hba1c, fbg),
        _ => RiskTier::Indeterminate,
    }
}

/// Full rule-based result, including the deterministic patient advice.
pub fn classify(patient: &PatientData) -> DiagnosisResult {
    let risk = assess(patient);
    let (mut suggestion, reason) = match risk {
        RiskTier::Indeterminate => (
            "Please complete the required fields (HbA1c and fasting blood glucose).".to_string(),
            indeterminate_reason(patient),
        ),
        RiskTier::High => (
            if patient.has_biochem() {
                "Clinical confirmation is recommended before a diagnosis is made.".to_string()
            } else {
                "A full biochemical panel is recommended to complete the assessment.".to_string()
            },
            format!(
                "HbA1c is {}% and fasting blood glucose is {} mmol/L, which reaches the diabetes \
                 diagnostic threshold (HbA1c >= {:.1}% or fasting glucose >= {:.1} mmol/L). The \
                 results indicate clearly abnormal glucose metabolism, suggesting impaired \
                 beta-cell function with insufficient insulin secretion or insulin resistance.",
                patient.hba1c.trim(),
                patient.fbg.trim(),
                THRESHOLDS.hba1c_high,
                THRESHOLDS.fbg_high,
            ),
        ),
        RiskTier::Moderate => (
            "Re-test periodically and start lifestyle intervention: adjust diet and increase \
             physical activity."
                .to_string(),
            format!(
                "HbA1c is {}% and fasting blood glucose is {} mmol/L, close to the diabetes \
                 threshold (HbA1c {:.1}-{:.1}%, fasting glucose {:.1}-{:.1} mmol/L). This range \
                 is usually described as pre-diabetes or impaired glucose regulation: some \
                 insulin resistance or declining islet function is present, but the diagnostic \
                 criteria are not met. Active lifestyle intervention at this stage can still \
                 delay or reverse progression.",
                patient.hba1c.trim(),
                patient.fbg.trim(),
                THRESHOLDS.hba1c_moderate,
                THRESHOLDS.hba1c_high,
                THRESHOLDS.fbg_moderate,
                THRESHOLDS.fbg_high,
            ),
        ),
        RiskTier::Low => (
            "Continue routine health management with a balanced diet and regular exercise."
                .to_string(),
            format!(
                "No value exceeds the diabetes criteria. HbA1c {}% and fasting blood glucose {} \
                 mmol/L are both within the normal range, indicating good glucose metabolism and \
                 normal islet function. Keep a healthy lifestyle and check up regularly.",
                patient.hba1c.trim(),
                patient.fbg.trim(),
            ),
        ),
    };

    if patient.biochem_panel().mentions_any(LIVER_MARKERS) && !patient.has_hormones() {
        suggestion.push_str(
            " Given the liver-function markers, supplementary hormone tests such as insulin and \
             C-peptide are recommended to fully assess islet function.",
        );
    }

    DiagnosisResult {
        risk,
        risk_label: risk.label().to_string(),
        suggestion,
        reason,
        patient_advice: build_advice(patient),
        source: DiagnosisSource::Rules,
    }
}

fn indeterminate_reason(patient: &PatientData) -> String {
    let mut missing = Vec::new();
    if patient.hba1c_value().is_none() {
        missing.push("HbA1c");
    }
    if patient.fbg_value().is_none() {
        missing.push("fasting blood glucose");
    }
    format!(
        "Missing or invalid key values ({}); diabetes risk cannot be assessed reliably.",
        missing.join(" and ")
    )
}
