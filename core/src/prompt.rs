//! Instruction text sent to every AI backend.
//!
//! The interpreter's structured stage relies on the backend honouring the
//! JSON schema requested here, so changes to this text change the contract
//! with every provider. `prompt_matches_reference_text` pins it.

use sha2::{Digest, Sha256};

use crate::model::PatientData;
use crate::rules::THRESHOLDS;

const NONE_PLACEHOLDER: &str = "none";

/// Build the diagnosis prompt for one patient. Pure and total.
pub fn build_prompt(patient: &PatientData) -> String {
    let biochem = optional_field(&patient.biochem);
    let hormones = optional_field(&patient.hormones);
    format!(
        r#"As a professional medical AI diagnostic assistant, assess the diabetes risk of the patient from the following lab data:

Patient data:
- Glycated hemoglobin (HbA1c): {hba1c}%
- Fasting blood glucose: {fbg} mmol/L
- Other biochemistry: {biochem}
- Hormones: {hormones}

Return the diagnosis as JSON with exactly these fields:
{{
  "possibility": "diabetes risk tier (high risk / moderate risk / low risk / indeterminate)",
  "suggestion": "specific medical advice and recommended follow-up tests",
  "reason": "detailed diagnostic basis and medical explanation"
}}

Reference criteria:
- HbA1c >= {hh:.1}% or fasting blood glucose >= {fh:.1} mmol/L: high risk
- HbA1c {hm:.1}-{hm_top:.1}% or fasting blood glucose {fm:.1}-{fm_top:.1} mmol/L: moderate risk
- Below these values: low risk

Return strict JSON only, with no other text."#,
        hba1c = patient.hba1c,
        fbg = patient.fbg,
        hh = THRESHOLDS.hba1c_high,
        fh = THRESHOLDS.fbg_high,
        hm = THRESHOLDS.hba1c_moderate,
        hm_top = THRESHOLDS.hba1c_high - 0.1,
        fm = THRESHOLDS.fbg_moderate,
        fm_top = THRESHOLDS.fbg_high - 0.1,
    )
}

/// Short SHA-256 digest used to correlate log events of one prompt without
/// logging patient data.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(prompt.as_bytes()));
    digest[..16].to_string()
}

fn optional_field(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NONE_PLACEHOLDER
    } else {
        trimmed
    }
}
