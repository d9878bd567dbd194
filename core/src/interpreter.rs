//! Turns raw AI text into a [`DiagnosisResult`].
//!
//! Two stages:
//! 1. **Structured**: strip a code fence, decode strict JSON and require the
//!    `possibility`, `suggestion` and `reason` keys to be present and non-empty.
//! 2. **Heuristic**: when stage 1 fails, the whole (fence-stripped) text becomes
//!    both suggestion and reason, and the tier comes from the rule engine.
//!
//! The threshold table decides the tier whenever the AI's own label cannot be
//! mapped to a known tier, so a result never carries a nonsensical label.

use log::Level;
use serde_json::{json, Map, Value};

use crate::advice::build_advice;
use crate::agents::ProviderId;
use crate::errors::DiagnosisError;
use crate::logging::log_event;
use crate::model::{DiagnosisResult, DiagnosisSource, InterpretStage, PatientData, RiskTier};
use crate::rules::assess;

const EMPTY_SUGGESTION: &str = "Please consult a clinician to confirm these results.";
const EMPTY_REASON: &str =
    "The AI analysis returned no usable text; please consult a clinician for an interpretation.";

/// Remove a Markdown code-fence wrapper.
///
/// Accepted forms, after trimming surrounding whitespace:
/// - ```` ```json ... ``` ```` (the `json` tag is case-insensitive)
/// - ```` ``` ... ``` ````
/// - a single-backtick wrapper around a field value
///
/// A missing closing fence is tolerated. Wrappers are peeled until the text
/// stops changing, so the function is idempotent on any input.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    loop {
        let peeled = peel_fence(body);
        if peeled == body {
            return body;
        }
        body = peeled;
    }
}

fn peel_fence(text: &str) -> &str {
    let mut body = text;
    if body.starts_with('`') {
        body = body.trim_start_matches('`');
        if body
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        {
            body = &body[4..];
        }
    }
    body.trim().trim_end_matches('`').trim()
}

/// Interpret the text returned by `provider` for `patient`.
pub fn interpret(raw: &str, patient: &PatientData, provider: ProviderId) -> DiagnosisResult {
    match parse_structured(raw, patient) {
        Ok(result) => {
            log_event(
                Level::Info,
                Some("DX-0300"),
                "dx.interpret",
                "Structured AI response accepted",
                None,
                Some(json!({ "provider": provider, "risk": result.risk })),
            );
            result.with_source(DiagnosisSource::Ai {
                provider,
                stage: InterpretStage::Structured,
            })
        }
        Err(err) => {
            log_event(
                Level::Warn,
                Some("DX-0301"),
                "dx.interpret",
                "Falling back to heuristic parse",
                Some(err.explain()),
                Some(json!({ "provider": provider, "error": err.to_string() })),
            );
            parse_heuristic(raw, patient).with_source(DiagnosisSource::Ai {
                provider,
                stage: InterpretStage::Heuristic,
            })
        }
    }
}

/// Stage 1. The returned result carries [`DiagnosisSource::Rules`] until the
/// caller stamps the real source.
pub fn parse_structured(raw: &str, patient: &PatientData) -> Result<DiagnosisResult, DiagnosisError> {
    let decoded: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|err| DiagnosisError::StructuredParse(err.to_string()))?;
    let fields = decoded
        .as_object()
        .ok_or_else(|| DiagnosisError::StructuredParse("top-level value is not an object".into()))?;

    let possibility = required_field(fields, "possibility")?;
    let suggestion = required_field(fields, "suggestion")?;
    let reason = required_field(fields, "reason")?;
    let patient_advice = field_text(fields, "patientAdvice")
        .or_else(|| field_text(fields, "patient_advice"))
        .unwrap_or_else(|| build_advice(patient));

    let threshold_tier = assess(patient);
    let (risk, risk_label) = match RiskTier::from_label(&possibility) {
        Some(tier) => {
            if tier != threshold_tier && threshold_tier != RiskTier::Indeterminate {
                log_event(
                    Level::Warn,
                    Some("DX-0302"),
                    "dx.interpret",
                    "AI risk tier disagrees with thresholds",
                    Some("Keeping the AI label"),
                    Some(json!({ "ai": tier, "thresholds": threshold_tier })),
                );
            }
            (tier, possibility)
        }
        None => (threshold_tier, threshold_tier.label().to_string()),
    };

    Ok(DiagnosisResult {
        risk,
        risk_label,
        suggestion,
        reason,
        patient_advice,
        source: DiagnosisSource::Rules,
    })
}

/// Stage 2. Never fails.
pub fn parse_heuristic(raw: &str, patient: &PatientData) -> DiagnosisResult {
    let cleaned = strip_code_fence(raw);
    let risk = assess(patient);
    let (suggestion, reason) = if cleaned.is_empty() {
        (EMPTY_SUGGESTION.to_string(), EMPTY_REASON.to_string())
    } else {
        (cleaned.to_string(), cleaned.to_string())
    };
    DiagnosisResult {
        risk,
        risk_label: risk.label().to_string(),
        suggestion,
        reason,
        patient_advice: build_advice(patient),
        source: DiagnosisSource::Rules,
    }
}

fn required_field(fields: &Map<String, Value>, key: &str) -> Result<String, DiagnosisError> {
    field_text(fields, key)
        .ok_or_else(|| DiagnosisError::StructuredParse(format!("missing or empty key `{key}`")))
}

/// Scalar field as fence-stripped text; `None` when absent, null, a container
/// or blank.
fn field_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let cleaned = strip_code_fence(&text);
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{"possibility":"High risk","suggestion":"Confirm with OGTT.","reason":"HbA1c above 6.5%."}"#;

    fn patient() -> PatientData {
        PatientData::new("6.8", "7.2")
    }

    #[test]
    fn strips_documented_fence_forms() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  `High risk`  "), "High risk");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("plain text"), "plain text");
        assert_eq!(strip_code_fence("jsonish text"), "jsonish text");
        assert_eq!(strip_code_fence(""), "");
    }

    #[test]
    fn fence_stripping_is_idempotent() {
        for raw in [
            "```json\n{}\n```",
            "``` x ```",
            "`y`",
            "z",
            "```json json```",
            "` `json x`",
            "``` ```json\n{}\n``` ```",
        ] {
            let once = strip_code_fence(raw);
            assert_eq!(strip_code_fence(once), once, "{raw:?}");
        }
    }

    #[test]
    fn nested_wrappers_are_peeled_completely() {
        assert_eq!(strip_code_fence("` `json x`"), "x");
        assert_eq!(strip_code_fence("``` ```json\n{\"a\":1}\n``` ```"), "{\"a\":1}");
    }

    #[test]
    fn fenced_and_bare_replies_parse_identically() {
        let bare = parse_structured(REPLY, &patient()).unwrap();
        let fenced = parse_structured(&format!("```json\n{REPLY}\n```"), &patient()).unwrap();
        assert_eq!(bare, fenced);
        assert_eq!(bare.risk, RiskTier::High);
        assert_eq!(bare.risk_label, "High risk");
        assert_eq!(bare.suggestion, "Confirm with OGTT.");
    }

    #[test]
    fn field_values_are_fence_trimmed() {
        let raw = r#"{"possibility":"```json Moderate risk```","suggestion":"`Re-test`","reason":"```Borderline```"}"#;
        let result = parse_structured(raw, &PatientData::new("6.2", "6.5")).unwrap();
        assert_eq!(result.risk_label, "Moderate risk");
        assert_eq!(result.suggestion, "Re-test");
        assert_eq!(result.reason, "Borderline");
    }

    #[test]
    fn advice_from_ai_is_kept_otherwise_generated() {
        let generated = parse_structured(REPLY, &patient()).unwrap();
        assert_eq!(generated.patient_advice, build_advice(&patient()));

        let raw = r#"{"possibility":"High","suggestion":"s","reason":"r","patientAdvice":"Walk daily."}"#;
        let supplied = parse_structured(raw, &patient()).unwrap();
        assert_eq!(supplied.patient_advice, "Walk daily.");

        let blank = r#"{"possibility":"High","suggestion":"s","reason":"r","patientAdvice":"  "}"#;
        assert_eq!(
            parse_structured(blank, &patient()).unwrap().patient_advice,
            build_advice(&patient())
        );
    }

    #[test]
    fn missing_or_empty_keys_are_rejected() {
        let missing = r#"{"possibility":"High","suggestion":"s"}"#;
        assert!(matches!(
            parse_structured(missing, &patient()),
            Err(DiagnosisError::StructuredParse(msg)) if msg.contains("reason")
        ));
        let empty = r#"{"possibility":"","suggestion":"s","reason":"r"}"#;
        assert!(parse_structured(empty, &patient()).is_err());
        assert!(parse_structured("[1,2]", &patient()).is_err());
        assert!(parse_structured("not json", &patient()).is_err());
    }

    #[test]
    fn unknown_ai_label_defers_to_thresholds() {
        let raw = r#"{"possibility":"Concerning","suggestion":"s","reason":"r"}"#;
        let result = parse_structured(raw, &PatientData::new("6.2", "6.5")).unwrap();
        assert_eq!(result.risk, RiskTier::Moderate);
        assert_eq!(result.risk_label, RiskTier::Moderate.label());
    }

    #[test]
    fn ai_tier_follows_the_label_it_reports() {
        let cases = [
            ("Low risk, no high-risk indicators", ("5.4", "5.0"), RiskTier::Low),
            ("Moderate risk (glucose higher than normal)", ("6.2", "6.5"), RiskTier::Moderate),
            ("High risk; diabetes cannot be excluded", ("6.8", "7.2"), RiskTier::High),
            ("Not high risk, borderline moderate", ("6.2", "6.5"), RiskTier::Moderate),
            ("Low risk despite a high-normal HbA1c", ("6.8", "5.0"), RiskTier::Low),
        ];
        for (label, (hba1c, fbg), tier) in cases {
            let raw = json!({ "possibility": label, "suggestion": "s", "reason": "r" }).to_string();
            let result = parse_structured(&raw, &PatientData::new(hba1c, fbg)).unwrap();
            assert_eq!(result.risk, tier, "{label:?}");
            assert_eq!(result.risk_label, label);
            assert_eq!(RiskTier::from_label(&result.risk_label), Some(result.risk));
            assert_eq!(result.risk.is_alarming(), tier == RiskTier::High, "{label:?}");
        }
    }

    #[test]
    fn heuristic_uses_text_verbatim_and_thresholds_for_tier() {
        let raw = "```\nThe patient probably has low risk. Recheck in 3 months.\n```";
        let result = interpret(raw, &patient(), ProviderId::Gemini);
        assert_eq!(result.risk, RiskTier::High);
        assert_eq!(result.suggestion, "The patient probably has low risk. Recheck in 3 months.");
        assert_eq!(result.reason, result.suggestion);
        assert_eq!(result.patient_advice, build_advice(&patient()));
        assert_eq!(
            result.source,
            DiagnosisSource::Ai {
                provider: ProviderId::Gemini,
                stage: InterpretStage::Heuristic
            }
        );
    }

    #[test]
    fn empty_text_gets_clinician_placeholder() {
        let result = interpret("```json\n```", &PatientData::new("", "7.0"), ProviderId::Qwen);
        assert_eq!(result.risk, RiskTier::Indeterminate);
        assert!(result.suggestion.contains("consult a clinician"));
        assert!(result.reason.contains("consult a clinician"));
        assert!(result.is_complete());
    }

    #[test]
    fn structured_interpretation_is_stamped_with_provider() {
        let result = interpret(REPLY, &patient(), ProviderId::Claude);
        assert_eq!(
            result.source,
            DiagnosisSource::Ai {
                provider: ProviderId::Claude,
                stage: InterpretStage::Structured
            }
        );
        assert!(result.is_complete());
    }
}
