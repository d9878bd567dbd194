//! Value objects shared by every stage of a diagnosis call.
//!
//! Everything here is constructed per request and dropped when the call
//! returns; nothing is cached or shared between calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agents::ProviderId;

/// Lab values for one patient as entered on the form.
///
/// The two required readings stay textual so that an empty or garbled entry
/// can be reported as "indeterminate" instead of being rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientData {
    /// Glycated hemoglobin, percent.
    #[serde(default)]
    pub hba1c: String,
    /// Fasting blood glucose, mmol/L.
    #[serde(default)]
    pub fbg: String,
    /// Other biochemistry as `name:value` pairs, e.g. `ALT:23,AST:19,Cr:60`.
    #[serde(default)]
    pub biochem: String,
    /// Hormone panel in the same shape, e.g. `INS:15,C-P:2.3`.
    #[serde(default)]
    pub hormones: String,
    /// Extension fields carried along but never interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl PatientData {
    pub fn new(hba1c: impl Into<String>, fbg: impl Into<String>) -> Self {
        Self {
            hba1c: hba1c.into(),
            fbg: fbg.into(),
            ..Self::default()
        }
    }

    pub fn with_biochem(mut self, biochem: impl Into<String>) -> Self {
        self.biochem = biochem.into();
        self
    }

    pub fn with_hormones(mut self, hormones: impl Into<String>) -> Self {
        self.hormones = hormones.into();
        self
    }

    pub fn hba1c_value(&self) -> Option<f64> {
        parse_reading(&self.hba1c)
    }

    pub fn fbg_value(&self) -> Option<f64> {
        parse_reading(&self.fbg)
    }

    pub fn has_biochem(&self) -> bool {
        !self.biochem.trim().is_empty()
    }

    pub fn has_hormones(&self) -> bool {
        !self.hormones.trim().is_empty()
    }

    pub fn biochem_panel(&self) -> LabPanel {
        LabPanel::parse(&self.biochem)
    }

    /// Supplied readings in form order, skipping blank fields.
    pub fn overview(&self) -> Vec<LabReading> {
        [
            ("HbA1c", self.hba1c.as_str(), Some("%")),
            ("Fasting blood glucose", self.fbg.as_str(), Some("mmol/L")),
            ("Other biochemistry", self.biochem.as_str(), None),
            ("Hormones", self.hormones.as_str(), None),
        ]
        .into_iter()
        .filter(|(_, value, _)| !value.trim().is_empty())
        .map(|(label, value, unit)| LabReading {
            label,
            value: value.trim().to_string(),
            unit,
        })
        .collect()
    }
}

/// A required reading is usable only when it is a finite, non-negative decimal.
pub fn parse_reading(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// One row of the entered-data overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabReading {
    pub label: &'static str,
    pub value: String,
    pub unit: Option<&'static str>,
}

/// Names of the entries in a free-text `name:value` list. Values are not
/// interpreted by the core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabPanel {
    names: Vec<String>,
}

impl LabPanel {
    pub fn parse(text: &str) -> Self {
        let names = text
            .split([',', '，', ';', '；', '\n'])
            .map(|entry| match entry.split_once([':', '：']) {
                Some((name, _)) => name.trim(),
                None => entry.trim(),
            })
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    /// True when any entry name contains one of `markers` as a whole word.
    /// Matching is case-insensitive.
    pub fn mentions_any(&self, markers: &[&str]) -> bool {
        self.names.iter().any(|name| {
            name.split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .any(|token| markers.iter().any(|m| token.eq_ignore_ascii_case(m)))
        })
    }
}

/// Closed set of diabetes risk tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Indeterminate,
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Indeterminate => "Indeterminate",
            Self::Low => "Low diabetes risk",
            Self::Moderate => "Moderate diabetes risk",
            Self::High => "High diabetes risk",
        }
    }

    /// High-risk results are surfaced with an alarming notification style.
    pub fn is_alarming(&self) -> bool {
        matches!(self, Self::High)
    }

    /// Map a free-text tier label (as returned by an AI backend) to a tier.
    ///
    /// The tier named first in the label wins, so "Low risk, no high-risk
    /// indicators" is low. English keywords match whole words only and are
    /// ignored right after a negation ("not high"). Inconclusive wording such as
    /// "unable" or "insufficient" yields [`RiskTier::Indeterminate`] only when no
    /// tier is named at all.
    pub fn from_label(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        const TIER_KEYWORDS: &[(RiskTier, &[&str])] = &[
            (RiskTier::Indeterminate, &["indeterminate", "undetermined"]),
            (RiskTier::High, &["high", "高"]),
            (
                RiskTier::Moderate,
                &["moderate", "medium", "intermediate", "中等", "中"],
            ),
            (RiskTier::Low, &["low", "较低", "低"]),
        ];
        const INCONCLUSIVE: &[&str] = &["unable", "cannot", "insufficient", "无法"];

        let named = TIER_KEYWORDS
            .iter()
            .filter_map(|(tier, keywords)| {
                keywords
                    .iter()
                    .filter_map(|keyword| first_affirmed(&lowered, keyword))
                    .min()
                    .map(|pos| (pos, *tier))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, tier)| tier);

        named.or_else(|| {
            INCONCLUSIVE
                .iter()
                .any(|keyword| lowered.contains(keyword))
                .then_some(Self::Indeterminate)
        })
    }
}

const NEGATIONS: &[&str] = &["no", "not", "non", "without"];
const CJK_NEGATIONS: &[char] = &['不', '非'];

/// Byte offset of the first occurrence of `keyword` in `text` that is not
/// negated. ASCII keywords must stand as a whole word.
fn first_affirmed(text: &str, keyword: &str) -> Option<usize> {
    text.match_indices(keyword)
        .map(|(pos, _)| pos)
        .find(|&pos| {
            let before = &text[..pos];
            let after = &text[pos + keyword.len()..];
            if !keyword.is_ascii() {
                return !before
                    .chars()
                    .next_back()
                    .is_some_and(|c| CJK_NEGATIONS.contains(&c));
            }
            let whole_word = !before.chars().next_back().is_some_and(char::is_alphanumeric)
                && !after.chars().next().is_some_and(char::is_alphanumeric);
            let negated = before
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| !word.is_empty())
                .next_back()
                .is_some_and(|word| NEGATIONS.contains(&word));
            whole_word && !negated
        })
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Credentials for one AI backend. Absent credentials select the rule engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub provider_id: String,
    pub secret: String,
}

impl ProviderCredentials {
    pub fn new(provider_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            secret: secret.into(),
        }
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.trim().is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider_id", &self.provider_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Which parse stage produced an AI-backed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretStage {
    Structured,
    Heuristic,
}

/// Where a result came from, so the caller can word its notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosisSource {
    Ai {
        provider: ProviderId,
        stage: InterpretStage,
    },
    /// No credentials were supplied.
    Rules,
    /// An AI call was attempted and failed.
    Fallback { code: String, reason: String },
}

impl DiagnosisSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Canonical result of a diagnosis call. All text fields are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub risk: RiskTier,
    pub risk_label: String,
    pub suggestion: String,
    pub reason: String,
    pub patient_advice: String,
    pub source: DiagnosisSource,
}

impl DiagnosisResult {
    pub fn with_source(mut self, source: DiagnosisSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_complete(&self) -> bool {
        [
            &self.risk_label,
            &self.suggestion,
            &self.reason,
            &self.patient_advice,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reading_rejects_blank_negative_and_garbage() {
        assert_eq!(parse_reading(" 6.8 "), Some(6.8));
        assert_eq!(parse_reading("0"), Some(0.0));
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("   "), None);
        assert_eq!(parse_reading("-1.2"), None);
        assert_eq!(parse_reading("abc"), None);
        assert_eq!(parse_reading("NaN"), None);
        assert_eq!(parse_reading("inf"), None);
    }

    #[test]
    fn lab_panel_splits_pairs() {
        let panel = LabPanel::parse("ALT:23, AST：19；Cr:60\nurea, :5");
        assert_eq!(panel.names, ["ALT", "AST", "Cr", "urea"]);
    }

    #[test]
    fn lab_panel_matches_whole_words_only() {
        let panel = LabPanel::parse("LDL-C:3.1, fasting insulin:12");
        assert!(panel.mentions_any(&["ldl"]));
        assert!(!panel.mentions_any(&["ast"]));
        assert!(!panel.mentions_any(&["alt"]));
        assert!(LabPanel::parse("alt:40").mentions_any(&["ALT"]));
        assert!(!LabPanel::parse("").mentions_any(&["alt"]));
    }

    #[test]
    fn overview_skips_blank_fields() {
        let patient = PatientData::new("6.8", "").with_hormones("INS:15");
        let rows = patient.overview();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "HbA1c");
        assert_eq!(rows[0].unit, Some("%"));
        assert_eq!(rows[1].label, "Hormones");
        assert_eq!(rows[1].unit, None);
    }

    #[test]
    fn tier_from_label_understands_common_wordings() {
        assert_eq!(RiskTier::from_label("High risk"), Some(RiskTier::High));
        assert_eq!(RiskTier::from_label("moderate risk"), Some(RiskTier::Moderate));
        assert_eq!(RiskTier::from_label("Low Risk"), Some(RiskTier::Low));
        assert_eq!(RiskTier::from_label("Unable to determine"), Some(RiskTier::Indeterminate));
        assert_eq!(RiskTier::from_label("糖尿病高风险"), Some(RiskTier::High));
        assert_eq!(RiskTier::from_label("糖尿病风险中等"), Some(RiskTier::Moderate));
        assert_eq!(RiskTier::from_label("风险较低"), Some(RiskTier::Low));
        assert_eq!(RiskTier::from_label("无法判断"), Some(RiskTier::Indeterminate));
        assert_eq!(RiskTier::from_label("banana"), None);
        assert_eq!(RiskTier::from_label(""), None);
    }

    #[test]
    fn tier_from_label_prefers_the_tier_named_first() {
        let cases = [
            ("Low risk, no high-risk indicators", RiskTier::Low),
            ("Moderate risk (glucose higher than normal)", RiskTier::Moderate),
            ("High risk; diabetes cannot be excluded", RiskTier::High),
            ("Not high risk, moderate at most", RiskTier::Moderate),
            ("Insufficient data, but low risk overall", RiskTier::Low),
            ("Risk is highly likely low", RiskTier::Low),
            ("Indeterminate, high HbA1c but FBG missing", RiskTier::Indeterminate),
            ("Cannot determine", RiskTier::Indeterminate),
            ("无法确定", RiskTier::Indeterminate),
            ("血糖不高，风险较低", RiskTier::Low),
        ];
        for (label, tier) in cases {
            assert_eq!(RiskTier::from_label(label), Some(tier), "{label:?}");
        }
        assert_eq!(RiskTier::from_label("Highest priority"), None);
        assert_eq!(RiskTier::from_label("no high values"), None);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = ProviderCredentials::new("openai", "sk-very-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("openai"));
        assert!(!printed.contains("sk-very-secret"));
        assert!(!ProviderCredentials::new("openai", "  ").has_secret());
    }

    #[test]
    fn extension_fields_survive_deserialisation() {
        let patient: PatientData =
            serde_json::from_str(r#"{"hba1c":"6.1","fbg":"5.2","ward":"3B"}"#).unwrap();
        assert_eq!(patient.extra.get("ward").map(String::as_str), Some("3B"));
        assert_eq!(patient.biochem, "");
    }
}
