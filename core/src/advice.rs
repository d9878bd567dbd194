//! Patient-facing lifestyle guidance built from fixed templates.
//!
//! Tiering comes from [`crate::rules::assess`], so the advice can never
//! disagree with the rule engine about which tier a patient is in.

use crate::model::{PatientData, RiskTier};
use crate::rules::{assess, LIVER_MARKERS};

const RENAL_MARKERS: &[&str] = &["cr", "crea", "creatinine", "scr", "urea", "bun"];
const LIPID_MARKERS: &[&str] = &[
    "tc",
    "ldl",
    "hdl",
    "tg",
    "cholesterol",
    "triglyceride",
    "triglycerides",
];

const HIGH_RISK_SECTIONS: &str = "\
Diet control:
- Strictly limit carbohydrate intake and choose low glycemic index foods
- Eat smaller, more frequent meals and avoid overeating
- Cut down on refined sugar, sweets and sugary drinks
- Increase dietary fibre with plenty of vegetables and moderate fruit

Exercise:
- At least 150 minutes of moderate aerobic exercise per week
- A walk 30-60 minutes after meals helps lower blood glucose
- Add resistance training to improve insulin sensitivity

Important:
- Monitor blood glucose regularly and keep a glucose diary
- Take medication as prescribed; never stop or change doses on your own
- Seek medical care promptly for excessive thirst, frequent urination or weight loss
";

const MODERATE_RISK_SECTIONS: &str = "\
Prevention:
- Keep body weight in the healthy range (BMI 18.5-23.9)
- Eat a balanced diet and reduce high-sugar, high-fat foods
- Exercise regularly, at least 30 minutes a day
- Stop smoking, limit alcohol and keep healthy habits
- Re-check HbA1c every 3-6 months
";

const LOW_RISK_SECTIONS: &str = "\
Staying healthy:
- Your glucose indicators are normal; keep up your healthy lifestyle
- Eat a balanced diet and stay physically active
- Have a yearly check-up to monitor blood glucose
";

const INDETERMINATE_SECTIONS: &str = "\
Next steps:
- Both HbA1c and fasting blood glucose are needed for a risk assessment
- Arrange the missing tests and review the results with your doctor
";

const DISCLAIMER: &str = "\
Friendly reminder:
- This advice is for reference only; ask a qualified doctor for a treatment plan
- See a doctor promptly if you feel unwell
- Stay positive: diabetes can be controlled and managed";

/// Multi-section advice text. Always ends with the disclaimer section.
pub fn build_advice(patient: &PatientData) -> String {
    let mut sections: Vec<String> = vec![tier_sections(assess(patient)).to_string()];

    if patient.has_biochem() {
        let panel = patient.biochem_panel();
        let notes: Vec<&str> = [
            (
                LIVER_MARKERS,
                "- Liver function: if abnormal, look after your liver, avoid alcohol and reduce \
                 high-fat foods\n",
            ),
            (
                RENAL_MARKERS,
                "- Kidney function: moderate protein intake, drink enough water and avoid \
                 burdening the kidneys\n",
            ),
            (
                LIPID_MARKERS,
                "- Blood lipids: limit cholesterol intake, add omega-3 fatty acids and stay \
                 active\n",
            ),
        ]
        .into_iter()
        .filter(|(markers, _)| panel.mentions_any(markers))
        .map(|(_, note)| note)
        .collect();
        if !notes.is_empty() {
            sections.push(format!("Other indicators:\n{}", notes.concat()));
        }
    }

    if patient.has_hormones() {
        sections.push(
            "Hormone levels:\n\
             - If hormone levels are abnormal, follow your doctor's targeted treatment\n\
             - Keep a regular routine and reduce stress to help hormone balance\n"
                .to_string(),
        );
    }

    sections.push(DISCLAIMER.to_string());
    sections.join("\n")
}

fn tier_sections(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::High => HIGH_RISK_SECTIONS,
        RiskTier::Moderate => MODERATE_RISK_SECTIONS,
        RiskTier::Low => LOW_RISK_SECTIONS,
        RiskTier::Indeterminate => INDETERMINATE_SECTIONS,
    }
}
