//! Version 1 of the diagnosis call surface.
//!
//! Handlers are thin: they coerce the loosely-typed form payload into
//! [`PatientData`], reject values the core must never see, run the
//! dispatcher and wrap the result with the metadata the UI needs for its
//! notifications.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::agents::{DispatcherSettings, ProviderId, ProviderRegistry, WireDialect};
use crate::dispatcher::Dispatcher;
use crate::model::{
    parse_reading, DiagnosisResult, DiagnosisSource, LabReading, PatientData, ProviderCredentials,
};

/// Provider preselected in the UI.
pub const DEFAULT_PROVIDER: ProviderId = ProviderId::OpenAi;

/// Shared state handed to each handler.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
}

impl ApiState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Built-in providers, real HTTP adapters, settings from the environment.
    pub fn from_env() -> Result<Self> {
        let dispatcher =
            Dispatcher::with_http(ProviderRegistry::builtin(), DispatcherSettings::from_env())?;
        Ok(Self::new(dispatcher))
    }
}

/// Simple health check.
pub fn ping() -> Value {
    serde_json::json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderView {
    pub id: ProviderId,
    pub display_name: String,
    pub description: String,
    pub model_name: String,
    pub dialect: WireDialect,
    pub is_default: bool,
}

/// Providers for the selector, in catalogue order.
pub fn list_providers(state: &ApiState) -> Vec<ProviderView> {
    state
        .dispatcher
        .registry()
        .list()
        .into_iter()
        .map(|p| ProviderView {
            id: p.id,
            display_name: p.display_name.clone(),
            description: p.description.clone(),
            model_name: p.model_name.clone(),
            dialect: p.dialect(),
            is_default: p.id == DEFAULT_PROVIDER,
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseInput {
    /// Form fields; values may be strings or numbers.
    pub patient: Value,
    #[serde(default)]
    pub credentials: Option<ProviderCredentials>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseOutput {
    #[serde(flatten)]
    pub result: DiagnosisResult,
    pub overview: Vec<LabReading>,
    /// Show the result with an alarming style.
    pub alert: bool,
    /// Advisory text when the AI path was attempted but not used.
    pub notice: Option<String>,
    pub generated_at: i64,
}

/// Run one diagnosis. Errors only for payloads rejected at the boundary.
pub async fn diagnose(state: &ApiState, input: DiagnoseInput) -> Result<DiagnoseOutput, String> {
    let patient = patient_from_json(&input.patient)?;
    let result = state
        .dispatcher
        .diagnose(&patient, input.credentials.as_ref())
        .await;
    let notice = match &result.source {
        DiagnosisSource::Fallback { reason, .. } => Some(format!(
            "AI-backed diagnosis was unavailable ({reason}); a rule-based result is shown instead."
        )),
        _ => None,
    };
    Ok(DiagnoseOutput {
        alert: result.risk.is_alarming(),
        overview: patient.overview(),
        notice,
        generated_at: OffsetDateTime::now_utc().unix_timestamp(),
        result,
    })
}

/// Coerce a form payload into [`PatientData`].
///
/// Strings are kept as-is, numbers are rendered as text and `null` becomes an
/// empty field. Required readings that are present must be non-negative
/// numbers; blank ones stay blank and yield an indeterminate result.
pub fn patient_from_json(payload: &Value) -> Result<PatientData, String> {
    let fields: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| "patient data must be a JSON object".to_string())?;
    let mut patient = PatientData::default();
    for (key, value) in fields {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
            _ => return Err(format!("field `{key}` must be text or a number")),
        };
        match key.as_str() {
            "hba1c" => patient.hba1c = text,
            "fbg" => patient.fbg = text,
            "biochem" => patient.biochem = text,
            "hormones" => patient.hormones = text,
            _ => {
                patient.extra.insert(key.clone(), text);
            }
        }
    }
    check_reading("HbA1c", &patient.hba1c)?;
    check_reading("Fasting blood glucose", &patient.fbg)?;
    Ok(patient)
}

fn check_reading(label: &str, raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() || parse_reading(raw).is_some() {
        Ok(())
    } else {
        Err(format!("{label} must be a non-negative number, got `{}`", raw.trim()))
    }
}
