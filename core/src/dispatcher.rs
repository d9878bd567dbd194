//! Entry point of a diagnosis call and owner of the failure boundary.
//!
//! The dispatcher resolves the requested provider, sends the prompt through
//! the matching adapter and hands the raw text to the interpreter. Any error
//! on that path (unknown provider, transport, malformed body) is logged and
//! replaced by the rule-engine result, so [`Dispatcher::diagnose`] never fails.

use anyhow::Result;
use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::agents::{AdapterSet, DispatcherSettings, ProviderDescriptor, ProviderRegistry};
use crate::errors::DiagnosisError;
use crate::interpreter::interpret;
use crate::logging::log_event;
use crate::model::{DiagnosisResult, DiagnosisSource, PatientData, ProviderCredentials};
use crate::prompt::{build_prompt, prompt_fingerprint};
use crate::rules::classify;

#[derive(Clone)]
pub struct Dispatcher {
    registry: ProviderRegistry,
    adapters: AdapterSet,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, adapters: AdapterSet, settings: DispatcherSettings) -> Self {
        Self {
            registry,
            adapters,
            settings,
        }
    }

    /// Dispatcher with real HTTP adapters built from `settings`.
    pub fn with_http(registry: ProviderRegistry, settings: DispatcherSettings) -> Result<Self> {
        let adapters = AdapterSet::http(&settings)?;
        Ok(Self::new(registry, adapters, settings))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Diagnose one patient. Without usable credentials the rule engine
    /// answers directly; with credentials the AI path is tried once.
    pub async fn diagnose(
        &self,
        patient: &PatientData,
        credentials: Option<&ProviderCredentials>,
    ) -> DiagnosisResult {
        let request_id = Uuid::new_v4();
        let Some(credentials) = credentials.filter(|c| c.has_secret()) else {
            log_event(
                Level::Info,
                Some("DX-0100"),
                "dx.dispatch",
                "No AI credentials supplied",
                Some("Using the rule engine"),
                Some(json!({ "request_id": request_id })),
            );
            return self.rules_result(patient, DiagnosisSource::Rules).await;
        };

        match self.call_provider(patient, credentials, request_id).await {
            Ok(result) => result,
            Err(err) => {
                log_invocation_failure(&credentials.provider_id, request_id, &err);
                let source = DiagnosisSource::Fallback {
                    code: err.code().to_string(),
                    reason: err.explain().to_string(),
                };
                self.rules_result(patient, source).await
            }
        }
    }

    async fn call_provider(
        &self,
        patient: &PatientData,
        credentials: &ProviderCredentials,
        request_id: Uuid,
    ) -> Result<DiagnosisResult, DiagnosisError> {
        let provider = self.registry.lookup(&credentials.provider_id)?;
        let prompt = build_prompt(patient);
        let fingerprint = prompt_fingerprint(&prompt);

        // Single attempt by policy: no retry, backoff or circuit breaking. A
        // resilience layer would wrap this call.
        let raw = self
            .adapters
            .for_dialect(provider.dialect())
            .send(provider, &prompt, credentials.secret.trim())
            .await?;

        log_invocation_success(provider, request_id, &fingerprint, &raw);
        Ok(interpret(&raw, patient, provider.id))
    }

    async fn rules_result(&self, patient: &PatientData, source: DiagnosisSource) -> DiagnosisResult {
        let latency = self.settings.simulated_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        classify(patient).with_source(source)
    }
}

fn log_invocation_success(
    provider: &ProviderDescriptor,
    request_id: Uuid,
    fingerprint: &str,
    raw: &str,
) {
    log_event(
        Level::Info,
        Some("DX-0200"),
        "dx.dispatch",
        "AI provider invocation succeeded",
        None,
        Some(json!({
            "request_id": request_id,
            "provider": provider.id,
            "model": provider.model_name,
            "prompt": fingerprint,
            "chars": raw.chars().count(),
        })),
    );
}

fn log_invocation_failure(provider_id: &str, request_id: Uuid, error: &DiagnosisError) {
    log_event(
        Level::Warn,
        Some("DX-0201"),
        "dx.dispatch",
        "AI provider invocation failed",
        Some("Falling back to the rule engine"),
        Some(json!({
            "request_id": request_id,
            "provider": provider_id,
            "code": error.code(),
            "transport": error.is_transport(),
            "error": error.to_string(),
        })),
    );
}
