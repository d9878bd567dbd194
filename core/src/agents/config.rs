use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::providers::{ProviderId, WireDialect, PROVIDER_SEEDS};
use crate::errors::DiagnosisError;

/// Connection metadata for one AI backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: String,
    pub description: String,
    pub endpoint: String,
    pub model_name: String,
}

impl ProviderDescriptor {
    pub fn dialect(&self) -> WireDialect {
        self.id.dialect()
    }
}

/// Read-only mapping from provider id to descriptor, handed to the
/// dispatcher at construction time.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// The five providers shipped with the application.
    pub fn builtin() -> Self {
        PROVIDER_SEEDS
            .iter()
            .fold(Self::empty(), |registry, seed| {
                registry.with(ProviderDescriptor {
                    id: seed.id,
                    display_name: seed.display.to_string(),
                    description: seed.description.to_string(),
                    endpoint: seed.endpoint.to_string(),
                    model_name: seed.default_model.to_string(),
                })
            })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Only used while assembling a registry.
    pub fn with(mut self, descriptor: ProviderDescriptor) -> Self {
        self.providers.insert(descriptor.id, descriptor);
        self
    }

    pub fn lookup(&self, id: &str) -> Result<&ProviderDescriptor, DiagnosisError> {
        let key: ProviderId = id.parse()?;
        self.providers
            .get(&key)
            .ok_or_else(|| DiagnosisError::UnknownProvider(id.trim().to_string()))
    }

    pub fn get(&self, id: ProviderId) -> Option<&ProviderDescriptor> {
        self.providers.get(&id)
    }

    /// Entries in catalogue order (the order of [`ProviderId::ALL`]).
    pub fn list(&self) -> Vec<&ProviderDescriptor> {
        ProviderId::ALL
            .iter()
            .filter_map(|id| self.providers.get(id))
            .collect()
    }
}

const DEFAULT_SIMULATED_LATENCY_MS: u64 = 1200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 45;
const DEFAULT_USER_AGENT: &str = "GlycoDx-Core/0.1";

/// Runtime knobs for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// Artificial pause before a rule-engine result is returned.
    pub simulated_latency_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            simulated_latency_ms: DEFAULT_SIMULATED_LATENCY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DispatcherSettings {
    /// Settings for headless callers and tests: no artificial delay.
    pub fn headless() -> Self {
        Self {
            simulated_latency_ms: 0,
            ..Self::default()
        }
    }

    /// Defaults overlaid with `GLYCODX_*` environment variables. Values that
    /// fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            simulated_latency_ms: read_setting(&lookup, "GLYCODX_SIMULATED_LATENCY_MS")
                .unwrap_or(defaults.simulated_latency_ms),
            request_timeout_secs: read_setting(&lookup, "GLYCODX_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            user_agent: lookup("GLYCODX_USER_AGENT")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.user_agent),
        }
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn read_setting(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    lookup(key).and_then(|value| value.trim().parse::<u64>().ok())
}
