//! Fixed catalogue of the AI backends the dispatcher knows how to reach.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DiagnosisError;

/// Known provider keys. Parsing any other string yields
/// [`DiagnosisError::UnknownProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    DeepSeek,
    Claude,
    Gemini,
    Qwen,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        Self::OpenAi,
        Self::Claude,
        Self::Gemini,
        Self::DeepSeek,
        Self::Qwen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Qwen => "qwen",
        }
    }

    /// Wire format spoken by the provider.
    pub fn dialect(&self) -> WireDialect {
        match self {
            Self::OpenAi | Self::DeepSeek => WireDialect::ChatCompletion,
            Self::Claude => WireDialect::MessageBlock,
            Self::Gemini => WireDialect::GenerativeContent,
            Self::Qwen => WireDialect::TaskInput,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == key)
            .ok_or_else(|| DiagnosisError::UnknownProvider(s.trim().to_string()))
    }
}

/// Request/response envelope families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireDialect {
    /// `{model, messages, temperature, max_tokens}` with bearer auth.
    ChatCompletion,
    /// `{model, max_tokens, messages}` with `x-api-key` and a version header.
    MessageBlock,
    /// `{contents, generationConfig}` with the key in the query string.
    GenerativeContent,
    /// `{model, input:{messages}, parameters}` with bearer auth.
    TaskInput,
}

pub struct ProviderSeed {
    pub id: ProviderId,
    pub display: &'static str,
    pub description: &'static str,
    pub endpoint: &'static str,
    pub default_model: &'static str,
}

pub const PROVIDER_SEEDS: &[ProviderSeed] = &[
    ProviderSeed {
        id: ProviderId::OpenAi,
        display: "ChatGPT",
        description: "OpenAI chat completions",
        endpoint: "https://api.openai.com/v1/chat/completions",
        default_model: "gpt-4",
    },
    ProviderSeed {
        id: ProviderId::Claude,
        display: "Claude",
        description: "Anthropic messages API",
        endpoint: "https://api.anthropic.com/v1/messages",
        default_model: "claude-3-sonnet-20240229",
    },
    ProviderSeed {
        id: ProviderId::Gemini,
        display: "Gemini",
        description: "Google generative language API",
        endpoint: "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
        default_model: "gemini-pro",
    },
    ProviderSeed {
        id: ProviderId::DeepSeek,
        display: "DeepSeek",
        description: "DeepSeek OpenAI-compatible chat completions",
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        default_model: "deepseek-chat",
    },
    ProviderSeed {
        id: ProviderId::Qwen,
        display: "Qwen",
        description: "Alibaba DashScope text generation",
        endpoint: "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
        default_model: "qwen-turbo",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_ids_case_insensitively() {
        assert_eq!(" OpenAI ".parse::<ProviderId>(), Ok(ProviderId::OpenAi));
        assert_eq!("qwen".parse::<ProviderId>(), Ok(ProviderId::Qwen));
        assert_eq!(
            "mistral".parse::<ProviderId>(),
            Err(DiagnosisError::UnknownProvider("mistral".into()))
        );
    }

    #[test]
    fn every_id_has_exactly_one_seed() {
        for id in ProviderId::ALL {
            assert_eq!(PROVIDER_SEEDS.iter().filter(|s| s.id == id).count(), 1, "{id}");
        }
        assert_eq!(PROVIDER_SEEDS.len(), ProviderId::ALL.len());
    }

    #[test]
    fn chat_completion_dialect_is_shared() {
        assert_eq!(ProviderId::OpenAi.dialect(), WireDialect::ChatCompletion);
        assert_eq!(ProviderId::DeepSeek.dialect(), WireDialect::ChatCompletion);
        assert_eq!(ProviderId::Claude.dialect(), WireDialect::MessageBlock);
        assert_eq!(ProviderId::Gemini.dialect(), WireDialect::GenerativeContent);
        assert_eq!(ProviderId::Qwen.dialect(), WireDialect::TaskInput);
    }

    #[test]
    fn serde_uses_lowercase_keys() {
        assert_eq!(serde_json::to_string(&ProviderId::DeepSeek).unwrap(), "\"deepseek\"");
        assert_eq!(serde_json::to_string(&ProviderId::OpenAi).unwrap(), "\"openai\"");
    }
}
