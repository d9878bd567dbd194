use thiserror::Error;

/// Failure catalogue for a single diagnosis call.
///
/// None of these ever reach the caller of [`crate::dispatcher::Dispatcher::diagnose`]:
/// the dispatcher recovers every one of them by switching to the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosisError {
    #[error("Unknown AI provider: {0}")] UnknownProvider(String),
    #[error("HTTP {status}: {status_text}")] Transport { status: u16, status_text: String },
    #[error("Connection failed: {0}")] Connection(String),
    #[error("Malformed provider response: {0}")] MalformedResponse(String),
    #[error("Structured parse failed: {0}")] StructuredParse(String),
}

impl DiagnosisError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "DX-1001",
            Self::Transport { .. } => "DX-1002",
            Self::Connection(_) => "DX-1003",
            Self::MalformedResponse(_) => "DX-1004",
            Self::StructuredParse(_) => "DX-1005",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "The requested AI provider is not in the catalogue.",
            Self::Transport { .. } => "The AI provider answered with a non-success HTTP status.",
            Self::Connection(_) => "The AI provider could not be reached.",
            Self::MalformedResponse(_) => "The AI provider returned a body that is not valid JSON.",
            Self::StructuredParse(_) => "The AI text did not follow the requested JSON schema.",
        }
    }

    /// Both the HTTP-status and the connection-level failure count as transport errors.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DiagnosisError::UnknownProvider("x".into()),
            DiagnosisError::Transport { status: 500, status_text: "Internal Server Error".into() },
            DiagnosisError::Connection("refused".into()),
            DiagnosisError::MalformedResponse("eof".into()),
            DiagnosisError::StructuredParse("missing reason".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn transport_display_carries_status() {
        let err = DiagnosisError::Transport { status: 503, status_text: "Service Unavailable".into() };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert!(err.is_transport());
        assert!(DiagnosisError::Connection("timeout".into()).is_transport());
        assert!(!DiagnosisError::UnknownProvider("acme".into()).is_transport());
    }
}
