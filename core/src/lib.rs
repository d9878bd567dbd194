//! Core library for diabetes-risk screening from lab values.
//!
//! The boundaries between responsibilities:
//! - [`agents`] holds the provider catalogue and one wire adapter per dialect.
//! - [`dispatcher`] runs a diagnosis and owns the AI-to-rules fallback.
//! - [`prompt`] builds the instruction text sent to AI backends.
//! - [`interpreter`] turns raw AI text into the canonical result.
//! - [`rules`] and [`advice`] are the deterministic engines.
//! - [`model`] defines the per-request value objects.
//! - [`errors`] keeps the error catalogue with human friendly metadata.
//! - [`logging`] emits structured diagnostic events.
//! - [`api`] exposes the call surface the UI invokes.

pub mod advice;
pub mod agents;
pub mod api;
pub mod dispatcher;
pub mod errors;
pub mod interpreter;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod rules;

pub use dispatcher::Dispatcher;
pub use errors::DiagnosisError;
pub use model::{DiagnosisResult, DiagnosisSource, PatientData, ProviderCredentials, RiskTier};
