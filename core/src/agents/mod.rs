//! AI backend catalogue and wire adapters.

pub mod adapters;
pub mod config;
pub mod providers;

pub use adapters::{AdapterSet, ProviderAdapter};
pub use config::{DispatcherSettings, ProviderDescriptor, ProviderRegistry};
pub use providers::{ProviderId, WireDialect};
