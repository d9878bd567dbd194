//! Call surface exposed to the UI layer.
//!
//! Versioned modules (currently `v1`) keep the interface stable while the
//! core evolves underneath.

pub mod v1;
