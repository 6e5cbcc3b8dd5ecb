//! Workspace umbrella crate.
//!
//! Re-exports the service façade so host applications can depend on
//! `melodyfetch-workspace` alone and pick bridges through feature flags
//! instead of wiring each workspace crate individually.

pub use core_service::*;
