//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the melody catalog core:
//! - Logging and tracing infrastructure
//! - Configuration management, including the remote catalog settings
//! - Event bus for status notifications
//!
//! ## Overview
//!
//! Other crates depend on this one for their configuration types and to
//! report what they are doing. It holds no catalog logic itself.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
