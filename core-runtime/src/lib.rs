//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sync core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Monotonic clock for position projection
//!
//! ## Overview
//!
//! Everything here is shared by `core-sync` and `core-service`; nothing here
//! knows how peers are reconciled.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
