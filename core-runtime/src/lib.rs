//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the feeder core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event sinks shared by repositories, playlists and the process-wide bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the domain crates depend on.
//! It establishes the logging conventions, the configuration builder, and the
//! broadcast mechanism every observable component uses.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
