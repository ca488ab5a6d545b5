#![forbid(unsafe_code)]

//! Core model and simulation engine for pethsim.
//!
//! This crate provides:
//! - Domain types (drinking sessions, subject parameters, timeline samples)
//! - Parameter resolution and unit conversions
//! - The fixed-step BAC / PEth simulation engine
//! - Session file loading, timeline export and summaries
//! - Configuration and logging setup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod units;
pub mod params;
pub mod schedule;
pub mod kinetics;
pub mod horizon;
pub mod engine;
pub mod summary;
pub mod input;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, SimulationConfig};
pub use params::resolve_parameters;
pub use engine::simulate;
pub use summary::TimelineSummary;
pub use units::BacUnit;
pub use input::load_sessions;
pub use export::write_timeline_csv;
