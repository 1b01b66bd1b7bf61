//! Configuration module
//!
//! Handles solver thresholds, capture geometry and tap targets.

pub mod settings;

pub use settings::{ConfigError, SolverSettings};
