#![forbid(unsafe_code)]

//! Core domain model and BAC estimation for Apéro.
//!
//! This crate provides:
//! - Domain types (profile, drinks, estimates, forecast points)
//! - The BAC estimation engine (Watson TBW, absorption, elimination)
//! - Phase segmentation of forecasts
//! - Drink presets
//! - Persistence (profile, JSONL drink log, CSV history)

pub mod types;
pub mod error;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod logging;
pub mod engine;
pub mod phases;
pub mod state;
pub mod drink_log;
pub mod csv_rollup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{get_default_catalog, DrinkCatalog, DrinkPreset};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::{classify, estimate, predict, BacModel, ModelParams};
pub use phases::{phase_segments, upcoming_phase_changes};
pub use drink_log::{DrinkSink, JsonlDrinkLog};
