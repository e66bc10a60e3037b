//! Enrichment and aggregation engine for Wi-Fi Advisor network diagnostic
//! submissions.
//!
//! Submissions are validated, tagged with the client's Autonomous System
//! and stored; history reads join device vendors and NDT percentile
//! buckets onto the client's most recent measurements.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

pub use bootstrap::{BootstrapError, Engine, load_enrichment_tables};
pub use config::{EngineSettings, SettingsError};
