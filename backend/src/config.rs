//! Engine settings loaded via OrthoConfig.
//!
//! Values come from `WIFI_ADVISOR_*` environment variables, configuration
//! files and command-line flags, in the usual OrthoConfig precedence.

use std::num::NonZeroUsize;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{HistoryConfig, ParseSaturationGateError, SaturationGate};
use crate::outbound::persistence::PoolConfig;

/// Invalid setting values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// History limit of zero.
    #[error("max_history_per_category must be at least 1")]
    ZeroHistoryLimit,
    /// Unrecognised saturation gate name.
    #[error(transparent)]
    SaturationGate(#[from] ParseSaturationGateError),
    /// No database URL configured.
    #[error("database_url is not configured")]
    MissingDatabaseUrl,
}

/// Settings for the enrichment engine.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WIFI_ADVISOR")]
pub struct EngineSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Entries returned per history category.
    #[ortho_config(default = 5)]
    pub max_history_per_category: usize,
    /// `upload` (default) or `per_metric`.
    pub saturation_gate: Option<String>,
    /// Upper bound on pooled database connections.
    pub pool_max_size: Option<u32>,
}

impl EngineSettings {
    /// History limits; five entries per category unless configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroHistoryLimit`] for a limit of zero.
    pub fn history_config(&self) -> Result<HistoryConfig, SettingsError> {
        NonZeroUsize::new(self.max_history_per_category)
            .map(HistoryConfig::new)
            .ok_or(SettingsError::ZeroHistoryLimit)
    }

    /// Configured saturation gate, falling back to the upload gate.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::SaturationGate`] for an unknown name.
    pub fn saturation_gate(&self) -> Result<SaturationGate, SettingsError> {
        self.saturation_gate
            .as_deref()
            .map_or(Ok(SaturationGate::default()), str::parse)
            .map_err(SettingsError::from)
    }

    /// Pool settings for the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUrl`] when no URL is set.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or(SettingsError::MissingDatabaseUrl)?;
        let config = PoolConfig::new(url);
        Ok(match self.pool_max_size {
            Some(max_size) => config.with_max_size(max_size),
            None => config,
        })
    }
}
