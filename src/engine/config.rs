//! Ledger configuration options.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// First id handed out for each entity kind.
    pub first_id: u64,
    /// Record committed commands so the ledger can be rebuilt by replay.
    pub journal: bool,
    /// Maximum number of published events to retain in memory.
    pub event_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            first_id: 1,
            journal: true,
            event_history: 10_000,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.first_id == 0 {
            return Err(LedgerError::InvalidConfig(
                "first_id must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            serde_json::from_str(raw).map_err(|e| LedgerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
