//! Runtime configuration of an aggregation run.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::engine::PartyId;
use crate::error::ConfigError;

/// Who holds shares, who learns opened values, and how long to wait for respondents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Parties holding a share of every secret.
    pub holders: Vec<PartyId>,
    /// Parties that learn every opened value; a subset of `holders`.
    pub revealers: Vec<PartyId>,
    /// Shares needed to reconstruct; `None` means every holder.
    pub threshold: Option<usize>,
    /// Upper bound on waiting for one respondent's shares; `None` waits indefinitely.
    pub share_timeout_ms: Option<u64>,
    /// Seed for the local engine's dealer.
    pub seed: Option<u64>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            holders: vec![PartyId::Analyst, PartyId::Coordinator],
            revealers: vec![PartyId::Analyst, PartyId::Coordinator],
            threshold: None,
            share_timeout_ms: None,
            seed: None,
        }
    }
}

impl AggregationConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn threshold(&self) -> usize {
        self.threshold.unwrap_or(self.holders.len())
    }

    pub fn share_timeout(&self) -> Option<Duration> {
        self.share_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.holders.len() < 2 {
            return Err(ConfigError::Invalid(format!(
                "at least 2 holders are required, got {}",
                self.holders.len()
            )));
        }
        if let Some(party) = self.holders.iter().find(|p| p.is_respondent()) {
            return Err(ConfigError::Invalid(format!(
                "respondent {} cannot hold shares",
                party
            )));
        }
        for (i, party) in self.holders.iter().enumerate() {
            if self.holders[..i].contains(party) {
                return Err(ConfigError::Invalid(format!(
                    "holder {} is listed twice",
                    party
                )));
            }
        }

        let threshold = self.threshold();
        if threshold < 2 || threshold > self.holders.len() {
            return Err(ConfigError::Invalid(format!(
                "threshold ({}) must be between 2 and the number of holders ({})",
                threshold,
                self.holders.len()
            )));
        }

        if self.revealers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one revealer is required".to_string(),
            ));
        }
        if let Some(party) = self.revealers.iter().find(|p| !self.holders.contains(p)) {
            return Err(ConfigError::Invalid(format!(
                "revealer {} is not a holder",
                party
            )));
        }

        if self.share_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "share timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
