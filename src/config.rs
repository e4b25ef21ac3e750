//! Application configuration and case files

use anyhow::{Context, Result};
use cbrx_core::{MemoryCaseBase, Record};
use cbrx_retrieval::{Aggregator, Cbr, Recovery, RecoveryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Contents of the application config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub recovery: RecoveryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<Aggregator>,
    /// Refit the recovery model after every case base mutation
    #[serde(default = "default_true")]
    pub refit_always: bool,
}

impl AppConfig {
    pub fn new(recovery: RecoveryConfig) -> Self {
        Self {
            recovery,
            aggregator: None,
            refit_always: true,
        }
    }

    #[must_use]
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Validated recovery model, not yet fitted
    pub fn recovery(&self) -> Result<Recovery> {
        Recovery::new(self.recovery.clone()).context("invalid recovery configuration")
    }

    /// Application over an in-memory case base, fitted on construction
    pub fn build(&self, case_base: MemoryCaseBase) -> Result<Cbr<MemoryCaseBase>> {
        let cbr = Cbr::new(case_base, self.recovery()?, self.aggregator.clone(), self.refit_always)
            .context("failed to fit the recovery model")?;
        Ok(cbr)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Record>),
    One(Record),
}

/// Read a JSON file holding one record or an array of records
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records = match serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON record or array of records", path.display()))?
    {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    };
    Ok(records)
}
