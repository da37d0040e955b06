use crate::error::{BillingEngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How upstream feeds express occupancy, drive-in and capture ratios.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum RatioScale {
    /// Already a 0-1 fraction.
    #[default]
    Fraction,
    /// Expressed ×100; divided down on ingest.
    Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub statistics_window_months: u32,
    pub year_window_months: u32,
    /// Size of the calculation worker pool; `None` uses every available core.
    pub worker_threads: Option<usize>,
    pub ratio_scale: RatioScale,
    pub include_forecast: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            statistics_window_months: 3,
            year_window_months: 12,
            worker_threads: None,
            ratio_scale: RatioScale::Fraction,
            include_forecast: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.statistics_window_months == 0 {
            return Err(BillingEngineError::InvalidConfig(
                "statisticsWindowMonths must be at least 1".to_string(),
            ));
        }
        if self.year_window_months == 0 {
            return Err(BillingEngineError::InvalidConfig(
                "yearWindowMonths must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(BillingEngineError::InvalidConfig(
                "workerThreads must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
