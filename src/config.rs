//! Run configuration
//!
//! One explicit `IngestConfig` value is built at startup and handed to the
//! pipeline; no component reads ambient global state. Values come from an
//! optional TOML file with CLI flags layered on top by the binary.

use crate::error::{IngestError, Result};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Window end date, the most recent day processed
    #[serde(default = "default_from")]
    pub from: NaiveDate,
    /// Number of days to walk backward from `from`
    #[serde(default = "default_delta")]
    pub delta: u32,
    /// Base currencies, one concurrent unit each per date
    #[serde(default = "default_bases")]
    pub bases: Vec<String>,
    /// Open Exchange Rates app id
    #[serde(default)]
    pub app_id: String,
    /// GCP project owning the dataset
    #[serde(default)]
    pub project: String,
    /// Storage bucket receiving the blobs
    #[serde(default)]
    pub bucket: String,
    /// BigQuery dataset
    #[serde(default)]
    pub dataset: String,
    /// BigQuery table
    #[serde(default)]
    pub table: String,
    /// OAuth bearer token for storage and warehouse calls
    #[serde(default)]
    pub token: String,
}

fn default_from() -> NaiveDate {
    let today = Utc::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

fn default_delta() -> u32 {
    3
}

fn default_bases() -> Vec<String> {
    vec!["SGD".to_string()]
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            delta: default_delta(),
            bases: default_bases(),
            app_id: String::new(),
            project: String::new(),
            bucket: String::new(),
            dataset: String::new(),
            table: String::new(),
            token: String::new(),
        }
    }
}

impl IngestConfig {
    /// Load from a TOML file, falling back to defaults when no file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        toml::from_str(&contents).map_err(|e| {
            IngestError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Check that every collaborator setting is present
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("app_id", &self.app_id),
            ("project", &self.project),
            ("bucket", &self.bucket),
            ("dataset", &self.dataset),
            ("table", &self.table),
            ("token", &self.token),
        ] {
            if value.is_empty() {
                return Err(IngestError::Config(format!(
                    "missing required setting: {}",
                    name
                )));
            }
        }
        if self.bases.is_empty() {
            return Err(IngestError::Config("no base currencies configured".to_string()));
        }
        Ok(())
    }
}

/// Default config file location (`~/.fx-ingest/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fx-ingest").join("config.toml"))
}

/// Split a comma-separated list of currency codes
pub fn parse_bases(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
