use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use directories::ProjectDirs;
use ledger::{
    adapter::{IdentitySource, StandardRail},
    batch::{BatchedReader, DEFAULT_BATCH_SIZE},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{
    errors::LiquidityError,
    units::{RateOrientation, to_settlement_units},
};

use crate::{engine::EngineSettings, store_builder::RankingPolicy, synchronizer::SyncSettings};

pub const MAX_BATCH_SIZE: usize = 500;
pub const DEFAULT_MAX_TRANSFER_SIZE: &str = "250";

fn project_dirs() -> Result<ProjectDirs, LiquidityError> {
    ProjectDirs::from("", "", "LiquidityEngine")
        .ok_or_else(|| LiquidityError::Config("Failed to determine project directory".into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database_directory: PathBuf,
    pub log_file_path: Option<PathBuf>,
    pub batch_size: usize,
    pub fetch_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub ranking_policy: RankingPolicy,
    pub rate_orientation: RateOrientation,
    pub identity_source: IdentitySource,
    pub rail: String,
    pub deny_list: Vec<String>,
    pub max_transfer_size: String,
    pub metrics_port: Option<u16>,
    #[serde(skip)]
    pub config_file_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_directory: Self::default_database_directory()
                .unwrap_or_else(|_| PathBuf::from("liquidity.db")),
            log_file_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            fetch_timeout_secs: 10,
            poll_interval_secs: 30,
            ranking_policy: RankingPolicy::default(),
            rate_orientation: RateOrientation::default(),
            identity_source: IdentitySource::default(),
            rail: "venmo".to_string(),
            deny_list: Vec::new(),
            max_transfer_size: DEFAULT_MAX_TRANSFER_SIZE.to_string(),
            metrics_port: None,
            config_file_path: PathBuf::from("config.yaml"),
        }
    }
}

impl EngineConfig {
    /// Config file named on the command line (a directory gets
    /// `config.yaml` appended), or the platform config directory.
    pub fn get_config_file_path(file_path_option: Option<&str>) -> Result<PathBuf, LiquidityError> {
        if let Some(file_path_str) = file_path_option {
            let mut path = PathBuf::from(file_path_str);
            if path.is_dir() {
                path.push("config.yaml");
            }
            debug!("Using config file path: {}", path.display());
            Ok(path)
        } else {
            Ok(project_dirs()?.config_dir().join("config.yaml"))
        }
    }

    pub fn default_database_directory() -> Result<PathBuf, LiquidityError> {
        Ok(project_dirs()?.data_dir().join("liquidity.db"))
    }

    pub fn load(path: &Path) -> Result<Self, LiquidityError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LiquidityError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let mut config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            LiquidityError::Config(format!("Failed to parse config {}: {e}", path.display()))
        })?;
        config.config_file_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), LiquidityError> {
        let config_str = serde_yaml::to_string(self)
            .map_err(|e| LiquidityError::Config(format!("Failed to serialize config: {e}")))?;

        if let Some(parent) = self.config_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LiquidityError::Config(format!("Failed to create config directory: {e}"))
                })?;
            }
        }
        fs::write(&self.config_file_path, config_str)
            .map_err(|e| LiquidityError::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), LiquidityError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(LiquidityError::Config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(LiquidityError::Config(
                "fetch_timeout_secs must be positive".into(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(LiquidityError::Config(
                "poll_interval_secs must be positive".into(),
            ));
        }
        if self.rail.trim().is_empty() {
            return Err(LiquidityError::Config("rail must not be empty".into()));
        }
        to_settlement_units(&self.max_transfer_size).map_err(|_| {
            LiquidityError::Config(format!(
                "max_transfer_size is not a positive amount: {:?}",
                self.max_transfer_size
            ))
        })?;
        Ok(())
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn rail_adapter(&self) -> StandardRail {
        StandardRail::new(&self.rail, self.identity_source, self.rate_orientation)
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, LiquidityError> {
        self.validate()?;
        Ok(EngineSettings {
            sync: SyncSettings {
                reader: BatchedReader::new(
                    self.batch_size,
                    Duration::from_secs(self.fetch_timeout_secs),
                ),
                rail: Arc::new(self.rail_adapter()),
                ranking_policy: self.ranking_policy,
            },
            max_transfer_size: to_settlement_units(&self.max_transfer_size)?,
            deny_list: self.deny_list.clone(),
        })
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn database_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_directory = path.into();
        self
    }

    #[must_use]
    pub fn log_file_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.log_file_path = path;
        self
    }

    #[must_use]
    pub fn config_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_file_path = path.into();
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn ranking_policy(mut self, policy: RankingPolicy) -> Self {
        self.config.ranking_policy = policy;
        self
    }

    #[must_use]
    pub fn rate_orientation(mut self, orientation: RateOrientation) -> Self {
        self.config.rate_orientation = orientation;
        self
    }

    #[must_use]
    pub fn identity_source(mut self, source: IdentitySource) -> Self {
        self.config.identity_source = source;
        self
    }

    #[must_use]
    pub fn rail(mut self, rail: impl Into<String>) -> Self {
        self.config.rail = rail.into();
        self
    }

    #[must_use]
    pub fn deny_list(mut self, deny_list: Vec<String>) -> Self {
        self.config.deny_list = deny_list;
        self
    }

    #[must_use]
    pub fn max_transfer_size(mut self, amount: impl Into<String>) -> Self {
        self.config.max_transfer_size = amount.into();
        self
    }

    #[must_use]
    pub fn metrics_port(mut self, port: Option<u16>) -> Self {
        self.config.metrics_port = port;
        self
    }

    pub fn build(self) -> Result<EngineConfig, LiquidityError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
