//! Layered configuration.
//!
//! Settings come from built-in defaults, then an optional file (any format the
//! `config` crate recognizes by extension), then environment variables such as
//! `BASKET__MINING__MIN_SUPPORT=0.05`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::clique::MaximalCliqueFindingParameters;
use crate::error::Result;
use crate::mining::{MAX_DEGREE_OF_PARALLELISM, MiningParameters};

pub const ENV_PREFIX: &str = "BASKET";
pub const DEFAULT_LOG_FILTER: &str = "basket_analysis=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub min_support: f64,
    pub min_confidence: f64,
    pub degree_of_parallelism: usize,
}

impl Default for MiningSettings {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            min_support: 0.01,
            min_confidence: 0.1,
            degree_of_parallelism: cores.clamp(1, MAX_DEGREE_OF_PARALLELISM),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliqueSettings {
    pub min_clique_size: usize,
    pub max_clique_size: usize,
    pub ignore_one_way_links: bool,
}

impl Default for CliqueSettings {
    fn default() -> Self {
        Self {
            min_clique_size: 2,
            max_clique_size: 5,
            ignore_one_way_links: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Seconds an unfinished save may sit idle before it is rolled back.
    pub idle_timeout_secs: u64,
    pub chunk_size: usize,
}

impl CatalogSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            chunk_size: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber` filter directives, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LoggingSettings {
    /// Installs a formatting subscriber. Returns false when one is already set.
    pub fn init_tracing(&self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .try_init()
            .is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mining: MiningSettings,
    pub clique: CliqueSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Defaults, overlaid by `path` when given and then by the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::build(path, None)
    }

    /// Like [`Settings::load`], reading variables from `vars` instead of the process environment.
    pub fn load_with_env(path: Option<&Path>, vars: HashMap<String, String>) -> Result<Self> {
        Self::build(path, Some(vars))
    }

    fn build(path: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );
        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn mining_parameters(&self) -> Result<MiningParameters> {
        MiningParameters::builder(self.mining.min_support, self.mining.min_confidence)
            .degree_of_parallelism(self.mining.degree_of_parallelism)
            .build()
    }

    pub fn clique_parameters(&self) -> Result<MaximalCliqueFindingParameters> {
        MaximalCliqueFindingParameters::new(
            self.clique.min_clique_size,
            self.clique.max_clique_size,
            self.clique.ignore_one_way_links,
        )
    }
}
