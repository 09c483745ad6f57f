use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use analytics::AnalyticsConfig;
use communities::CommunityAlgorithm;
use extract::ExtractionConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: OperationMode,
    pub extraction: ExtractionConfig,
    pub analytics: AnalyticsConfig,
    pub community_algorithm: CommunityAlgorithm,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,     // No proximity relations, small analytics budgets
    Accurate, // Every strategy, generous analytics budgets
    #[default]
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Each domain is saved under `<root>/<domain>/`
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/graphs"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            extraction: ExtractionConfig::default(),
            analytics: AnalyticsConfig::default(),
            community_algorithm: CommunityAlgorithm::Louvain,
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            extraction: ExtractionConfig {
                enable_proximity: false,
                min_confidence: 0.7,
                ..ExtractionConfig::default()
            },
            analytics: AnalyticsConfig {
                max_iterations: 50,
                tolerance: 1e-4,
                clique_node_limit: 500,
                ..AnalyticsConfig::default()
            },
            community_algorithm: CommunityAlgorithm::LabelPropagation,
            ..Self::default()
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            extraction: ExtractionConfig {
                proximity_window: 300,
                law_window: 300,
                ..ExtractionConfig::default()
            },
            analytics: AnalyticsConfig {
                max_iterations: 500,
                tolerance: 1e-8,
                clique_node_limit: 10_000,
                ..AnalyticsConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Accurate => Self::accurate_mode(),
            OperationMode::Balanced => Self::default(),
        }
    }

    /// Read a JSON config file. Missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn domain_dir(&self, domain: &str) -> PathBuf {
        self.storage.root.join(domain)
    }
}
