//! Layered pipeline settings.
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! settings file, the optional roster file, then `WEATHER__*` environment
//! variables (`WEATHER__PROVIDER__API_KEY`, `WEATHER__STORAGE__ROOT`, ...).

use crate::error::{ProcessingError, Result};
use crate::ingestion::ProviderSettings;
use crate::models::LocationConfig;
use crate::processors::QualityConfig;
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_BUCKET, DEFAULT_ROW_GROUP_SIZE, DEFAULT_STORAGE_ROOT,
};
use crate::writers::ParquetWriter;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

const ENV_PREFIX: &str = "WEATHER";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    #[validate(nested)]
    pub storage: StorageSettings,
    #[validate(nested)]
    pub provider: ProviderSettings,
    pub database: DatabaseSettings,
    #[validate(nested)]
    pub extract: ExtractSettings,
    #[validate(nested)]
    pub quality: QualityConfig,
    #[validate(nested)]
    pub locations: Vec<LocationConfig>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct StorageSettings {
    /// Local object store root; each bucket is a directory below it
    pub root: PathBuf,
    #[validate(length(min = 1))]
    pub bucket: String,
    pub compression: String,
    #[validate(range(min = 1))]
    pub row_group_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            bucket: DEFAULT_BUCKET.to_string(),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ExtractSettings {
    #[validate(range(min = 1, max = 64))]
    pub max_workers: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().min(8),
        }
    }
}

impl PipelineSettings {
    /// Load, merge and validate every configuration source
    pub fn load(config_file: Option<&Path>, locations_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        if let Some(path) = locations_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: PipelineSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR),
            )
            .build()?
            .try_deserialize()?;

        settings.check()?;
        tracing::debug!(
            message = "settings loaded",
            locations = settings.locations.len(),
            bucket = %settings.storage.bucket,
            root = %settings.storage.root.display()
        );
        Ok(settings)
    }

    /// Field validation plus the cross-field rules `validator` cannot express
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.quality.check()?;
        ParquetWriter::new().with_compression(&self.storage.compression)?;

        let mut seen = HashSet::new();
        for location in &self.locations {
            if !seen.insert(location.location_id.as_str()) {
                return Err(ProcessingError::Config(format!(
                    "Duplicate location_id in roster: {}",
                    location.location_id
                )));
            }
        }
        Ok(())
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::new(LocalObjectStore::new(&self.storage.root))
    }

    pub fn parquet_writer(&self) -> Result<ParquetWriter> {
        Ok(ParquetWriter::new()
            .with_compression(&self.storage.compression)?
            .with_row_group_size(self.storage.row_group_size))
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            ProcessingError::Config(
                "database.url is not set (WEATHER__DATABASE__URL)".to_string(),
            )
        })
    }
}
