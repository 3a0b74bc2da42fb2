use crate::error::{ProcessingError, Result};
use crate::ingestion::weather_api::WeatherApiClient;
use crate::models::{LocationConfig, RawSnapshot, SnapshotMetadata};
use crate::storage::ObjectStore;
use crate::utils::constants::CONTENT_TYPE_JSON;
use crate::utils::progress::ProgressReporter;
use crate::utils::PartitionDate;
use chrono::{SecondsFormat, Utc};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractSummary {
    pub dt: String,
    pub keys: Vec<String>,
    pub ingested_at: String,
}

impl ExtractSummary {
    pub fn written(&self) -> usize {
        self.keys.len()
    }
}

/// Lands one raw snapshot per configured location under the bronze prefix.
pub struct SnapshotWriter {
    client: Arc<WeatherApiClient>,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_workers: usize,
}

impl SnapshotWriter {
    pub fn new(client: Arc<WeatherApiClient>, store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            client,
            store,
            bucket: bucket.to_string(),
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Fetch and persist a single location, stamped with the current time
    pub fn write(&self, dt: &PartitionDate, location: &LocationConfig) -> Result<String> {
        self.write_at(dt, location, &now_rfc3339())
    }

    fn write_at(
        &self,
        dt: &PartitionDate,
        location: &LocationConfig,
        ingested_at: &str,
    ) -> Result<String> {
        let coordinates = location.coordinates()?;
        let payload = self.client.fetch(coordinates, dt)?;

        let snapshot = RawSnapshot {
            metadata: SnapshotMetadata::new(
                &dt.to_string(),
                &location.location_id,
                location.display_name(),
                ingested_at,
                coordinates.query(),
            ),
            payload,
        };

        let key = dt.bronze_key(&location.location_id);
        let body = serde_json::to_vec_pretty(&snapshot)?;
        self.store.put(&self.bucket, &key, &body, CONTENT_TYPE_JSON)?;

        tracing::info!(
            message = "raw snapshot written",
            dt = %dt,
            location_id = %location.location_id,
            key = %key
        );
        Ok(key)
    }

    /// Extract every roster entry for `dt`. The first failure fails the run.
    pub fn write_all(
        &self,
        dt: &PartitionDate,
        roster: &[LocationConfig],
        progress: Option<&ProgressReporter>,
    ) -> Result<ExtractSummary> {
        if roster.is_empty() {
            return Err(ProcessingError::Config(
                "No locations configured. Provide a roster with at least one entry".to_string(),
            ));
        }

        let ingested_at = now_rfc3339();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers.min(roster.len()))
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let keys: Result<Vec<String>> = pool.install(|| {
            roster
                .par_iter()
                .map(|location| {
                    let result = self.write_at(dt, location, &ingested_at);
                    if let Some(p) = progress {
                        p.location_done(&location.location_id);
                    }
                    if let Err(ref e) = result {
                        tracing::error!(
                            message = "extract failed",
                            location_id = %location.location_id,
                            error = %e
                        );
                    }
                    result
                })
                .collect()
        });

        let keys = keys?;
        if let Some(p) = progress {
            p.finish(format!("extracted {} locations", keys.len()));
        }

        Ok(ExtractSummary {
            dt: dt.to_string(),
            keys,
            ingested_at,
        })
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
