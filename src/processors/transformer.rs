use crate::error::{ProcessingError, Result};
use crate::models::{DailyObservationRow, LocationRow, ProviderPayload, RawSnapshot};
use crate::storage::ObjectStore;
use crate::utils::coercion::{to_date, to_f64, to_i64, to_naive_timestamp, to_string, to_utc_timestamp};
use crate::utils::constants::{CONTENT_TYPE_PARQUET, RAW_SNAPSHOT_FILE};
use crate::utils::PartitionDate;
use crate::writers::ParquetWriter;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Row collections derived from one partition's snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedPartition {
    pub daily: Vec<DailyObservationRow>,
    pub locations: Vec<LocationRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformSummary {
    pub dt: String,
    pub snapshots: usize,
    pub daily_count: usize,
    pub location_count: usize,
    pub daily_key: String,
    pub locations_key: String,
}

/// Flattens bronze snapshots into the silver `weather_daily` and `locations` tables.
pub struct PartitionTransformer {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    writer: ParquetWriter,
}

impl PartitionTransformer {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            writer: ParquetWriter::new(),
        }
    }

    pub fn with_writer(mut self, writer: ParquetWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Every `raw.json` snapshot under the partition's bronze prefix, in key order
    pub fn read_snapshots(&self, dt: &PartitionDate) -> Result<Vec<RawSnapshot>> {
        let prefix = dt.bronze_prefix();
        let keys: Vec<String> = self
            .store
            .list(&self.bucket, &prefix)?
            .into_iter()
            .filter(|k| k.ends_with(RAW_SNAPSHOT_FILE))
            .collect();

        if keys.is_empty() {
            return Err(ProcessingError::NoData(format!(
                "No raw snapshots under {}/{}",
                self.bucket, prefix
            )));
        }

        keys.iter()
            .map(|key| {
                let body = self.store.get(&self.bucket, key)?;
                serde_json::from_slice(&body).map_err(|e| {
                    ProcessingError::InvalidFormat(format!("Unreadable snapshot {}: {}", key, e))
                })
            })
            .collect()
    }

    pub fn transform(&self, dt: &PartitionDate) -> Result<TransformSummary> {
        let snapshots = self.read_snapshots(dt)?;
        let partition = Self::flatten(dt, &snapshots);

        if partition.daily.is_empty() {
            return Err(ProcessingError::NoData(format!(
                "No daily observations for dt={} ({} snapshot(s) without forecast data)",
                dt,
                snapshots.len()
            )));
        }
        if partition.locations.is_empty() {
            return Err(ProcessingError::NoData(format!(
                "No locations for dt={}",
                dt
            )));
        }

        let daily_key = dt.silver_daily_key();
        let locations_key = dt.silver_locations_key();

        let daily_bytes = self.writer.write_daily_rows(&partition.daily)?;
        self.store
            .put(&self.bucket, &daily_key, &daily_bytes, CONTENT_TYPE_PARQUET)?;

        let location_bytes = self.writer.write_location_rows(&partition.locations)?;
        self.store
            .put(&self.bucket, &locations_key, &location_bytes, CONTENT_TYPE_PARQUET)?;

        tracing::info!(
            message = "silver partition written",
            dt = %dt,
            snapshots = snapshots.len(),
            daily_rows = partition.daily.len(),
            location_rows = partition.locations.len()
        );

        Ok(TransformSummary {
            dt: dt.to_string(),
            snapshots: snapshots.len(),
            daily_count: partition.daily.len(),
            location_count: partition.locations.len(),
            daily_key,
            locations_key,
        })
    }

    /// Snapshots to de-duplicated rows. Never fails: unreadable values become nulls.
    pub fn flatten(dt: &PartitionDate, snapshots: &[RawSnapshot]) -> FlattenedPartition {
        let mut daily = Vec::new();
        let mut locations = Vec::with_capacity(snapshots.len());

        for snapshot in snapshots {
            let location_id = snapshot.metadata.location_id.clone();
            let ingested_at = snapshot
                .metadata
                .ingested_at
                .as_ref()
                .and_then(|s| to_utc_timestamp(&Value::String(s.clone())));
            let payload = read_payload(snapshot);

            let mut location = LocationRow::empty(dt.date(), location_id.clone());
            location.ingested_at = ingested_at;
            if let Some(provider) = &payload.location {
                location.name = to_string(&provider.name);
                location.region = to_string(&provider.region);
                location.country = to_string(&provider.country);
                location.lat = to_f64(&provider.lat);
                location.lon = to_f64(&provider.lon);
                location.tz_id = to_string(&provider.tz_id);
                location.local_time = to_naive_timestamp(&provider.localtime);
            }
            locations.push(location);

            let Some(day) = payload.first_forecast_day() else {
                tracing::warn!(
                    message = "snapshot has no forecast day, daily row dropped",
                    dt = %dt,
                    location_id = location_id.as_deref().unwrap_or("null")
                );
                continue;
            };

            let summary = day.day.unwrap_or_default();
            let condition = summary.condition.unwrap_or_default();
            daily.push(DailyObservationRow {
                dt: dt.date(),
                location_id,
                date: to_date(&day.date),
                temp_min_c: to_f64(&summary.mintemp_c),
                temp_max_c: to_f64(&summary.maxtemp_c),
                temp_avg_c: to_f64(&summary.avgtemp_c),
                precip_mm: to_f64(&summary.totalprecip_mm),
                snow_cm: to_f64(&summary.totalsnow_cm),
                humidity_avg: to_f64(&summary.avghumidity),
                wind_max_kph: to_f64(&summary.maxwind_kph),
                condition_code: to_i64(&condition.code),
                condition_text: to_string(&condition.text),
                ingested_at,
            });
        }

        FlattenedPartition {
            daily: dedupe_keep_last(daily, |r| -> (Option<String>, Option<NaiveDate>) {
                (r.location_id.clone(), r.date)
            }),
            locations: dedupe_keep_last(locations, |r| r.location_id.clone()),
        }
    }
}

fn read_payload(snapshot: &RawSnapshot) -> ProviderPayload {
    match serde_json::from_value::<ProviderPayload>(snapshot.payload.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(
                message = "unreadable provider payload, treated as empty",
                location_id = snapshot.metadata.location_id.as_deref().unwrap_or("null"),
                error = %e
            );
            ProviderPayload::default()
        }
    }
}

/// Keep the last row per key, at the position of that last occurrence
fn dedupe_keep_last<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = rows
        .into_iter()
        .rev()
        .filter(|row| seen.insert(key(row)))
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotMetadata;
    use crate::storage::MemoryObjectStore;
    use arrow::array::AsArray;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dt() -> PartitionDate {
        PartitionDate::parse("2025-01-01").unwrap()
    }

    fn snapshot(id: &str, payload: Value) -> RawSnapshot {
        RawSnapshot {
            metadata: SnapshotMetadata::new(
                "2025-01-01",
                id,
                id,
                "2025-01-02T06:00:00Z",
                "0,0".to_string(),
            ),
            payload,
        }
    }

    fn payload(name: &str, avg: Value) -> Value {
        json!({
            "location": {
                "name": name,
                "region": "Greater London",
                "country": "United Kingdom",
                "lat": 51.52,
                "lon": "-0.11",
                "tz_id": "Europe/London",
                "localtime": "2025-01-01 9:05"
            },
            "forecast": {"forecastday": [{
                "date": "2025-01-01",
                "day": {
                    "mintemp_c": 1.2,
                    "maxtemp_c": "7.9",
                    "avgtemp_c": avg,
                    "totalprecip_mm": 0.4,
                    "totalsnow_cm": 0,
                    "avghumidity": 88,
                    "maxwind_kph": 21.6,
                    "condition": {"code": 1063, "text": "Patchy rain possible"}
                }
            }]}
        })
    }

    fn seed(store: &MemoryObjectStore, snapshots: &[RawSnapshot]) {
        for s in snapshots {
            let key = dt().bronze_key(s.metadata.location_id.as_deref().unwrap());
            store
                .put("lake", &key, &serde_json::to_vec(s).unwrap(), "application/json")
                .unwrap();
        }
    }

    #[test]
    fn test_flatten_coerces_values() {
        let partition = PartitionTransformer::flatten(&dt(), &[snapshot("london", payload("London", json!("4.5")))]);

        assert_eq!(partition.daily.len(), 1);
        let row = &partition.daily[0];
        assert_eq!(row.location_id.as_deref(), Some("london"));
        assert_eq!(row.date, Some(dt().date()));
        assert_eq!(row.temp_avg_c, Some(4.5));
        assert_eq!(row.temp_max_c, Some(7.9));
        assert_eq!(row.snow_cm, Some(0.0));
        assert_eq!(row.condition_code, Some(1063));
        assert_eq!(row.ingested_at.map(|t| t.to_rfc3339()).as_deref(), Some("2025-01-02T06:00:00+00:00"));

        let location = &partition.locations[0];
        assert_eq!(location.lon, Some(-0.11));
        assert_eq!(location.tz_id.as_deref(), Some("Europe/London"));
        assert_eq!(
            location.local_time.map(|t| t.to_string()).as_deref(),
            Some("2025-01-01 09:05:00")
        );
    }

    #[test]
    fn test_invalid_numeric_becomes_null() {
        let partition = PartitionTransformer::flatten(&dt(), &[snapshot("london", payload("London", json!("n/a")))]);
        assert_eq!(partition.daily[0].temp_avg_c, None);
        assert_eq!(partition.daily[0].temp_min_c, Some(1.2));
    }

    #[test]
    fn test_missing_forecast_keeps_location_only() {
        let partition = PartitionTransformer::flatten(
            &dt(),
            &[
                snapshot("london", payload("London", json!(4.0))),
                snapshot("paris", json!({"location": {"name": "Paris"}, "forecast": {"forecastday": []}})),
                snapshot("oslo", json!("not an object")),
            ],
        );

        assert_eq!(partition.daily.len(), 1);
        assert_eq!(partition.locations.len(), 3);
        assert_eq!(partition.locations[1].name.as_deref(), Some("Paris"));
        assert_eq!(partition.locations[2].name, None);
        assert_eq!(partition.locations[2].location_id.as_deref(), Some("oslo"));
    }

    #[test]
    fn test_malformed_forecast_keeps_location_fields() {
        let mut broken = payload("London", json!(4.0));
        broken["forecast"] = json!({"forecastday": [{"date": "2025-01-01", "day": "n/a"}]});
        let mut no_forecast = payload("Paris", json!(4.0));
        no_forecast["forecast"] = json!("unavailable");

        let partition = PartitionTransformer::flatten(
            &dt(),
            &[snapshot("london", broken), snapshot("paris", no_forecast)],
        );

        let london = &partition.locations[0];
        assert_eq!(london.name.as_deref(), Some("London"));
        assert_eq!(london.country.as_deref(), Some("United Kingdom"));
        assert_eq!(london.lat, Some(51.52));
        assert_eq!(london.tz_id.as_deref(), Some("Europe/London"));
        assert_eq!(partition.locations[1].name.as_deref(), Some("Paris"));

        assert_eq!(partition.daily.len(), 1);
        assert_eq!(partition.daily[0].location_id.as_deref(), Some("london"));
        assert_eq!(partition.daily[0].date, Some(dt().date()));
        assert_eq!(partition.daily[0].temp_avg_c, None);
    }

    #[test]
    fn test_dedupe_keeps_last_occurrence_position() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)];
        let kept = dedupe_keep_last(rows, |r| r.0);
        assert_eq!(kept, vec![("b", 2), ("a", 3), ("c", 4)]);
    }

    #[test]
    fn test_flatten_dedupes_repeated_location() {
        let partition = PartitionTransformer::flatten(
            &dt(),
            &[
                snapshot("london", payload("Old", json!(1.0))),
                snapshot("london", payload("New", json!(2.0))),
            ],
        );

        assert_eq!(partition.daily.len(), 1);
        assert_eq!(partition.daily[0].temp_avg_c, Some(2.0));
        assert_eq!(partition.locations.len(), 1);
        assert_eq!(partition.locations[0].name.as_deref(), Some("New"));
    }

    #[test]
    fn test_transform_writes_silver_files() {
        let store = Arc::new(MemoryObjectStore::new());
        seed(
            &store,
            &[
                snapshot("london", payload("London", json!(4.0))),
                snapshot("paris", payload("Paris", json!(6.0))),
            ],
        );
        store
            .put("lake", &format!("{}notes.txt", dt().bronze_prefix()), b"ignored", "text/plain")
            .unwrap();

        let transformer = PartitionTransformer::new(store.clone(), "lake");
        let summary = transformer.transform(&dt()).unwrap();
        assert_eq!(summary.daily_count, 2);
        assert_eq!(summary.location_count, 2);
        assert_eq!(summary.snapshots, 2);

        let batch = ParquetWriter::new()
            .read_batch(store.get("lake", &dt().silver_daily_key()).unwrap())
            .unwrap();
        let ids = batch.column_by_name("location_id").unwrap().as_string::<i32>();
        assert_eq!(ids.value(0), "london");
        assert_eq!(ids.value(1), "paris");
        assert!(store.head("lake", &dt().silver_locations_key()).unwrap());
    }

    #[test]
    fn test_silver_files_render_samples() {
        let store = Arc::new(MemoryObjectStore::new());
        seed(&store, &[snapshot("london", payload("London", json!(4.0)))]);
        PartitionTransformer::new(store.clone(), "lake").transform(&dt()).unwrap();

        let reader = ParquetWriter::new();
        for key in [dt().silver_daily_key(), dt().silver_locations_key()] {
            let sample = reader.read_sample(store.get("lake", &key).unwrap(), 10).unwrap();
            assert_eq!(sample.total_rows, 1);
            assert!(
                sample.render().contains("ingested_at=2025-01-02T06:00:00"),
                "{}",
                sample.render()
            );
        }
    }

    #[test]
    fn test_transform_without_snapshots_is_no_data() {
        let transformer = PartitionTransformer::new(Arc::new(MemoryObjectStore::new()), "lake");
        assert!(matches!(transformer.transform(&dt()), Err(ProcessingError::NoData(_))));
    }

    #[test]
    fn test_transform_without_daily_rows_is_no_data() {
        let store = Arc::new(MemoryObjectStore::new());
        seed(&store, &[snapshot("paris", json!({"location": {"name": "Paris"}}))]);

        let transformer = PartitionTransformer::new(store.clone(), "lake");
        assert!(matches!(transformer.transform(&dt()), Err(ProcessingError::NoData(_))));
        assert!(!store.head("lake", &dt().silver_daily_key()).unwrap());
    }
}
