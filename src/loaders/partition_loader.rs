use crate::error::{ProcessingError, Result};
use crate::loaders::StagingStore;
use crate::models::staging::{STG_LOCATIONS_COLUMNS, STG_WEATHER_DAILY_COLUMNS};
use crate::models::{StgLocation, StgWeatherDaily};
use crate::storage::ObjectStore;
use crate::utils::columns::{
    date_values, float_values, i32_values, naive_timestamp_values, string_values,
    utc_timestamp_values,
};
use crate::utils::PartitionDate;
use crate::writers::ParquetWriter;
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoadTarget {
    #[default]
    All,
    Locations,
    Daily,
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadTarget::All => write!(f, "all"),
            LoadTarget::Locations => write!(f, "locations"),
            LoadTarget::Daily => write!(f, "daily"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    pub dt: String,
    pub location_rows: Option<usize>,
    pub daily_rows: Option<usize>,
}

/// Moves a validated silver partition into the staging tables.
pub struct PartitionLoader {
    object_store: Arc<dyn ObjectStore>,
    bucket: String,
    reader: ParquetWriter,
}

impl PartitionLoader {
    pub fn new(object_store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            object_store,
            bucket: bucket.to_string(),
            reader: ParquetWriter::new(),
        }
    }

    pub fn read_daily(&self, dt: &PartitionDate) -> Result<Vec<StgWeatherDaily>> {
        let bytes = self.object_store.get(&self.bucket, &dt.silver_daily_key())?;
        Self::daily_rows_from_batch(dt, &self.reader.read_batch(bytes)?)
    }

    pub fn read_locations(&self, dt: &PartitionDate) -> Result<Vec<StgLocation>> {
        let bytes = self
            .object_store
            .get(&self.bucket, &dt.silver_locations_key())?;
        Self::location_rows_from_batch(dt, &self.reader.read_batch(bytes)?)
    }

    /// Replace the `dt` partition of `staging.stg_weather_daily`
    pub fn load_daily(&self, dt: &PartitionDate, store: &mut dyn StagingStore) -> Result<usize> {
        let rows = self.read_daily(dt)?;
        let inserted = store.replace_daily_partition(dt.date(), &rows)?;

        tracing::info!(message = "staging daily partition replaced", dt = %dt, rows = inserted);
        Ok(inserted)
    }

    /// Replace the whole of `staging.stg_locations`
    pub fn load_locations(&self, dt: &PartitionDate, store: &mut dyn StagingStore) -> Result<usize> {
        let rows = dedupe_locations(self.read_locations(dt)?);
        let inserted = store.replace_locations(&rows)?;

        tracing::info!(message = "staging locations replaced", dt = %dt, rows = inserted);
        Ok(inserted)
    }

    /// Locations before daily, for manual runs
    pub fn load(
        &self,
        dt: &PartitionDate,
        target: LoadTarget,
        store: &mut dyn StagingStore,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary {
            dt: dt.to_string(),
            ..LoadSummary::default()
        };

        if matches!(target, LoadTarget::All | LoadTarget::Locations) {
            summary.location_rows = Some(self.load_locations(dt, store)?);
        }
        if matches!(target, LoadTarget::All | LoadTarget::Daily) {
            summary.daily_rows = Some(self.load_daily(dt, store)?);
        }

        Ok(summary)
    }

    pub fn daily_rows_from_batch(
        dt: &PartitionDate,
        batch: &RecordBatch,
    ) -> Result<Vec<StgWeatherDaily>> {
        let columns = project(batch, "weather_daily", &STG_WEATHER_DAILY_COLUMNS)?;

        let dts = date_values(columns["dt"])?;
        let ids = string_values(columns["location_id"])?;
        let dates = date_values(columns["date"])?;
        let temp_min = float_values(columns["temp_min_c"])?;
        let temp_max = float_values(columns["temp_max_c"])?;
        let temp_avg = float_values(columns["temp_avg_c"])?;
        let precip = float_values(columns["precip_mm"])?;
        let humidity = float_values(columns["humidity_avg"])?;
        let wind = float_values(columns["wind_max_kph"])?;
        let codes = i32_values(columns["condition_code"])?;
        let texts = string_values(columns["condition_text"])?;
        let ingested = utc_timestamp_values(columns["ingested_at"])?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(StgWeatherDaily {
                    dt: dts[i].unwrap_or_else(|| dt.date()),
                    location_id: required_id("weather_daily", i, &ids[i])?,
                    date: dates[i],
                    temp_min_c: temp_min[i],
                    temp_max_c: temp_max[i],
                    temp_avg_c: temp_avg[i],
                    precip_mm: precip[i],
                    humidity_avg: humidity[i],
                    wind_max_kph: wind[i],
                    condition_code: codes[i],
                    condition_text: texts[i].clone(),
                    ingested_at: ingested[i],
                })
            })
            .collect()
    }

    pub fn location_rows_from_batch(
        dt: &PartitionDate,
        batch: &RecordBatch,
    ) -> Result<Vec<StgLocation>> {
        let columns = project(batch, "locations", &STG_LOCATIONS_COLUMNS)?;

        let dts = date_values(columns["dt"])?;
        let ids = string_values(columns["location_id"])?;
        let names = string_values(columns["name"])?;
        let regions = string_values(columns["region"])?;
        let countries = string_values(columns["country"])?;
        let lats = float_values(columns["lat"])?;
        let lons = float_values(columns["lon"])?;
        let tz_ids = string_values(columns["tz_id"])?;
        let local_times = naive_timestamp_values(columns["local_time"])?;
        let ingested = utc_timestamp_values(columns["ingested_at"])?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(StgLocation {
                    dt: dts[i].unwrap_or_else(|| dt.date()),
                    location_id: required_id("locations", i, &ids[i])?,
                    name: names[i].clone(),
                    region: regions[i].clone(),
                    country: countries[i].clone(),
                    lat: lats[i],
                    lon: lons[i],
                    tz_id: tz_ids[i].clone(),
                    local_time: local_times[i],
                    ingested_at: ingested[i],
                })
            })
            .collect()
    }
}

/// Staging columns by name; any absent column is a schema mismatch
fn project<'a>(
    batch: &'a RecordBatch,
    table: &str,
    columns: &[&'static str],
) -> Result<HashMap<&'static str, &'a ArrayRef>> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| batch.column_by_name(c).is_none())
        .map(|c| c.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ProcessingError::SchemaMismatch {
            table: table.to_string(),
            missing,
        });
    }

    Ok(columns
        .iter()
        .filter_map(|c| batch.column_by_name(c).map(|array| (*c, array)))
        .collect())
}

fn required_id(table: &str, row: usize, id: &Option<String>) -> Result<String> {
    id.clone().ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("{} row {} has a null location_id", table, row))
    })
}

/// Keep the last row per `location_id`
fn dedupe_locations(rows: Vec<StgLocation>) -> Vec<StgLocation> {
    let mut last: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        last.insert(row.location_id.clone(), i);
    }

    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| last.get(&row.location_id) == Some(i))
        .map(|(_, row)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryStagingStore;
    use crate::models::{DailyObservationRow, LocationRow};
    use crate::storage::MemoryObjectStore;
    use crate::utils::constants::CONTENT_TYPE_PARQUET;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn dt(value: &str) -> PartitionDate {
        PartitionDate::parse(value).unwrap()
    }

    fn daily(dt: &PartitionDate, id: &str, avg: f64) -> DailyObservationRow {
        DailyObservationRow::builder(dt.date())
            .location_id(id)
            .date(dt.date())
            .temperatures(avg - 1.0, avg, avg + 1.0)
            .condition(1000, "Sunny")
            .ingested_at(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
            .build()
    }

    fn location(dt: &PartitionDate, id: &str, name: &str) -> LocationRow {
        let mut row = LocationRow::empty(dt.date(), Some(id.to_string()));
        row.name = Some(name.to_string());
        row.lat = Some(1.0);
        row.lon = Some(2.0);
        row
    }

    fn seed(
        store: &MemoryObjectStore,
        dt: &PartitionDate,
        daily_rows: &[DailyObservationRow],
        location_rows: &[LocationRow],
    ) {
        let writer = ParquetWriter::new();
        store
            .put(
                "lake",
                &dt.silver_daily_key(),
                &writer.write_daily_rows(daily_rows).unwrap(),
                CONTENT_TYPE_PARQUET,
            )
            .unwrap();
        store
            .put(
                "lake",
                &dt.silver_locations_key(),
                &writer.write_location_rows(location_rows).unwrap(),
                CONTENT_TYPE_PARQUET,
            )
            .unwrap();
    }

    #[test]
    fn test_load_replaces_only_target_partition() {
        let objects = Arc::new(MemoryObjectStore::new());
        let day1 = dt("2025-01-01");
        let day2 = dt("2025-01-02");
        let loader = PartitionLoader::new(objects.clone(), "lake");
        let mut staging = MemoryStagingStore::new();

        seed(&objects, &day1, &[daily(&day1, "a", 1.0), daily(&day1, "b", 2.0)], &[location(&day1, "a", "A")]);
        seed(&objects, &day2, &[daily(&day2, "a", 5.0)], &[location(&day2, "a", "A")]);
        loader.load_daily(&day1, &mut staging).unwrap();
        loader.load_daily(&day2, &mut staging).unwrap();

        seed(&objects, &day1, &[daily(&day1, "c", 9.0)], &[location(&day1, "c", "C")]);
        assert_eq!(loader.load_daily(&day1, &mut staging).unwrap(), 1);

        let ids: Vec<&str> = staging
            .daily_rows(day1.date())
            .iter()
            .map(|r| r.location_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(staging.daily_rows(day2.date()).len(), 1);
        assert_eq!(staging.daily_rows(day2.date())[0].temp_avg_c, Some(5.0));
    }

    #[test]
    fn test_daily_rows_use_staging_types() {
        let day = dt("2025-01-01");
        let batch = ParquetWriter::daily_rows_to_batch(&[daily(&day, "a", 3.0)]).unwrap();
        let rows = PartitionLoader::daily_rows_from_batch(&day, &batch).unwrap();

        assert_eq!(rows[0].condition_code, Some(1000i32));
        assert_eq!(rows[0].date, Some(day.date()));
        assert_eq!(
            rows[0].ingested_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_locations_dedupe_keep_last() {
        let objects = Arc::new(MemoryObjectStore::new());
        let day = dt("2025-01-01");
        seed(
            &objects,
            &day,
            &[daily(&day, "a", 1.0)],
            &[
                location(&day, "a", "First"),
                location(&day, "b", "B"),
                location(&day, "a", "Second"),
            ],
        );

        let mut staging = MemoryStagingStore::new();
        let summary = PartitionLoader::new(objects, "lake")
            .load(&day, LoadTarget::Locations, &mut staging)
            .unwrap();

        assert_eq!(summary.location_rows, Some(2));
        assert_eq!(summary.daily_rows, None);
        let names: Vec<_> = staging
            .locations()
            .iter()
            .map(|r| r.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["B".to_string(), "Second".to_string()]);
        assert!(staging.daily_partitions().is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("location_id", DataType::Utf8, true),
            Field::new("temp_avg_c", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["a"])),
                Arc::new(Float64Array::from(vec![1.0])),
            ],
        )
        .unwrap();

        match PartitionLoader::daily_rows_from_batch(&dt("2025-01-01"), &batch) {
            Err(ProcessingError::SchemaMismatch { table, missing }) => {
                assert_eq!(table, "weather_daily");
                assert!(missing.contains(&"dt".to_string()));
                assert!(missing.contains(&"wind_max_kph".to_string()));
                assert!(!missing.contains(&"location_id".to_string()));
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_null_location_id_is_rejected() {
        let day = dt("2025-01-01");
        let mut row = daily(&day, "a", 1.0);
        row.location_id = None;
        let batch = ParquetWriter::daily_rows_to_batch(&[row]).unwrap();

        assert!(matches!(
            PartitionLoader::daily_rows_from_batch(&day, &batch),
            Err(ProcessingError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_load_target_display() {
        assert_eq!(LoadTarget::All.to_string(), "all");
        assert_eq!(LoadTarget::default(), LoadTarget::All);
    }
}
