use crate::error::{ProcessingError, Result};
use crate::storage::ObjectStore;
use crate::utils::constants::{
    COMPLETENESS_SAMPLE_SIZE, DEFAULT_HUMIDITY_MAX, DEFAULT_HUMIDITY_MIN,
    DEFAULT_MIN_COMPLETENESS_RATIO, DEFAULT_TEMP_MAX_C, DEFAULT_TEMP_MIN_C, QUALITY_SAMPLE_SIZE,
};
use crate::utils::columns::{date_values, float_values, string_values};
use crate::utils::PartitionDate;
use crate::writers::ParquetWriter;
use arrow::array::{Array, ArrayRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use validator::Validate;

pub const DAILY_REQUIRED_COLUMNS: [&str; 3] = ["location_id", "date", "ingested_at"];

pub const LOCATIONS_REQUIRED_COLUMNS: [&str; 7] = [
    "location_id",
    "name",
    "country",
    "lat",
    "lon",
    "tz_id",
    "ingested_at",
];

const TEMPERATURE_COLUMNS: [&str; 3] = ["temp_min_c", "temp_max_c", "temp_avg_c"];
const HUMIDITY_COLUMN: &str = "humidity_avg";

/// Gate checks, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityCheck {
    Existence,
    NonEmpty,
    RequiredColumns,
    NotNull,
    Freshness,
    Uniqueness,
    Range,
    Completeness,
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityCheck::Existence => "existence",
            QualityCheck::NonEmpty => "non_empty",
            QualityCheck::RequiredColumns => "required_columns",
            QualityCheck::NotNull => "not_null",
            QualityCheck::Freshness => "freshness",
            QualityCheck::Uniqueness => "uniqueness",
            QualityCheck::Range => "range",
            QualityCheck::Completeness => "completeness",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QualityConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_completeness_ratio: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_completeness_ratio: DEFAULT_MIN_COMPLETENESS_RATIO,
            temp_min_c: DEFAULT_TEMP_MIN_C,
            temp_max_c: DEFAULT_TEMP_MAX_C,
            humidity_min: DEFAULT_HUMIDITY_MIN,
            humidity_max: DEFAULT_HUMIDITY_MAX,
        }
    }
}

impl QualityConfig {
    /// Field-level validation plus ordered bounds
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        for (name, value) in [
            ("min_completeness_ratio", self.min_completeness_ratio),
            ("temp_min_c", self.temp_min_c),
            ("temp_max_c", self.temp_max_c),
            ("humidity_min", self.humidity_min),
            ("humidity_max", self.humidity_max),
        ] {
            if !value.is_finite() {
                return Err(ProcessingError::Config(format!(
                    "quality.{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        if self.temp_min_c > self.temp_max_c {
            return Err(ProcessingError::Config(format!(
                "quality.temp_min_c ({}) is greater than quality.temp_max_c ({})",
                self.temp_min_c, self.temp_max_c
            )));
        }
        if self.humidity_min > self.humidity_max {
            return Err(ProcessingError::Config(format!(
                "quality.humidity_min ({}) is greater than quality.humidity_max ({})",
                self.humidity_min, self.humidity_max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub dt: String,
    pub daily_rows: usize,
    pub location_rows: usize,
    pub covered_locations: usize,
    pub total_locations: usize,
    pub completeness_ratio: f64,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Quality Gate Summary (dt={}):\n\
            - Daily rows: {}\n\
            - Locations: {}\n\
            - Coverage: {}/{} ({:.1}%)",
            self.dt,
            self.daily_rows,
            self.location_rows,
            self.covered_locations,
            self.total_locations,
            self.completeness_ratio * 100.0
        )
    }
}

/// Blocks promotion of a silver partition that fails any check.
pub struct QualityGate {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    config: QualityConfig,
    reader: ParquetWriter,
}

impl QualityGate {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str, config: QualityConfig) -> Result<Self> {
        config.check()?;
        Ok(Self {
            store,
            bucket: bucket.to_string(),
            config,
            reader: ParquetWriter::new(),
        })
    }

    /// Run every check against the stored silver partition
    pub fn check(&self, dt: &PartitionDate) -> Result<QualityReport> {
        let daily_key = dt.silver_daily_key();
        let locations_key = dt.silver_locations_key();

        let mut missing = Vec::new();
        for key in [&daily_key, &locations_key] {
            if !self.store.head(&self.bucket, key)? {
                missing.push(key.clone());
            }
        }

        if !missing.is_empty() {
            let mut found = Vec::new();
            for prefix in [dt.silver_daily_prefix(), dt.silver_locations_prefix()] {
                found.extend(
                    self.store
                        .list(&self.bucket, &prefix)?
                        .into_iter()
                        .filter(|k| k.ends_with(".parquet")),
                );
            }
            return Err(failure(
                QualityCheck::Existence,
                format!(
                    "missing silver file(s) {:?}. Parquet objects found under the partition prefixes",
                    missing
                ),
                found,
            ));
        }

        let daily = self.reader.read_batch(self.store.get(&self.bucket, &daily_key)?)?;
        let locations = self
            .reader
            .read_batch(self.store.get(&self.bucket, &locations_key)?)?;

        self.check_tables(dt, &daily, &locations)
    }

    /// Checks 2 to 8 over already loaded tables
    pub fn check_tables(
        &self,
        dt: &PartitionDate,
        daily: &RecordBatch,
        locations: &RecordBatch,
    ) -> Result<QualityReport> {
        check_non_empty(dt, daily, locations)?;
        check_required_columns(daily, locations)?;
        check_not_null(daily, locations)?;

        let daily_ids = string_values(required_column(daily, "location_id")?)?;
        let dates = check_freshness(dt, daily, &daily_ids)?;
        check_uniqueness(daily, &daily_ids)?;

        let keys: Vec<(&Option<String>, &Option<NaiveDate>)> = daily_ids.iter().zip(&dates).collect();
        for column in TEMPERATURE_COLUMNS {
            check_range(daily, &keys, column, self.config.temp_min_c, self.config.temp_max_c)?;
        }
        check_range(
            daily,
            &keys,
            HUMIDITY_COLUMN,
            self.config.humidity_min,
            self.config.humidity_max,
        )?;

        let location_ids = string_values(required_column(locations, "location_id")?)?;
        let (covered, total, ratio) =
            check_completeness(&daily_ids, &location_ids, self.config.min_completeness_ratio)?;

        let report = QualityReport {
            dt: dt.to_string(),
            daily_rows: daily.num_rows(),
            location_rows: locations.num_rows(),
            covered_locations: covered,
            total_locations: total,
            completeness_ratio: ratio,
        };

        tracing::info!(
            message = "quality gate passed",
            dt = %dt,
            daily_rows = report.daily_rows,
            locations = report.location_rows,
            coverage = %format!("{:.1}%", ratio * 100.0)
        );
        Ok(report)
    }
}

fn failure(check: QualityCheck, message: String, sample: Vec<String>) -> ProcessingError {
    ProcessingError::Quality {
        check,
        message,
        sample,
    }
}

fn check_non_empty(dt: &PartitionDate, daily: &RecordBatch, locations: &RecordBatch) -> Result<()> {
    let mut empty = Vec::new();
    if daily.num_rows() == 0 {
        empty.push("weather_daily".to_string());
    }
    if locations.num_rows() == 0 {
        empty.push("locations".to_string());
    }

    if empty.is_empty() {
        Ok(())
    } else {
        Err(failure(
            QualityCheck::NonEmpty,
            format!("empty silver table(s) for dt={}", dt),
            empty,
        ))
    }
}

fn check_required_columns(daily: &RecordBatch, locations: &RecordBatch) -> Result<()> {
    let mut missing = Vec::new();
    for (table, batch, required) in [
        ("weather_daily", daily, &DAILY_REQUIRED_COLUMNS[..]),
        ("locations", locations, &LOCATIONS_REQUIRED_COLUMNS[..]),
    ] {
        missing.extend(
            required
                .iter()
                .filter(|c| batch.column_by_name(c).is_none())
                .map(|c| format!("{}.{}", table, c)),
        );
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(failure(
            QualityCheck::RequiredColumns,
            format!("{} required column(s) missing", missing.len()),
            missing,
        ))
    }
}

fn check_not_null(daily: &RecordBatch, locations: &RecordBatch) -> Result<()> {
    let mut offenders = Vec::new();
    for (table, batch, required) in [
        ("weather_daily", daily, &DAILY_REQUIRED_COLUMNS[..]),
        ("locations", locations, &LOCATIONS_REQUIRED_COLUMNS[..]),
    ] {
        for column in required {
            let nulls = required_column(batch, column)?.null_count();
            if nulls > 0 {
                offenders.push(format!("{}.{}: {} null(s)", table, column, nulls));
            }
        }
    }

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(failure(
            QualityCheck::NotNull,
            format!("{} required column(s) contain nulls", offenders.len()),
            offenders,
        ))
    }
}

/// Returns the parsed dates for the checks that follow
fn check_freshness(
    dt: &PartitionDate,
    daily: &RecordBatch,
    ids: &[Option<String>],
) -> Result<Vec<Option<NaiveDate>>> {
    let dates = date_values(required_column(daily, "date")?)?;

    let unparseable = dates.iter().filter(|d| d.is_none()).count();
    if unparseable > 0 {
        return Err(failure(
            QualityCheck::Freshness,
            format!("{} date value(s) could not be parsed", unparseable),
            Vec::new(),
        ));
    }

    let expected = dt.date();
    let mismatched: Vec<String> = ids
        .iter()
        .zip(&dates)
        .filter(|(_, date)| **date != Some(expected))
        .map(|(id, date)| format!("({}, {})", display(id), display(date)))
        .collect();

    if mismatched.is_empty() {
        Ok(dates)
    } else {
        Err(failure(
            QualityCheck::Freshness,
            format!("{} row(s) have date != {}", mismatched.len(), dt),
            mismatched.into_iter().take(QUALITY_SAMPLE_SIZE).collect(),
        ))
    }
}

fn check_uniqueness(daily: &RecordBatch, ids: &[Option<String>]) -> Result<()> {
    let dates = date_values(required_column(daily, "date")?)?;

    let mut counts: BTreeMap<(Option<&str>, Option<NaiveDate>), usize> = BTreeMap::new();
    for (id, date) in ids.iter().zip(&dates) {
        *counts.entry((id.as_deref(), *date)).or_default() += 1;
    }

    let duplicates: Vec<String> = counts
        .iter()
        .filter(|(_, &count)| count > 1)
        .map(|((id, date), count)| {
            format!("({}, {}) x{}", id.unwrap_or("null"), display(date), count)
        })
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(failure(
            QualityCheck::Uniqueness,
            format!("{} duplicate (location_id, date) key(s)", duplicates.len()),
            duplicates.into_iter().take(QUALITY_SAMPLE_SIZE).collect(),
        ))
    }
}

fn check_range(
    daily: &RecordBatch,
    keys: &[(&Option<String>, &Option<NaiveDate>)],
    column: &str,
    min: f64,
    max: f64,
) -> Result<()> {
    let Some(array) = daily.column_by_name(column) else {
        return Ok(());
    };

    let values = float_values(array)?;
    if values.iter().all(|v| v.is_none()) {
        return Err(failure(
            QualityCheck::Range,
            format!("{} has no numeric values", column),
            Vec::new(),
        ));
    }

    let mut below = 0;
    let mut above = 0;
    let mut sample = Vec::new();
    for (&(id, date), value) in keys.iter().zip(&values) {
        let Some(v) = *value else { continue };
        if v < min {
            below += 1;
        } else if v > max {
            above += 1;
        } else {
            continue;
        }
        if sample.len() < QUALITY_SAMPLE_SIZE {
            sample.push(format!("({}, {}, {})", display(id), display(date), v));
        }
    }

    if below + above == 0 {
        Ok(())
    } else {
        Err(failure(
            QualityCheck::Range,
            format!(
                "{} outside [{}, {}]: {} below, {} above",
                column, min, max, below, above
            ),
            sample,
        ))
    }
}

fn check_completeness(
    daily_ids: &[Option<String>],
    location_ids: &[Option<String>],
    min_ratio: f64,
) -> Result<(usize, usize, f64)> {
    let known: BTreeSet<&str> = location_ids.iter().flatten().map(String::as_str).collect();
    if known.is_empty() {
        return Err(failure(
            QualityCheck::Completeness,
            "no location ids to measure coverage against".to_string(),
            Vec::new(),
        ));
    }

    let observed: HashSet<&str> = daily_ids.iter().flatten().map(String::as_str).collect();
    let covered = known.iter().filter(|id| observed.contains(*id)).count();
    let ratio = covered as f64 / known.len() as f64;

    if ratio >= min_ratio {
        return Ok((covered, known.len(), ratio));
    }

    // BTreeSet iteration keeps the sample sorted
    let missing: Vec<String> = known
        .iter()
        .filter(|id| !observed.contains(*id))
        .take(COMPLETENESS_SAMPLE_SIZE)
        .map(|id| id.to_string())
        .collect();

    Err(failure(
        QualityCheck::Completeness,
        format!(
            "coverage {:.1}% below minimum {:.1}% ({}/{} locations)",
            ratio * 100.0,
            min_ratio * 100.0,
            covered,
            known.len()
        ),
        missing,
    ))
}

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(name).ok_or_else(|| {
        failure(
            QualityCheck::RequiredColumns,
            format!("column {} is missing", name),
            vec![name.to_string()],
        )
    })
}

fn display<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "null".to_string(), |v| v.to_string())
}
