use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    BRONZE_PREFIX, DAILY_PARQUET_FILE, LOCATIONS_PARQUET_FILE, RAW_SNAPSHOT_FILE,
    SILVER_DAILY_PREFIX, SILVER_LOCATIONS_PREFIX,
};
use chrono::{NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

const PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Calendar-date partition key (`dt`) shared by every pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionDate(NaiveDate);

impl PartitionDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a strict `YYYY-MM-DD` partition key
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        // chrono accepts unpadded fields, the key layout does not
        if trimmed.len() != 10 {
            return Err(ProcessingError::Config(format!(
                "Invalid dt '{}'. Expected YYYY-MM-DD",
                value
            )));
        }

        NaiveDate::parse_from_str(trimmed, PARTITION_FORMAT)
            .map(Self)
            .map_err(|e| {
                ProcessingError::Config(format!(
                    "Invalid dt '{}'. Expected YYYY-MM-DD. Error: {}",
                    value, e
                ))
            })
    }

    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `bronze/weather_history/dt=<dt>/`
    pub fn bronze_prefix(&self) -> String {
        format!("{}/dt={}/", BRONZE_PREFIX, self)
    }

    pub fn bronze_key(&self, location_id: &str) -> String {
        format!(
            "{}location_id={}/{}",
            self.bronze_prefix(),
            location_id,
            RAW_SNAPSHOT_FILE
        )
    }

    pub fn silver_daily_prefix(&self) -> String {
        format!("{}/dt={}/", SILVER_DAILY_PREFIX, self)
    }

    pub fn silver_daily_key(&self) -> String {
        format!("{}{}", self.silver_daily_prefix(), DAILY_PARQUET_FILE)
    }

    pub fn silver_locations_prefix(&self) -> String {
        format!("{}/dt={}/", SILVER_LOCATIONS_PREFIX, self)
    }

    pub fn silver_locations_key(&self) -> String {
        format!("{}{}", self.silver_locations_prefix(), LOCATIONS_PARQUET_FILE)
    }
}

impl fmt::Display for PartitionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PARTITION_FORMAT))
    }
}

impl FromStr for PartitionDate {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for PartitionDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}
