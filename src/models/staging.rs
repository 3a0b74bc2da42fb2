//! Store-native rows for the relational staging tables.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column order of `staging.stg_weather_daily`
pub const STG_WEATHER_DAILY_COLUMNS: [&str; 12] = [
    "dt",
    "location_id",
    "date",
    "temp_min_c",
    "temp_max_c",
    "temp_avg_c",
    "precip_mm",
    "humidity_avg",
    "wind_max_kph",
    "condition_code",
    "condition_text",
    "ingested_at",
];

/// Column order of `staging.stg_locations`
pub const STG_LOCATIONS_COLUMNS: [&str; 10] = [
    "dt",
    "location_id",
    "name",
    "region",
    "country",
    "lat",
    "lon",
    "tz_id",
    "local_time",
    "ingested_at",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(diesel::Insertable))]
#[cfg_attr(
    feature = "postgres",
    diesel(table_name = crate::loaders::postgres::schema::stg_weather_daily)
)]
pub struct StgWeatherDaily {
    pub dt: NaiveDate,
    pub location_id: String,
    pub date: Option<NaiveDate>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub temp_avg_c: Option<f64>,
    pub precip_mm: Option<f64>,
    pub humidity_avg: Option<f64>,
    pub wind_max_kph: Option<f64>,
    pub condition_code: Option<i32>,
    pub condition_text: Option<String>,
    pub ingested_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(diesel::Insertable))]
#[cfg_attr(
    feature = "postgres",
    diesel(table_name = crate::loaders::postgres::schema::stg_locations)
)]
pub struct StgLocation {
    pub dt: NaiveDate,
    pub location_id: String,
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz_id: Option<String>,
    pub local_time: Option<NaiveDateTime>,
    pub ingested_at: Option<DateTime<Utc>>,
}
