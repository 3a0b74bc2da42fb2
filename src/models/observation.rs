use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Silver `weather_daily` row: one observation per location and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservationRow {
    pub dt: NaiveDate,
    pub location_id: Option<String>,
    pub date: Option<NaiveDate>,

    // Temperatures in °C
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub temp_avg_c: Option<f64>,

    pub precip_mm: Option<f64>,
    pub snow_cm: Option<f64>,
    pub humidity_avg: Option<f64>,
    pub wind_max_kph: Option<f64>,

    pub condition_code: Option<i64>,
    pub condition_text: Option<String>,

    pub ingested_at: Option<DateTime<Utc>>,
}

impl DailyObservationRow {
    pub fn builder(dt: NaiveDate) -> DailyObservationRowBuilder {
        DailyObservationRowBuilder::new(dt)
    }
}

/// Silver `locations` row: the provider's view of a configured location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRow {
    pub dt: NaiveDate,
    pub location_id: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz_id: Option<String>,
    pub local_time: Option<NaiveDateTime>,
    pub ingested_at: Option<DateTime<Utc>>,
}

impl LocationRow {
    pub fn empty(dt: NaiveDate, location_id: Option<String>) -> Self {
        Self {
            dt,
            location_id,
            name: None,
            region: None,
            country: None,
            lat: None,
            lon: None,
            tz_id: None,
            local_time: None,
            ingested_at: None,
        }
    }
}

pub struct DailyObservationRowBuilder {
    row: DailyObservationRow,
}

impl DailyObservationRowBuilder {
    pub fn new(dt: NaiveDate) -> Self {
        Self {
            row: DailyObservationRow {
                dt,
                location_id: None,
                date: None,
                temp_min_c: None,
                temp_max_c: None,
                temp_avg_c: None,
                precip_mm: None,
                snow_cm: None,
                humidity_avg: None,
                wind_max_kph: None,
                condition_code: None,
                condition_text: None,
                ingested_at: None,
            },
        }
    }

    pub fn location_id(mut self, id: &str) -> Self {
        self.row.location_id = Some(id.to_string());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.row.date = Some(date);
        self
    }

    pub fn temperatures(mut self, min: f64, avg: f64, max: f64) -> Self {
        self.row.temp_min_c = Some(min);
        self.row.temp_avg_c = Some(avg);
        self.row.temp_max_c = Some(max);
        self
    }

    pub fn humidity_avg(mut self, humidity: f64) -> Self {
        self.row.humidity_avg = Some(humidity);
        self
    }

    pub fn condition(mut self, code: i64, text: &str) -> Self {
        self.row.condition_code = Some(code);
        self.row.condition_text = Some(text.to_string());
        self
    }

    pub fn ingested_at(mut self, ingested_at: DateTime<Utc>) -> Self {
        self.row.ingested_at = Some(ingested_at);
        self
    }

    pub fn build(self) -> DailyObservationRow {
        self.row
    }
}
