//! Bronze snapshot envelope and the subset of the WeatherAPI history payload
//! the transform reads.
//!
//! Provider leaves are kept as raw [`Value`]s so that coercion can be
//! best-effort per field instead of failing the whole document.

use crate::utils::constants::{HISTORY_ENDPOINT, SNAPSHOT_API_VERSION, SNAPSHOT_SOURCE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub metadata: SnapshotMetadata,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotMetadata {
    pub dt: Option<String>,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub ingested_at: Option<String>,
    pub source: Option<String>,
    pub api_version: Option<String>,
    pub request: Option<SnapshotRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotRequest {
    pub q: String,
    pub endpoint: String,
}

impl SnapshotMetadata {
    pub fn new(
        dt: &str,
        location_id: &str,
        location_name: &str,
        ingested_at: &str,
        query: String,
    ) -> Self {
        Self {
            dt: Some(dt.to_string()),
            location_id: Some(location_id.to_string()),
            location_name: Some(location_name.to_string()),
            ingested_at: Some(ingested_at.to_string()),
            source: Some(SNAPSHOT_SOURCE.to_string()),
            api_version: Some(SNAPSHOT_API_VERSION.to_string()),
            request: Some(SnapshotRequest {
                q: query,
                endpoint: HISTORY_ENDPOINT.to_string(),
            }),
        }
    }
}

/// Each section is decoded on its own. A malformed section reads as absent
/// and leaves its siblings intact.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderPayload {
    #[serde(deserialize_with = "lenient")]
    pub location: Option<ProviderLocation>,
    #[serde(deserialize_with = "lenient")]
    pub forecast: Option<ProviderForecast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderLocation {
    pub name: Value,
    pub region: Value,
    pub country: Value,
    pub lat: Value,
    pub lon: Value,
    pub tz_id: Value,
    #[serde(alias = "local_time")]
    pub localtime: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderForecast {
    #[serde(deserialize_with = "lenient")]
    pub forecastday: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForecastDay {
    pub date: Value,
    #[serde(deserialize_with = "lenient")]
    pub day: Option<DaySummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub mintemp_c: Value,
    pub maxtemp_c: Value,
    pub avgtemp_c: Value,
    pub totalprecip_mm: Value,
    pub totalsnow_cm: Value,
    pub avghumidity: Value,
    pub maxwind_kph: Value,
    #[serde(deserialize_with = "lenient")]
    pub condition: Option<DayCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DayCondition {
    pub code: Value,
    pub text: Value,
}

impl ProviderPayload {
    /// First forecast day, if the provider returned any
    pub fn first_forecast_day(&self) -> Option<ForecastDay> {
        let first = self.forecast.as_ref()?.forecastday.as_ref()?.first()?;
        Some(serde_json::from_value(first.clone()).unwrap_or_default())
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(section) => Ok(Some(section)),
        Err(e) => {
            tracing::warn!(message = "malformed provider section ignored", error = %e);
            Ok(None)
        }
    }
}
