use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One entry of the configured location roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationConfig {
    #[validate(length(min = 1))]
    pub location_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,

    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Provider query form: `<lat>,<lon>`
    pub fn query(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

impl LocationConfig {
    pub fn new(location_id: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            location_id: location_id.to_string(),
            name: Some(name.to_string()),
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.location_id)
    }

    /// Coordinates are required to query the provider unambiguously
    pub fn coordinates(&self) -> Result<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(ProcessingError::Config(format!(
                "Location {} is missing lat/lon",
                self.location_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_validation() {
        let location = LocationConfig::new("london", "London", 51.5074, -0.1278);

        assert!(location.validate().is_ok());
        assert_eq!(location.display_name(), "London");
        assert_eq!(location.coordinates().unwrap().query(), "51.5074,-0.1278");
    }

    #[test]
    fn test_invalid_coordinates() {
        let location = LocationConfig::new("nowhere", "Nowhere", 91.0, -0.1278);
        assert!(location.validate().is_err());
    }

    #[test]
    fn test_missing_coordinates_is_config_error() {
        let location = LocationConfig {
            location_id: "paris".to_string(),
            name: None,
            lat: Some(48.85),
            lon: None,
        };

        assert_eq!(location.display_name(), "paris");
        assert!(matches!(
            location.coordinates(),
            Err(ProcessingError::Config(_))
        ));
    }
}
