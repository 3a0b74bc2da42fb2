//! Typed column extraction from Arrow arrays.
//!
//! Every function first applies a safe cast, so values that cannot be
//! represented in the target type come back as `None` rather than an error.

use crate::error::Result;
use crate::utils::constants::UTC_OFFSET_TZ;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, TimeUnit, TimestampMicrosecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn string_values(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let strings = cast(array, &DataType::Utf8)?;
    Ok(strings
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

pub fn date_values(array: &ArrayRef) -> Result<Vec<Option<NaiveDate>>> {
    let dates = cast(array, &DataType::Date32)?;
    let dates = dates.as_primitive::<Date32Type>();
    Ok((0..dates.len())
        .map(|i| {
            if dates.is_null(i) {
                None
            } else {
                dates.value_as_date(i)
            }
        })
        .collect())
}

/// NaN counts as null
pub fn float_values(array: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let floats = cast(array, &DataType::Float64)?;
    Ok(floats
        .as_primitive::<Float64Type>()
        .iter()
        .map(|v| v.filter(|f| !f.is_nan()))
        .collect())
}

/// Out-of-range integers and non-integral floats become null
pub fn i32_values(array: &ArrayRef) -> Result<Vec<Option<i32>>> {
    let floats = float_values(array)?;
    Ok(floats
        .into_iter()
        .map(|v| {
            v.filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
                .map(|f| f as i32)
        })
        .collect())
}

pub fn utc_timestamp_values(array: &ArrayRef) -> Result<Vec<Option<DateTime<Utc>>>> {
    let stamps = cast(
        array,
        &DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_OFFSET_TZ.into())),
    )?;
    let stamps = stamps.as_primitive::<TimestampMicrosecondType>();
    Ok((0..stamps.len())
        .map(|i| {
            if stamps.is_null(i) {
                None
            } else {
                stamps.value_as_datetime(i).map(|naive| naive.and_utc())
            }
        })
        .collect())
}

pub fn naive_timestamp_values(array: &ArrayRef) -> Result<Vec<Option<NaiveDateTime>>> {
    let stamps = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
    let stamps = stamps.as_primitive::<TimestampMicrosecondType>();
    Ok((0..stamps.len())
        .map(|i| {
            if stamps.is_null(i) {
                None
            } else {
                stamps.value_as_datetime(i)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use std::sync::Arc;

    #[test]
    fn test_safe_casts_null_out_bad_values() -> Result<()> {
        let dates: ArrayRef = Arc::new(StringArray::from(vec![Some("2025-01-01"), Some("yesterday"), None]));
        assert_eq!(
            date_values(&dates)?,
            vec![NaiveDate::from_ymd_opt(2025, 1, 1), None, None]
        );

        let floats: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.5), Some(f64::NAN), None]));
        assert_eq!(float_values(&floats)?, vec![Some(1.5), None, None]);

        let codes: ArrayRef = Arc::new(Int64Array::from(vec![Some(1003), Some(i64::MAX), None]));
        assert_eq!(i32_values(&codes)?, vec![Some(1003), None, None]);

        let numeric_text: ArrayRef = Arc::new(StringArray::from(vec!["95.0", "hot"]));
        assert_eq!(float_values(&numeric_text)?, vec![Some(95.0), None]);
        Ok(())
    }

    #[test]
    fn test_timestamps() -> Result<()> {
        let text: ArrayRef = Arc::new(StringArray::from(vec!["2025-01-02T06:00:00Z"]));
        let utc = utc_timestamp_values(&text)?;
        assert_eq!(
            utc[0].map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-01-02T06:00:00+00:00")
        );

        let local: ArrayRef = Arc::new(StringArray::from(vec!["2025-01-01 09:05:00"]));
        assert_eq!(
            naive_timestamp_values(&local)?[0].map(|t| t.to_string()).as_deref(),
            Some("2025-01-01 09:05:00")
        );
        Ok(())
    }
}
