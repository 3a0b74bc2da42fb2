use crate::error::Result;
use crate::loaders::StagingStore;
use crate::models::{StgLocation, StgWeatherDaily};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// In-process staging tables for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStagingStore {
    daily: BTreeMap<NaiveDate, Vec<StgWeatherDaily>>,
    locations: Vec<StgLocation>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn daily_rows(&self, dt: NaiveDate) -> &[StgWeatherDaily] {
        self.daily.get(&dt).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn daily_partitions(&self) -> Vec<NaiveDate> {
        self.daily.keys().copied().collect()
    }

    pub fn locations(&self) -> &[StgLocation] {
        &self.locations
    }
}

impl StagingStore for MemoryStagingStore {
    fn replace_daily_partition(&mut self, dt: NaiveDate, rows: &[StgWeatherDaily]) -> Result<usize> {
        self.daily.remove(&dt);

        // rows carry their own dt; group by it the way a table would
        for row in rows {
            self.daily.entry(row.dt).or_default().push(row.clone());
        }
        Ok(rows.len())
    }

    fn replace_locations(&mut self, rows: &[StgLocation]) -> Result<usize> {
        self.locations = rows.to_vec();
        Ok(rows.len())
    }
}
