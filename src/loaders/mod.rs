//! Relational staging: silver partitions replace staging rows transactionally.

pub mod memory;
pub mod partition_loader;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStagingStore;
pub use partition_loader::{LoadSummary, LoadTarget, PartitionLoader};
#[cfg(feature = "postgres")]
pub use postgres::PgStagingStore;

use crate::error::Result;
use crate::models::{StgLocation, StgWeatherDaily};
use chrono::NaiveDate;

/// Staging tables that accept whole-partition replacement.
///
/// Each method is a single transaction: either every row replaces the old
/// contents or nothing changes.
pub trait StagingStore {
    /// Delete `staging.stg_weather_daily` rows with this `dt`, then insert `rows`
    fn replace_daily_partition(&mut self, dt: NaiveDate, rows: &[StgWeatherDaily]) -> Result<usize>;

    /// Delete every `staging.stg_locations` row, then insert `rows`
    fn replace_locations(&mut self, rows: &[StgLocation]) -> Result<usize>;
}
