pub mod location;
pub mod observation;
pub mod snapshot;
pub mod staging;

pub use location::{Coordinates, LocationConfig};
pub use observation::{DailyObservationRow, DailyObservationRowBuilder, LocationRow};
pub use snapshot::{ProviderPayload, RawSnapshot, SnapshotMetadata, SnapshotRequest};
pub use staging::{StgLocation, StgWeatherDaily};
