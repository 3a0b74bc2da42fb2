pub mod coercion;
pub mod columns;
pub mod constants;
pub mod partition;
pub mod progress;

pub use constants::*;
pub use partition::PartitionDate;
pub use progress::ProgressReporter;
