pub mod quality_gate;
pub mod transformer;

pub use quality_gate::{QualityCheck, QualityConfig, QualityGate, QualityReport};
pub use transformer::{FlattenedPartition, PartitionTransformer, TransformSummary};
