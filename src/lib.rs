pub mod cli;
pub mod error;
pub mod ingestion;
pub mod loaders;
pub mod models;
pub mod processors;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
