use crate::loaders::LoadTarget;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "weather-lakehouse")]
#[command(about = "Daily weather-history pipeline: extract, transform, quality gate and staging load")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Location roster file with a `locations` list")]
    pub locations: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info", help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: tracing::Level,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch raw snapshots for every configured location into bronze
    Extract {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,

        #[arg(long, help = "Override extract.max_workers")]
        max_workers: Option<usize>,
    },

    /// Flatten bronze snapshots into the silver Parquet tables
    Transform {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,
    },

    /// Run the quality gate over a silver partition
    Quality {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,

        #[arg(long, help = "Override quality.min_completeness_ratio")]
        min_completeness_ratio: Option<f64>,

        #[arg(long, allow_hyphen_values = true, help = "Override quality.temp_min_c")]
        temp_min_c: Option<f64>,

        #[arg(long, allow_hyphen_values = true, help = "Override quality.temp_max_c")]
        temp_max_c: Option<f64>,

        #[arg(long, help = "Override quality.humidity_min")]
        humidity_min: Option<f64>,

        #[arg(long, help = "Override quality.humidity_max")]
        humidity_max: Option<f64>,
    },

    /// Replace staging rows with a validated silver partition
    Load {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,

        #[arg(long, value_enum, default_value_t = LoadTarget::All)]
        target: LoadTarget,
    },

    /// Extract, transform, quality and load one partition
    Run {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,

        #[arg(long, help = "Stop after the quality gate")]
        skip_load: bool,
    },

    /// Display file statistics and sample rows of a silver partition
    Info {
        #[arg(long, help = "Partition date YYYY-MM-DD [default: today, UTC]")]
        dt: Option<String>,

        #[arg(short, long, value_enum, default_value_t = SilverTable::Daily)]
        table: SilverTable,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SilverTable {
    Daily,
    Locations,
}
