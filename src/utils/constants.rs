/// Object key layout
pub const BRONZE_PREFIX: &str = "bronze/weather_history";
pub const SILVER_DAILY_PREFIX: &str = "silver/weather_daily";
pub const SILVER_LOCATIONS_PREFIX: &str = "silver/locations";
pub const RAW_SNAPSHOT_FILE: &str = "raw.json";
pub const DAILY_PARQUET_FILE: &str = "weather_daily.parquet";
pub const LOCATIONS_PARQUET_FILE: &str = "locations.parquet";

/// Arrow timezone tag of UTC instant columns (offset form)
pub const UTC_OFFSET_TZ: &str = "+00:00";

/// Content types
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_PARQUET: &str = "application/octet-stream";

/// Snapshot metadata
pub const SNAPSHOT_SOURCE: &str = "weatherapi";
pub const SNAPSHOT_API_VERSION: &str = "v1";
pub const HISTORY_ENDPOINT: &str = "history.json";

/// Provider defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.weatherapi.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_SECS: u64 = 2;

/// Quality gate defaults
pub const DEFAULT_MIN_COMPLETENESS_RATIO: f64 = 0.95;
pub const DEFAULT_TEMP_MIN_C: f64 = -80.0;
pub const DEFAULT_TEMP_MAX_C: f64 = 60.0;
pub const DEFAULT_HUMIDITY_MIN: f64 = 0.0;
pub const DEFAULT_HUMIDITY_MAX: f64 = 100.0;
pub const QUALITY_SAMPLE_SIZE: usize = 5;
pub const COMPLETENESS_SAMPLE_SIZE: usize = 10;

/// Storage defaults
pub const DEFAULT_STORAGE_ROOT: &str = "data";
pub const DEFAULT_BUCKET: &str = "weather-lakehouse";
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 1000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
