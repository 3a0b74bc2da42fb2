pub mod snapshot_writer;
pub mod weather_api;

pub use snapshot_writer::{ExtractSummary, SnapshotWriter};
pub use weather_api::{
    AttemptOutcome, HttpResponse, HttpTransport, ProviderSettings, ReqwestTransport, RetryPolicy,
    Sleeper, ThreadSleeper, TransportError, WeatherApiClient,
};
