pub mod config;
pub mod fetcher;

pub use config::{ConfigError, LaunchpadConfig};
pub use fetcher::{CommandLogFetcher, FetchError, LogFetcher};
