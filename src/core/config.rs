use std::path::PathBuf;

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the append-only NDJSON alert log.
    pub alerts_path: PathBuf,
    /// Maximum number of alerts held in the recency cache.
    pub cache_capacity: usize,
    /// Byte step used by the reverse reader when scanning backwards.
    pub chunk_size: usize,
    /// Default retention window loaded on startup or refresh.
    pub load_window_hours: u64,
}

impl Config {
    pub fn load_window(&self) -> Duration {
        Duration::hours(self.load_window_hours as i64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alerts_path: PathBuf::from("./alerts.json"),
            cache_capacity: 10_000,
            chunk_size: 8192,
            load_window_hours: 24,
        }
    }
}
