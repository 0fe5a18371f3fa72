use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Configuration for resolving and scoring at-bats
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    /// Upper bound on any single store read or write
    pub store_timeout: Duration,
    /// Attempts per prediction once the batch write has failed
    pub max_write_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub retry_base_delay: Duration,
    /// How many resolved predictions the streak tracker looks back over
    pub streak_window: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            max_write_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            streak_window: 20,
        }
    }
}

/// Configuration for the sync scheduler
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often the background pass runs
    pub interval: Duration,
    /// Upper bound on the upstream game fetch
    pub fetch_timeout: Duration,
    /// Upper bound on a whole pass
    pub pass_timeout: Duration,
    /// How many pass records are kept
    pub history_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(10),
            pass_timeout: Duration::from_secs(60),
            history_capacity: 50,
        }
    }
}

/// When a prediction may still be submitted
#[derive(Debug, Clone)]
pub struct PredictionRules {
    /// Balls in the count at which predictions close
    pub risk_balls: u8,
    /// Strikes in the count at which predictions close
    pub risk_strikes: u8,
}

impl Default for PredictionRules {
    fn default() -> Self {
        Self {
            risk_balls: 2,
            risk_strikes: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; the in-memory store is used when unset
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub resolution: ResolutionConfig,
    pub sync: SyncConfig,
    pub predictions: PredictionRules,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Defaults overridden by `PITCHCALL_*` variables and `DATABASE_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = AppConfig::default();
        let read = Reader { lookup: &lookup };

        if let Some(secs) = read.parse::<u64>("PITCHCALL_SYNC_INTERVAL_SECS") {
            config.sync.interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = read.parse::<u64>("PITCHCALL_FETCH_TIMEOUT_SECS") {
            config.sync.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read.parse::<u64>("PITCHCALL_PASS_TIMEOUT_SECS") {
            config.sync.pass_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = read.parse::<usize>("PITCHCALL_SYNC_HISTORY") {
            config.sync.history_capacity = capacity;
        }
        if let Some(millis) = read.parse::<u64>("PITCHCALL_STORE_TIMEOUT_MS") {
            config.resolution.store_timeout = Duration::from_millis(millis);
        }
        if let Some(attempts) = read.parse::<u32>("PITCHCALL_WRITE_ATTEMPTS") {
            config.resolution.max_write_attempts = attempts.max(1);
        }
        if let Some(millis) = read.parse::<u64>("PITCHCALL_RETRY_BASE_DELAY_MS") {
            config.resolution.retry_base_delay = Duration::from_millis(millis);
        }
        if let Some(window) = read.parse::<usize>("PITCHCALL_STREAK_WINDOW") {
            // never below 20
            config.resolution.streak_window = window.max(20);
        }
        if let Some(balls) = read.parse::<u8>("PITCHCALL_RISK_BALLS") {
            config.predictions.risk_balls = balls;
        }
        if let Some(strikes) = read.parse::<u8>("PITCHCALL_RISK_STRIKES") {
            config.predictions.risk_strikes = strikes;
        }
        if let Some(addr) = read.parse::<SocketAddr>("PITCHCALL_BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        config.server.database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());

        config
    }
}

struct Reader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Reader<'_, F> {
    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = (self.lookup)(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring invalid configuration value");
                None
            }
        }
    }
}
