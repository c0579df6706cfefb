use std::time::Duration;

use clap::Parser;
use liap_core::Config;

/// Configuration recognized by the server process. Every field accepts a CLI
/// flag or its environment-variable equivalent via `clap`'s `env` attribute,
/// rather than a hand-rolled `env::var().unwrap_or(...)` per field.
#[derive(Debug, Parser)]
#[command(name = "liap-tui-server", about = "Liap Tui game-session server")]
pub struct Args {
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub listen_host: String,

    #[arg(long, env = "LISTEN_PORT", default_value_t = 8080)]
    pub listen_port: u16,

    /// Directory of static assets to serve alongside the API, if any.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<String>,

    #[arg(long, env = "MAX_ROOMS", default_value_t = 1000)]
    pub max_rooms: usize,

    #[arg(long, env = "HEARTBEAT_INTERVAL_MS", default_value_t = 15_000)]
    pub heartbeat_interval_ms: u64,

    #[arg(long, env = "HEARTBEAT_TIMEOUT_MS", default_value_t = 30_000)]
    pub heartbeat_timeout_ms: u64,

    /// Decision timeout shared by declaration and play phases. The distilled
    /// config allows a per-phase timeout table; this deployment uses one
    /// value for all of them (recorded as an Open Question resolution).
    #[arg(long, env = "PHASE_TIMEOUT_MS", default_value_t = 30_000)]
    pub phase_timeout_ms: u64,

    #[arg(long, env = "BOT_THINK_DELAY_MIN_MS", default_value_t = 400)]
    pub bot_think_delay_min_ms: u64,

    #[arg(long, env = "BOT_THINK_DELAY_MAX_MS", default_value_t = 1_500)]
    pub bot_think_delay_max_ms: u64,

    #[arg(long, env = "WINNING_SCORE", default_value_t = 50)]
    pub winning_score: i32,

    /// 0 means unbounded round count (only the winning score ends the game).
    #[arg(long, env = "MAX_ROUNDS", default_value_t = 0)]
    pub max_rounds: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Required when built with the `database` feature; ignored otherwise.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl Args {
    pub fn reconnect_secret(&self) -> Option<Vec<u8>> {
        std::env::var("RECONNECT_SECRET").ok().map(String::into_bytes)
    }

    pub fn into_config(self) -> Config {
        let missed_threshold = (self.heartbeat_timeout_ms / self.heartbeat_interval_ms.max(1)).max(1) as u32;
        Config {
            winning_score: self.winning_score,
            decision_timeout: Duration::from_millis(self.phase_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            heartbeat_missed_threshold: missed_threshold,
            bot_think_delay_range: (
                Duration::from_millis(self.bot_think_delay_min_ms),
                Duration::from_millis(self.bot_think_delay_max_ms),
            ),
            max_rooms: self.max_rooms,
            max_rounds: self.max_rounds,
            ..Config::default()
        }
    }
}
