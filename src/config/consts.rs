// src/config/consts.rs

// Site
pub const TARGET_URL: &str = "https://extra.bet365.bet.br/results/br?li=1";
pub const DEFAULT_COMPETITIONS: [&str; 4] =
    ["Euro Cup", "Premier League", "Sul Americano", "Copa do Mundo"];

// Known misspellings in hand-edited config files
pub const COMPETITION_ALIASES: [(&str, &str); 1] = [("Premiere League", "Premier League")];

// Local state
pub const STORE_DIR: &str = ".store";
pub const LOG_FILE: &str = "debug.log";
pub const CONFIG_FILE: &str = "config.json";
pub const HISTORY_DIR: &str = "historico";
pub const ANCHOR_DIR: &str = "anchor_time";
pub const STORE_SEP: char = ',';

// Polling
pub const POLLING_INTERVAL_SECS: u64 = 30;
pub const REST_TIME_SECS: u64 = 30;
pub const LOOKBACK_HOURS: u32 = 1;
pub const CONSECUTIVE_NONE_LIMIT: u32 = 1;
pub const MAX_MATCHES: usize = 0; // 0 = no cap

// Jitter around page interactions, seconds
pub const DELAY_MIN_SECS: f64 = 0.5;
pub const DELAY_MAX_SECS: f64 = 1.5;

// Recovery
pub const NAV_RETRY_LIMIT: u32 = 5;
pub const NAV_BACKOFF_SECS: u64 = 30;
pub const NAV_COOLDOWN_SECS: u64 = 300;
pub const ERROR_DELAY_SECS: u64 = 10;
pub const WRITE_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY_MS: u64 = 1000;
