//! Core configuration
//!
//! All values can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | DATABASE_PATH | ./work_dir/studio.db | SQLite database file |
//! | LOG_LEVEL | info | tracing filter when RUST_LOG is unset |
//! | LOG_DIR | (unset) | directory for daily-rolling file logs |
//! | BOOKING_CANCEL_LEAD_MIN | 120 | booking cancellation lead time |
//! | SCHEDULE_CANCEL_LEAD_MIN | 180 | class-session cancellation lead time |

/// Cancellation lead times. These are policy, not incidental: a class
/// session gets a longer window than a single booking because cancelling it
/// affects every registered attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    /// Minutes before start_time after which a booking can no longer be cancelled
    pub booking_cancel_lead_min: i64,
    /// Minutes before start_time after which a class session can no longer be cancelled
    pub schedule_cancel_lead_min: i64,
}

impl CancellationPolicy {
    pub const DEFAULT_BOOKING_LEAD_MIN: i64 = 120;
    pub const DEFAULT_SCHEDULE_LEAD_MIN: i64 = 180;

    pub fn booking_lead_ms(&self) -> i64 {
        self.booking_cancel_lead_min * 60_000
    }

    pub fn schedule_lead_ms(&self) -> i64 {
        self.schedule_cancel_lead_min * 60_000
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            booking_cancel_lead_min: Self::DEFAULT_BOOKING_LEAD_MIN,
            schedule_cancel_lead_min: Self::DEFAULT_SCHEDULE_LEAD_MIN,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path
    pub database_path: String,
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Directory for file logging; console-only when unset
    pub log_dir: Option<String>,
    /// Cancellation lead times
    pub policy: CancellationPolicy,
}

impl Config {
    /// Load configuration from the environment (and a `.env` file when
    /// present), using defaults for anything unset.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./work_dir/studio.db".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            policy: CancellationPolicy {
                booking_cancel_lead_min: env_i64(
                    "BOOKING_CANCEL_LEAD_MIN",
                    CancellationPolicy::DEFAULT_BOOKING_LEAD_MIN,
                ),
                schedule_cancel_lead_min: env_i64(
                    "SCHEDULE_CANCEL_LEAD_MIN",
                    CancellationPolicy::DEFAULT_SCHEDULE_LEAD_MIN,
                ),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./work_dir/studio.db".into(),
            log_level: "info".into(),
            log_dir: None,
            policy: CancellationPolicy::default(),
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
