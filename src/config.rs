//! Configuration module

use std::env;
use std::time::Duration;

/// Bounds for the client polling period, in milliseconds.
pub const POLL_INTERVAL_MIN_MS: u64 = 1_000;
pub const POLL_INTERVAL_MAX_MS: u64 = 2_000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// JWT secret key shared with the identity provider
    pub jwt_secret: String,

    /// Environment (development, production)
    pub environment: String,

    /// Status poll period handed to clients (1-2s)
    pub poll_interval_ms: u64,

    /// Polls a client makes before giving up
    pub poll_max_attempts: u32,

    /// Delay between progress steps of the simulated routine
    pub routine_step_delay_ms: u64,

    /// "json" switches the log formatter to JSON lines
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            jwt_secret: "scanguard-dev-secret-change-in-production".to_string(),
            environment: "development".to_string(),
            poll_interval_ms: POLL_INTERVAL_MIN_MS,
            poll_max_attempts: 30,
            routine_step_delay_ms: 200,
            log_format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or(defaults.jwt_secret),

            environment: env::var("ENVIRONMENT")
                .unwrap_or(defaults.environment),

            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|v| v.clamp(POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MAX_MS))
                .unwrap_or(defaults.poll_interval_ms),

            poll_max_attempts: env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u32| *v > 0)
                .unwrap_or(defaults.poll_max_attempts),

            routine_step_delay_ms: env::var("ROUTINE_STEP_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.routine_step_delay_ms),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or(defaults.log_format),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn routine_step_delay(&self) -> Duration {
        Duration::from_millis(self.routine_step_delay_ms)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
