//! Runtime Configuration
//!
//! All operator-tunable knobs of the runtime live in [`RuntimeConfig`]: rate
//! limits, the input size cap, lifecycle timings and the memory-pressure
//! threshold. The defaults match the values the runtime was tuned with; every
//! knob can be overridden from the environment (`ORIEL_*` variables) or
//! deserialized from a config file via serde.
//!
//! Durations are stored as integral milliseconds so the struct stays
//! trivially serializable; accessor methods hand out [`Duration`] values for
//! the scheduler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable parameters for the window manager and per-window runtimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Messages a single window may send per rate-limit window.
    pub input_rate_threshold: u32,

    /// Length of the per-window message rate-limit window, in milliseconds.
    pub input_rate_ttl_ms: u64,

    /// Windows a single origin may create per rate-limit window.
    pub creation_rate_threshold: u32,

    /// Length of the window-creation rate-limit window, in milliseconds.
    pub creation_rate_ttl_ms: u64,

    /// Largest inbound message accepted, in bytes. Oversized messages are
    /// dropped before admission.
    pub max_input_buffer_bytes: usize,

    /// Interval between lifecycle sweeps, in milliseconds.
    pub sweep_interval_ms: u64,

    /// Silence after which a window is considered disconnected, in
    /// milliseconds.
    pub disconnect_after_ms: u64,

    /// Silence after which a disconnected window is destroyed, in
    /// milliseconds.
    pub destroy_after_ms: u64,

    /// Resident set size above which all disconnected windows are evicted
    /// immediately, in megabytes. `0` disables the check.
    pub rss_low_memory_threshold_mb: u64,

    /// Destroy a window whose computation raised an error no boundary
    /// handled. When off, the error is logged and the window keeps running.
    pub destroy_window_on_unhandled_error: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            input_rate_threshold: 16,
            input_rate_ttl_ms: 2_000,
            creation_rate_threshold: 3,
            creation_rate_ttl_ms: 1_000,
            max_input_buffer_bytes: 4_096,
            sweep_interval_ms: 2_500,
            disconnect_after_ms: 6_000,
            destroy_after_ms: 60_000,
            rss_low_memory_threshold_mb: 0,
            destroy_window_on_unhandled_error: false,
        }
    }
}

impl RuntimeConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparseable.
    ///
    /// Recognized variables:
    ///
    /// - `ORIEL_RATELIMIT_WINDOW_INPUT_THRESHOLD`
    /// - `ORIEL_RATELIMIT_WINDOW_INPUT_TTL_SECONDS`
    /// - `ORIEL_RATELIMIT_WINDOW_CREATION_THRESHOLD`
    /// - `ORIEL_RATELIMIT_WINDOW_CREATION_TTL_SECONDS`
    /// - `ORIEL_MAX_INPUT_EVENT_BUFFER_SIZE` (bytes)
    /// - `ORIEL_SWEEP_INTERVAL_MS`
    /// - `ORIEL_RSS_LOW_MEMORY_THRESHOLD` (megabytes, `0` disables)
    /// - `ORIEL_DESTROY_WINDOW_ON_UNHANDLED_ERROR` (`1` or `true`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            input_rate_threshold: env_parse(
                "ORIEL_RATELIMIT_WINDOW_INPUT_THRESHOLD",
                defaults.input_rate_threshold,
            ),
            input_rate_ttl_ms: env_parse(
                "ORIEL_RATELIMIT_WINDOW_INPUT_TTL_SECONDS",
                defaults.input_rate_ttl_ms / 1_000,
            ) * 1_000,
            creation_rate_threshold: env_parse(
                "ORIEL_RATELIMIT_WINDOW_CREATION_THRESHOLD",
                defaults.creation_rate_threshold,
            ),
            creation_rate_ttl_ms: env_parse(
                "ORIEL_RATELIMIT_WINDOW_CREATION_TTL_SECONDS",
                defaults.creation_rate_ttl_ms / 1_000,
            ) * 1_000,
            max_input_buffer_bytes: env_parse(
                "ORIEL_MAX_INPUT_EVENT_BUFFER_SIZE",
                defaults.max_input_buffer_bytes,
            ),
            sweep_interval_ms: env_parse("ORIEL_SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
            disconnect_after_ms: defaults.disconnect_after_ms,
            destroy_after_ms: defaults.destroy_after_ms,
            rss_low_memory_threshold_mb: env_parse(
                "ORIEL_RSS_LOW_MEMORY_THRESHOLD",
                defaults.rss_low_memory_threshold_mb,
            ),
            destroy_window_on_unhandled_error: env_flag(
                "ORIEL_DESTROY_WINDOW_ON_UNHANDLED_ERROR",
                defaults.destroy_window_on_unhandled_error,
            ),
        }
    }

    /// Per-window message rate-limit window.
    pub fn input_rate_ttl(&self) -> Duration {
        Duration::from_millis(self.input_rate_ttl_ms)
    }

    /// Per-origin window-creation rate-limit window.
    pub fn creation_rate_ttl(&self) -> Duration {
        Duration::from_millis(self.creation_rate_ttl_ms)
    }

    /// Interval between lifecycle sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Silence after which a window is marked disconnected.
    pub fn disconnect_after(&self) -> Duration {
        Duration::from_millis(self.disconnect_after_ms)
    }

    /// Silence after which a disconnected window is destroyed.
    pub fn destroy_after(&self) -> Duration {
        Duration::from_millis(self.destroy_after_ms)
    }

    /// Memory-pressure threshold in bytes, `0` when disabled.
    pub fn rss_low_memory_threshold_bytes(&self) -> u64 {
        self.rss_low_memory_threshold_mb * 1024 * 1024
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.trim(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => default,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
