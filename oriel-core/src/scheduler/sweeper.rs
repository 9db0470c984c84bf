//! Lifecycle Sweeper
//!
//! The sweep runs on a fixed interval and decides, per window, whether to
//! mark it disconnected, destroy it, or ping it. Decisions come from two
//! clocks and one gauge:
//!
//! - A window whose last pong is older than the disconnect threshold is
//!   treated as disconnected even if its socket never closed.
//! - A disconnected window is destroyed after the destroy threshold of
//!   silence, or immediately when the process is under memory pressure.
//! - Everything still connected is pinged, and its batched block-delete
//!   acks are flushed on the same tick.
//!
//! The decision itself is a pure function so the thresholds can be tested
//! without a manager or a clock.

use tokio::time::Duration;

use crate::config::RuntimeConfig;

/// What the sweep should do with one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepDecision {
    /// Pong silence crossed the disconnect threshold.
    pub mark_disconnected: bool,

    /// Tear the window down now.
    pub destroy: bool,
}

/// Classify one window given its connection state, the time since its last
/// pong and the process memory gauge.
pub(crate) fn assess(
    connected: bool,
    pong_diff: Duration,
    low_memory: bool,
    config: &RuntimeConfig,
) -> SweepDecision {
    let mark_disconnected = pong_diff >= config.disconnect_after();
    let connected_now = connected && !mark_disconnected;
    let destroy = !connected_now && (low_memory || pong_diff >= config.destroy_after());
    SweepDecision {
        mark_disconnected,
        destroy,
    }
}

/// Resident set size of this process in bytes, zero when unavailable.
#[cfg(target_os = "linux")]
pub(crate) fn current_rss_bytes() -> u64 {
    // Second field of /proc/self/statm is resident pages.
    let statm = match std::fs::read_to_string("/proc/self/statm") {
        Ok(contents) => contents,
        Err(_) => return 0,
    };
    let resident_pages = statm
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse::<u64>().ok())
        .unwrap_or(0);
    resident_pages * 4096
}

/// Resident set size of this process in bytes, zero when unavailable.
#[cfg(not(target_os = "linux"))]
pub(crate) fn current_rss_bytes() -> u64 {
    0
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    #[test]
    fn healthy_window_is_left_alone() {
        let decision = assess(true, Duration::from_secs(1), false, &config());
        assert_eq!(
            decision,
            SweepDecision {
                mark_disconnected: false,
                destroy: false
            }
        );
    }

    #[test]
    fn pong_silence_marks_disconnected_without_destroying() {
        let decision = assess(true, Duration::from_secs(6), false, &config());
        assert!(decision.mark_disconnected);
        assert!(!decision.destroy);

        let decision = assess(true, Duration::from_secs(59), false, &config());
        assert!(decision.mark_disconnected);
        assert!(!decision.destroy);
    }

    #[test]
    fn prolonged_silence_destroys() {
        let decision = assess(true, Duration::from_secs(60), false, &config());
        assert!(decision.destroy);

        // Also when the window was already marked disconnected.
        let decision = assess(false, Duration::from_secs(60), false, &config());
        assert!(decision.destroy);
    }

    #[test]
    fn memory_pressure_evicts_disconnected_windows_immediately() {
        // Pong silence past the disconnect threshold only.
        let decision = assess(true, Duration::from_secs(7), true, &config());
        assert!(decision.destroy);

        // Explicitly disconnected with a recent pong.
        let decision = assess(false, Duration::from_secs(1), true, &config());
        assert!(decision.destroy);
    }

    #[test]
    fn memory_pressure_spares_connected_windows() {
        let decision = assess(true, Duration::from_secs(1), true, &config());
        assert!(!decision.destroy);
        assert!(!decision.mark_disconnected);
    }

    #[test]
    fn explicit_disconnect_with_recent_pong_waits_for_the_timeout() {
        let decision = assess(false, Duration::from_secs(1), false, &config());
        assert!(!decision.destroy);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn rss_probe_reads_a_nonzero_value() {
        assert!(current_rss_bytes() > 0);
    }
}
