//! Periodic memory reclamation.
//!
//! When `FREEMEM` names a positive number of seconds, a background ticker
//! asks the allocator to hand unused heap pages back to the OS at that
//! interval. It runs for the life of the process.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::observability::metrics;

/// Parse a `FREEMEM` value. `None` for anything but a positive integer.
pub fn parse_interval(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}

/// Start the reclamation ticker for a raw `FREEMEM` value.
///
/// An unusable value is logged and no ticker is started.
pub fn spawn_from_env(raw: &str) -> Option<JoinHandle<()>> {
    match parse_interval(raw) {
        Some(interval) => Some(spawn(interval)),
        None => {
            tracing::warn!(
                value = %raw,
                "FREEMEM is not a positive number of seconds, memory reclamation disabled"
            );
            None
        }
    }
}

pub fn spawn(interval: Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = interval.as_secs(), "Memory reclamation enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let released = release_memory();
            metrics::record_memory_reclaim();
            tracing::debug!(released, "Memory reclamation pass");
        }
    })
}

/// Ask the allocator to return free memory. True if anything was released.
pub fn release_memory() -> bool {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    // SAFETY: malloc_trim only walks the allocator's own free lists.
    unsafe {
        libc::malloc_trim(0) == 1
    }
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_interval(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_interval("0"), None);
        assert_eq!(parse_interval("-1"), None);
        assert_eq!(parse_interval("soon"), None);
        assert_eq!(parse_interval(""), None);
    }

    #[tokio::test]
    async fn test_invalid_value_starts_nothing() {
        assert!(spawn_from_env("never").is_none());
    }

    #[tokio::test]
    async fn test_ticker_keeps_running() {
        let handle = spawn(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[test]
    fn test_release_memory_is_callable() {
        let _ = release_memory();
    }
}
