//! Worker thread helpers.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a worker to finish.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Join `handle`, giving up after `timeout`.
///
/// Returns the worker's result when it finished in time. A worker that
/// outlives the timeout is detached and `None` is returned; a panicked
/// worker is logged and also yields `None`.
pub fn join_with_timeout<T>(handle: JoinHandle<T>, timeout: Duration, name: &str) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(
                worker = name,
                timeout_ms = timeout.as_millis() as u64,
                "Worker did not finish in time; detaching"
            );
            return None;
        }
        std::thread::sleep(JOIN_POLL);
    }

    match handle.join() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(worker = name, "Worker thread panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn joins_finished_worker() {
        let handle = std::thread::spawn(|| 7);
        assert_eq!(
            join_with_timeout(handle, Duration::from_secs(2), "test"),
            Some(7)
        );
    }

    #[test]
    fn gives_up_on_stuck_worker() {
        let release = Arc::new(AtomicBool::new(false));
        let flag = release.clone();
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        let started = Instant::now();
        assert!(join_with_timeout(handle, Duration::from_millis(50), "stuck").is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
        release.store(true, Ordering::SeqCst);
    }
}
