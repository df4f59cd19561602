//! Clock and pacing utilities for the capture loops.
//!
//! Recording time is anchored to a monotonic epoch taken when a session
//! starts. Paused intervals are accumulated separately so the displayed
//! elapsed time (and the encoded timeline) only counts active recording.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// A recording clock that excludes paused time from its elapsed value.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Local>,

    /// Sum of all completed pauses.
    paused_total: Duration,

    /// Start of the pause in progress, if any.
    pause_started: Option<Instant>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    /// Create a clock anchored to a known instant.
    pub fn start_at(epoch: Instant) -> Self {
        Self {
            epoch,
            epoch_wall: Local::now(),
            paused_total: Duration::ZERO,
            pause_started: None,
        }
    }

    /// Begin a pause. Returns false if the clock was already paused.
    pub fn pause(&mut self) -> bool {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> bool {
        if self.pause_started.is_some() {
            return false;
        }
        self.pause_started = Some(now);
        true
    }

    /// End the current pause, returning its length.
    pub fn resume(&mut self) -> Option<Duration> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> Option<Duration> {
        let started = self.pause_started.take()?;
        let paused = now.saturating_duration_since(started);
        self.paused_total += paused;
        Some(paused)
    }

    /// Whether a pause is in progress.
    pub fn is_paused(&self) -> bool {
        self.pause_started.is_some()
    }

    /// Active (non-paused) time since the epoch.
    pub fn active_elapsed(&self) -> Duration {
        self.active_elapsed_at(Instant::now())
    }

    /// `now - start - total_paused`, counting a pause in progress up to `now`.
    pub fn active_elapsed_at(&self, now: Instant) -> Duration {
        let wall = now.saturating_duration_since(self.epoch);
        let open_pause = self
            .pause_started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or(Duration::ZERO);
        wall.saturating_sub(self.paused_total + open_pause)
    }

    /// Total paused time so far, including a pause in progress.
    pub fn paused_total(&self) -> Duration {
        let open_pause = self
            .pause_started
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO);
        self.paused_total + open_pause
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> DateTime<Local> {
        self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

/// Format an elapsed duration as `HH:MM:SS` for status displays.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Fixed-cadence loop pacer.
///
/// Ticks are scheduled on absolute deadlines. When the loop falls behind
/// by more than a full period the missed ticks are dropped instead of
/// being replayed in a burst.
#[derive(Debug)]
pub struct RateController {
    period: Duration,
    next_tick: Option<Instant>,
}

impl RateController {
    /// Create a controller with the given tick period.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_tick: None,
        }
    }

    /// Create a controller targeting the given Hz rate.
    pub fn from_hz(target_hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / target_hz.max(1))
    }

    /// Check if the next tick is due at `now`.
    /// Returns true and schedules the following tick if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now: Instant) -> bool {
        match self.next_tick {
            None => {
                self.next_tick = Some(now + self.period);
                true
            }
            Some(next) if now >= next => {
                let mut following = next + self.period;
                if following <= now {
                    following = now + self.period;
                }
                self.next_tick = Some(following);
                true
            }
            _ => false,
        }
    }

    /// Time left until the next tick is due.
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next_tick
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }
}
