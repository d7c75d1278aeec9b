//! Countdown ticker: a stateful child widget created lazily by the
//! `countdown-enabled` render routine.
//!
//! The ticker owns a periodic tokio task that rewrites its surface's text once
//! per second. It stops on its own after rendering an expired duration, and it
//! is cancelled by its owner when the countdown is switched off (or on drop),
//! so no timer outlives the option that created it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::render::surface::SurfaceHandle;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownFormat {
    /// `MM:SS`, widening to `HH:MM:SS` and `Dd HH:MM:SS` as needed.
    Auto,
    Hms,
    Dhms,
    Seconds,
}

impl CountdownFormat {
    pub const NAMES: &'static [&'static str] = &["auto", "hms", "dhms", "seconds"];

    /// Unknown names fall back to `Auto`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "hms" => Self::Hms,
            "dhms" => Self::Dhms,
            "seconds" => Self::Seconds,
            _ => Self::Auto,
        }
    }
}

/// Formats a remaining duration. Negative durations display as zero.
pub fn format_remaining(seconds: i64, format: CountdownFormat) -> String {
    let total = seconds.max(0);
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let secs = total % 60;

    match format {
        CountdownFormat::Seconds => total.to_string(),
        CountdownFormat::Hms => format!("{:02}:{minutes:02}:{secs:02}", total / 3_600),
        CountdownFormat::Dhms => format!("{days}d {hours:02}:{minutes:02}:{secs:02}"),
        CountdownFormat::Auto if days > 0 => {
            format!("{days}d {hours:02}:{minutes:02}:{secs:02}")
        }
        CountdownFormat::Auto if hours > 0 => format!("{hours:02}:{minutes:02}:{secs:02}"),
        CountdownFormat::Auto => format!("{minutes:02}:{secs:02}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ticker state
// ────────────────────────────────────────────────────────────────────────────

/// Wall-clock time derived from a monotonic anchor, so that paused tokio
/// time drives the countdown the same way it drives the tick.
#[derive(Debug, Clone, Copy)]
struct Clock {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.mono.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

#[derive(Debug)]
struct TickerState {
    target: DateTime<Utc>,
    format: CountdownFormat,
    clock: Clock,
}

impl TickerState {
    /// Whole seconds left, rounded up.
    fn remaining_secs(&self) -> i64 {
        let ms = (self.target - self.clock.now()).num_milliseconds();
        ms.div_euclid(1_000) + i64::from(ms.rem_euclid(1_000) > 0)
    }
}

fn lock_state(state: &Mutex<TickerState>) -> MutexGuard<'_, TickerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Writes the current remaining time; returns true once expired.
fn render_tick(state: &Mutex<TickerState>, surface: &SurfaceHandle) -> bool {
    let (text, expired) = {
        let state = lock_state(state);
        let remaining = state.remaining_secs();
        (format_remaining(remaining, state.format), remaining <= 0)
    };
    surface.lock().set_text(text);
    expired
}

async fn tick_loop(state: Arc<Mutex<TickerState>>, surface: SurfaceHandle) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    loop {
        interval.tick().await;
        if render_tick(&state, &surface) {
            debug!("countdown expired, stopping ticker");
            break;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ticker
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CountdownTicker {
    surface: SurfaceHandle,
    state: Arc<Mutex<TickerState>>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    /// Renders immediately and, unless already expired, starts ticking.
    pub fn new(surface: SurfaceHandle, target: DateTime<Utc>, format: CountdownFormat) -> Self {
        let state = TickerState {
            target,
            format,
            clock: Clock::start(),
        };
        let mut ticker = Self {
            surface,
            state: Arc::new(Mutex::new(state)),
            task: None,
        };
        ticker.restart();
        ticker
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        lock_state(&self.state).target
    }

    pub fn format(&self) -> CountdownFormat {
        lock_state(&self.state).format
    }

    pub fn set_timestamp(&mut self, target: DateTime<Utc>) {
        if self.timestamp() == target {
            return;
        }
        lock_state(&self.state).target = target;
        self.restart();
    }

    pub fn set_format(&mut self, format: CountdownFormat) {
        if self.format() == format {
            return;
        }
        lock_state(&self.state).format = format;
        self.restart();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the periodic task. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn restart(&mut self) {
        self.cancel();
        if render_tick(&self.state, &self.surface) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = tick_loop(self.state.clone(), self.surface.clone());
                self.task = Some(runtime.spawn(task));
            }
            Err(_) => warn!("no async runtime available; countdown rendered once without ticking"),
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::Surface;

    fn surface() -> SurfaceHandle {
        SurfaceHandle::new(Surface::new())
    }

    // ── formatting ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_auto_widens_with_magnitude() {
        assert_eq!(format_remaining(65, CountdownFormat::Auto), "01:05");
        assert_eq!(format_remaining(3_725, CountdownFormat::Auto), "01:02:05");
        assert_eq!(format_remaining(90_061, CountdownFormat::Auto), "1d 01:01:01");
    }

    #[test]
    fn test_format_fixed_layouts() {
        assert_eq!(format_remaining(90_061, CountdownFormat::Hms), "25:01:01");
        assert_eq!(format_remaining(61, CountdownFormat::Dhms), "0d 00:01:01");
        assert_eq!(format_remaining(61, CountdownFormat::Seconds), "61");
    }

    #[test]
    fn test_negative_durations_display_as_zero() {
        assert_eq!(format_remaining(-30, CountdownFormat::Auto), "00:00");
        assert_eq!(format_remaining(-30, CountdownFormat::Seconds), "0");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(CountdownFormat::from_name("dhms"), CountdownFormat::Dhms);
        assert_eq!(CountdownFormat::from_name("bogus"), CountdownFormat::Auto);
    }

    #[test]
    fn test_without_runtime_renders_once() {
        let handle = surface();
        let ticker = CountdownTicker::new(
            handle.clone(),
            Utc::now() + chrono::Duration::seconds(90),
            CountdownFormat::Auto,
        );
        assert!(!ticker.is_running());
        assert_eq!(handle.lock().text_writes(), 1);
    }

    // ── ticking ─────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_past_timestamp_renders_once_then_stops() {
        let handle = surface();
        let ticker = CountdownTicker::new(
            handle.clone(),
            Utc::now() - chrono::Duration::seconds(30),
            CountdownFormat::Auto,
        );
        assert_eq!(handle.lock().text(), "00:00");
        assert!(!ticker.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.lock().text_writes(), 1, "no periodic writes after expiry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_second_until_expiry() {
        let handle = surface();
        let ticker = CountdownTicker::new(
            handle.clone(),
            Utc::now() + chrono::Duration::seconds(3),
            CountdownFormat::Seconds,
        );
        assert_eq!(handle.lock().text(), "3");
        assert!(ticker.is_running());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(handle.lock().text(), "2");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.lock().text(), "0");
        assert!(!ticker.is_running());
        assert_eq!(handle.lock().text_writes(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_periodic_writes() {
        let handle = surface();
        let mut ticker = CountdownTicker::new(
            handle.clone(),
            Utc::now() + chrono::Duration::seconds(60),
            CountdownFormat::Auto,
        );
        ticker.cancel();
        assert!(!ticker.is_running());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.lock().text_writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setters_rerender_immediately() {
        let handle = surface();
        let mut ticker = CountdownTicker::new(
            handle.clone(),
            Utc::now() + chrono::Duration::seconds(125),
            CountdownFormat::Auto,
        );
        assert_eq!(handle.lock().text(), "02:05");

        ticker.set_format(CountdownFormat::Seconds);
        assert_eq!(handle.lock().text(), "125");

        ticker.set_timestamp(Utc::now() - chrono::Duration::seconds(1));
        assert_eq!(handle.lock().text(), "0");
        assert!(!ticker.is_running());
    }
}
