// ▶️ Playback Controller - Timer-driven cursor advance
//
// States: Stopped ⇄ Playing.
//
// The controller owns no thread and no OS timer. The caller's event loop hands
// it the monotonic clock through `poll(now)`; the controller fires every tick
// whose deadline has passed. Deadlines are chained from the previous DEADLINE,
// never from the moment `poll` happened to run, so a late event loop catches
// up instead of drifting.
//
// Interaction contract with the widgets: any write to the cursor that does not
// come from the playback timer stops playback.

use crate::cursor::{CursorSource, TimeCursor};
use crate::observable::SubscriptionId;
use crate::{MAX_YEAR, MIN_YEAR};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

// ============================================================================
// TICK POLICY
// ============================================================================

/// Per-year tick cadence: `interval` before `late_from`, `late_interval` from
/// `late_from` onwards (recent decades linger a little longer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPolicy {
    pub interval: Duration,
    pub late_interval: Duration,
    pub late_from: i32,
}

impl TickPolicy {
    pub fn uniform(interval: Duration) -> Self {
        TickPolicy {
            interval,
            late_interval: interval,
            late_from: MAX_YEAR + 1,
        }
    }

    /// Delay to hold `year` on screen before the next tick
    pub fn interval_for(&self, year: i32) -> Duration {
        if year >= self.late_from {
            self.late_interval
        } else {
            self.interval
        }
    }
}

impl Default for TickPolicy {
    fn default() -> Self {
        TickPolicy {
            interval: Duration::from_millis(200),
            late_interval: Duration::from_millis(350),
            late_from: 1990,
        }
    }
}

// ============================================================================
// PLAYBACK CONTROLLER
// ============================================================================

struct PlaybackInner {
    state: Cell<PlaybackState>,
    next_deadline: Cell<Option<Instant>>,
}

impl PlaybackInner {
    /// Cancel the schedule; false if it was already cancelled
    fn stop(&self, reason: &str) -> bool {
        if self.state.get() == PlaybackState::Stopped {
            return false;
        }
        self.state.set(PlaybackState::Stopped);
        self.next_deadline.set(None);
        debug!(reason, "playback stopped");
        true
    }
}

pub struct PlaybackController {
    cursor: TimeCursor,
    policy: TickPolicy,
    inner: Rc<PlaybackInner>,
    subscription: SubscriptionId,
}

impl PlaybackController {
    pub fn new(cursor: TimeCursor, policy: TickPolicy) -> Self {
        let inner = Rc::new(PlaybackInner {
            state: Cell::new(PlaybackState::Stopped),
            next_deadline: Cell::new(None),
        });

        // Manual scrubbing wins over the timer
        let weak: Weak<PlaybackInner> = Rc::downgrade(&inner);
        let subscription = cursor.subscribe(move |change| {
            if change.source.is_manual() {
                if let Some(inner) = weak.upgrade() {
                    inner.stop("manual cursor change");
                }
            }
        });

        PlaybackController {
            cursor,
            policy,
            inner,
            subscription,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn policy(&self) -> TickPolicy {
        self.policy
    }

    /// Start playing now
    pub fn play(&self) -> bool {
        self.play_at(Instant::now())
    }

    /// Start playing with the first tick due one interval after `now`
    ///
    /// No-op (returns false) when already playing. Starting at `MAX_YEAR`
    /// rewinds to `MIN_YEAR` first so the sequence can be replayed.
    pub fn play_at(&self, now: Instant) -> bool {
        if self.is_playing() {
            return false;
        }

        if self.cursor.get() >= MAX_YEAR {
            self.cursor.set_from(MIN_YEAR, CursorSource::Playback);
        }

        let year = self.cursor.get();
        self.inner.state.set(PlaybackState::Playing);
        self.inner
            .next_deadline
            .set(Some(now + self.policy.interval_for(year)));

        debug!(year, "playback started");
        true
    }

    /// Cancel the schedule, keeping the cursor where it is
    pub fn pause(&self) -> bool {
        self.inner.stop("paused")
    }

    /// Play if stopped, pause if playing; returns the new state
    pub fn toggle(&self, now: Instant) -> PlaybackState {
        if self.is_playing() {
            self.pause();
        } else {
            self.play_at(now);
        }
        self.state()
    }

    /// Fire every tick due at `now`; returns how many times the cursor advanced
    ///
    /// A tick that would move past `MAX_YEAR` stops the controller instead.
    pub fn poll(&self, now: Instant) -> usize {
        let mut advanced = 0;

        while self.is_playing() {
            let Some(deadline) = self.inner.next_deadline.get() else {
                break;
            };
            if now < deadline {
                break;
            }

            let next = self.cursor.get() + 1;
            if next > MAX_YEAR {
                self.inner.stop("reached end of range");
                break;
            }

            self.cursor.set_from(next, CursorSource::Playback);
            advanced += 1;

            // A subscriber may have paused us during the fan-out
            if self.is_playing() {
                self.inner
                    .next_deadline
                    .set(Some(deadline + self.policy.interval_for(next)));
            }
        }

        advanced
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.next_deadline.get()
    }

    /// How long the event loop may sleep before the next tick is due
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.inner.stop("controller dropped");
        self.cursor.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn controller_at(year: i32) -> (TimeCursor, PlaybackController) {
        let cursor = TimeCursor::starting_at(year);
        let playback = PlaybackController::new(cursor.clone(), TickPolicy::uniform(TICK));
        (cursor, playback)
    }

    #[test]
    fn test_ten_ticks_from_2010_stop_at_2015() {
        let (cursor, playback) = controller_at(2010);
        let t0 = Instant::now();

        assert!(playback.play_at(t0));
        for tick in 1..=10 {
            playback.poll(t0 + TICK * tick);
        }

        assert_eq!(cursor.get(), 2015);
        assert_eq!(playback.state(), PlaybackState::Stopped);
        assert_eq!(playback.next_deadline(), None);
    }

    #[test]
    fn test_late_poll_catches_up() {
        let (cursor, playback) = controller_at(1900);
        let t0 = Instant::now();

        playback.play_at(t0);
        let advanced = playback.poll(t0 + TICK * 10);

        assert_eq!(advanced, 10);
        assert_eq!(cursor.get(), 1910);
        assert!(playback.is_playing());
    }

    #[test]
    fn test_deadlines_do_not_drift() {
        let (cursor, playback) = controller_at(1900);
        let t0 = Instant::now();
        let jitter = Duration::from_millis(30);

        playback.play_at(t0);
        for tick in 1..=5 {
            // The event loop always wakes up late
            assert_eq!(playback.poll(t0 + TICK * tick + jitter), 1);
        }

        assert_eq!(cursor.get(), 1905);
        assert_eq!(playback.next_deadline(), Some(t0 + TICK * 6));
    }

    #[test]
    fn test_poll_before_deadline_does_nothing() {
        let (cursor, playback) = controller_at(1950);
        let t0 = Instant::now();

        playback.play_at(t0);
        assert_eq!(playback.poll(t0 + TICK / 2), 0);
        assert_eq!(cursor.get(), 1950);
        assert_eq!(playback.time_until_next(t0), Some(TICK));
    }

    #[test]
    fn test_double_play_is_noop() {
        let (cursor, playback) = controller_at(1900);
        let t0 = Instant::now();

        assert!(playback.play_at(t0));
        assert!(!playback.play_at(t0 + TICK / 2));

        // Only one schedule: one tick per interval
        assert_eq!(playback.poll(t0 + TICK), 1);
        assert_eq!(cursor.get(), 1901);
    }

    #[test]
    fn test_pause_preserves_cursor() {
        let (cursor, playback) = controller_at(1900);
        let t0 = Instant::now();

        playback.play_at(t0);
        playback.poll(t0 + TICK * 3);
        assert!(playback.pause());
        assert!(!playback.pause());

        assert_eq!(playback.poll(t0 + TICK * 10), 0);
        assert_eq!(cursor.get(), 1903);
        assert_eq!(playback.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_manual_scrub_stops_playback() {
        let (cursor, playback) = controller_at(1900);
        let t0 = Instant::now();

        playback.play_at(t0);
        cursor.set_from(1960, CursorSource::Slider);

        assert_eq!(playback.state(), PlaybackState::Stopped);
        assert_eq!(playback.poll(t0 + TICK * 5), 0);
        assert_eq!(cursor.get(), 1960);
    }

    #[test]
    fn test_play_at_end_rewinds() {
        let (cursor, playback) = controller_at(2015);
        let t0 = Instant::now();

        assert!(playback.play_at(t0));
        assert_eq!(cursor.get(), 1900);
        assert!(playback.is_playing());
    }

    #[test]
    fn test_toggle() {
        let (_cursor, playback) = controller_at(1900);
        let t0 = Instant::now();

        assert_eq!(playback.toggle(t0), PlaybackState::Playing);
        assert_eq!(playback.toggle(t0), PlaybackState::Stopped);
    }

    #[test]
    fn test_tick_policy_varies_by_year() {
        let policy = TickPolicy::default();

        assert_eq!(policy.interval_for(1989), Duration::from_millis(200));
        assert_eq!(policy.interval_for(1990), Duration::from_millis(350));
        assert_eq!(TickPolicy::uniform(TICK).interval_for(2015), TICK);
    }

    #[test]
    fn test_variable_cadence_schedule() {
        let cursor = TimeCursor::starting_at(1988);
        let playback = PlaybackController::new(cursor.clone(), TickPolicy::default());
        let t0 = Instant::now();

        playback.play_at(t0);
        // 1988 → 1989 after 200ms, 1989 → 1990 after another 200ms
        playback.poll(t0 + Duration::from_millis(400));
        assert_eq!(cursor.get(), 1990);
        // 1990 is a late year: held for 350ms
        assert_eq!(playback.next_deadline(), Some(t0 + Duration::from_millis(750)));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cursor = TimeCursor::new();
        {
            let playback = PlaybackController::new(cursor.clone(), TickPolicy::default());
            playback.play();
            assert_eq!(cursor.subscriber_count(), 1);
        }
        assert_eq!(cursor.subscriber_count(), 0);
    }
}
