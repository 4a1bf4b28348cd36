//! Wall clock, countdown ticker and the per-step countdown.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1_000);
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Source of countdown ticks. A ticker is owned by the view it drives, so
/// dropping the view cancels any pending ticks.
pub trait Ticker: Send {
    /// Whole periods elapsed since the previous poll or reset.
    fn poll(&mut self) -> u32;
    /// Restart the period from now, discarding any partial period.
    fn reset(&mut self);
}

/// Ticker that measures elapsed periods on a [`Clock`]. Partial periods carry
/// over to the next poll.
pub struct ClockTicker {
    clock: Arc<dyn Clock>,
    period_ms: i64,
    anchor_ms: i64,
}

impl ClockTicker {
    pub fn new(clock: Arc<dyn Clock>, period_ms: u64) -> Self {
        let anchor_ms = clock.now_ms();
        Self {
            clock,
            period_ms: i64::try_from(period_ms.max(1)).unwrap_or(i64::MAX),
            anchor_ms,
        }
    }
}

impl Ticker for ClockTicker {
    fn poll(&mut self) -> u32 {
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.anchor_ms);
        if elapsed < self.period_ms {
            // Covers clocks that stepped backwards as well.
            if elapsed < 0 {
                self.anchor_ms = now;
            }
            return 0;
        }

        let ticks = elapsed / self.period_ms;
        self.anchor_ms += ticks * self.period_ms;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    fn reset(&mut self) {
        self.anchor_ms = self.clock.now_ms();
    }
}

impl std::fmt::Debug for ClockTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockTicker")
            .field("period_ms", &self.period_ms)
            .field("anchor_ms", &self.anchor_ms)
            .finish()
    }
}

/// Seconds left on a step. Stops at zero and stays there; expiry is purely
/// informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    remaining: Option<u32>,
}

impl Countdown {
    pub fn new(limit_secs: Option<u32>) -> Self {
        Self {
            remaining: limit_secs,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_timed(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Returns true when the remaining time changed.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            Some(left) if left > 0 => {
                self.remaining = Some(left - 1);
                true
            }
            _ => false,
        }
    }

    /// Applies up to `ticks` ticks; returns how many changed the value.
    pub fn tick_n(&mut self, ticks: u32) -> u32 {
        let Some(left) = self.remaining else {
            return 0;
        };
        let applied = ticks.min(left);
        self.remaining = Some(left - applied);
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_from_twenty_hits_zero_and_stays() {
        let mut countdown = Countdown::new(Some(20));
        for _ in 0..20 {
            assert!(countdown.tick());
        }
        assert_eq!(countdown.remaining(), Some(0));
        assert!(countdown.is_expired());

        for _ in 0..5 {
            assert!(!countdown.tick());
        }
        assert_eq!(countdown.remaining(), Some(0));
    }

    #[test]
    fn untimed_countdown_ignores_ticks() {
        let mut countdown = Countdown::new(None);
        assert!(!countdown.tick());
        assert_eq!(countdown.tick_n(10), 0);
        assert_eq!(countdown.remaining(), None);
        assert!(!countdown.is_expired());
    }

    #[test]
    fn tick_n_saturates() {
        let mut countdown = Countdown::new(Some(3));
        assert_eq!(countdown.tick_n(10), 3);
        assert_eq!(countdown.remaining(), Some(0));
    }

    #[test]
    fn clock_ticker_carries_partial_periods() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut ticker = ClockTicker::new(clock.clone(), 1_000);

        clock.advance_ms(999);
        assert_eq!(ticker.poll(), 0);
        clock.advance_ms(1);
        assert_eq!(ticker.poll(), 1);
        clock.advance_ms(2_500);
        assert_eq!(ticker.poll(), 2);
        clock.advance_ms(500);
        assert_eq!(ticker.poll(), 1);
    }

    #[test]
    fn reset_discards_partial_period() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = ClockTicker::new(clock.clone(), 1_000);

        clock.advance_ms(900);
        ticker.reset();
        clock.advance_ms(900);
        assert_eq!(ticker.poll(), 0);
        clock.advance_ms(100);
        assert_eq!(ticker.poll(), 1);
    }

    #[test]
    fn backwards_clock_does_not_tick() {
        let clock = Arc::new(ManualClock::new(5_000));
        let mut ticker = ClockTicker::new(clock.clone(), 1_000);

        clock.set_ms(1_000);
        assert_eq!(ticker.poll(), 0);
        clock.advance_ms(1_000);
        assert_eq!(ticker.poll(), 1);
    }
}
