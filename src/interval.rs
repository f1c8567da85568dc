//! The single recurring recalculation tick a card may own.
//!
//! Scheduling goes through the runtime: arming returns a command that
//! resolves into a [`TickMsg`] after the poll period, and the card's
//! update loop chains the next one. Cancellation is a tag bump — every
//! message already in flight carries the old tag and is rejected by
//! [`Interval::accepts`], so a replaced or stopped chain can never deliver
//! a late tick. That makes the replacement synchronous: by the time `arm`
//! returns, the previous chain is already dead.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use bubbletea_rs::{tick, Cmd, Msg};

// Ensures tick messages are only accepted by the interval that armed them,
// even with several cards in one program.
static LAST_ID: AtomicI64 = AtomicI64::new(0);

fn next_id() -> i64 {
    LAST_ID.fetch_add(1, Ordering::SeqCst) + 1
}

/// Message produced by the recurring recalculation tick.
#[derive(Debug, Clone)]
pub struct TickMsg {
    /// The interval instance this tick belongs to.
    pub id: i64,
    /// Chain tag; a stale tag means the chain was cancelled or replaced.
    pub(crate) tag: i64,
}

/// Owns a card's single recurring tick.
///
/// At most one chain is live per instance at any time: arming bumps the
/// tag first, so a second `arm` always kills the first chain before the
/// new one exists.
#[derive(Debug, Clone)]
pub struct Interval {
    id: i64,
    tag: i64,
    armed: bool,
}

impl Default for Interval {
    fn default() -> Self {
        Self {
            id: next_id(),
            tag: 0,
            armed: false,
        }
    }
}

impl Interval {
    /// Creates a disarmed interval with a fresh instance id.
    pub fn new() -> Self {
        Self::default()
    }

    /// The unique id of this interval instance.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Whether a tick chain is currently live.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Replaces any prior chain and schedules the next tick.
    pub fn arm(&mut self, period: Duration) -> Cmd {
        self.tag += 1;
        self.armed = true;
        let id = self.id;
        let tag = self.tag;
        log::debug!("interval {id}: armed (tag {tag})");
        tick(period, move |_| Box::new(TickMsg { id, tag }) as Msg)
    }

    /// Cancels the live chain, if any. Idempotent.
    pub fn disarm(&mut self) {
        if self.armed {
            log::debug!("interval {}: disarmed", self.id);
        }
        self.tag += 1;
        self.armed = false;
    }

    /// Whether a tick message belongs to the live chain.
    pub fn accepts(&self, msg: &TickMsg) -> bool {
        self.armed && msg.id == self.id && msg.tag == self.tag
    }

    /// The message the live chain will deliver next. Test hook for driving
    /// the update loop without a runtime.
    pub(crate) fn live_tick(&self) -> TickMsg {
        TickMsg {
            id: self.id,
            tag: self.tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(1);

    #[test]
    fn test_unique_ids() {
        let a = Interval::new();
        let b = Interval::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_starts_disarmed() {
        let interval = Interval::new();
        assert!(!interval.is_armed());
        assert!(!interval.accepts(&interval.live_tick()));
    }

    #[test]
    fn test_arm_accepts_only_current_chain() {
        let mut interval = Interval::new();
        let _cmd = interval.arm(PERIOD);

        assert!(interval.is_armed());
        assert!(interval.accepts(&interval.live_tick()));

        let foreign = TickMsg {
            id: interval.id() + 999,
            tag: interval.live_tick().tag,
        };
        assert!(!interval.accepts(&foreign));
    }

    #[test]
    fn test_rearm_invalidates_previous_chain() {
        let mut interval = Interval::new();
        let _first = interval.arm(PERIOD);
        let stale = interval.live_tick();

        let _second = interval.arm(PERIOD);

        // Only the most recent chain is live.
        assert!(!interval.accepts(&stale));
        assert!(interval.accepts(&interval.live_tick()));
    }

    #[test]
    fn test_disarm_rejects_in_flight_ticks() {
        let mut interval = Interval::new();
        let _cmd = interval.arm(PERIOD);
        let in_flight = interval.live_tick();

        interval.disarm();

        assert!(!interval.is_armed());
        assert!(!interval.accepts(&in_flight));
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut interval = Interval::new();
        interval.disarm();
        interval.disarm();
        assert!(!interval.is_armed());

        let _cmd = interval.arm(PERIOD);
        interval.disarm();
        interval.disarm();
        assert!(!interval.is_armed());
    }
}
