//! Timer entity snapshots and the remaining-time calculation.
//!
//! The host owns the entities; this crate only reads immutable snapshots
//! of them. A snapshot changes by replacement, never by mutation, so
//! change detection is a plain value comparison.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;

/// Activity state reported by a timer entity.
///
/// The set is open-ended: states this crate does not know about are
/// carried verbatim in [`ActivityState::Other`] and behave like a
/// non-active state everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    /// The timer is not counting and holds its configured duration.
    Idle,
    /// The timer is counting down towards `finishes_at`.
    Active,
    /// The timer is suspended partway through its countdown.
    Paused,
    /// Any state not listed above.
    #[serde(untagged)]
    Other(String),
}

impl ActivityState {
    /// Whether the timer is actively counting down.
    pub fn is_active(&self) -> bool {
        matches!(self, ActivityState::Active)
    }
}

/// A point-in-time snapshot of a timer entity, produced by the host.
///
/// Snapshots are immutable values; the card compares old and new by
/// equality to decide whether anything externally visible changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEntity {
    /// The host's identifier for this entity, e.g. `timer.tea`.
    pub entity_id: String,
    /// Current activity state.
    pub state: ActivityState,
    /// Configured duration as `HH:MM:SS`.
    pub duration: String,
    /// Absolute completion time; present only while the timer runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finishes_at: Option<DateTime<Utc>>,
}

/// A snapshot of the host state store, keyed by entity id.
///
/// The host hands one of these to [`Model::sync`](crate::card::Model::sync)
/// on every refresh cycle; the card extracts its own entity from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStates {
    entities: HashMap<String, TimerEntity>,
}

impl EntityStates {
    /// Creates an empty store snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entity, keyed by its `entity_id`.
    pub fn insert(&mut self, entity: TimerEntity) {
        self.entities.insert(entity.entity_id.clone(), entity);
    }

    /// Removes an entity, returning it if it was present.
    pub fn remove(&mut self, entity_id: &str) -> Option<TimerEntity> {
        self.entities.remove(entity_id)
    }

    /// Looks up an entity snapshot.
    pub fn get(&self, entity_id: &str) -> Option<&TimerEntity> {
        self.entities.get(entity_id)
    }
}

/// Seconds left on a timer right now.
///
/// While the timer is active the value is derived from `finishes_at`,
/// floored at zero so a just-expired timer reads 0 rather than going
/// negative. In every other state the configured duration applies and the
/// result is independent of wall-clock time. A malformed duration string
/// degrades to `None` (unknown) instead of failing; the next snapshot or
/// tick may recover.
///
/// Pure apart from the `now` argument, so it is safe to call redundantly.
///
/// # Examples
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use timer_card::entity::{time_remaining, ActivityState, TimerEntity};
///
/// let now = Utc::now();
/// let entity = TimerEntity {
///     entity_id: "timer.tea".to_string(),
///     state: ActivityState::Active,
///     duration: "00:05:00".to_string(),
///     finishes_at: Some(now + Duration::seconds(30)),
/// };
/// assert_eq!(time_remaining(&entity, now), Some(30));
/// ```
pub fn time_remaining(entity: &TimerEntity, now: DateTime<Utc>) -> Option<u64> {
    if entity.state.is_active() {
        if let Some(finishes_at) = entity.finishes_at {
            let remaining = finishes_at.signed_duration_since(now).num_seconds();
            return Some(remaining.max(0) as u64);
        }
    }

    match parse_duration(&entity.duration) {
        Ok(seconds) => Some(seconds),
        Err(error) => {
            log::warn!(
                "dropping malformed duration on {}: {}",
                entity.entity_id,
                error
            );
            None
        }
    }
}
