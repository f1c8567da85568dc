//! The timer card: keeps a displayed countdown in sync with an externally
//! owned timer entity.
//!
//! The card never owns the timer. The host's state store holds the
//! authoritative entity; the card holds the last snapshot it was shown, a
//! derived remaining-seconds value, and the single recurring tick used to
//! refresh that value while the timer runs. User actions are delegated:
//! toggle and reset emit a [`ServiceCallMsg`] for the host's command
//! channel and the card waits for the next snapshot to reflect the
//! outcome, with no local prediction.
//!
//! # Integration
//!
//! Call [`Model::sync`] whenever the host's state store refreshes, forward
//! every message through [`Model::update`], and intercept the messages the
//! card emits:
//!
//! ```rust
//! use bubbletea_rs::{Cmd, Model as BubbleTeaModel, Msg};
//! use timer_card::{CardConfig, EntityStates, Model as TimerCard, ServiceCallMsg};
//!
//! struct App {
//!     states: EntityStates,
//!     card: TimerCard,
//! }
//!
//! impl BubbleTeaModel for App {
//!     fn init() -> (Self, Option<Cmd>) {
//!         let card = TimerCard::new(CardConfig {
//!             entity: "timer.tea".to_string(),
//!             name: Some("Tea".to_string()),
//!         })
//!         .expect("entity id is set");
//!         let states = EntityStates::new();
//!         (Self { states, card }, None)
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         if let Some(call) = msg.downcast_ref::<ServiceCallMsg>() {
//!             // Forward (call.domain, call.action, call.entity_id) to the
//!             // command channel, then refresh self.states from its result.
//!             let _ = call;
//!             return None;
//!         }
//!         self.card.update(&msg)
//!     }
//!
//!     fn view(&self) -> String {
//!         self.card.view()
//!     }
//! }
//! ```

use std::time::Duration;

use bubbletea_rs::{tick, Cmd, KeyMsg, Msg};
use chrono::{DateTime, Utc};
use crossterm::event::KeyCode;
use lipgloss_extras::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::duration::format_duration;
use crate::entity::{time_remaining, EntityStates, TimerEntity};
use crate::interval::{Interval, TickMsg};
use crate::key::Binding;

/// How often the displayed value is recomputed while the timer runs.
const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Error returned when a card is configured without a usable entity id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timer card requires a non-empty entity id")]
pub struct ConfigError;

/// Card configuration, as supplied by the host's dashboard config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardConfig {
    /// Id of the timer entity to mirror. Required.
    pub entity: String,
    /// Optional display label rendered above the value.
    #[serde(default)]
    pub name: Option<String>,
}

/// Timer service actions the card can request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Start or resume the timer.
    Start,
    /// Pause a running timer, keeping its remaining time.
    Pause,
    /// Cancel the timer, restoring its configured duration.
    Cancel,
}

impl TimerAction {
    /// The action name as the host command channel expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Cancel => "cancel",
        }
    }
}

/// Emitted when the user activates an action.
///
/// The host forwards the `(domain, action, entity_id)` triple to its
/// command channel verbatim. The card does not guess the outcome; its
/// state only changes on the next authoritative snapshot.
#[derive(Debug, Clone)]
pub struct ServiceCallMsg {
    /// Service domain, always `"timer"` for this card.
    pub domain: &'static str,
    /// The requested action.
    pub action: TimerAction,
    /// The configured entity id.
    pub entity_id: String,
}

/// Emitted when the user activates the card's primary content.
///
/// Hosts typically respond by opening an info panel for the entity.
#[derive(Debug, Clone)]
pub struct MoreInfoMsg {
    /// The configured entity id.
    pub entity_id: String,
}

/// What the card should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Display {
    /// A remaining-time value, formatted `HH:MM:SS`.
    Remaining(String),
    /// The entity exists but no remaining value could be derived.
    Unknown,
    /// The host has no entity under the configured id.
    NotFound,
}

/// Key bindings for the card actions.
#[derive(Debug, Clone)]
pub struct CardKeyMap {
    /// Start the timer, or pause it if it is running.
    pub toggle: Binding,
    /// Cancel the timer regardless of its state.
    pub reset: Binding,
    /// Request the host's info panel for the entity.
    pub more_info: Binding,
}

impl Default for CardKeyMap {
    fn default() -> Self {
        Self {
            toggle: Binding::new(vec![KeyCode::Char(' '), KeyCode::Char('s')])
                .with_help("space", "start/stop"),
            reset: Binding::new(vec![KeyCode::Char('r')]).with_help("r", "reset"),
            more_info: Binding::new(vec![KeyCode::Enter]).with_help("enter", "more info"),
        }
    }
}

/// The timer card model.
///
/// Create one with [`Model::new`] when the card is attached to its host,
/// and call [`Model::detach`] when it is removed so the polling tick is
/// released.
#[derive(Debug, Clone)]
pub struct Model {
    /// Key bindings for toggle, reset and more-info.
    pub keymap: CardKeyMap,
    /// Style for the optional name header.
    pub header_style: Style,
    /// Style for the remaining-time value.
    pub time_style: Style,
    /// Style for the entity-not-found notice.
    pub warning_style: Style,
    /// Style for the action help footer.
    pub help_style: Style,

    config: CardConfig,
    entity: Option<TimerEntity>,
    remaining: Option<u64>,
    interval: Interval,
    clock: fn() -> DateTime<Utc>,
}

impl Model {
    /// Creates a card for the configured entity.
    ///
    /// Fails with [`ConfigError`] when the entity id is missing or blank;
    /// there is nothing useful a card without one could display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use timer_card::{CardConfig, Model};
    ///
    /// let card = Model::new(CardConfig {
    ///     entity: "timer.tea".to_string(),
    ///     name: None,
    /// });
    /// assert!(card.is_ok());
    ///
    /// let missing = Model::new(CardConfig::default());
    /// assert!(missing.is_err());
    /// ```
    pub fn new(config: CardConfig) -> Result<Self, ConfigError> {
        if config.entity.trim().is_empty() {
            return Err(ConfigError);
        }
        Ok(Self {
            keymap: CardKeyMap::default(),
            header_style: Style::new().bold(true),
            time_style: Style::new().foreground(Color::from("212")),
            warning_style: Style::new().foreground(Color::from("9")),
            help_style: Style::new().faint(true),
            config,
            entity: None,
            remaining: None,
            interval: Interval::new(),
            clock: Utc::now,
        })
    }

    /// Replaces the wall-clock source. Tests use this to make remaining
    /// time a pure function of the snapshot.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured entity id.
    pub fn entity_id(&self) -> &str {
        &self.config.entity
    }

    /// The last snapshot the host showed this card, if any.
    pub fn entity(&self) -> Option<&TimerEntity> {
        self.entity.as_ref()
    }

    /// The current remaining-seconds value, if one could be derived.
    pub fn time_remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Whether the recurring recalculation tick is live.
    pub fn is_polling(&self) -> bool {
        self.interval.is_armed()
    }

    /// Host-refresh entry point, called once per external update.
    ///
    /// Compares the store's snapshot of the configured entity against the
    /// one the card last saw:
    /// - changed (appeared, disappeared into another value, or any
    ///   attribute differs) → polling restarts from scratch: recompute
    ///   immediately, then arm the recurring tick only while the timer is
    ///   active;
    /// - became absent → polling stops and the value is unknown;
    /// - unchanged → nothing happens, so redundant refreshes cause no
    ///   timer churn.
    pub fn sync(&mut self, states: &EntityStates) -> Option<Cmd> {
        let new_entity = states.get(&self.config.entity);
        if new_entity == self.entity.as_ref() {
            return None;
        }

        match new_entity {
            Some(entity) => {
                log::debug!(
                    "timer card {}: snapshot changed, state {:?}",
                    self.config.entity,
                    entity.state
                );
                self.entity = Some(entity.clone());
                self.start_interval()
            }
            None => {
                log::debug!("timer card {}: entity disappeared", self.config.entity);
                self.entity = None;
                self.remaining = None;
                self.interval.disarm();
                None
            }
        }
    }

    /// Releases the polling tick. Call when the card is removed from the
    /// host; safe to call repeatedly.
    pub fn detach(&mut self) {
        self.interval.disarm();
    }

    /// Handles tick and key messages.
    ///
    /// Ticks from a cancelled or replaced chain are rejected, so a stopped
    /// card never recomputes. Action keys are ignored while the entity is
    /// missing, matching a card that renders no buttons in that state.
    pub fn update(&mut self, msg: &Msg) -> Option<Cmd> {
        if let Some(tick_msg) = msg.downcast_ref::<TickMsg>() {
            if !self.interval.accepts(tick_msg) {
                return None;
            }
            self.calculate_remaining();
            return Some(self.interval.arm(POLL_PERIOD));
        }

        if let Some(key_msg) = msg.downcast_ref::<KeyMsg>() {
            if self.entity.is_none() {
                return None;
            }
            if self.keymap.toggle.matches(key_msg) {
                return Some(self.toggle());
            }
            if self.keymap.reset.matches(key_msg) {
                return Some(self.reset());
            }
            if self.keymap.more_info.matches(key_msg) {
                return Some(self.more_info());
            }
        }

        None
    }

    /// Requests start or pause from the host, based on the current
    /// snapshot: pause while the timer is active, start otherwise.
    pub fn toggle(&self) -> Cmd {
        emit_service_call(self.toggle_call())
    }

    /// Requests a cancel from the host, regardless of the current state.
    pub fn reset(&self) -> Cmd {
        emit_service_call(self.service_call(TimerAction::Cancel))
    }

    /// Requests the host's info panel for the configured entity.
    pub fn more_info(&self) -> Cmd {
        let msg = MoreInfoMsg {
            entity_id: self.config.entity.clone(),
        };
        tick(Duration::from_nanos(1), move |_| {
            Box::new(msg.clone()) as Msg
        })
    }

    /// What the card should currently show.
    pub fn display(&self) -> Display {
        match (&self.entity, self.remaining) {
            (None, _) => Display::NotFound,
            (Some(_), Some(seconds)) => Display::Remaining(format_duration(seconds)),
            (Some(_), None) => Display::Unknown,
        }
    }

    /// Renders the card: optional header, the value or a not-found
    /// notice, and a one-line action footer.
    pub fn view(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.config.name {
            lines.push(self.header_style.render(name));
        }

        match self.display() {
            Display::NotFound => {
                lines.push(
                    self.warning_style
                        .render(&format!("Entity not found: {}", self.config.entity)),
                );
            }
            Display::Remaining(text) => {
                lines.push(self.time_style.render(&text));
                lines.push(self.help_style.render(&self.help_line()));
            }
            Display::Unknown => {
                // Transient bad data degrades to a blank value, never a crash.
                lines.push(String::new());
                lines.push(self.help_style.render(&self.help_line()));
            }
        }

        lines.join("\n")
    }

    fn entity_is_active(&self) -> bool {
        self.entity
            .as_ref()
            .is_some_and(|entity| entity.state.is_active())
    }

    /// Restarts polling from scratch: any prior tick chain dies, the
    /// display is corrected immediately, and the recurring tick is armed
    /// only while the timer is actively counting down. The snapshot does
    /// not change between ticks; only wall-clock time advances.
    fn start_interval(&mut self) -> Option<Cmd> {
        self.interval.disarm();
        self.calculate_remaining();
        if self.entity_is_active() {
            Some(self.interval.arm(POLL_PERIOD))
        } else {
            None
        }
    }

    fn calculate_remaining(&mut self) {
        let now = (self.clock)();
        self.remaining = self
            .entity
            .as_ref()
            .and_then(|entity| time_remaining(entity, now));
    }

    fn toggle_call(&self) -> ServiceCallMsg {
        let action = if self.entity_is_active() {
            TimerAction::Pause
        } else {
            TimerAction::Start
        };
        self.service_call(action)
    }

    fn service_call(&self, action: TimerAction) -> ServiceCallMsg {
        ServiceCallMsg {
            domain: "timer",
            action,
            entity_id: self.config.entity.clone(),
        }
    }

    fn help_line(&self) -> String {
        let toggle_label = if self.entity_is_active() {
            "stop"
        } else {
            "start"
        };
        let (toggle_key, _) = self.keymap.toggle.help();
        let (reset_key, reset_desc) = self.keymap.reset.help();
        let (info_key, info_desc) = self.keymap.more_info.help();
        format!(
            "[{toggle_key}] {toggle_label} · [{reset_key}] {reset_desc} · [{info_key}] {info_desc}"
        )
    }
}

fn emit_service_call(call: ServiceCallMsg) -> Cmd {
    tick(Duration::from_nanos(1), move |_| {
        Box::new(call.clone()) as Msg
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ActivityState;
    use chrono::TimeZone;
    use crossterm::event::KeyModifiers;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap()
    }

    fn ten_seconds_later() -> DateTime<Utc> {
        fixed_now() + chrono::Duration::seconds(10)
    }

    fn forty_seconds_later() -> DateTime<Utc> {
        fixed_now() + chrono::Duration::seconds(40)
    }

    fn card() -> Model {
        Model::new(CardConfig {
            entity: "timer.tea".to_string(),
            name: Some("Tea".to_string()),
        })
        .expect("valid config")
        .with_clock(fixed_now)
    }

    fn active_entity() -> TimerEntity {
        TimerEntity {
            entity_id: "timer.tea".to_string(),
            state: ActivityState::Active,
            duration: "00:05:00".to_string(),
            finishes_at: Some(fixed_now() + chrono::Duration::seconds(30)),
        }
    }

    fn paused_entity() -> TimerEntity {
        TimerEntity {
            entity_id: "timer.tea".to_string(),
            state: ActivityState::Paused,
            duration: "00:01:30".to_string(),
            finishes_at: None,
        }
    }

    fn idle_entity() -> TimerEntity {
        TimerEntity {
            entity_id: "timer.tea".to_string(),
            state: ActivityState::Idle,
            duration: "00:05:00".to_string(),
            finishes_at: None,
        }
    }

    fn states_with(entity: TimerEntity) -> EntityStates {
        let mut states = EntityStates::new();
        states.insert(entity);
        states
    }

    fn key(code: KeyCode) -> Msg {
        Box::new(KeyMsg {
            key: code,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_new_rejects_blank_entity() {
        assert_eq!(Model::new(CardConfig::default()).unwrap_err(), ConfigError);
        let blank = Model::new(CardConfig {
            entity: "   ".to_string(),
            name: None,
        });
        assert_eq!(blank.unwrap_err(), ConfigError);
    }

    #[test]
    fn test_missing_entity_shows_not_found_and_does_not_poll() {
        let mut m = card();
        let cmd = m.sync(&EntityStates::new());

        assert!(cmd.is_none());
        assert_eq!(m.display(), Display::NotFound);
        assert!(!m.is_polling());
    }

    #[test]
    fn test_paused_entity_uses_static_duration_without_polling() {
        let mut m = card();
        let cmd = m.sync(&states_with(paused_entity()));

        // Only the immediate recompute fires; no recurring tick is armed.
        assert!(cmd.is_none());
        assert_eq!(m.time_remaining(), Some(90));
        assert_eq!(m.display(), Display::Remaining("00:01:30".to_string()));
        assert!(!m.is_polling());
    }

    #[test]
    fn test_active_entity_arms_polling_and_computes_immediately() {
        let mut m = card();
        let cmd = m.sync(&states_with(active_entity()));

        assert!(cmd.is_some());
        assert!(m.is_polling());
        assert_eq!(m.time_remaining(), Some(30));
        assert_eq!(m.display(), Display::Remaining("00:00:30".to_string()));
    }

    #[test]
    fn test_unchanged_snapshot_is_a_no_op() {
        let mut m = card();
        let first = m.sync(&states_with(active_entity()));
        assert!(first.is_some());
        let live = m.interval.live_tick();

        let second = m.sync(&states_with(active_entity()));

        assert!(second.is_none());
        // The existing chain was left alone, not replaced.
        assert!(m.interval.accepts(&live));
    }

    #[test]
    fn test_tick_recomputes_from_wall_clock() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        assert_eq!(m.time_remaining(), Some(30));

        m.clock = ten_seconds_later;
        let tick_msg: Msg = Box::new(m.interval.live_tick());
        let next = m.update(&tick_msg);

        assert!(next.is_some()); // chains the following tick
        assert_eq!(m.time_remaining(), Some(20));
    }

    #[test]
    fn test_expired_timer_reads_zero_not_negative() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));

        m.clock = forty_seconds_later;
        let tick_msg: Msg = Box::new(m.interval.live_tick());
        let _ = m.update(&tick_msg);

        assert_eq!(m.time_remaining(), Some(0));
        assert_eq!(m.display(), Display::Remaining("00:00:00".to_string()));
    }

    #[test]
    fn test_entity_removal_stops_polling_and_rejects_in_flight_tick() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        let in_flight = m.interval.live_tick();

        let cmd = m.sync(&EntityStates::new());
        assert!(cmd.is_none());
        assert!(!m.is_polling());
        assert_eq!(m.display(), Display::NotFound);
        assert_eq!(m.time_remaining(), None);

        // Simulated time advance plus the stale tick: no recompute happens.
        m.clock = ten_seconds_later;
        let stale: Msg = Box::new(in_flight);
        assert!(m.update(&stale).is_none());
        assert_eq!(m.time_remaining(), None);
    }

    #[test]
    fn test_transition_active_to_idle_disarms() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        assert!(m.is_polling());
        let old_chain = m.interval.live_tick();

        let cmd = m.sync(&states_with(idle_entity()));

        assert!(cmd.is_none());
        assert!(!m.is_polling());
        assert_eq!(m.time_remaining(), Some(300));
        assert!(!m.interval.accepts(&old_chain));
    }

    #[test]
    fn test_transition_idle_to_active_arms_exactly_one_chain() {
        let mut m = card();
        let idle_cmd = m.sync(&states_with(idle_entity()));
        assert!(idle_cmd.is_none());
        assert!(!m.is_polling());

        let active_cmd = m.sync(&states_with(active_entity()));
        assert!(active_cmd.is_some());
        assert!(m.is_polling());
    }

    #[test]
    fn test_rapid_snapshot_updates_never_leak_a_second_chain() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        let first_chain = m.interval.live_tick();

        let mut updated = active_entity();
        updated.finishes_at = Some(fixed_now() + chrono::Duration::seconds(29));
        let _ = m.sync(&states_with(updated));

        // The first chain is dead; only the replacement is accepted.
        assert!(!m.interval.accepts(&first_chain));
        assert!(m.interval.accepts(&m.interval.live_tick()));

        let stale: Msg = Box::new(first_chain);
        assert!(m.update(&stale).is_none());
    }

    #[test]
    fn test_detach_stops_polling() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        assert!(m.is_polling());

        m.detach();
        assert!(!m.is_polling());
        m.detach(); // idempotent
        assert!(!m.is_polling());
    }

    #[test]
    fn test_toggle_maps_active_to_pause() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));

        let call = m.toggle_call();
        assert_eq!(call.domain, "timer");
        assert_eq!(call.action, TimerAction::Pause);
        assert_eq!(call.entity_id, "timer.tea");
    }

    #[test]
    fn test_toggle_maps_non_active_to_start() {
        let mut m = card();
        let _ = m.sync(&states_with(paused_entity()));
        assert_eq!(m.toggle_call().action, TimerAction::Start);

        let _ = m.sync(&states_with(idle_entity()));
        assert_eq!(m.toggle_call().action, TimerAction::Start);
    }

    #[test]
    fn test_reset_always_maps_to_cancel() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        assert_eq!(m.service_call(TimerAction::Cancel).action, TimerAction::Cancel);

        let _ = m.sync(&states_with(idle_entity()));
        let call = m.service_call(TimerAction::Cancel);
        assert_eq!(call.domain, "timer");
        assert_eq!(call.action, TimerAction::Cancel);
        assert_eq!(call.entity_id, "timer.tea");
    }

    #[test]
    fn test_action_keys_produce_commands_when_entity_exists() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));

        assert!(m.update(&key(KeyCode::Char(' '))).is_some());
        assert!(m.update(&key(KeyCode::Char('r'))).is_some());
        assert!(m.update(&key(KeyCode::Enter)).is_some());
        assert!(m.update(&key(KeyCode::Char('x'))).is_none());
    }

    #[test]
    fn test_action_keys_ignored_without_entity() {
        let mut m = card();
        let _ = m.sync(&EntityStates::new());

        assert!(m.update(&key(KeyCode::Char(' '))).is_none());
        assert!(m.update(&key(KeyCode::Char('r'))).is_none());
    }

    #[test]
    fn test_sync_does_not_dispatch_optimistically() {
        // Toggling produces a command but leaves the snapshot and the
        // derived value untouched until the host delivers a new snapshot.
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        let before = m.entity().cloned();

        let _cmd = m.toggle();

        assert_eq!(m.entity().cloned(), before);
        assert_eq!(m.time_remaining(), Some(30));
    }

    #[test]
    fn test_view_not_found_names_the_entity() {
        let mut m = card();
        let _ = m.sync(&EntityStates::new());

        let view = m.view();
        assert!(view.contains("Tea"));
        assert!(view.contains("Entity not found: timer.tea"));
    }

    #[test]
    fn test_view_shows_value_and_state_dependent_action_label() {
        let mut m = card();
        let _ = m.sync(&states_with(active_entity()));
        let view = m.view();
        assert!(view.contains("00:00:30"));
        assert!(view.contains("stop"));

        let _ = m.sync(&states_with(paused_entity()));
        let view = m.view();
        assert!(view.contains("00:01:30"));
        assert!(view.contains("start"));
    }

    #[test]
    fn test_malformed_duration_degrades_to_unknown_display() {
        let mut entity = paused_entity();
        entity.duration = "soon".to_string();

        let mut m = card();
        let _ = m.sync(&states_with(entity));

        assert_eq!(m.time_remaining(), None);
        assert_eq!(m.display(), Display::Unknown);
        // The card still renders rather than crashing on bad data.
        let _ = m.view();
    }

    #[test]
    fn test_config_deserializes_from_host_json() {
        let config: CardConfig =
            serde_json::from_str(r#"{"entity": "timer.tea", "name": "Tea"}"#).unwrap();
        assert_eq!(config.entity, "timer.tea");
        assert_eq!(config.name.as_deref(), Some("Tea"));

        let bare: CardConfig = serde_json::from_str(r#"{"entity": "timer.tea"}"#).unwrap();
        assert_eq!(bare.name, None);
    }
}
