#![warn(missing_docs)]
#![doc(html_root_url = "https://docs.rs/timer-card/")]

//! # timer-card
//!
//! A countdown card for [bubbletea-rs](https://github.com/joshka/bubbletea-rs)
//! that mirrors an externally owned timer entity.
//!
//! ## Overview
//!
//! The host application owns the authoritative timer state and pushes
//! snapshots into an [`EntityStates`] store. The card derives everything
//! else: the remaining time, whether a once-per-second refresh tick should
//! run, and what the user's start, stop and reset keys should request. The
//! card never mutates the timer itself; actions are emitted as
//! [`ServiceCallMsg`] values for the host to forward to whatever actually
//! controls the timer.
//!
//! This split keeps the card honest. Pressing start does not make the
//! display count down; the display only changes when the host delivers a
//! snapshot that says the timer is running.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use timer_card::{ActivityState, CardConfig, EntityStates, Model, TimerEntity};
//!
//! let mut card = Model::new(CardConfig {
//!     entity: "timer.tea".to_string(),
//!     name: Some("Tea".to_string()),
//! })
//! .expect("entity id is set");
//!
//! let mut states = EntityStates::new();
//! states.insert(TimerEntity {
//!     entity_id: "timer.tea".to_string(),
//!     state: ActivityState::Active,
//!     duration: "00:03:00".to_string(),
//!     finishes_at: Some(Utc::now() + chrono::Duration::seconds(180)),
//! });
//!
//! // Call sync() on every host refresh. It returns a Cmd while the timer
//! // is actively counting down, which keeps a 1-second tick chain alive.
//! let cmd = card.sync(&states);
//! assert!(cmd.is_some());
//! assert!(card.is_polling());
//! println!("{}", card.view());
//! ```
//!
//! ## Modules
//!
//! - [`card`]: the card model, its key handling and rendering
//! - [`entity`]: timer snapshots, the state store and remaining-time math
//! - [`duration`]: the `HH:MM:SS` codec shared by snapshots and rendering
//! - [`interval`]: the cancellable once-per-second tick chain
//! - [`key`]: small key-binding helper used by the card's keymap

pub mod card;
pub mod duration;
pub mod entity;
pub mod interval;
pub mod key;

pub use card::{
    CardConfig, CardKeyMap, ConfigError, Display, Model, MoreInfoMsg, ServiceCallMsg, TimerAction,
};
pub use duration::{format_duration, parse_duration, FormatError};
pub use entity::{time_remaining, ActivityState, EntityStates, TimerEntity};
pub use interval::{Interval, TickMsg};
pub use key::Binding;

/// Prelude module for convenient imports.
///
/// ```rust
/// use timer_card::prelude::*;
/// ```
pub mod prelude {
    pub use crate::card::{
        CardConfig, CardKeyMap, ConfigError, Display, Model as TimerCard, MoreInfoMsg,
        ServiceCallMsg, TimerAction,
    };
    pub use crate::duration::{format_duration, parse_duration, FormatError};
    pub use crate::entity::{time_remaining, ActivityState, EntityStates, TimerEntity};
    pub use crate::interval::{Interval, TickMsg};
    pub use crate::key::Binding;
}
