//! # Fable Battle
//!
//! Turn-based battle core for Fable.
//!
//! This crate provides the battle systems and the contracts they need:
//! - Stats with level scaling, experience and temporary modifiers
//! - Combat strategies (weapons, abilities, stat modifiers)
//! - Actors with capability traits, teams and the hero party
//! - Opponent selection and the deferred step queue
//! - Battle orchestration and construction from content
//! - Event bus for inter-system communication
//! - Persistence and render contracts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod battle;
pub mod builder;
pub mod config;
pub mod content;
pub mod events;
pub mod hero_team;
pub mod opponent_select;
pub mod persist;
pub mod render;
pub mod stats;
pub mod step;
pub mod strategy;
pub mod team;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::battle::*;
    pub use crate::builder::*;
    pub use crate::config::*;
    pub use crate::content::{ActorTemplate, Catalog, TeamBlueprint};
    pub use crate::events::*;
    pub use crate::hero_team::*;
    pub use crate::opponent_select::*;
    pub use crate::persist::*;
    pub use crate::render::*;
    pub use crate::stats::*;
    pub use crate::step::*;
    pub use crate::strategy::*;
    pub use crate::team::*;
}

pub use prelude::*;
