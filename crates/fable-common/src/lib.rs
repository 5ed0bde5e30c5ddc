//! # Fable Common
//!
//! Common types, utilities, and shared abstractions for Fable.
//!
//! This crate provides foundational types used across all Fable crates:
//! - ID types (ActorId, ContentRef)
//! - Screen-space positions and facing
//! - The error taxonomy shared by the battle core and the engine
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
