//! ID types for actors and content references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for actor IDs.
static ACTOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique runtime identifier for an actor.
///
/// Actor IDs are process-local and never persisted; saved state is keyed by
/// the actor's content reference instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Creates a new unique actor ID.
    #[must_use]
    pub fn new() -> Self {
        Self(ACTOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an actor ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid actor ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) actor ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content reference naming an actor template, weapon, ability or modifier
/// (for example `"hero.ada"` or `"weapon.rusty_sword"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Creates a content reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContentRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ContentRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_ids_are_unique() {
        let a = ActorId::new();
        let b = ActorId::new();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(!ActorId::NULL.is_valid());
    }

    #[test]
    fn test_content_ref_serializes_as_string() {
        let reference = ContentRef::new("weapon.club");
        let json = serde_json::to_string(&reference).expect("serialize");
        assert_eq!(json, "\"weapon.club\"");
        assert_eq!(reference.to_string(), "weapon.club");
    }
}
