//! Screen-space positions and facing directions.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Cardinal facing of an actor sprite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Facing up the screen.
    Up,
    /// Facing down the screen.
    #[default]
    Down,
    /// Facing left.
    Left,
    /// Facing right.
    Right,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit vector for this direction in screen space (y grows downward).
    #[must_use]
    pub const fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// A saved position and facing, restored after a battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Position in screen space.
    pub position: Vec2,
    /// Facing direction.
    pub direction: Direction,
}

impl Placement {
    /// Creates a placement.
    #[must_use]
    pub const fn new(position: Vec2, direction: Direction) -> Self {
        Self {
            position,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
    }

    proptest! {
        #[test]
        fn prop_opposite_is_involution(dir in any_direction()) {
            prop_assert_eq!(dir.opposite().opposite(), dir);
            prop_assert_ne!(dir.opposite(), dir);
        }
    }

    #[test]
    fn test_unit_vectors_cancel_with_opposite() {
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            assert_eq!(dir.unit() + dir.opposite().unit(), Vec2::ZERO);
        }
    }
}
