//! Target cursor over the opposing team.

use crate::actor::{Combatant, Lockable, Movable};
use crate::team::Team;

/// Cursor over the opposing team.
///
/// Never rests on a defeated member while a living one exists. Locked
/// outside the hero's selection window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentSelect {
    cursor: usize,
    locked: bool,
}

impl Default for OpponentSelect {
    fn default() -> Self {
        Self::new()
    }
}

impl OpponentSelect {
    /// Creates a locked cursor on the leader.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: 0,
            locked: true,
        }
    }

    /// Current index.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the cursor is frozen.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Freezes the cursor.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Releases the cursor.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Currently selected opponent.
    #[must_use]
    pub fn selected<'a, A>(&self, team: &'a Team<A>) -> Option<&'a A>
    where
        A: Combatant + Movable + Lockable,
    {
        team.get(self.cursor)
    }

    /// Whether exactly one opponent is still standing.
    #[must_use]
    pub fn has_last_man_standing<A>(team: &Team<A>) -> bool
    where
        A: Combatant + Movable + Lockable,
    {
        team.living().count() == 1
    }

    /// Moves to the next living opponent, wrapping around.
    pub fn next<A>(&mut self, team: &Team<A>)
    where
        A: Combatant + Movable + Lockable,
    {
        self.step(team, 1);
    }

    /// Moves to the previous living opponent, wrapping around.
    pub fn previous<A>(&mut self, team: &Team<A>)
    where
        A: Combatant + Movable + Lockable,
    {
        self.step(team, team.len() - 1);
    }

    /// Moves off a defeated opponent onto the first living one.
    pub fn resolve_selected<A>(&mut self, team: &Team<A>)
    where
        A: Combatant + Movable + Lockable,
    {
        let on_living = team.get(self.cursor).is_some_and(|m| !m.is_defeated());
        if !on_living {
            if let Some(first) = team.first_living() {
                self.cursor = first;
            }
        }
    }

    fn step<A>(&mut self, team: &Team<A>, delta: usize)
    where
        A: Combatant + Movable + Lockable,
    {
        if self.locked || team.first_living().is_none() {
            return;
        }
        if Self::has_last_man_standing(team) {
            self.resolve_selected(team);
            return;
        }
        let len = team.len();
        let mut index = self.cursor.min(len - 1);
        for _ in 0..len {
            index = (index + delta) % len;
            if team.get(index).is_some_and(|m| !m.is_defeated()) {
                self.cursor = index;
                return;
            }
        }
    }
}
