//! Ordered battle teams and per-cycle turn bookkeeping.
//!
//! Index 0 is the leader. A team tracks which of its members have acted in
//! the current combat cycle; once every living member has acted, the turn
//! passes to the other side.

use ahash::AHashSet;
use fable_common::{ActorId, BattleError, BattleResult, Direction, Vec2};

use crate::actor::{Actor, Combatant, Lockable, Movable};

/// An ordered, non-empty team.
#[derive(Debug, Clone)]
pub struct Team<A = Actor> {
    members: Vec<A>,
    acted: AHashSet<ActorId>,
}

impl<A: Combatant + Movable + Lockable> Team<A> {
    /// Creates a team. Fails if `members` is empty.
    pub fn new(members: Vec<A>) -> BattleResult<Self> {
        if members.is_empty() {
            return Err(BattleError::missing("team members"));
        }
        Ok(Self {
            members,
            acted: AHashSet::new(),
        })
    }

    /// The leader (index 0).
    #[must_use]
    pub fn leader(&self) -> &A {
        &self.members[0]
    }

    /// Members in order.
    #[must_use]
    pub fn members(&self) -> &[A] {
        &self.members
    }

    /// Mutable members in order.
    pub fn members_mut(&mut self) -> &mut [A] {
        &mut self.members
    }

    /// Member at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&A> {
        self.members.get(index)
    }

    /// Mutable member at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut A> {
        self.members.get_mut(index)
    }

    /// Position of the member with `id`.
    #[must_use]
    pub fn index_of(&self, id: ActorId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == id)
    }

    /// Whether `id` belongs to this team.
    #[must_use]
    pub fn contains(&self, id: ActorId) -> bool {
        self.index_of(id).is_some()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; teams are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Releases the members.
    #[must_use]
    pub fn into_members(self) -> Vec<A> {
        self.members
    }

    /// Removes and returns the member with `id`. The last member can't be
    /// removed.
    pub fn remove(&mut self, id: ActorId) -> BattleResult<A> {
        let index = self
            .index_of(id)
            .ok_or_else(|| BattleError::invalid_operation(format!("{id} is not on this team")))?;
        if self.members.len() == 1 {
            return Err(BattleError::invalid_operation("cannot remove the last member"));
        }
        self.acted.remove(&id);
        Ok(self.members.remove(index))
    }

    /// Whether every member is defeated.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.members.iter().all(Combatant::is_defeated)
    }

    /// Members still standing.
    pub fn living(&self) -> impl Iterator<Item = &A> {
        self.members.iter().filter(|m| !m.is_defeated())
    }

    /// Index of the first member still standing.
    #[must_use]
    pub fn first_living(&self) -> Option<usize> {
        self.members.iter().position(|m| !m.is_defeated())
    }

    /// Experience pool for beating this team: the yields of its defeated
    /// members.
    #[must_use]
    pub fn exp_yield(&self) -> u32 {
        self.members
            .iter()
            .filter(|m| m.is_defeated())
            .map(|m| m.stats().exp_yield())
            .fold(0, u32::saturating_add)
    }

    // ------------------------------------------------------------------------
    // Turn bookkeeping
    // ------------------------------------------------------------------------

    /// Records that `id` acted this cycle.
    pub fn take_turn(&mut self, id: ActorId) -> BattleResult<()> {
        if !self.contains(id) {
            return Err(BattleError::invalid_operation(format!(
                "{id} took a turn for a team it is not on"
            )));
        }
        self.acted.insert(id);
        Ok(())
    }

    /// Whether `id` already acted this cycle.
    #[must_use]
    pub fn has_acted(&self, id: ActorId) -> bool {
        self.acted.contains(&id)
    }

    /// Whether every living member has acted this cycle.
    #[must_use]
    pub fn turn_is_over(&self) -> bool {
        self.living().all(|m| self.acted.contains(&m.id()))
    }

    /// Index of the first living member yet to act, or the leader when none
    /// is left.
    #[must_use]
    pub fn next_to_take_turn(&self) -> usize {
        self.members
            .iter()
            .position(|m| !m.is_defeated() && !self.acted.contains(&m.id()))
            .unwrap_or(0)
    }

    /// Starts a new combat cycle: forgets who acted and counts down every
    /// member's stat modifiers.
    pub fn cycle(&mut self) {
        self.acted.clear();
        for member in &mut self.members {
            member.stats_mut().expire_modifiers();
        }
    }

    // ------------------------------------------------------------------------
    // Positioning
    // ------------------------------------------------------------------------

    /// Lines the team up for battle.
    ///
    /// Each member remembers its world placement, faces `direction`, and is
    /// placed at `origin + (i * stride, 0)` and locked.
    pub fn prepare(&mut self, direction: Direction, origin: Vec2, stride: f32) {
        for (i, member) in self.members.iter_mut().enumerate() {
            member.save_position();
            member.face(direction);
            member.move_to(origin + Vec2::new(i as f32 * stride, 0.0));
            member.lock();
        }
        self.cycle();
    }

    /// Puts every member back where [`Team::prepare`] found it and unlocks
    /// it.
    pub fn restore(&mut self) {
        for member in &mut self.members {
            member.restore_position();
            member.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorKind;
    use crate::stats::{BaseStats, Stats, StatsConfig};

    fn member(name: &str) -> Actor {
        let stats = Stats::new(BaseStats::uniform(10).with_exp_yield(5), 50, StatsConfig::default());
        Actor::new(ActorKind::Enemy, format!("enemy.{name}"), name, stats)
    }

    fn trio() -> Team {
        Team::new(vec![member("a"), member("b"), member("c")]).expect("non-empty")
    }

    #[test]
    fn test_empty_team_is_rejected() {
        assert!(matches!(
            Team::<Actor>::new(Vec::new()),
            Err(BattleError::MissingData(_))
        ));
    }

    #[test]
    fn test_turn_cycle() {
        let mut team = trio();
        let ids: Vec<ActorId> = team.members().iter().map(Combatant::id).collect();

        assert_eq!(team.next_to_take_turn(), 0);
        team.take_turn(ids[0]).expect("member");
        assert_eq!(team.next_to_take_turn(), 1);
        team.take_turn(ids[1]).expect("member");
        assert!(!team.turn_is_over());
        team.take_turn(ids[2]).expect("member");
        assert!(team.turn_is_over());
        assert_eq!(team.next_to_take_turn(), 0);

        team.cycle();
        assert!(!team.turn_is_over());
        assert!(!team.has_acted(ids[0]));
    }

    #[test]
    fn test_defeated_members_skip_turns() {
        let mut team = trio();
        team.members_mut()[1].kill();
        let first = team.leader().id();
        let last = team.members()[2].id();

        team.take_turn(first).expect("member");
        assert_eq!(team.next_to_take_turn(), 2);
        team.take_turn(last).expect("member");
        assert!(team.turn_is_over());
    }

    #[test]
    fn test_take_turn_rejects_strangers() {
        let mut team = trio();
        let stranger = member("x");
        assert!(matches!(
            team.take_turn(stranger.id()),
            Err(BattleError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_exp_yield_counts_defeated_only() {
        let mut team = trio();
        assert_eq!(team.exp_yield(), 0);
        team.members_mut()[0].kill();
        team.members_mut()[2].kill();
        assert_eq!(team.exp_yield(), 10);
        assert!(!team.is_defeated());
        team.members_mut()[1].kill();
        assert!(team.is_defeated());
        assert_eq!(team.first_living(), None);
    }

    #[test]
    fn test_remove_keeps_one_member() {
        let mut team = trio();
        let ids: Vec<ActorId> = team.members().iter().map(Combatant::id).collect();
        assert!(team.remove(ids[1]).is_ok());
        assert!(team.remove(ids[0]).is_ok());
        assert!(team.remove(ids[2]).is_err());
        assert_eq!(team.len(), 1);
    }

    #[test]
    fn test_prepare_and_restore() {
        let mut team = trio();
        team.members_mut()[0].move_to(Vec2::new(100.0, 40.0));

        team.prepare(Direction::Left, Vec2::new(10.0, 5.0), 24.0);
        assert_eq!(team.members()[0].position(), Vec2::new(10.0, 5.0));
        assert_eq!(team.members()[2].position(), Vec2::new(58.0, 5.0));
        assert!(team.members().iter().all(|m| m.is_locked() && m.direction() == Direction::Left));

        team.restore();
        assert_eq!(team.leader().position(), Vec2::new(100.0, 40.0));
        assert_eq!(team.leader().direction(), Direction::Down);
        assert!(!team.leader().is_locked());
    }
}
