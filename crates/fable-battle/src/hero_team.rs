//! The player's party.
//!
//! A [`HeroTeam`] is a [`Team`] that outlives battles. It persists its
//! composition as a [`SavedRoster`], rebuilds itself from one, shares
//! experience after a victory and keeps weapons unique across the party.

use std::ops::{Deref, DerefMut};

use fable_common::{ActorId, BattleError, BattleResult, ContentRef};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::actor::{Actor, Combatant};
use crate::content::Catalog;
use crate::events::{EventBus, ExpReport, GameEvent};
use crate::persist::Persistence;
use crate::stats::StatsConfig;
use crate::strategy::{Describable, Weapon};
use crate::team::Team;

// ============================================================================
// Saved State
// ============================================================================

/// Persisted state of one hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMember {
    /// Content reference of the hero.
    pub reference: ContentRef,
    /// Out of the fight.
    #[serde(default)]
    pub defeated: bool,
    /// Accumulated damage.
    #[serde(default)]
    pub damage: u32,
    /// Level.
    pub level: u32,
    /// Experience toward the next level.
    #[serde(default)]
    pub experience: u32,
    /// Equipped weapon.
    #[serde(default)]
    pub equipped: Option<ContentRef>,
}

impl SavedMember {
    /// Captures the persistent state of `actor`.
    #[must_use]
    pub fn capture(actor: &Actor) -> Self {
        let stats = actor.stats();
        Self {
            reference: actor.reference().clone(),
            defeated: actor.is_defeated(),
            damage: stats.damage().min(stats.max_hp()),
            level: stats.level(),
            experience: stats.experience(),
            equipped: actor.weapon().map(|w| w.reference().clone()),
        }
    }

    /// Writes this member's state onto `actor`.
    pub fn apply(&self, actor: &mut Actor, catalog: &Catalog) -> BattleResult<()> {
        let stats = actor.stats_mut();
        stats.set_level(self.level)?;
        stats.set_experience(self.experience)?;
        stats.set_damage(self.damage)?;

        match &self.equipped {
            Some(reference) => {
                actor.equip(catalog.weapon(reference)?);
            },
            None => {
                actor.unequip();
            },
        }

        if self.defeated {
            actor.kill();
        } else {
            actor.revive();
        }
        Ok(())
    }
}

/// Persisted composition of the party, in team order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRoster {
    /// Members in team order.
    pub members: Vec<SavedMember>,
}

impl SavedRoster {
    /// Writes `team.members` and one `team.<ref>` entry per member.
    pub fn save_to(&self, store: &mut dyn Persistence) {
        let references: Vec<&str> = self.members.iter().map(|m| m.reference.as_str()).collect();
        store.merge_by_ref("team.members", json!(references));
        for member in &self.members {
            store.merge_by_ref(
                &format!("team.{}", member.reference),
                json!({
                    "defeated": member.defeated,
                    "damage": member.damage,
                    "level": member.level,
                    "experience": member.experience,
                    "equipped": member.equipped,
                }),
            );
        }
    }

    /// Reads back what [`SavedRoster::save_to`] wrote, if anything was saved.
    pub fn load_from(store: &dyn Persistence) -> Result<Option<Self>, serde_json::Error> {
        let Some(references) = store.get("team.members") else {
            return Ok(None);
        };
        let references: Vec<ContentRef> = serde_json::from_value(references.clone())?;

        let mut members = Vec::with_capacity(references.len());
        for reference in references {
            let mut entry = store
                .get(&format!("team.{reference}"))
                .cloned()
                .unwrap_or_else(|| json!({}));
            if let Some(object) = entry.as_object_mut() {
                object.insert("reference".into(), json!(reference));
            }
            members.push(serde_json::from_value(entry)?);
        }
        Ok(Some(Self { members }))
    }
}

// ============================================================================
// Hero Team
// ============================================================================

/// The player's party.
#[derive(Debug, Clone)]
pub struct HeroTeam {
    team: Team<Actor>,
}

impl HeroTeam {
    /// Creates a party. Fails if `members` is empty.
    pub fn new(members: Vec<Actor>) -> BattleResult<Self> {
        Ok(Self {
            team: Team::new(members)?,
        })
    }

    /// Rebuilds a party from saved state.
    ///
    /// Saved members come first, in saved order; heroes in `members` that
    /// the roster doesn't mention follow. Saved members absent from
    /// `members` are instantiated from `catalog`.
    pub fn restore(
        members: Vec<Actor>,
        saved: &SavedRoster,
        catalog: &Catalog,
        config: &StatsConfig,
    ) -> BattleResult<Self> {
        let mut pool = members;
        let mut ordered = Vec::with_capacity(saved.members.len() + pool.len());

        for entry in &saved.members {
            let mut actor = match pool.iter().position(|a| a.reference() == &entry.reference) {
                Some(index) => pool.remove(index),
                None => {
                    debug!("Reconstructing {} from content", entry.reference);
                    catalog.instantiate(&entry.reference, config)?
                },
            };
            entry.apply(&mut actor, catalog)?;
            ordered.push(actor);
        }
        ordered.extend(pool);

        info!("Restored party of {}", ordered.len());
        Self::new(ordered)
    }

    /// Current persistent state.
    #[must_use]
    pub fn snapshot(&self) -> SavedRoster {
        SavedRoster {
            members: self.team.members().iter().map(SavedMember::capture).collect(),
        }
    }

    /// Persists the current state.
    pub fn save_to(&self, store: &mut dyn Persistence) {
        self.snapshot().save_to(store);
    }

    /// Shares `pool` experience across the party.
    ///
    /// Each living member receives `ceil(pool / team size)`; an
    /// `actor.gainExp` event is published for each of them.
    pub fn award_exp(&mut self, pool: u32, bus: &EventBus) -> Vec<ExpReport> {
        let size = self.team.len() as u32;
        if pool == 0 || size == 0 {
            return Vec::new();
        }
        let share = pool.div_ceil(size);

        let mut reports = Vec::new();
        for member in self.team.members_mut() {
            if member.is_defeated() {
                continue;
            }
            let report = member.gain_exp(share);
            debug!("{} gained {} exp", report.name, report.exp);
            bus.publish(GameEvent::ActorGainExp(report.clone()));
            reports.push(report);
        }
        reports
    }

    /// Equips `weapon` on `member`, taking it from any other member holding
    /// the same weapon. Returns the weapon `member` held before.
    pub fn equip(&mut self, member: ActorId, weapon: Weapon) -> BattleResult<Option<Weapon>> {
        let index = self
            .team
            .index_of(member)
            .ok_or_else(|| BattleError::invalid_operation(format!("{member} is not in the party")))?;

        for (i, other) in self.team.members_mut().iter_mut().enumerate() {
            if i != index
                && other
                    .weapon()
                    .is_some_and(|held| held.reference() == weapon.reference())
            {
                other.unequip();
            }
        }
        Ok(self.team.members_mut()[index].equip(weapon))
    }

    /// Releases the members.
    #[must_use]
    pub fn into_members(self) -> Vec<Actor> {
        self.team.into_members()
    }
}

impl Deref for HeroTeam {
    type Target = Team<Actor>;

    fn deref(&self) -> &Self::Target {
        &self.team
    }
}

impl DerefMut for HeroTeam {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.team
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorKind, Hit};
    use crate::content::tests::sample_catalog;
    use crate::events::Topic;
    use crate::persist::MemoryStore;
    use crate::stats::{BaseStats, Stats};
    use crate::strategy::{DamageDescriptor, Description, Equipable};

    fn hero(reference: &str) -> Actor {
        let stats = Stats::new(BaseStats::uniform(10), 1, StatsConfig::default());
        Actor::new(ActorKind::Player, reference, reference, stats)
    }

    fn party(size: usize) -> HeroTeam {
        HeroTeam::new((0..size).map(|i| hero(&format!("hero.{i}"))).collect()).expect("non-empty")
    }

    #[test]
    fn test_award_exp_rounds_share_up() {
        let bus = EventBus::default();
        let mut three = party(3);
        let reports = three.award_exp(10, &bus);
        assert!(reports.iter().all(|r| r.exp == 4));

        let mut two = party(2);
        let reports = two.award_exp(9, &bus);
        assert!(reports.iter().all(|r| r.exp == 5));
    }

    #[test]
    fn test_award_exp_skips_defeated_and_publishes() {
        let bus = EventBus::default();
        let sub = bus.subscribe(&[Topic::ActorGainExp]);
        let mut team = party(3);
        team.members_mut()[1].kill();

        let reports = team.award_exp(10, &bus);
        assert_eq!(reports.len(), 2);
        assert_eq!(sub.drain().len(), 2);
        assert_eq!(team.members()[1].stats().experience(), 0);
    }

    #[test]
    fn test_equip_takes_weapon_from_other_member() {
        let mut team = party(2);
        let sword = Weapon::new(Description::new("weapon.sword", "Sword"), DamageDescriptor::physical(1));
        let first = team.members()[0].id();
        let second = team.members()[1].id();

        team.equip(first, sword.clone()).expect("member");
        team.equip(second, sword).expect("member");

        assert!(team.members()[0].weapon().is_none());
        assert!(team.members()[1].weapon().is_some_and(Equipable::is_equipped));
    }

    #[test]
    fn test_equip_rejects_strangers() {
        let mut team = party(1);
        let stranger = hero("hero.x");
        assert!(team.equip(stranger.id(), Weapon::unarmed()).is_err());
    }

    #[test]
    fn test_restore_reconstructs_and_kills_silently() {
        let catalog = sample_catalog();
        let bus = EventBus::default();
        let sub = bus.subscribe(&Topic::ALL);
        let saved = SavedRoster {
            members: vec![
                SavedMember {
                    reference: "hero.ada".into(),
                    defeated: true,
                    damage: 3,
                    level: 50,
                    experience: 0,
                    equipped: None,
                },
                SavedMember {
                    reference: "hero.0".into(),
                    defeated: false,
                    damage: 0,
                    level: 2,
                    experience: 1,
                    equipped: Some("weapon.sword".into()),
                },
            ],
        };

        let team = HeroTeam::restore(vec![hero("hero.0"), hero("hero.1")], &saved, &catalog, &StatsConfig::default())
            .expect("restorable");

        assert_eq!(team.len(), 3);
        let ada = team.leader();
        assert_eq!(ada.name(), "Ada");
        assert!(ada.is_defeated());
        assert!(ada.weapon().is_none());
        assert_eq!(ada.stats().damage(), 3);

        let zero = &team.members()[1];
        assert_eq!(zero.stats().level(), 2);
        assert_eq!(zero.stats().experience(), 1);
        assert_eq!(zero.weapon().map(|w| w.name()), Some("Sword"));

        assert_eq!(team.members()[2].reference().as_str(), "hero.1");
        assert_eq!(sub.pending_count(), 0);
    }

    #[test]
    fn test_overkilled_hero_restores() {
        let catalog = Catalog::default();
        let frail = |reference: &str| {
            let stats = Stats::new(BaseStats::uniform(5), 50, StatsConfig::default());
            Actor::new(ActorKind::Player, reference, reference, stats)
        };
        let mut team = HeroTeam::new(vec![frail("hero.a"), frail("hero.b")]).expect("non-empty");
        team.members_mut()[1].endure(Hit {
            amount: 50,
            special: false,
        });
        assert!(team.members()[1].is_defeated());

        let saved = team.snapshot();
        let max_hp = team.members()[1].stats().max_hp();
        assert_eq!(saved.members[1].damage, max_hp);

        let restored = HeroTeam::restore(
            vec![frail("hero.a"), frail("hero.b")],
            &saved,
            &catalog,
            &StatsConfig::default(),
        )
        .expect("overkill damage restores");
        let hero = &restored.members()[1];
        assert!(hero.is_defeated());
        assert_eq!(hero.stats().hp(), 0);
        assert_eq!(restored.snapshot(), saved);
    }

    #[test]
    fn test_restore_rejects_unknown_hero() {
        let saved = SavedRoster {
            members: vec![SavedMember {
                reference: "hero.ghost".into(),
                defeated: false,
                damage: 0,
                level: 1,
                experience: 0,
                equipped: None,
            }],
        };
        let result = HeroTeam::restore(vec![hero("hero.0")], &saved, &Catalog::default(), &StatsConfig::default());
        assert!(matches!(result, Err(BattleError::MissingData(_))));
    }

    #[test]
    fn test_snapshot_roundtrips_through_store() {
        let mut team = party(2);
        team.members_mut()[0].gain_exp(3);
        team.members_mut()[1].kill();

        let mut store = MemoryStore::new();
        team.save_to(&mut store);
        assert!(store.get("team.hero.0").is_some());

        let loaded = SavedRoster::load_from(&store).expect("valid json");
        assert_eq!(loaded, Some(team.snapshot()));
        assert_eq!(SavedRoster::load_from(&MemoryStore::new()).expect("empty"), None);
    }
}
