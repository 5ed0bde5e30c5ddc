//! Content catalog: actor templates, strategies and team blueprints.
//!
//! Entries are keyed by content reference. A lookup returns an owned copy
//! with its reference filled in from the key, so content files don't need to
//! repeat it.

use std::collections::BTreeMap;

use fable_common::{BattleError, BattleResult, ContentRef};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorKind};
use crate::stats::{BaseStats, Stats, StatsConfig};
use crate::strategy::{Ability, StatModifier, Weapon};

fn default_level() -> u32 {
    1
}

/// Blueprint for instantiating an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorTemplate {
    /// Display name.
    pub name: String,
    /// Kind of actor.
    #[serde(default)]
    pub kind: ActorKind,
    /// Sprite key (defaults to the reference).
    #[serde(default)]
    pub sprite: Option<String>,
    /// Base attributes.
    #[serde(default)]
    pub base: BaseStats,
    /// Starting level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Weapon equipped on creation.
    #[serde(default)]
    pub weapon: Option<ContentRef>,
    /// Abilities learnable by level.
    #[serde(default)]
    pub learnset: Vec<ContentRef>,
    /// Stat modifiers known.
    #[serde(default)]
    pub modifiers: Vec<ContentRef>,
}

/// Composition of a foe team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamBlueprint {
    /// Followers joining the engaging enemy. Absent is a content error.
    #[serde(default)]
    pub members: Option<Vec<ContentRef>>,
}

/// Everything the battle needs to know about game content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Actor templates.
    pub actors: BTreeMap<ContentRef, ActorTemplate>,
    /// Weapons.
    pub weapons: BTreeMap<ContentRef, Weapon>,
    /// Abilities.
    pub abilities: BTreeMap<ContentRef, Ability>,
    /// Stat modifiers.
    pub modifiers: BTreeMap<ContentRef, StatModifier>,
    /// Team blueprints by team type.
    pub teams: BTreeMap<String, TeamBlueprint>,
    /// Team type of each enemy that can start an encounter.
    pub team_types: BTreeMap<ContentRef, String>,
}

impl Catalog {
    /// Actor template.
    pub fn template(&self, reference: &ContentRef) -> BattleResult<&ActorTemplate> {
        self.actors
            .get(reference)
            .ok_or_else(|| BattleError::missing(format!("actor `{reference}`")))
    }

    /// Weapon, unequipped.
    pub fn weapon(&self, reference: &ContentRef) -> BattleResult<Weapon> {
        let mut weapon = self
            .weapons
            .get(reference)
            .cloned()
            .ok_or_else(|| BattleError::missing(format!("weapon `{reference}`")))?;
        weapon.info.reference = reference.clone();
        Ok(weapon)
    }

    /// Ability.
    pub fn ability(&self, reference: &ContentRef) -> BattleResult<Ability> {
        let mut ability = self
            .abilities
            .get(reference)
            .cloned()
            .ok_or_else(|| BattleError::missing(format!("ability `{reference}`")))?;
        ability.info.reference = reference.clone();
        Ok(ability)
    }

    /// Stat modifier.
    pub fn modifier(&self, reference: &ContentRef) -> BattleResult<StatModifier> {
        let mut modifier = self
            .modifiers
            .get(reference)
            .cloned()
            .ok_or_else(|| BattleError::missing(format!("modifier `{reference}`")))?;
        modifier.info.reference = reference.clone();
        Ok(modifier)
    }

    /// Team type an enemy brings into battle.
    pub fn team_type(&self, enemy: &ContentRef) -> BattleResult<&str> {
        self.team_types
            .get(enemy)
            .map(String::as_str)
            .ok_or_else(|| BattleError::missing(format!("team type for `{enemy}`")))
    }

    /// Followers listed by a team blueprint.
    pub fn team_members(&self, team_type: &str) -> BattleResult<&[ContentRef]> {
        let blueprint = self
            .teams
            .get(team_type)
            .ok_or_else(|| BattleError::missing(format!("team blueprint `{team_type}`")))?;
        blueprint
            .members
            .as_deref()
            .ok_or_else(|| BattleError::missing(format!("members of team blueprint `{team_type}`")))
    }

    /// Creates a fresh actor from its template.
    pub fn instantiate(&self, reference: &ContentRef, config: &StatsConfig) -> BattleResult<Actor> {
        let template = self.template(reference)?;
        let stats = Stats::new(template.base, template.level, *config);
        let learnset = template
            .learnset
            .iter()
            .map(|r| self.ability(r))
            .collect::<BattleResult<Vec<_>>>()?;
        let modifiers = template
            .modifiers
            .iter()
            .map(|r| self.modifier(r))
            .collect::<BattleResult<Vec<_>>>()?;

        let mut actor = Actor::new(template.kind, reference.clone(), template.name.clone(), stats)
            .with_learnset(learnset)
            .with_modifiers(modifiers);
        if let Some(sprite) = &template.sprite {
            actor = actor.with_sprite(sprite.clone());
        }
        if let Some(weapon) = &template.weapon {
            actor = actor.with_weapon(self.weapon(weapon)?);
        }
        Ok(actor)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actor::Combatant;
    use crate::strategy::{DamageDescriptor, Describable, Description};

    /// Small catalog shared by the battle tests.
    pub(crate) fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.weapons.insert(
            "weapon.sword".into(),
            Weapon::new(Description::new("", "Sword"), DamageDescriptor::physical(2)),
        );
        catalog.abilities.insert(
            "ability.flare".into(),
            Ability::new(Description::new("", "Flare"), Some(DamageDescriptor::special(3)), 1),
        );
        catalog.actors.insert(
            "hero.ada".into(),
            ActorTemplate {
                name: "Ada".into(),
                kind: ActorKind::Player,
                sprite: None,
                base: BaseStats::uniform(20),
                level: 50,
                weapon: Some("weapon.sword".into()),
                learnset: vec!["ability.flare".into()],
                modifiers: Vec::new(),
            },
        );
        catalog.actors.insert(
            "enemy.slime".into(),
            ActorTemplate {
                name: "Slime".into(),
                kind: ActorKind::Enemy,
                sprite: Some("slime".into()),
                base: BaseStats::uniform(6).with_exp_yield(5),
                level: 50,
                weapon: None,
                learnset: Vec::new(),
                modifiers: Vec::new(),
            },
        );
        catalog
            .team_types
            .insert("enemy.slime".into(), "slimes".into());
        catalog.teams.insert(
            "slimes".into(),
            TeamBlueprint {
                members: Some(vec!["enemy.slime".into(), "enemy.slime".into()]),
            },
        );
        catalog
    }

    #[test]
    fn test_lookup_fills_reference_from_key() {
        let catalog = sample_catalog();
        let sword = catalog.weapon(&"weapon.sword".into()).expect("present");
        assert_eq!(sword.reference().as_str(), "weapon.sword");
    }

    #[test]
    fn test_unknown_reference_is_missing_data() {
        let catalog = sample_catalog();
        assert!(matches!(
            catalog.weapon(&"weapon.nope".into()),
            Err(BattleError::MissingData(_))
        ));
        assert!(catalog.instantiate(&"hero.nobody".into(), &StatsConfig::default()).is_err());
    }

    #[test]
    fn test_blueprint_without_members_is_missing_data() {
        let mut catalog = sample_catalog();
        catalog.teams.insert("empty".into(), TeamBlueprint::default());
        assert!(matches!(
            catalog.team_members("empty"),
            Err(BattleError::MissingData(_))
        ));
        assert_eq!(catalog.team_members("slimes").map(<[_]>::len), Ok(2));
    }

    #[test]
    fn test_instantiate_builds_equipped_actor() {
        let catalog = sample_catalog();
        let ada = catalog
            .instantiate(&"hero.ada".into(), &StatsConfig::default())
            .expect("template exists");
        assert_eq!(ada.name(), "Ada");
        assert_eq!(ada.stats().attack(), 20);
        assert_eq!(ada.abilities().len(), 1);
        assert_eq!(ada.sprite(), "hero.ada");
        assert!(ada.weapon().is_some());
    }

    #[test]
    fn test_catalog_deserializes_from_json() {
        let catalog: Catalog = serde_json::from_value(serde_json::json!({
            "weapons": {"weapon.club": {"name": "Club", "damage": {"base": 1}}},
            "teams": {"bats": {}},
        }))
        .expect("valid catalog");
        assert_eq!(catalog.weapons.len(), 1);
        assert!(catalog.team_members("bats").is_err());
    }
}
