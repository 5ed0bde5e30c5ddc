//! Encounter construction.
//!
//! Turns a `battle.start` into a running [`Battle`]: the engaging enemy
//! leads a foe team whose followers come from the team blueprint its team
//! type maps to.

use std::sync::Arc;

use fable_common::{BattleError, BattleResult};
use tracing::{info, warn};

use crate::actor::{Actor, Combatant};
use crate::battle::Battle;
use crate::config::BattleConfig;
use crate::content::Catalog;
use crate::events::EventBus;
use crate::hero_team::HeroTeam;
use crate::team::Team;

/// Builds battles from content.
#[derive(Debug, Clone)]
pub struct BattleBuilder {
    catalog: Arc<Catalog>,
    config: BattleConfig,
    bus: Arc<EventBus>,
}

impl BattleBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: BattleConfig, bus: Arc<EventBus>) -> Self {
        Self { catalog, config, bus }
    }

    /// Content in use.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Battle tunables in use.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Composes the foe team `enemy` brings: `enemy` itself as leader, then
    /// one fresh actor per blueprint member.
    pub fn foe_team(&self, enemy: &Actor) -> BattleResult<Team> {
        let team_type = self.catalog.team_type(enemy.reference())?;
        let followers = self.catalog.team_members(team_type)?;

        let mut members = Vec::with_capacity(followers.len() + 1);
        members.push(enemy.clone());
        for reference in followers {
            members.push(self.catalog.instantiate(reference, &self.config.stats)?);
        }
        info!("{} leads a `{team_type}` team of {}", enemy.name(), members.len());
        Team::new(members)
    }

    /// Starts a battle between `heroes` and the team `enemy` brings.
    ///
    /// A wiped-out party or an already defeated enemy can't fight. On error
    /// `heroes` is handed back untouched along with the cause.
    pub fn begin(&self, heroes: HeroTeam, enemy: &Actor) -> Result<Battle, (HeroTeam, BattleError)> {
        if heroes.is_defeated() {
            warn!("Cannot build battle against {}: party is defeated", enemy.name());
            return Err((heroes, BattleError::invalid_operation("every hero is defeated")));
        }
        if enemy.is_defeated() {
            warn!("Cannot build battle against {}: already defeated", enemy.name());
            return Err((
                heroes,
                BattleError::invalid_operation(format!("{} is already defeated", enemy.name())),
            ));
        }
        match self.foe_team(enemy) {
            Ok(foes) => Ok(Battle::new(heroes, foes, Arc::clone(&self.bus), self.config)),
            Err(e) => {
                warn!("Cannot build battle against {}: {e}", enemy.name());
                Err((heroes, e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattlePhase;
    use crate::content::tests::sample_catalog;
    use crate::content::TeamBlueprint;
    use crate::stats::StatsConfig;
    use fable_common::ContentRef;

    fn builder(catalog: Catalog) -> BattleBuilder {
        BattleBuilder::new(Arc::new(catalog), BattleConfig::instant(), Arc::new(EventBus::default()))
    }

    fn slime(catalog: &Catalog) -> Actor {
        catalog
            .instantiate(&ContentRef::new("enemy.slime"), &StatsConfig::default())
            .expect("slime template")
    }

    fn party(catalog: &Catalog) -> HeroTeam {
        let ada = catalog
            .instantiate(&ContentRef::new("hero.ada"), &StatsConfig::default())
            .expect("ada template");
        HeroTeam::new(vec![ada]).expect("non-empty")
    }

    #[test]
    fn test_enemy_leads_blueprint_followers() {
        let catalog = sample_catalog();
        let enemy = slime(&catalog);
        let team = builder(catalog).foe_team(&enemy).expect("composable");

        assert_eq!(team.len(), 3);
        assert_eq!(team.leader().id(), enemy.id());
        assert_ne!(team.members()[1].id(), enemy.id());
    }

    #[test]
    fn test_missing_mapping_is_missing_data() {
        let mut catalog = sample_catalog();
        catalog.team_types.clear();
        let enemy = slime(&catalog);
        assert!(matches!(
            builder(catalog).foe_team(&enemy),
            Err(BattleError::MissingData(_))
        ));
    }

    #[test]
    fn test_missing_members_hands_heroes_back() {
        let mut catalog = sample_catalog();
        catalog.teams.insert("slimes".into(), TeamBlueprint::default());
        let enemy = slime(&catalog);
        let heroes = party(&catalog);
        let lead = heroes.leader().id();

        match builder(catalog).begin(heroes, &enemy) {
            Err((heroes, BattleError::MissingData(_))) => assert_eq!(heroes.leader().id(), lead),
            other => panic!("expected missing data, got {:?}", other.map(|b| b.phase())),
        }
    }

    #[test]
    fn test_defeated_party_cannot_begin() {
        let catalog = sample_catalog();
        let enemy = slime(&catalog);
        let mut heroes = party(&catalog);
        heroes.members_mut()[0].kill();

        match builder(catalog).begin(heroes, &enemy) {
            Err((heroes, BattleError::InvalidOperation(_))) => assert!(heroes.is_defeated()),
            other => panic!("expected invalid operation, got {:?}", other.map(|b| b.phase())),
        }
    }

    #[test]
    fn test_defeated_enemy_cannot_begin() {
        let catalog = sample_catalog();
        let mut enemy = slime(&catalog);
        enemy.kill();
        let heroes = party(&catalog);
        assert!(matches!(
            builder(catalog).begin(heroes, &enemy),
            Err((_, BattleError::InvalidOperation(_)))
        ));
    }

    #[test]
    fn test_begin_starts_intro() {
        let catalog = sample_catalog();
        let enemy = slime(&catalog);
        let heroes = party(&catalog);
        let battle = builder(catalog).begin(heroes, &enemy).expect("buildable");
        assert_eq!(battle.phase(), BattlePhase::Intro);
        assert!(battle.is_active());
    }
}
