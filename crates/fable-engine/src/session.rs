//! Game session.
//!
//! Owns the party between battles, the enemies roaming the world, the save
//! store and the running battle, and wires them together through the bus.
//! It plays the parts the battle core leaves to collaborators: it starts
//! encounters, persists `team.save` and `actor.defeated`, takes the party back
//! on `battle.end`, and drives the hero menu when nobody is at the controls.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fable_battle::{
    Actor, Battle, BattleBuilder, BattleOutcome, Catalog, Combatant, Damaging, EventBus, GameEvent,
    HeroTeam, MemoryStore, Persistence, SavedRoster, Subscription, Topic,
};
use fable_common::{ActorId, BattleResult, ContentRef, FableError, FableResult};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::content::load_catalog;

/// Encounter tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Battles won.
    pub victories: u32,
    /// Battles lost.
    pub defeats: u32,
    /// Battles run from.
    pub flights: u32,
}

impl Tally {
    fn record(&mut self, outcome: BattleOutcome) {
        match outcome {
            BattleOutcome::Victory => self.victories += 1,
            BattleOutcome::Defeat => self.defeats += 1,
            BattleOutcome::Fled => self.flights += 1,
        }
    }
}

/// A running game.
pub struct Session {
    bus: Arc<EventBus>,
    subscription: Subscription,
    builder: BattleBuilder,
    store: MemoryStore,
    heroes: Option<HeroTeam>,
    world: Vec<Actor>,
    battle: Option<Battle>,
    last_outcome: Option<BattleOutcome>,
    tally: Tally,
    flee_below: f32,
    dt: f32,
    max_ticks: u32,
}

impl Session {
    /// Loads the configured content and creates a session from it.
    pub fn boot(config: &EngineConfig) -> FableResult<Self> {
        let catalog = load_catalog(config.content_path.as_deref())?;
        Ok(Self::new(config, catalog)?)
    }

    /// Creates a session with the configured party.
    pub fn new(config: &EngineConfig, catalog: Catalog) -> BattleResult<Self> {
        Self::with_store(config, catalog, MemoryStore::new())
    }

    /// Creates a session, restoring the party from `store` when it holds a
    /// saved roster.
    pub fn with_store(config: &EngineConfig, catalog: Catalog, store: MemoryStore) -> BattleResult<Self> {
        let stats = config.battle.stats;
        let members = config
            .party
            .iter()
            .map(|reference| catalog.instantiate(reference, &stats))
            .collect::<BattleResult<Vec<_>>>()?;

        let heroes = match SavedRoster::load_from(&store) {
            Ok(Some(saved)) => HeroTeam::restore(members, &saved, &catalog, &stats)?,
            Ok(None) => HeroTeam::new(members)?,
            Err(e) => {
                warn!("Ignoring unreadable saved roster: {e}");
                HeroTeam::new(members)?
            },
        };

        let bus = Arc::new(EventBus::new(config.event_capacity));
        let subscription = bus.subscribe(&[
            Topic::BattleStart,
            Topic::TeamSave,
            Topic::ActorDefeated,
            Topic::BattleEnd,
        ]);
        let builder = BattleBuilder::new(Arc::new(catalog), config.battle, Arc::clone(&bus));

        Ok(Self {
            bus,
            subscription,
            builder,
            store,
            heroes: Some(heroes),
            world: Vec::new(),
            battle: None,
            last_outcome: None,
            tally: Tally::default(),
            flee_below: config.flee_below,
            dt: config.tick_dt(),
            max_ticks: config.max_ticks,
        })
    }

    /// The party, unless it is away in battle.
    #[must_use]
    pub fn heroes(&self) -> Option<&HeroTeam> {
        self.heroes.as_ref()
    }

    /// Enemies in the world.
    #[must_use]
    pub fn world(&self) -> &[Actor] {
        &self.world
    }

    /// Writes the save store to `path` as pretty JSON.
    pub fn write_save(&self, path: &Path) -> FableResult<()> {
        let contents = serde_json::to_string_pretty(&self.store.to_json())
            .map_err(|e| FableError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        info!("Saved store to {}", path.display());
        Ok(())
    }

    /// Encounter tally so far.
    #[must_use]
    pub const fn tally(&self) -> Tally {
        self.tally
    }

    /// Places an enemy from content into the world.
    pub fn spawn(&mut self, reference: &ContentRef) -> BattleResult<ActorId> {
        let enemy = self.builder.catalog().instantiate(reference, &self.builder.config().stats)?;
        let id = enemy.id();
        debug!("Spawned {} as {id}", enemy.name());
        self.world.push(enemy);
        Ok(id)
    }

    /// Reports that the party touched `enemy`.
    pub fn engage(&self, enemy: ActorId) {
        self.bus.publish(GameEvent::BattleStart { enemy });
    }

    /// Advances the session by one tick.
    pub fn update(&mut self) {
        for event in self.subscription.drain() {
            self.handle(event);
        }
        if let Some(battle) = &mut self.battle {
            autopilot(battle, self.flee_below);
            battle.update(self.dt);
        }
    }

    fn handle(&mut self, event: GameEvent) {
        match event {
            GameEvent::BattleStart { enemy } => self.start_battle(enemy),
            GameEvent::TeamSave(roster) => roster.save_to(&mut self.store),
            GameEvent::ActorDefeated { actor, reference, .. } => {
                if let Some(enemy) = self.world.iter_mut().find(|e| e.id() == actor) {
                    enemy.kill();
                    self.store
                        .merge_by_ref(&format!("enemies.{reference}.defeated"), json!(true));
                }
            },
            GameEvent::BattleEnd { outcome } => self.end_battle(outcome),
            _ => {},
        }
    }

    fn start_battle(&mut self, enemy: ActorId) {
        if self.battle.is_some() {
            warn!("Ignoring encounter with {enemy}: already in battle");
            return;
        }
        let Some(foe) = self.world.iter().find(|e| e.id() == enemy && !e.is_defeated()) else {
            warn!("Ignoring encounter with {enemy}: not in the world");
            return;
        };
        let Some(heroes) = self.heroes.take() else {
            warn!("Ignoring encounter with {enemy}: party unavailable");
            return;
        };
        match self.builder.begin(heroes, foe) {
            Ok(battle) => self.battle = Some(battle),
            Err((heroes, e)) => {
                warn!("Encounter with {} aborted: {e}", foe.name());
                self.heroes = Some(heroes);
            },
        }
    }

    fn end_battle(&mut self, outcome: BattleOutcome) {
        let Some(battle) = self.battle.take() else {
            return;
        };
        let report = battle.finish();
        info!("Encounter over: {outcome:?}");
        self.tally.record(outcome);
        self.last_outcome = Some(outcome);
        self.heroes = Some(report.heroes);
    }

    /// Spawns `reference`, engages it and ticks until the battle is over.
    ///
    /// Returns `None` if no battle took place or it ran out of ticks.
    pub fn run_encounter(&mut self, reference: &ContentRef) -> BattleResult<Option<BattleOutcome>> {
        let enemy = self.spawn(reference)?;
        self.last_outcome = None;
        self.engage(enemy);

        // one tick to deliver battle.start
        self.update();
        if self.battle.is_none() {
            return Ok(None);
        }
        for _ in 0..self.max_ticks {
            self.update();
            if let Some(outcome) = self.last_outcome {
                return Ok(Some(outcome));
            }
        }
        warn!("Encounter with {reference} did not finish in {} ticks", self.max_ticks);
        if let Some(battle) = self.battle.take() {
            self.heroes = Some(battle.finish().heroes);
        }
        Ok(None)
    }
}

/// Plays the hero side: runs when the acting hero is hurt badly enough,
/// otherwise picks the first damaging entry of the menu.
fn autopilot(battle: &Battle, flee_below: f32) {
    if battle.is_locked() {
        return;
    }
    let index = battle.heroes().next_to_take_turn();
    if let Some(hero) = battle.heroes().get(index) {
        let stats = hero.stats();
        let health = stats.hp() as f32 / stats.max_hp().max(1) as f32;
        if health < flee_below {
            battle.flee();
            return;
        }
    }
    let choice = battle
        .menu()
        .iter()
        .position(Damaging::is_damaging)
        .unwrap_or(0);
    battle.choose(choice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fable_battle::{BattleConfig, TeamBlueprint};
    use fable_common::ConfigError;
    use tempfile::TempDir;

    fn config() -> EngineConfig {
        EngineConfig {
            battle: BattleConfig::instant(),
            ..EngineConfig::default()
        }
    }

    fn session() -> Session {
        Session::new(&config(), load_catalog(None).expect("built-in content")).expect("party")
    }

    #[test]
    fn test_slime_encounter_is_won_and_saved() {
        let mut session = session();
        let outcome = session.run_encounter(&"enemy.slime".into()).expect("spawnable");

        assert_eq!(outcome, Some(BattleOutcome::Victory));
        assert_eq!(session.tally().victories, 1);
        assert!(session.battle.is_none());
        assert!(session.heroes().is_some());
        assert!(session.world()[0].is_defeated());

        let store = &session.store;
        assert_eq!(store.get("enemies.enemy.slime.defeated"), Some(&json!(true)));
        assert_eq!(store.get("team.members"), Some(&json!(["hero.ada", "hero.bram"])));
        assert!(store.get("team.hero.ada").is_some());
    }

    #[test]
    fn test_party_persists_across_encounters() {
        let mut session = session();
        for enemy in ["enemy.slime", "enemy.goblin"] {
            session.run_encounter(&enemy.into()).expect("spawnable");
        }
        let tally = session.tally();
        assert_eq!(tally.victories + tally.defeats + tally.flights, 2);
        assert!(tally.victories >= 1);

        let heroes = session.heroes().expect("party back");
        assert!(heroes.leader().stats().experience() > 0);
        assert_eq!(session.world().len(), 2);
    }

    #[test]
    fn test_missing_blueprint_leaves_world_unchanged() {
        let mut catalog = load_catalog(None).expect("built-in content");
        catalog.teams.insert("slimes".into(), TeamBlueprint::default());
        let mut session = Session::new(&config(), catalog).expect("party");

        let outcome = session.run_encounter(&"enemy.slime".into()).expect("spawnable");
        assert_eq!(outcome, None);
        assert!(session.battle.is_none());
        assert!(session.heroes().is_some());
        assert!(!session.world()[0].is_defeated());
        assert!(session.store.is_empty());
    }

    #[test]
    fn test_second_engagement_is_ignored() {
        let mut session = session();
        let first = session.spawn(&"enemy.slime".into()).expect("spawnable");
        let second = session.spawn(&"enemy.goblin".into()).expect("spawnable");
        session.engage(first);
        session.engage(second);
        session.update();

        let battle = session.battle.as_ref().expect("first battle running");
        assert_eq!(battle.foes().leader().id(), first);
    }

    #[test]
    fn test_cowardly_autopilot_flees() {
        let mut config = config();
        config.flee_below = 1.0;
        let mut session = Session::new(&config, load_catalog(None).expect("built-in content")).expect("party");

        // the slime opens and scratches Ada, so she is below full health
        let outcome = session.run_encounter(&"enemy.slime".into()).expect("spawnable");
        assert_eq!(outcome, Some(BattleOutcome::Fled));
        assert!(!session.world()[0].is_defeated());
        assert_eq!(session.tally().flights, 1);
    }

    #[test]
    fn test_restores_party_from_store() {
        let mut first = session();
        first.run_encounter(&"enemy.slime".into()).expect("spawnable");
        let saved = first.heroes().expect("party").snapshot();

        let catalog = load_catalog(None).expect("built-in content");
        let second = Session::with_store(&config(), catalog, first.store.clone()).expect("restorable");
        assert_eq!(second.heroes().expect("party").snapshot(), saved);
    }

    #[test]
    fn test_boot_reports_missing_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = EngineConfig {
            content_path: Some(temp_dir.path().join("missing.toml")),
            ..config()
        };
        let err = Session::boot(&config).err().expect("content is missing");
        assert!(matches!(err, FableError::Config(ConfigError::Read { .. })));
    }

    #[test]
    fn test_boot_reports_unknown_party_member() {
        let config = EngineConfig {
            party: vec!["hero.nobody".into()],
            ..config()
        };
        let err = Session::boot(&config).err().expect("hero is unknown");
        assert!(matches!(err, FableError::Battle(_)));
    }

    #[test]
    fn test_write_save_dumps_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("saves").join("save.json");

        let mut session = Session::boot(&config()).expect("built-in content");
        session.run_encounter(&"enemy.slime".into()).expect("spawnable");
        session.write_save(&path).expect("writable");

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("valid json");
        assert_eq!(written["enemies.enemy.slime.defeated"], json!(true));
    }
}
