//! Battle orchestration.
//!
//! A [`Battle`] owns both teams for the duration of an encounter. It listens
//! for `battle.action` intents on its own subscription, turns each accepted
//! intent into a short sequence of queued [`Step`]s and drains one step per
//! [`Battle::update`]. Between actions it decides whose turn it is and
//! whether the encounter is over.
//!
//! Phases run `Intro` -> `HeroTurn` <-> `FoeTurn` -> `Victory` | `GameOver` |
//! `Fled` -> `Done`. While the queue is non-empty the battle is resolving and
//! ignores new strategy intents.

use std::sync::Arc;

use fable_common::{Direction, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::actor::{Actor, Combatant, Movable};
use crate::config::BattleConfig;
use crate::events::{
    ActionIntent, BattleAction, BattleOutcome, EventBus, ExpReport, GameEvent, Side, Subscription,
    Topic,
};
use crate::hero_team::HeroTeam;
use crate::opponent_select::OpponentSelect;
use crate::render::{RenderContext, Renderable};
use crate::step::{advance, Sequenced, Step, StepQueue, TimedStep};
use crate::strategy::{CombatStrategy, DamageDescriptor, Damaging, Describable, ModifierTarget, StatModifier};
use crate::team::Team;

/// How far off screen the foes start their entrance.
const INTRO_SLIDE: f32 = 96.0;
/// Where captions are drawn, relative to the draw offset.
const CAPTION_AT: Vec2 = Vec2::new(16.0, 16.0);
/// Where the menu is drawn, relative to the draw offset.
const MENU_AT: Vec2 = Vec2::new(16.0, 176.0);
/// Vertical spacing of menu lines.
const MENU_LINE: f32 = 12.0;

// ============================================================================
// Phase
// ============================================================================

/// Where a battle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Entrance animation.
    Intro,
    /// Heroes choose and act.
    HeroTurn,
    /// Foes act.
    FoeTurn,
    /// Every foe is down; narration pending.
    Victory,
    /// Every hero is down; narration pending.
    GameOver,
    /// The heroes are running away.
    Fled,
    /// Torn down.
    Done,
}

impl BattlePhase {
    /// Whether the battle has been decided but not yet torn down.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::GameOver | Self::Fled)
    }

    /// Phase in which `side` acts.
    #[must_use]
    pub const fn turn_of(side: Side) -> Self {
        match side {
            Side::Heroes => Self::HeroTurn,
            Side::Foes => Self::FoeTurn,
        }
    }
}

/// What is left once a battle is over.
#[derive(Debug)]
pub struct BattleReport {
    /// How it ended.
    pub outcome: BattleOutcome,
    /// The party, positions restored.
    pub heroes: HeroTeam,
    /// The foes, followers marked defeated.
    pub foes: Team,
}

// ============================================================================
// Battle
// ============================================================================

/// A running encounter.
pub struct Battle {
    heroes: HeroTeam,
    foes: Team,
    select: OpponentSelect,
    phase: BattlePhase,
    turn: Side,
    queue: StepQueue<Battle>,
    locked: bool,
    active: bool,
    bus: Arc<EventBus>,
    subscription: Subscription,
    config: BattleConfig,
    outcome: Option<BattleOutcome>,
    menu: Vec<CombatStrategy>,
}

impl std::fmt::Debug for Battle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Battle")
            .field("phase", &self.phase)
            .field("turn", &self.turn)
            .field("queue", &self.queue)
            .field("locked", &self.locked)
            .field("active", &self.active)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl Sequenced for Battle {
    fn steps(&mut self) -> &mut StepQueue<Self> {
        &mut self.queue
    }
}

impl Battle {
    /// Lines both teams up and queues the entrance.
    ///
    /// The lead with the lower speed opens; on a tie the foes open.
    pub fn new(mut heroes: HeroTeam, mut foes: Team, bus: Arc<EventBus>, config: BattleConfig) -> Self {
        heroes.prepare(Direction::Right, config.hero_origin, -config.member_stride);
        foes.prepare(Direction::Left, config.foe_origin, config.member_stride);

        let hero_first = heroes.leader().stats().speed() >= foes.leader().stats().speed();
        // the faster lead waits for the slower one to commit
        let turn = if hero_first { Side::Foes } else { Side::Heroes };

        let subscription = bus.subscribe(&[Topic::BattleAction, Topic::ActorGainExp]);
        info!(
            "Battle: {} vs {} ({} foes), {:?} open",
            heroes.leader().name(),
            foes.leader().name(),
            foes.len(),
            turn
        );

        let mut battle = Self {
            heroes,
            foes,
            select: OpponentSelect::new(),
            phase: BattlePhase::Intro,
            turn,
            queue: StepQueue::new(),
            locked: true,
            active: true,
            bus,
            subscription,
            config,
            outcome: None,
            menu: Vec::new(),
        };

        let entrance = format!("{} draws near!", battle.foes.leader().name());
        battle.queue.push(Step::Timed(
            TimedStep::new(config.intro_duration, |b: &mut Self, p| b.slide_in(p)).with_label(entrance),
        ));
        battle.queue.push(Step::immediate(Self::open_turn));
        battle
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Side on turn.
    #[must_use]
    pub const fn turn(&self) -> Side {
        self.turn
    }

    /// The party.
    #[must_use]
    pub const fn heroes(&self) -> &HeroTeam {
        &self.heroes
    }

    /// The foes.
    #[must_use]
    pub const fn foes(&self) -> &Team {
        &self.foes
    }

    /// Target cursor.
    #[must_use]
    pub const fn select(&self) -> &OpponentSelect {
        &self.select
    }

    /// Currently targeted foe.
    #[must_use]
    pub fn selected(&self) -> Option<&Actor> {
        self.select.selected(&self.foes)
    }

    /// Whether the battle is still running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether hero input is frozen.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether steps are in flight.
    #[must_use]
    pub fn is_resolving(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Pending steps.
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.queue.len()
    }

    /// Outcome, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Strategies offered to the hero about to act.
    #[must_use]
    pub fn menu(&self) -> &[CombatStrategy] {
        &self.menu
    }

    /// Text currently on screen.
    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        self.queue.front_label()
    }

    /// Tunables.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Whether either side is wiped out.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.heroes.is_defeated() || self.foes.is_defeated()
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Announces the hero's choice of menu entry `index`. Returns `false` if
    /// input is frozen or there is no such entry.
    pub fn choose(&self, index: usize) -> bool {
        if self.locked {
            return false;
        }
        let Some(strategy) = self.menu.get(index) else {
            return false;
        };
        strategy.use_by(Side::Heroes, &self.bus);
        true
    }

    /// Announces that the heroes want to run.
    pub fn flee(&self) {
        self.bus.publish(GameEvent::BattleAction(BattleAction {
            side: Side::Heroes,
            intent: ActionIntent::Flee,
        }));
    }

    /// Moves the target cursor forward.
    pub fn select_next(&mut self) {
        self.select.next(&self.foes);
    }

    /// Moves the target cursor back.
    pub fn select_previous(&mut self) {
        self.select.previous(&self.foes);
    }

    /// Freezes hero input and the target cursor.
    pub fn lock(&mut self) {
        self.locked = true;
        self.select.lock();
    }

    /// Releases hero input. Only takes effect on the hero's turn with
    /// nothing in flight.
    pub fn unlock(&mut self) {
        if self.active && self.phase == BattlePhase::HeroTurn && self.queue.is_empty() {
            self.locked = false;
            self.select.unlock();
        }
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advances the battle by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        for event in self.subscription.drain() {
            self.dispatch(event);
        }
        if self.phase.is_terminal() && self.queue.is_empty() {
            self.stop();
            return;
        }
        advance(self, dt);
        if self.phase == BattlePhase::HeroTurn && self.queue.is_empty() {
            self.unlock();
        }
    }

    /// Reacts to one bus event.
    pub fn dispatch(&mut self, event: GameEvent) {
        match event {
            GameEvent::BattleAction(action) => self.on_action(action),
            GameEvent::ActorGainExp(report) => self.narrate_exp(&report),
            _ => {},
        }
    }

    fn on_action(&mut self, action: BattleAction) {
        if !self.active || self.phase.is_terminal() {
            debug!("Ignoring {:?} intent: battle is over", action.side);
            return;
        }
        match action.intent {
            ActionIntent::Flee => {
                if action.side != Side::Heroes {
                    debug!("Ignoring foe flee intent");
                } else if self.turn != Side::Heroes || self.phase != BattlePhase::HeroTurn {
                    debug!("Ignoring flee intent during {:?}", self.phase);
                } else {
                    self.queue_flee();
                }
            },
            ActionIntent::Use(strategy) => {
                if !self.queue.is_empty() {
                    debug!("Ignoring {}: still resolving", strategy.name());
                } else if action.side != self.turn || self.phase != BattlePhase::turn_of(action.side) {
                    debug!("Ignoring {}: not {:?}'s turn", strategy.name(), action.side);
                } else if action.side == Side::Heroes && self.locked {
                    debug!("Ignoring {}: input locked", strategy.name());
                } else {
                    self.resolve(action.side, &strategy);
                }
            },
        }
    }

    fn queue_flee(&mut self) {
        info!("Heroes flee");
        self.lock();
        self.queue.push(Step::caption("Got away safely!", self.config.caption_duration));
        self.queue.push(Step::immediate(|b: &mut Self| {
            if !b.phase.is_terminal() {
                b.phase = BattlePhase::Fled;
                b.outcome = Some(BattleOutcome::Fled);
            }
            b.stop();
        }));
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    fn team(&self, side: Side) -> &Team {
        match side {
            Side::Heroes => &*self.heroes,
            Side::Foes => &self.foes,
        }
    }

    fn team_mut(&mut self, side: Side) -> &mut Team {
        match side {
            Side::Heroes => &mut *self.heroes,
            Side::Foes => &mut self.foes,
        }
    }

    /// Index of the member `side` will strike.
    fn target_of(&mut self, side: Side) -> usize {
        match side {
            Side::Heroes => {
                self.select.resolve_selected(&self.foes);
                self.select.cursor()
            },
            Side::Foes => self.heroes.first_living().unwrap_or(0),
        }
    }

    fn resolve(&mut self, side: Side, strategy: &CombatStrategy) {
        self.lock();
        let actor = self.team(side).next_to_take_turn();
        let target = self.target_of(side);
        if let Some(member) = self.team(side).get(actor) {
            info!("{} uses {}", member.name(), strategy.name());
        }

        if let Some(modifier) = strategy.as_modifier() {
            self.apply_modifier(side, actor, target, modifier);
        } else if let Some(damage) = strategy.damage().copied() {
            self.queue_strike(side, actor, target, damage);
        }
        self.queue_bookkeeping(side, actor);
    }

    fn queue_strike(&mut self, side: Side, actor: usize, target: usize, damage: DamageDescriptor) {
        let (Some(attacker), Some(defender)) = (self.team(side).get(actor), self.team(side.opposite()).get(target))
        else {
            warn!("Strike between missing members {actor} -> {target}");
            return;
        };
        let start = attacker.position();
        let dest = defender.position() - attacker.direction().unit() * self.config.lunge_gap;
        let duration = self.config.step_duration;

        self.queue.push(Step::timed(duration, move |b: &mut Self, p| {
            b.place(side, actor, start.lerp(dest, p));
        }));
        self.queue.push(Step::immediate(move |b: &mut Self| {
            b.apply_damage(side, actor, target, &damage);
        }));
        self.queue.push(Step::timed(duration, move |b: &mut Self, p| {
            b.place(side, actor, dest.lerp(start, p));
        }));
    }

    fn queue_bookkeeping(&mut self, side: Side, actor: usize) {
        self.queue.push(Step::immediate(move |b: &mut Self| b.mark_turn_taken(side, actor)));
        self.queue.push(Step::immediate(move |b: &mut Self| b.post_turn_check(side)));
        self.queue.push(Step::immediate(Self::refresh_menu));
        self.queue.push(Step::immediate(Self::resync_target));
    }

    fn place(&mut self, side: Side, index: usize, position: Vec2) {
        if let Some(member) = self.team_mut(side).get_mut(index) {
            member.move_to(position);
        }
    }

    fn slide_in(&mut self, progress: f32) {
        let origin = self.config.foe_origin;
        let stride = self.config.member_stride;
        for (i, foe) in self.foes.members_mut().iter_mut().enumerate() {
            let home = origin + Vec2::new(i as f32 * stride, 0.0);
            foe.move_to(home + Vec2::new((1.0 - progress) * INTRO_SLIDE, 0.0));
        }
    }

    fn apply_damage(&mut self, side: Side, actor: usize, target: usize, damage: &DamageDescriptor) {
        let (attacker, defender) = match side {
            Side::Heroes => (self.heroes.get(actor), self.foes.get_mut(target)),
            Side::Foes => (self.foes.get(actor), self.heroes.get_mut(target)),
        };
        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            warn!("Damage between missing members {actor} -> {target}");
            return;
        };

        let was_defeated = defender.is_defeated();
        let applied = attacker.attack(defender, damage);
        info!("{} takes {applied} damage ({} hp left)", defender.name(), defender.stats().hp());

        if !was_defeated && defender.is_defeated() {
            info!("{} is defeated", defender.name());
            self.bus.publish(GameEvent::ActorDefeated {
                actor: defender.id(),
                reference: defender.reference().clone(),
                kind: defender.kind(),
            });
        }
    }

    fn apply_modifier(&mut self, side: Side, actor: usize, target: usize, modifier: &StatModifier) {
        let recipient = match modifier.target {
            ModifierTarget::User => self.team_mut(side).get_mut(actor),
            ModifierTarget::Opponent => self.team_mut(side.opposite()).get_mut(target),
        };
        match recipient {
            Some(member) => {
                debug!("{} gets {:?} {:?}", member.name(), modifier.stat, modifier.effect);
                member.stats_mut().modify(modifier.to_active());
            },
            None => warn!("Modifier {} has no recipient", modifier.name()),
        }
    }

    fn mark_turn_taken(&mut self, side: Side, actor: usize) {
        let Some(id) = self.team(side).get(actor).map(Combatant::id) else {
            error!("No member {actor} on {side:?} to mark");
            return;
        };
        if let Err(e) = self.team_mut(side).take_turn(id) {
            error!("Turn bookkeeping failed: {e}");
        }
    }

    fn post_turn_check(&mut self, side: Side) {
        if self.heroes.is_defeated() {
            info!("Heroes defeated");
            self.phase = BattlePhase::GameOver;
            self.outcome = Some(BattleOutcome::Defeat);
            self.lock();
            self.queue.push(Step::caption("The party has fallen...", self.config.caption_duration));
            return;
        }
        if self.foes.is_defeated() {
            info!("Foes defeated");
            self.phase = BattlePhase::Victory;
            self.outcome = Some(BattleOutcome::Victory);
            self.lock();
            self.queue.push(Step::caption("Victory!", self.config.caption_duration));
            let pool = self.foes.exp_yield();
            self.heroes.award_exp(pool, &self.bus);
            return;
        }

        if self.team(side).turn_is_over() {
            let next = side.opposite();
            debug!("Turn passes to {next:?}");
            self.turn = next;
            self.team_mut(next).cycle();
            self.phase = BattlePhase::turn_of(next);
            if next == Side::Foes {
                self.queue.push(Step::immediate(Self::announce_foe_action));
            }
        } else if side == Side::Foes {
            self.queue.push(Step::immediate(Self::announce_foe_action));
        }
    }

    fn refresh_menu(&mut self) {
        let next = self.heroes.next_to_take_turn();
        self.menu = self.heroes.get(next).map(Actor::menu).unwrap_or_default();
    }

    fn resync_target(&mut self) {
        self.select.resolve_selected(&self.foes);
    }

    fn open_turn(&mut self) {
        self.phase = BattlePhase::turn_of(self.turn);
        self.refresh_menu();
        self.resync_target();
        if self.turn == Side::Foes {
            self.announce_foe_action();
        }
    }

    fn announce_foe_action(&mut self) {
        if !self.active || self.phase != BattlePhase::FoeTurn {
            return;
        }
        let index = self.foes.next_to_take_turn();
        if let Some(foe) = self.foes.get(index) {
            foe.default_strategy().use_by(Side::Foes, &self.bus);
        }
    }

    fn narrate_exp(&mut self, report: &ExpReport) {
        if !self.heroes.contains(report.actor) {
            return;
        }
        let duration = self.config.caption_duration;
        self.queue
            .push(Step::caption(format!("{} gained {} exp.", report.name, report.exp), duration));
        for level in &report.levels {
            self.queue
                .push(Step::caption(format!("{} reached level {level}!", report.name), duration));
        }
        for ability in &report.abilities {
            self.queue
                .push(Step::caption(format!("{} learned {ability}!", report.name), duration));
        }
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Tears the battle down.
    ///
    /// Refused (returns `false`) while steps are in flight and neither side
    /// is wiped out, or when already stopped. Restores both teams, marks every
    /// foe but a surviving leader defeated, releases the bus subscription and
    /// publishes `team.save` then `battle.end`.
    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        if !self.queue.is_empty() && !self.is_done() {
            debug!("Refusing to stop with {} steps pending", self.queue.len());
            return false;
        }

        self.queue.clear();
        self.heroes.restore();
        self.foes.restore();
        for (i, foe) in self.foes.members_mut().iter_mut().enumerate() {
            if i != 0 || foe.is_defeated() {
                foe.kill();
            }
        }

        self.bus.unsubscribe(self.subscription.id());
        self.active = false;
        self.lock();
        self.phase = BattlePhase::Done;
        let outcome = *self.outcome.get_or_insert(BattleOutcome::Fled);

        info!("Battle over: {outcome:?}");
        self.bus.publish(GameEvent::TeamSave(self.heroes.snapshot()));
        self.bus.publish(GameEvent::BattleEnd { outcome });
        true
    }

    /// Consumes the battle, tearing it down first if it is still running.
    #[must_use]
    pub fn finish(mut self) -> BattleReport {
        if self.active {
            self.queue.clear();
            self.stop();
        }
        BattleReport {
            outcome: self.outcome.unwrap_or(BattleOutcome::Fled),
            heroes: self.heroes,
            foes: self.foes,
        }
    }
}

impl Renderable for Battle {
    fn draw(&self, ctx: &mut dyn RenderContext, offset: Vec2, resolution: f32) {
        for member in self.heroes.members().iter().chain(self.foes.members()) {
            member.draw(ctx, offset, resolution);
        }
        if !self.select.is_locked() {
            if let Some(target) = self.selected() {
                let above = target.position() - Vec2::new(0.0, target.size().y);
                ctx.arrow((above + offset) * resolution);
            }
        }
        if let Some(caption) = self.caption() {
            ctx.text(caption, (CAPTION_AT + offset) * resolution);
        } else if !self.locked {
            for (i, strategy) in self.menu.iter().enumerate() {
                let line = MENU_AT + Vec2::new(0.0, i as f32 * MENU_LINE);
                strategy.draw(ctx, line + offset, resolution);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
