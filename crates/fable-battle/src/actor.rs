//! Battle participants.
//!
//! Every participant is one [`Actor`] data struct tagged with an
//! [`ActorKind`]. What the battle needs from it is expressed through three
//! small capability traits: [`Combatant`], [`Movable`] and [`Lockable`].

use fable_common::{ActorId, ContentRef, Direction, Placement, Vec2};
use serde::{Deserialize, Serialize};

use crate::events::ExpReport;
use crate::render::{RenderContext, Renderable};
use crate::stats::Stats;
use crate::strategy::{
    Ability, CombatStrategy, DamageDescriptor, Damaging, Describable, Equipable, StatModifier,
    Weapon,
};

/// Kind of actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Player-controlled hero.
    Player,
    /// Hostile actor.
    #[default]
    Enemy,
    /// Non-player character.
    NonPlayer,
    /// Companion following a hero.
    Pet,
}

// ============================================================================
// Capabilities
// ============================================================================

/// A single hit handed to [`Combatant::endure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Raw damage before the defender's reduction.
    pub amount: u32,
    /// Special (vs physical) hit.
    pub special: bool,
}

/// Something that takes part in combat.
pub trait Combatant {
    /// Runtime id.
    fn id(&self) -> ActorId;
    /// Content reference.
    fn reference(&self) -> &ContentRef;
    /// Display name.
    fn name(&self) -> &str;
    /// Stats.
    fn stats(&self) -> &Stats;
    /// Mutable stats.
    fn stats_mut(&mut self) -> &mut Stats;
    /// Whether out of the fight.
    fn is_defeated(&self) -> bool;
    /// Takes a hit; returns the damage applied.
    fn endure(&mut self, hit: Hit) -> u32;
    /// Marks defeated. Returns `true` only if this call defeated the actor.
    fn kill(&mut self) -> bool;

    /// Attacks `target` with `damage`; returns the damage applied.
    fn attack(&self, target: &mut dyn Combatant, damage: &DamageDescriptor) -> u32 {
        target.endure(Hit {
            amount: damage.raw_damage(self.stats()),
            special: damage.special,
        })
    }
}

/// Something with a position and facing on screen.
pub trait Movable {
    /// Current position.
    fn position(&self) -> Vec2;
    /// Sprite size.
    fn size(&self) -> Vec2;
    /// Current facing.
    fn direction(&self) -> Direction;
    /// Moves to `position`.
    fn move_to(&mut self, position: Vec2);
    /// Turns to face `direction`.
    fn face(&mut self, direction: Direction);
    /// Remembers the current placement.
    fn save_position(&mut self);
    /// Returns to the remembered placement, if any.
    fn restore_position(&mut self);
}

/// Something whose independent movement can be frozen.
pub trait Lockable {
    /// Freezes independent movement.
    fn lock(&mut self);
    /// Releases independent movement.
    fn unlock(&mut self);
    /// Whether currently frozen.
    fn is_locked(&self) -> bool;
}

// ============================================================================
// Actor
// ============================================================================

/// A battle participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    id: ActorId,
    reference: ContentRef,
    name: String,
    kind: ActorKind,
    sprite: String,
    position: Vec2,
    size: Vec2,
    direction: Direction,
    saved: Option<Placement>,
    locked: bool,
    defeated: bool,
    stats: Stats,
    weapon: Option<Weapon>,
    abilities: Vec<Ability>,
    learnset: Vec<Ability>,
    modifiers: Vec<StatModifier>,
}

impl Actor {
    /// Creates an actor with a fresh id.
    #[must_use]
    pub fn new(
        kind: ActorKind,
        reference: impl Into<ContentRef>,
        name: impl Into<String>,
        stats: Stats,
    ) -> Self {
        let reference = reference.into();
        Self {
            id: ActorId::new(),
            sprite: reference.to_string(),
            reference,
            name: name.into(),
            kind,
            position: Vec2::ZERO,
            size: Vec2::splat(16.0),
            direction: Direction::default(),
            saved: None,
            locked: false,
            defeated: false,
            stats,
            weapon: None,
            abilities: Vec::new(),
            learnset: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    /// Set the sprite key.
    #[must_use]
    pub fn with_sprite(mut self, sprite: impl Into<String>) -> Self {
        self.sprite = sprite.into();
        self
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Set the sprite size.
    #[must_use]
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Equip a weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.equip(weapon);
        self
    }

    /// Set the abilities this actor can learn; those at or below the current
    /// level are learned immediately.
    #[must_use]
    pub fn with_learnset(mut self, learnset: Vec<Ability>) -> Self {
        self.learnset = learnset;
        self.learn_up_to_level();
        self
    }

    /// Set the stat modifiers this actor knows.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Vec<StatModifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Kind of actor.
    #[must_use]
    pub const fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Sprite key.
    #[must_use]
    pub fn sprite(&self) -> &str {
        &self.sprite
    }

    /// Equipped weapon.
    #[must_use]
    pub const fn weapon(&self) -> Option<&Weapon> {
        self.weapon.as_ref()
    }

    /// Learned abilities.
    #[must_use]
    pub fn abilities(&self) -> &[Ability] {
        &self.abilities
    }

    /// Known stat modifiers.
    #[must_use]
    pub fn stat_modifiers(&self) -> &[StatModifier] {
        &self.modifiers
    }

    /// Equips `weapon` and returns the weapon it displaced, unequipped.
    ///
    /// Equipping the weapon already held (same reference) is a no-op.
    pub fn equip(&mut self, mut weapon: Weapon) -> Option<Weapon> {
        if self
            .weapon
            .as_ref()
            .is_some_and(|held| held.reference() == weapon.reference())
        {
            return None;
        }
        weapon.set_equipped(true);
        self.weapon.replace(weapon).map(|mut previous| {
            previous.set_equipped(false);
            previous
        })
    }

    /// Removes and returns the equipped weapon.
    pub fn unequip(&mut self) -> Option<Weapon> {
        self.weapon.take().map(|mut weapon| {
            weapon.set_equipped(false);
            weapon
        })
    }

    /// Strategy used when this actor acts without a menu: the weapon, else
    /// the first damaging ability, else a bare-handed strike.
    #[must_use]
    pub fn default_strategy(&self) -> CombatStrategy {
        if let Some(weapon) = &self.weapon {
            return CombatStrategy::Weapon(weapon.clone());
        }
        self.abilities
            .iter()
            .find(|ability| ability.is_damaging())
            .map_or_else(
                || CombatStrategy::Weapon(Weapon::unarmed()),
                |ability| CombatStrategy::Ability(ability.clone()),
            )
    }

    /// Everything this actor can choose from on its turn.
    #[must_use]
    pub fn menu(&self) -> Vec<CombatStrategy> {
        let mut menu = vec![CombatStrategy::Weapon(
            self.weapon.clone().unwrap_or_else(Weapon::unarmed),
        )];
        menu.extend(self.abilities.iter().cloned().map(CombatStrategy::Ability));
        menu.extend(self.modifiers.iter().cloned().map(CombatStrategy::Modifier));
        menu
    }

    /// Adds experience, learning any abilities gated at the levels reached.
    pub fn gain_exp(&mut self, points: u32) -> ExpReport {
        let gain = self.stats.gain_exp(points);
        let abilities = if gain.leveled_up() {
            self.learn_up_to_level()
        } else {
            Vec::new()
        };
        ExpReport {
            actor: self.id,
            name: self.name.clone(),
            exp: gain.applied,
            levels: gain.levels,
            abilities,
        }
    }

    /// Learns every ability of the learnset up to the current level; returns
    /// the names of the newly learned ones.
    fn learn_up_to_level(&mut self) -> Vec<String> {
        let level = self.stats.level();
        let mut learned = Vec::new();
        for ability in &self.learnset {
            let known = self
                .abilities
                .iter()
                .any(|a| a.reference() == ability.reference());
            if ability.level <= level && !known {
                learned.push(ability.name().to_owned());
                self.abilities.push(ability.clone());
            }
        }
        learned
    }

    /// Clears the defeated flag (used when reviving a roster).
    pub fn revive(&mut self) {
        self.defeated = false;
    }
}

impl Combatant for Actor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn reference(&self) -> &ContentRef {
        &self.reference
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    fn is_defeated(&self) -> bool {
        self.defeated
    }

    fn endure(&mut self, hit: Hit) -> u32 {
        let applied = self.stats.endure(hit.amount, hit.special);
        if self.stats.is_depleted() {
            self.kill();
        }
        applied
    }

    fn kill(&mut self) -> bool {
        if self.defeated {
            return false;
        }
        self.defeated = true;
        true
    }
}

impl Movable for Actor {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn move_to(&mut self, position: Vec2) {
        self.position = position;
    }

    fn face(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn save_position(&mut self) {
        self.saved = Some(Placement::new(self.position, self.direction));
    }

    fn restore_position(&mut self) {
        if let Some(placement) = self.saved.take() {
            self.position = placement.position;
            self.direction = placement.direction;
        }
    }
}

impl Lockable for Actor {
    fn lock(&mut self) {
        self.locked = true;
    }

    fn unlock(&mut self) {
        self.locked = false;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Renderable for Actor {
    fn draw(&self, ctx: &mut dyn RenderContext, offset: Vec2, resolution: f32) {
        ctx.sprite(
            &self.sprite,
            (self.position + offset) * resolution,
            self.size * resolution,
            self.direction,
            self.defeated,
        );
    }
}
