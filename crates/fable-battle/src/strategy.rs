//! Combat strategies: everything an actor can use on its turn.
//!
//! A strategy never applies its own effect. [`CombatStrategy::use_by`] only
//! announces the intent on the event bus; the battle resolves it against
//! whoever is acting. The same menu code therefore drives weapons, abilities
//! and stat modifiers alike.

use fable_common::{ContentRef, Vec2};
use serde::{Deserialize, Serialize};

use crate::events::{ActionIntent, BattleAction, EventBus, GameEvent, Side};
use crate::render::{RenderContext, Renderable};
use crate::stats::{ActiveModifier, ModifierEffect, StatKey, Stats};

// ============================================================================
// Capabilities
// ============================================================================

/// Has a reference, a display name and a description.
pub trait Describable {
    /// Content reference.
    fn reference(&self) -> &ContentRef;
    /// Display name.
    fn name(&self) -> &str;
    /// Flavor text.
    fn description(&self) -> &str;
}

/// Deals damage when used.
pub trait Damaging {
    /// Damage descriptor, if this strategy deals damage.
    fn damage(&self) -> Option<&DamageDescriptor>;

    /// Whether using this strategy deals damage.
    fn is_damaging(&self) -> bool {
        self.damage().is_some()
    }
}

/// Can be equipped by an actor.
pub trait Equipable {
    /// Whether currently equipped.
    fn is_equipped(&self) -> bool;
    /// Sets the equipped flag.
    fn set_equipped(&mut self, equipped: bool);
}

/// Reference, name and description shared by every strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Content reference (filled from the catalog key when omitted).
    #[serde(default)]
    pub reference: ContentRef,
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
}

impl Description {
    /// Creates a description.
    #[must_use]
    pub fn new(reference: impl Into<ContentRef>, name: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

// ============================================================================
// Damage
// ============================================================================

fn default_scaling() -> f32 {
    1.0
}

/// How much damage a strategy deals: `base + floor(attack * scaling)`.
///
/// `attack` is the user's special attack for special hits and physical attack
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageDescriptor {
    /// Flat base amount.
    #[serde(default)]
    pub base: u32,
    /// Special (vs physical) hit.
    #[serde(default)]
    pub special: bool,
    /// Attack scaling factor (0.0 = flat damage).
    #[serde(default = "default_scaling")]
    pub scaling: f32,
}

impl DamageDescriptor {
    /// Physical damage scaling fully with attack.
    #[must_use]
    pub const fn physical(base: u32) -> Self {
        Self {
            base,
            special: false,
            scaling: 1.0,
        }
    }

    /// Special damage scaling fully with special attack.
    #[must_use]
    pub const fn special(base: u32) -> Self {
        Self {
            base,
            special: true,
            scaling: 1.0,
        }
    }

    /// Set the scaling factor.
    #[must_use]
    pub const fn with_scaling(mut self, scaling: f32) -> Self {
        self.scaling = scaling;
        self
    }

    /// Raw damage before the defender's reduction.
    #[must_use]
    pub fn raw_damage(&self, attacker: &Stats) -> u32 {
        let attack = if self.special {
            attacker.special_attack()
        } else {
            attacker.attack()
        };
        let scaled = (attack as f32 * self.scaling).floor().max(0.0) as u32;
        self.base.saturating_add(scaled)
    }
}

// ============================================================================
// Weapon
// ============================================================================

/// An equipable weapon, held by at most one actor at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Reference and names.
    #[serde(flatten)]
    pub info: Description,
    /// Damage dealt.
    pub damage: DamageDescriptor,
    /// Icon sprite key.
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(skip)]
    equipped: bool,
}

impl Weapon {
    /// Creates an unequipped weapon.
    #[must_use]
    pub fn new(info: Description, damage: DamageDescriptor) -> Self {
        Self {
            info,
            damage,
            sprite: None,
            equipped: false,
        }
    }

    /// Bare-handed strike used by actors without a weapon.
    #[must_use]
    pub fn unarmed() -> Self {
        Self::new(
            Description::new("weapon.unarmed", "Strike"),
            DamageDescriptor::physical(0),
        )
    }
}

impl Describable for Weapon {
    fn reference(&self) -> &ContentRef {
        &self.info.reference
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }
}

impl Damaging for Weapon {
    fn damage(&self) -> Option<&DamageDescriptor> {
        Some(&self.damage)
    }
}

impl Equipable for Weapon {
    fn is_equipped(&self) -> bool {
        self.equipped
    }

    fn set_equipped(&mut self, equipped: bool) {
        self.equipped = equipped;
    }
}

// ============================================================================
// Ability
// ============================================================================

fn default_ability_level() -> u32 {
    1
}

/// A learned technique, available from a given level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Reference and names.
    #[serde(flatten)]
    pub info: Description,
    /// Damage dealt, if any.
    #[serde(default)]
    pub damage: Option<DamageDescriptor>,
    /// Level at which the ability is learned.
    #[serde(default = "default_ability_level")]
    pub level: u32,
}

impl Ability {
    /// Creates an ability learned at `level`.
    #[must_use]
    pub fn new(info: Description, damage: Option<DamageDescriptor>, level: u32) -> Self {
        Self {
            info,
            damage,
            level,
        }
    }
}

impl Describable for Ability {
    fn reference(&self) -> &ContentRef {
        &self.info.reference
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }
}

impl Damaging for Ability {
    fn damage(&self) -> Option<&DamageDescriptor> {
        self.damage.as_ref()
    }
}

// ============================================================================
// Stat Modifier
// ============================================================================

/// Who a stat modifier lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTarget {
    /// The actor using it.
    #[serde(rename = "self")]
    User,
    /// The current opponent.
    Opponent,
}

/// A buff or debuff lasting a number of combat cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    /// Reference and names.
    #[serde(flatten)]
    pub info: Description,
    /// Who receives the modifier.
    pub target: ModifierTarget,
    /// Stat being changed.
    pub stat: StatKey,
    /// Magnitude of the change.
    pub effect: ModifierEffect,
    /// Combat cycles it lasts.
    pub duration: u32,
}

impl StatModifier {
    /// Creates a stat modifier.
    #[must_use]
    pub fn new(
        info: Description,
        target: ModifierTarget,
        stat: StatKey,
        effect: ModifierEffect,
        duration: u32,
    ) -> Self {
        Self {
            info,
            target,
            stat,
            effect,
            duration,
        }
    }

    /// The modifier as applied to a stat block.
    #[must_use]
    pub const fn to_active(&self) -> ActiveModifier {
        ActiveModifier::new(self.stat, self.effect, self.duration)
    }
}

impl Describable for StatModifier {
    fn reference(&self) -> &ContentRef {
        &self.info.reference
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }
}

impl Damaging for StatModifier {
    fn damage(&self) -> Option<&DamageDescriptor> {
        None
    }
}

// ============================================================================
// Combat Strategy
// ============================================================================

/// Any usable combat action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStrategy {
    /// Attack with a weapon.
    Weapon(Weapon),
    /// Use a learned ability.
    Ability(Ability),
    /// Apply a buff or debuff.
    Modifier(StatModifier),
}

impl CombatStrategy {
    /// Announces that the acting member of `side` wants to use this strategy.
    pub fn use_by(&self, side: Side, bus: &EventBus) {
        bus.publish(GameEvent::BattleAction(BattleAction {
            side,
            intent: ActionIntent::Use(self.clone()),
        }));
    }

    /// The stat modifier, if this is one.
    #[must_use]
    pub fn as_modifier(&self) -> Option<&StatModifier> {
        match self {
            Self::Modifier(modifier) => Some(modifier),
            _ => None,
        }
    }

    fn describable(&self) -> &dyn Describable {
        match self {
            Self::Weapon(weapon) => weapon,
            Self::Ability(ability) => ability,
            Self::Modifier(modifier) => modifier,
        }
    }
}

impl Describable for CombatStrategy {
    fn reference(&self) -> &ContentRef {
        self.describable().reference()
    }

    fn name(&self) -> &str {
        self.describable().name()
    }

    fn description(&self) -> &str {
        self.describable().description()
    }
}

impl Damaging for CombatStrategy {
    fn damage(&self) -> Option<&DamageDescriptor> {
        match self {
            Self::Weapon(weapon) => weapon.damage(),
            Self::Ability(ability) => ability.damage(),
            Self::Modifier(modifier) => modifier.damage(),
        }
    }
}

impl Renderable for CombatStrategy {
    fn draw(&self, ctx: &mut dyn RenderContext, offset: Vec2, resolution: f32) {
        ctx.text(self.name(), offset * resolution);
    }
}

impl From<Weapon> for CombatStrategy {
    fn from(value: Weapon) -> Self {
        Self::Weapon(value)
    }
}

impl From<Ability> for CombatStrategy {
    fn from(value: Ability) -> Self {
        Self::Ability(value)
    }
}

impl From<StatModifier> for CombatStrategy {
    fn from(value: StatModifier) -> Self {
        Self::Modifier(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
