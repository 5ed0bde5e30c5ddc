//! Combat stats and level progression.
//!
//! This module provides:
//! - The base stat block every actor carries
//! - Level scaling of base values into derived values
//! - Damage intake with a defense reduction and a floor of one
//! - Experience thresholds and multi-level gains
//! - Temporary stat modifiers that expire per combat cycle

use fable_common::{BattleError, BattleResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for stat scaling and leveling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Multiplier applied after level scaling.
    pub multiplier: f64,
    /// Constant `k` of the experience threshold formula.
    pub exp_constant: f64,
    /// Highest reachable level.
    pub max_level: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            exp_constant: 0.1,
            max_level: 100,
        }
    }
}

// ============================================================================
// Base Stats
// ============================================================================

/// Key naming one derived stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    /// Maximum hit points.
    Hp,
    /// Physical attack.
    Atk,
    /// Physical defense.
    Def,
    /// Special attack.
    SpAtk,
    /// Special defense.
    SpDef,
    /// Speed (decides the opening turn).
    Spd,
}

/// Unscaled attribute block of an actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    /// Base hit points.
    pub hp: u32,
    /// Base physical attack.
    pub atk: u32,
    /// Base physical defense.
    pub def: u32,
    /// Base special attack.
    pub sp_atk: u32,
    /// Base special defense.
    pub sp_def: u32,
    /// Base speed.
    pub spd: u32,
    /// Experience awarded when this actor is defeated.
    pub exp_yield: u32,
}

impl BaseStats {
    /// Creates a block with every combat attribute set to `value`.
    #[must_use]
    pub const fn uniform(value: u32) -> Self {
        Self {
            hp: value,
            atk: value,
            def: value,
            sp_atk: value,
            sp_def: value,
            spd: value,
            exp_yield: 0,
        }
    }

    /// Returns the base value for a stat key.
    #[must_use]
    pub const fn get(&self, key: StatKey) -> u32 {
        match key {
            StatKey::Hp => self.hp,
            StatKey::Atk => self.atk,
            StatKey::Def => self.def,
            StatKey::SpAtk => self.sp_atk,
            StatKey::SpDef => self.sp_def,
            StatKey::Spd => self.spd,
        }
    }

    /// Sum of the six combat attributes (yield excluded).
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.hp + self.atk + self.def + self.sp_atk + self.sp_def + self.spd
    }

    /// Set the experience yield.
    #[must_use]
    pub const fn with_exp_yield(mut self, exp_yield: u32) -> Self {
        self.exp_yield = exp_yield;
        self
    }
}

// ============================================================================
// Modifiers
// ============================================================================

/// How a modifier changes its stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierEffect {
    /// Add a flat amount (may be negative).
    Add(i32),
    /// Multiply by a factor (1.0 = unchanged).
    Scale(f32),
}

/// A temporary modifier applied to one stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveModifier {
    /// Stat being modified.
    pub stat: StatKey,
    /// Effect on the stat.
    pub effect: ModifierEffect,
    /// Combat cycles left before expiry.
    pub remaining: u32,
}

impl ActiveModifier {
    /// Creates a modifier lasting `cycles` combat cycles.
    #[must_use]
    pub const fn new(stat: StatKey, effect: ModifierEffect, cycles: u32) -> Self {
        Self {
            stat,
            effect,
            remaining: cycles,
        }
    }
}

// ============================================================================
// Experience
// ============================================================================

/// Outcome of a call to [`Stats::gain_exp`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpGain {
    /// Every level reached, in ascending order.
    pub levels: Vec<u32>,
    /// Experience actually absorbed.
    pub applied: u32,
}

impl ExpGain {
    /// Whether at least one level was gained.
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        !self.levels.is_empty()
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Per-actor numeric progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    base: BaseStats,
    level: u32,
    damage: u32,
    experience: u32,
    modifiers: Vec<ActiveModifier>,
    config: StatsConfig,
}

impl Stats {
    /// Creates stats at `level`, clamped into `1..=max_level`.
    #[must_use]
    pub fn new(base: BaseStats, level: u32, config: StatsConfig) -> Self {
        Self {
            base,
            level: level.clamp(1, config.max_level.max(1)),
            damage: 0,
            experience: 0,
            modifiers: Vec::new(),
            config,
        }
    }

    /// Base attribute block.
    #[must_use]
    pub const fn base(&self) -> &BaseStats {
        &self.base
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Accumulated damage.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Experience accumulated toward the next level.
    #[must_use]
    pub const fn experience(&self) -> u32 {
        self.experience
    }

    /// Scaling configuration.
    #[must_use]
    pub const fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Active temporary modifiers.
    pub fn modifiers(&self) -> impl Iterator<Item = &ActiveModifier> {
        self.modifiers.iter()
    }

    /// Scales a base value by level: `floor(base * level / 100 * multiplier)`.
    #[must_use]
    pub fn scaled(&self, base: u32) -> u32 {
        let value = f64::from(base) * f64::from(self.level) / 100.0 * self.config.multiplier;
        value.floor().max(0.0) as u32
    }

    /// Derived value of a stat with modifiers applied.
    #[must_use]
    pub fn stat(&self, key: StatKey) -> u32 {
        let scaled = self.scaled(self.base.get(key));
        let mut flat = i64::from(scaled);
        let mut factor = 1.0_f64;
        for modifier in self.modifiers.iter().filter(|m| m.stat == key) {
            match modifier.effect {
                ModifierEffect::Add(amount) => flat += i64::from(amount),
                ModifierEffect::Scale(scale) => factor *= f64::from(scale),
            }
        }
        ((flat.max(0) as f64) * factor).floor().max(0.0) as u32
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        self.stat(StatKey::Hp)
    }

    /// Current hit points: `max(0, max_hp - damage)`.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.max_hp().saturating_sub(self.damage)
    }

    /// Physical attack.
    #[must_use]
    pub fn attack(&self) -> u32 {
        self.stat(StatKey::Atk)
    }

    /// Physical defense.
    #[must_use]
    pub fn defense(&self) -> u32 {
        self.stat(StatKey::Def)
    }

    /// Special attack.
    #[must_use]
    pub fn special_attack(&self) -> u32 {
        self.stat(StatKey::SpAtk)
    }

    /// Special defense.
    #[must_use]
    pub fn special_defense(&self) -> u32 {
        self.stat(StatKey::SpDef)
    }

    /// Speed.
    #[must_use]
    pub fn speed(&self) -> u32 {
        self.stat(StatKey::Spd)
    }

    /// Experience awarded for defeating this actor.
    #[must_use]
    pub fn exp_yield(&self) -> u32 {
        self.scaled(self.base.exp_yield)
    }

    /// Whether hit points are exhausted.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.hp() == 0
    }

    /// Takes a hit of `raw` damage and returns the damage applied.
    ///
    /// The hit is reduced by defense (special defense for special hits) and
    /// never applies less than 1. Accumulated damage stops at max hp; the
    /// returned amount is the full hit.
    pub fn endure(&mut self, raw: u32, special: bool) -> u32 {
        let defense = if special {
            self.special_defense()
        } else {
            self.defense()
        };
        let applied = raw.saturating_sub(defense).max(1);
        self.damage = self.damage.saturating_add(applied).min(self.max_hp());
        applied
    }

    /// Heals by reducing accumulated damage; returns the amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(self.damage);
        self.damage -= healed;
        healed
    }

    /// Experience needed to leave `level`, or `None` at the level cap.
    #[must_use]
    pub fn threshold(&self, level: u32) -> Option<u32> {
        if level >= self.config.max_level {
            return None;
        }
        let raw = f64::from(level).powf(1.5) * f64::from(self.base.total()) * self.config.exp_constant;
        // absorb float noise so exact products don't round up
        Some(((raw - 1e-9).ceil().max(1.0)) as u32)
    }

    /// Experience needed to leave the current level.
    #[must_use]
    pub fn next_threshold(&self) -> Option<u32> {
        self.threshold(self.level)
    }

    /// Adds experience, leveling up as many times as it covers.
    ///
    /// Experience stops accruing at the level cap; anything past it is not
    /// counted in [`ExpGain::applied`].
    pub fn gain_exp(&mut self, points: u32) -> ExpGain {
        let mut gain = ExpGain::default();
        if points == 0 || self.next_threshold().is_none() {
            return gain;
        }

        self.experience = self.experience.saturating_add(points);
        gain.applied = points;

        while let Some(threshold) = self.next_threshold() {
            if self.experience < threshold {
                break;
            }
            self.experience -= threshold;
            self.level += 1;
            gain.levels.push(self.level);
        }

        if self.next_threshold().is_none() {
            gain.applied = gain.applied.saturating_sub(self.experience);
            self.experience = 0;
        }
        gain
    }

    /// Applies a temporary modifier.
    pub fn modify(&mut self, modifier: ActiveModifier) {
        if modifier.remaining > 0 {
            self.modifiers.push(modifier);
        }
    }

    /// Counts down every modifier by one cycle and drops the elapsed ones.
    pub fn expire_modifiers(&mut self) {
        for modifier in &mut self.modifiers {
            modifier.remaining = modifier.remaining.saturating_sub(1);
        }
        self.modifiers.retain(|m| m.remaining > 0);
    }

    // ------------------------------------------------------------------------
    // Restore-path setters
    // ------------------------------------------------------------------------

    /// Sets the level from saved state.
    pub fn set_level(&mut self, level: u32) -> BattleResult<()> {
        if level == 0 || level > self.config.max_level {
            return Err(BattleError::InvalidInput {
                field: "level",
                value: u64::from(level),
                reason: format!("must be within 1..={}", self.config.max_level),
            });
        }
        self.level = level;
        Ok(())
    }

    /// Sets accumulated damage from saved state.
    pub fn set_damage(&mut self, damage: u32) -> BattleResult<()> {
        let max_hp = self.max_hp();
        if damage > max_hp {
            return Err(BattleError::InvalidInput {
                field: "damage",
                value: u64::from(damage),
                reason: format!("exceeds max hp {max_hp}"),
            });
        }
        self.damage = damage;
        Ok(())
    }

    /// Sets experience toward the next level from saved state.
    pub fn set_experience(&mut self, experience: u32) -> BattleResult<()> {
        let threshold = self.next_threshold();
        if !threshold.map_or(experience == 0, |limit| experience < limit) {
            return Err(BattleError::InvalidInput {
                field: "experience",
                value: u64::from(experience),
                reason: format!("must stay below the next threshold {}", threshold.unwrap_or(0)),
            });
        }
        self.experience = experience;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Level 50 with multiplier 2.0 makes every derived value equal its base.
    fn at_par(base: BaseStats) -> Stats {
        Stats::new(base, 50, StatsConfig::default())
    }

    #[test]
    fn test_scaled_values_follow_level() {
        let stats = Stats::new(BaseStats::uniform(50), 10, StatsConfig::default());
        // floor(50 * 10 / 100 * 2.0) = 10
        assert_eq!(stats.attack(), 10);
        assert_eq!(stats.max_hp(), 10);
        assert_eq!(at_par(BaseStats::uniform(37)).defense(), 37);
    }

    #[test]
    fn test_endure_subtracts_defense() {
        let mut foe = at_par(BaseStats {
            hp: 40,
            def: 3,
            ..BaseStats::default()
        });
        assert_eq!(foe.endure(10, false), 7);
        assert_eq!(foe.hp(), 33);
    }

    #[test]
    fn test_endure_floor_is_one() {
        let mut foe = at_par(BaseStats {
            hp: 40,
            def: 20,
            ..BaseStats::default()
        });
        assert_eq!(foe.endure(10, false), 1);
        assert_eq!(foe.damage(), 1);
    }

    #[test]
    fn test_special_hits_use_special_defense() {
        let mut foe = at_par(BaseStats {
            hp: 40,
            def: 1,
            sp_def: 6,
            ..BaseStats::default()
        });
        assert_eq!(foe.endure(10, true), 4);
    }

    #[test]
    fn test_hp_never_negative() {
        let mut stats = at_par(BaseStats {
            hp: 5,
            ..BaseStats::default()
        });
        assert_eq!(stats.endure(100, false), 100);
        assert_eq!(stats.hp(), 0);
        assert_eq!(stats.damage(), stats.max_hp());
        assert!(stats.is_depleted());
    }

    #[test]
    fn test_heal_caps_at_zero_damage() {
        let mut stats = at_par(BaseStats::uniform(20));
        stats.endure(30, false);
        assert_eq!(stats.damage(), 10);
        assert_eq!(stats.heal(25), 10);
        assert_eq!(stats.hp(), stats.max_hp());
    }

    #[test]
    fn test_threshold_formula() {
        let stats = Stats::new(BaseStats::uniform(10), 1, StatsConfig::default());
        // ceil(1^1.5 * 60 * 0.1) = 6, ceil(2^1.5 * 60 * 0.1) = 17
        assert_eq!(stats.threshold(1), Some(6));
        assert_eq!(stats.threshold(2), Some(17));
        assert_eq!(stats.threshold(100), None);
    }

    #[test]
    fn test_gain_exp_zero_is_noop() {
        let mut stats = Stats::new(BaseStats::uniform(10), 3, StatsConfig::default());
        let gain = stats.gain_exp(0);
        assert!(!gain.leveled_up());
        assert_eq!(gain.applied, 0);
        assert_eq!(stats.level(), 3);
        assert_eq!(stats.experience(), 0);
    }

    #[test]
    fn test_gain_exp_crosses_several_levels() {
        let mut stats = Stats::new(BaseStats::uniform(10), 1, StatsConfig::default());
        let needed: u32 = (1..=3).filter_map(|lvl| stats.threshold(lvl)).sum();

        let gain = stats.gain_exp(needed + 2);
        assert_eq!(gain.levels, vec![2, 3, 4]);
        assert_eq!(gain.applied, needed + 2);
        assert_eq!(stats.level(), 4);
        assert_eq!(stats.experience(), 2);
    }

    #[test]
    fn test_gain_exp_stops_at_cap() {
        let config = StatsConfig {
            max_level: 3,
            ..StatsConfig::default()
        };
        let mut stats = Stats::new(BaseStats::uniform(10), 2, config);
        let gain = stats.gain_exp(1_000);
        assert_eq!(gain.levels, vec![3]);
        assert_eq!(gain.applied, 17);
        assert_eq!(stats.experience(), 0);

        let gain = stats.gain_exp(50);
        assert_eq!(gain, ExpGain::default());
    }

    #[test]
    fn test_modifiers_apply_and_expire() {
        let mut stats = at_par(BaseStats::uniform(10));
        stats.modify(ActiveModifier::new(StatKey::Atk, ModifierEffect::Add(5), 1));
        stats.modify(ActiveModifier::new(StatKey::Def, ModifierEffect::Scale(0.5), 2));
        assert_eq!(stats.attack(), 15);
        assert_eq!(stats.defense(), 5);

        stats.expire_modifiers();
        assert_eq!(stats.attack(), 10);
        assert_eq!(stats.defense(), 5);

        stats.expire_modifiers();
        assert_eq!(stats.defense(), 10);
        assert_eq!(stats.modifiers().count(), 0);
    }

    #[test]
    fn test_negative_modifier_clamps_to_zero() {
        let mut stats = at_par(BaseStats::uniform(4));
        stats.modify(ActiveModifier::new(StatKey::Def, ModifierEffect::Add(-10), 3));
        assert_eq!(stats.defense(), 0);
    }

    #[test]
    fn test_setters_reject_out_of_range() {
        let mut stats = Stats::new(BaseStats::uniform(100), 1, StatsConfig::default());
        assert!(stats.set_level(0).is_err());
        assert!(stats.set_level(101).is_err());
        assert!(stats.set_level(2).is_ok());

        // ceil(2^1.5 * 600 * 0.1) = 170
        assert!(matches!(
            stats.set_experience(170),
            Err(BattleError::InvalidInput { field: "experience", .. })
        ));
        assert!(stats.set_experience(169).is_ok());

        assert_eq!(stats.max_hp(), 4);
        assert!(stats.set_damage(5).is_err());
        assert!(stats.set_damage(1).is_ok());
        assert_eq!(stats.hp(), 3);
    }

    proptest! {
        #[test]
        fn prop_endure_applies_at_least_one(
            raw in 0u32..500,
            def in 0u32..500,
            level in 1u32..=100,
        ) {
            let mut stats = Stats::new(
                BaseStats { hp: 100, def, ..BaseStats::default() },
                level,
                StatsConfig::default(),
            );
            let before = stats.damage();
            let applied = stats.endure(raw, false);
            prop_assert!(applied >= 1);
            prop_assert_eq!(stats.damage(), (before + applied).min(stats.max_hp()));
        }

        #[test]
        fn prop_levels_reported_ascending(
            base in 1u32..60,
            level in 1u32..20,
            points in 0u32..5_000,
        ) {
            let mut stats = Stats::new(BaseStats::uniform(base), level, StatsConfig::default());
            let gain = stats.gain_exp(points);
            let mut expected = level;
            for reached in &gain.levels {
                expected += 1;
                prop_assert_eq!(*reached, expected);
            }
            prop_assert_eq!(stats.level(), expected);
            if let Some(threshold) = stats.next_threshold() {
                prop_assert!(stats.experience() < threshold);
            }
        }
    }
}
