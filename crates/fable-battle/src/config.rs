//! Battle tunables.

use fable_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::stats::StatsConfig;

/// Timing and layout parameters of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    // === Timing ===
    /// Length of the entrance step in seconds
    pub intro_duration: f32,
    /// Length of a lunge or retreat in seconds
    pub step_duration: f32,
    /// How long a caption stays up in seconds
    pub caption_duration: f32,

    // === Layout ===
    /// Horizontal spacing between members of a team
    pub member_stride: f32,
    /// Distance a lunging actor stops short of its target
    pub lunge_gap: f32,
    /// Where the hero leader stands
    pub hero_origin: Vec2,
    /// Where the foe leader stands
    pub foe_origin: Vec2,

    // === Progression ===
    /// Stat scaling and leveling
    pub stats: StatsConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            intro_duration: 1.0,
            step_duration: 0.25,
            caption_duration: 1.5,

            member_stride: 24.0,
            lunge_gap: 16.0,
            hero_origin: Vec2::new(64.0, 120.0),
            foe_origin: Vec2::new(192.0, 120.0),

            stats: StatsConfig::default(),
        }
    }
}

impl BattleConfig {
    /// Clamps values to sensible ranges.
    pub fn validate(&mut self) {
        self.intro_duration = self.intro_duration.clamp(0.0, 10.0);
        self.step_duration = self.step_duration.clamp(0.0, 5.0);
        self.caption_duration = self.caption_duration.clamp(0.0, 10.0);
        self.member_stride = self.member_stride.clamp(0.0, 256.0);
        self.lunge_gap = self.lunge_gap.clamp(0.0, 256.0);

        self.stats.multiplier = self.stats.multiplier.clamp(0.1, 100.0);
        self.stats.exp_constant = self.stats.exp_constant.clamp(0.001, 100.0);
        self.stats.max_level = self.stats.max_level.clamp(1, 999);
    }

    /// A config with every duration at zero, for headless runs and tests.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            intro_duration: 0.0,
            step_duration: 0.0,
            caption_duration: 0.0,
            ..Self::default()
        }
    }
}
