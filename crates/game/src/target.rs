//! Target kinds and the per-target component stored in the manager's world.

use audio::SoundId;
use engine_core::{Vec3, VisualHandle};
use physics::RigidBodyHandle;

/// Unscaled half extents of a target board (0.6 × 1.2 × 0.3 m).
pub const TARGET_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.6, 0.15);
/// Mass per unit of scale before the kind's multiplier.
pub const TARGET_BASE_MASS: f32 = 1.5;

/// Stable id of a live target. Never reused within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// The four boards the range can put up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Plain red board.
    Standard,
    /// Small, fast-tumbling gold board worth triple.
    Bonus,
    /// Green board that costs points and health when hit.
    Penalty,
    /// Wooden cover that soaks three hits and lets shots through.
    Cover,
}

impl TargetKind {
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Standard,
        TargetKind::Bonus,
        TargetKind::Penalty,
        TargetKind::Cover,
    ];

    pub fn points(self) -> i64 {
        match self {
            TargetKind::Standard => 10,
            TargetKind::Bonus => 30,
            TargetKind::Penalty => -20,
            TargetKind::Cover => 5,
        }
    }

    /// 0xRRGGBB
    pub fn color(self) -> u32 {
        match self {
            TargetKind::Standard => 0xff4444,
            TargetKind::Bonus => 0xffd700,
            TargetKind::Penalty => 0x44ff44,
            TargetKind::Cover => 0xcd853f,
        }
    }

    pub fn scale(self) -> f32 {
        match self {
            TargetKind::Standard => 1.0,
            TargetKind::Bonus => 0.7,
            TargetKind::Penalty => 1.1,
            TargetKind::Cover => 1.4,
        }
    }

    /// Hits needed to destroy.
    pub fn health(self) -> u32 {
        match self {
            TargetKind::Cover => 3,
            _ => 1,
        }
    }

    /// Whether a shot keeps going after damaging (but not destroying) it.
    pub fn penetrable(self) -> bool {
        matches!(self, TargetKind::Cover)
    }

    pub fn mass_multiplier(self) -> f32 {
        match self {
            TargetKind::Standard => 1.0,
            TargetKind::Bonus => 0.8,
            TargetKind::Penalty => 1.2,
            TargetKind::Cover => 2.0,
        }
    }

    pub fn hit_sound(self) -> SoundId {
        match self {
            TargetKind::Standard => SoundId::HitStandard,
            TargetKind::Bonus => SoundId::HitBonus,
            TargetKind::Penalty => SoundId::HitPenalty,
            TargetKind::Cover => SoundId::HitWood,
        }
    }

    pub fn half_extents(self) -> Vec3 {
        TARGET_HALF_EXTENTS * self.scale()
    }

    pub fn mass(self) -> f32 {
        self.mass_multiplier() * self.scale() * TARGET_BASE_MASS
    }

    pub fn is_penalty(self) -> bool {
        self.points() < 0
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetKind::Standard => "standard",
            TargetKind::Bonus => "bonus",
            TargetKind::Penalty => "penalty",
            TargetKind::Cover => "cover",
        }
    }
}

/// Component for a live target. Bodies and visuals point back to it only by id.
#[derive(Debug, Clone, Copy)]
pub struct TargetEntity {
    pub id: TargetId,
    pub kind: TargetKind,
    /// 1..=kind.health() while live.
    pub health: u32,
    pub body: RigidBodyHandle,
    pub visual: VisualHandle,
}
