//! Collision groups, surface materials and body tags.

use engine_core::VisualHandle;
use rapier3d::prelude::*;

/// Collision groups for the range's body roles.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (ground, walls, obstacles)
    Environment = 1 << 0,
    /// Player character
    Player = 1 << 1,
    /// Shootable targets
    Target = 1 << 2,
}

impl CollisionGroup {
    /// Create a collision group for environment.
    pub fn environment() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Environment as u32);
        let filter = Group::ALL;
        (membership, filter)
    }

    /// Create a collision group for player.
    pub fn player() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Player as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32 | Self::Target as u32);
        (membership, filter)
    }

    /// Create a collision group for targets. Targets bump into each other.
    pub fn target() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Target as u32);
        let filter = Group::from_bits_retain(
            Self::Environment as u32 | Self::Player as u32 | Self::Target as u32,
        );
        (membership, filter)
    }

    pub fn interaction_groups(self) -> InteractionGroups {
        let (membership, filter) = match self {
            Self::Environment => Self::environment(),
            Self::Player => Self::player(),
            Self::Target => Self::target(),
        };
        InteractionGroups::new(membership, filter)
    }
}

/// Surface material of a collider. Friction and restitution are combined
/// pairwise by rapier's combine rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialTag {
    #[default]
    Default,
    /// Low friction so the player slides along walls instead of sticking.
    Player,
    Target,
    Ground,
}

impl MaterialTag {
    pub fn friction(self) -> f32 {
        match self {
            Self::Default => 0.3,
            Self::Player => 0.2,
            Self::Target | Self::Ground => 0.6,
        }
    }

    pub fn restitution(self) -> f32 {
        match self {
            Self::Default => 0.2,
            Self::Player => 0.1,
            Self::Target | Self::Ground => 0.3,
        }
    }

    /// The player takes the smaller coefficient of any pair; everything else averages.
    pub fn combine_rule(self) -> CoefficientCombineRule {
        match self {
            Self::Player => CoefficientCombineRule::Min,
            _ => CoefficientCombineRule::Average,
        }
    }
}

/// Weak back-reference from a rigid body to its owner, stored in the body's
/// `user_data`. Never authoritative: owners resolve it through their own maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Environment,
    Player,
    /// Id of the owning target entity.
    Target(u64),
}

const KIND_SHIFT: u32 = 120;
const VISUAL_SHIFT: u32 = 64;
const VISUAL_MASK: u128 = (1u128 << 56) - 1;

/// Pack the tag and an optional visual handle into rapier's 128-bit user data.
///
/// Layout: bits 0..64 target id, bits 64..120 visual handle + 1 (0 = none),
/// bits 120..128 tag kind.
pub fn encode_user_data(tag: BodyTag, visual: Option<VisualHandle>) -> u128 {
    let (kind, payload) = match tag {
        BodyTag::Environment => (0u128, 0u128),
        BodyTag::Player => (1, 0),
        BodyTag::Target(id) => (2, id as u128),
    };
    let visual = visual
        .map(|v| ((v.0 as u128) + 1) & VISUAL_MASK)
        .unwrap_or(0);
    (kind << KIND_SHIFT) | (visual << VISUAL_SHIFT) | payload
}

/// Inverse of [`encode_user_data`]. Unknown kinds read back as environment.
pub fn decode_user_data(data: u128) -> (BodyTag, Option<VisualHandle>) {
    let payload = data as u64;
    let visual = (data >> VISUAL_SHIFT) & VISUAL_MASK;
    let tag = match data >> KIND_SHIFT {
        1 => BodyTag::Player,
        2 => BodyTag::Target(payload),
        _ => BodyTag::Environment,
    };
    let visual = (visual != 0).then(|| VisualHandle((visual - 1) as u64));
    (tag, visual)
}
