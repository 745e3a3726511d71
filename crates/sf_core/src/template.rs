//! Read-only descriptors of spawnable kinds.
//!
//! A [`Template`] is loaded once at startup. Behaviour that used to live in
//! per-kind subclasses is expressed as data: a [`Movement`] variant and a
//! [`DeathBehavior`] variant chosen per template.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::coords::WorldPos;
use crate::ids::{DropTableId, TemplateId};

/// Primary category of a template, used by collision and scoring collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemCategory {
    /// Adds score or meter (fruit).
    #[default]
    Collectible,
    /// Adds ammunition.
    Ammo,
    /// Grants a timed effect.
    PowerUp,
    /// Damages or penalises on contact.
    Hazard,
    /// Restores health.
    Health,
}

/// Effect granted by a power-up template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PowerupKind {
    #[default]
    None,
    Magnet,
    Rush,
    Shield,
    WeaponUpgrade,
}

bitflags! {
    /// Behaviour switches of a template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TemplateFlags: u8 {
        /// At most one active instance of this template at a time.
        const UNIQUE_ON_SCREEN = 1 << 0;
        /// Can be pulled by a magnet.
        const ATTRACTABLE = 1 << 1;
        /// Collecting it counts towards score combos.
        const COMBO_ELIGIBLE = 1 << 2;
        /// Expires after `duration` seconds even when not collected.
        const AUTO_DESPAWN = 1 << 3;
        /// Always keeps the spawner's global minimum distance from every active instance.
        const AVOID_ALL_OVERLAP = 1 << 4;
    }
}

impl Default for TemplateFlags {
    fn default() -> Self {
        Self::ATTRACTABLE | Self::COMBO_ELIGIBLE
    }
}

/// Triangular attraction area in front of the magnet holder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetParams {
    /// Units per second towards the holder once locked on.
    pub pull_speed: f64,
    /// Height of the triangle along the holder's forward axis.
    pub range: f64,
    /// Width of the triangle at its far edge.
    pub base_width: f64,
}

impl Default for MagnetParams {
    fn default() -> Self {
        Self {
            pull_speed: 15.0,
            range: 5.0,
            base_width: 6.0,
        }
    }
}

impl MagnetParams {
    /// Whether `item` lies inside the triangle whose tip is `head`, opening along `forward`.
    ///
    /// `forward` must be a unit vector.
    pub fn contains(&self, item: WorldPos, head: WorldPos, forward: WorldPos) -> bool {
        if self.range <= 0.0 {
            return false;
        }
        let to_item = item.sub(head);
        let right = WorldPos::new(forward.y, -forward.x);

        let forward_dist = to_item.dot(forward);
        if forward_dist < 0.0 || forward_dist > self.range {
            return false;
        }

        let half_width = (forward_dist / self.range) * (self.base_width / 2.0);
        to_item.dot(right).abs() <= half_width
    }
}

/// Per-tick motion of an active instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Movement {
    #[default]
    Static,
    /// Moves against the scroll direction at `speed` units per second.
    Descend { speed: f64 },
}

impl Movement {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static)
    }

    pub fn step(&self, pos: WorldPos, dt: f64) -> WorldPos {
        match *self {
            Self::Static => pos,
            Self::Descend { speed } => pos.offset(0.0, -speed * dt),
        }
    }
}

/// What happens when an instance is destroyed (as opposed to collected or expired).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeathBehavior {
    #[default]
    Vanish,
    /// Roll the named drop table at the point of destruction.
    DropLoot { table: DropTableId },
}

impl DeathBehavior {
    pub fn drop_table(&self) -> Option<&DropTableId> {
        match self {
            Self::Vanish => None,
            Self::DropLoot { table } => Some(table),
        }
    }
}

/// Immutable descriptor of a spawnable kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    /// Spawn likelihood relative to the other templates of the catalog.
    pub weight: f64,
    pub category: ItemCategory,
    pub powerup: PowerupKind,
    /// Primary value (meter fill, ammo added, damage dealt).
    pub value: f64,
    /// Secondary value (slow amount, shield strength).
    pub secondary_value: f64,
    /// Effect duration in seconds; also the lifetime when auto-despawn is set.
    pub duration: f64,
    /// Instances created up front for this template.
    pub pool_size: usize,
    pub flags: TemplateFlags,
    /// Minimum distance from other instances of this same template, if enforced.
    pub same_kind_radius: Option<f64>,
    pub magnet: MagnetParams,
    pub movement: Movement,
    pub death: DeathBehavior,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            id: TemplateId::default(),
            name: String::new(),
            weight: 1.0,
            category: ItemCategory::default(),
            powerup: PowerupKind::default(),
            value: 1.0,
            secondary_value: 0.0,
            duration: 5.0,
            pool_size: 10,
            flags: TemplateFlags::default(),
            same_kind_radius: None,
            magnet: MagnetParams::default(),
            movement: Movement::default(),
            death: DeathBehavior::default(),
        }
    }
}

impl Template {
    pub fn new(id: u32, name: impl Into<String>, weight: f64, category: ItemCategory) -> Self {
        Self {
            id: TemplateId(id),
            name: name.into(),
            weight,
            category,
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_flags(mut self, flags: TemplateFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_same_kind_radius(mut self, radius: f64) -> Self {
        self.same_kind_radius = Some(radius);
        self
    }

    pub fn with_movement(mut self, movement: Movement) -> Self {
        self.movement = movement;
        self
    }

    pub fn with_death(mut self, death: DeathBehavior) -> Self {
        self.death = death;
        self
    }

    pub fn is_unique_on_screen(&self) -> bool {
        self.flags.contains(TemplateFlags::UNIQUE_ON_SCREEN)
    }

    pub fn is_attractable(&self) -> bool {
        self.flags.contains(TemplateFlags::ATTRACTABLE)
    }

    pub fn auto_despawns(&self) -> bool {
        self.flags.contains(TemplateFlags::AUTO_DESPAWN)
    }

    pub fn avoids_all_overlap(&self) -> bool {
        self.flags.contains(TemplateFlags::AVOID_ALL_OVERLAP)
    }
}
