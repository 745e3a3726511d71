//! Two-phase weighted loot resolution.
//!
//! A trigger first rolls the table's overall chance. Singleton entries (one
//! unit, min = max = 1) then compete in a single weighted draw; a hit returns
//! that one item immediately. Only when no singleton is emitted do flexible
//! entries (max > 1) each roll independently for a batch.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sf_core::{select_weighted, total_weight, DropTableId, TemplateId};

use crate::cooldown::{CooldownRegistry, CooldownScope};

/// Error type for drop table validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DropTableError {
    InvalidChance { table: DropTableId, chance: f64 },
    InvalidWeight { table: DropTableId, template: TemplateId },
    ZeroMinCount { table: DropTableId, template: TemplateId },
    InvertedRange { table: DropTableId, template: TemplateId },
    InvalidCooldown { table: DropTableId, template: TemplateId },
}

impl std::fmt::Display for DropTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChance { table, chance } => {
                write!(f, "table '{}': overall chance {} is outside [0, 1]", table, chance)
            }
            Self::InvalidWeight { table, template } => {
                write!(f, "table '{}': {} has an invalid weight", table, template)
            }
            Self::ZeroMinCount { table, template } => {
                write!(f, "table '{}': {} has a minimum count of 0", table, template)
            }
            Self::InvertedRange { table, template } => {
                write!(f, "table '{}': {} has max count below min count", table, template)
            }
            Self::InvalidCooldown { table, template } => {
                write!(f, "table '{}': {} has an invalid cooldown", table, template)
            }
        }
    }
}

impl std::error::Error for DropTableError {}

/// Phase an entry competes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    Singleton,
    Flexible,
}

/// One possible reward of a drop table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEntry {
    pub template: TemplateId,
    /// Relative likelihood against the other entries of the same phase.
    pub weight: f64,
    pub min_count: u32,
    pub max_count: u32,
    /// Seconds before this template may drop again; zero disables the cooldown.
    #[serde(default)]
    pub cooldown: f64,
}

impl DropEntry {
    pub fn singleton(template: TemplateId, weight: f64) -> Self {
        Self {
            template,
            weight,
            min_count: 1,
            max_count: 1,
            cooldown: 0.0,
        }
    }

    pub fn flexible(template: TemplateId, weight: f64, min_count: u32, max_count: u32) -> Self {
        Self {
            template,
            weight,
            min_count,
            max_count,
            cooldown: 0.0,
        }
    }

    pub fn with_cooldown(mut self, seconds: f64) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn kind(&self) -> Option<DropKind> {
        if self.min_count == 1 && self.max_count == 1 {
            Some(DropKind::Singleton)
        } else if self.max_count > 1 {
            Some(DropKind::Flexible)
        } else {
            None
        }
    }
}

/// A loot configuration rolled when an entity is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTable {
    pub id: DropTableId,
    /// Probability in [0, 1] that a trigger drops anything at all.
    pub overall_chance: f64,
    pub entries: Vec<DropEntry>,
    #[serde(default)]
    pub scope: CooldownScope,
}

impl DropTable {
    pub fn new(id: impl Into<String>, overall_chance: f64, entries: Vec<DropEntry>) -> Self {
        Self {
            id: DropTableId::new(id),
            overall_chance,
            entries,
            scope: CooldownScope::default(),
        }
    }

    pub fn with_scope(mut self, scope: CooldownScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn validate(&self) -> Result<(), DropTableError> {
        if !(0.0..=1.0).contains(&self.overall_chance) {
            return Err(DropTableError::InvalidChance {
                table: self.id.clone(),
                chance: self.overall_chance,
            });
        }
        for entry in &self.entries {
            let table = self.id.clone();
            let template = entry.template;
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(DropTableError::InvalidWeight { table, template });
            }
            if entry.min_count == 0 {
                return Err(DropTableError::ZeroMinCount { table, template });
            }
            if entry.max_count < entry.min_count {
                return Err(DropTableError::InvertedRange { table, template });
            }
            if !entry.cooldown.is_finite() || entry.cooldown < 0.0 {
                return Err(DropTableError::InvalidCooldown { table, template });
            }
        }
        Ok(())
    }

    /// Templates referenced by any entry.
    pub fn templates(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.entries.iter().map(|e| e.template)
    }

    fn eligible(&self, kind: DropKind, now: f64, cooldowns: &CooldownRegistry) -> Vec<&DropEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind() == Some(kind))
            .filter(|e| e.cooldown <= 0.0 || cooldowns.is_ready(e.template, now))
            .collect()
    }

    /// Resolve one trigger into a list of templates, one element per dropped unit.
    ///
    /// Cooldowns are read and armed in `cooldowns` at time `now`. A cap of
    /// zero drops nothing.
    pub fn roll_drops(
        &self,
        max_total_drops: usize,
        now: f64,
        cooldowns: &mut CooldownRegistry,
        rng: &mut impl Rng,
    ) -> Vec<TemplateId> {
        let mut drops = Vec::new();
        if self.entries.is_empty() || max_total_drops == 0 {
            return drops;
        }
        if rng.gen::<f64>() >= self.overall_chance {
            return drops;
        }

        let singletons = self.eligible(DropKind::Singleton, now, cooldowns);
        if !singletons.is_empty() {
            // Floored so a handful of rare entries can still come up empty.
            let total = total_weight(&singletons, |e| e.weight).max(1.0);
            if let Some(entry) = select_weighted(&singletons, total, |e| e.weight, rng) {
                cooldowns.arm(entry.template, now, entry.cooldown);
                drops.push(entry.template);
                return drops;
            }
        }

        let flexible = self.eligible(DropKind::Flexible, now, cooldowns);
        let total = total_weight(&flexible, |e| e.weight);
        if total <= 0.0 {
            return drops;
        }

        for entry in flexible {
            let room = max_total_drops - drops.len();
            if room == 0 {
                break;
            }
            if rng.gen::<f64>() >= entry.weight / total {
                continue;
            }

            let count = rng.gen_range(entry.min_count..=entry.max_count) as usize;
            drops.extend(std::iter::repeat(entry.template).take(count.min(room)));
            cooldowns.arm(entry.template, now, entry.cooldown);
        }

        drops
    }
}
