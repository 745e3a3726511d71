use serde::{Deserialize, Serialize};
use sf_core::{DropTableId, TemplateCatalog, TemplateId};
use sf_loot::LootTables;

use crate::pattern::SpawnPattern;

/// How the frontier is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpawnMode {
    /// One weighted template per row, rows `spawn_interval` apart.
    #[default]
    Dynamic,
    /// One weighted pattern per step, advancing by the pattern's extent.
    Patterns,
}

/// Error type for spawner configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { field: &'static str, value: f64 },
    /// Overlap queries only look one cell away, so cells must be at least as
    /// wide as the largest distance queried.
    CellTooSmall { cell_size: f64, min_distance: f64 },
    NoPatterns,
    UnknownTemplate { context: String, template: TemplateId },
    UnknownDropTable { template: TemplateId, table: DropTableId },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, value } => write!(f, "invalid {}: {}", field, value),
            Self::CellTooSmall {
                cell_size,
                min_distance,
            } => write!(
                f,
                "grid cell size {} is smaller than overlap distance {}",
                cell_size, min_distance
            ),
            Self::NoPatterns => write!(f, "pattern mode requires at least one spawn pattern"),
            Self::UnknownTemplate { context, template } => {
                write!(f, "{} references unknown {}", context, template)
            }
            Self::UnknownDropTable { template, table } => {
                write!(f, "{} drops from unknown table '{}'", template, table)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables of the spawn orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub mode: SpawnMode,
    /// Total width of the track used for lateral placement.
    pub track_width: f64,
    /// How far ahead of the reference the frontier is kept.
    pub lead_distance: f64,
    /// Row spacing in dynamic mode.
    pub spawn_interval: f64,
    /// Margin keeping instances off the track edges.
    pub clip_margin: f64,
    /// Every template keeps `min_overlap_distance` from every active instance.
    pub no_overlap: bool,
    pub min_overlap_distance: f64,
    pub grid_cell_size: f64,
    pub max_active: usize,
    /// Advance without spawning while `max_active` instances are alive.
    pub limit_when_full: bool,
    /// Chance that a row is left empty on purpose.
    pub skip_chance: f64,
    /// Lateral positions tried before a row is abandoned.
    pub placement_attempts: u32,
    /// How far behind the reference an instance falls before it is recycled.
    pub trailing_distance: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Radius around a destroyed instance in which its drops are placed.
    pub drop_scatter: f64,
    pub max_drops_per_trigger: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            mode: SpawnMode::Dynamic,
            track_width: 5.0,
            lead_distance: 10.0,
            spawn_interval: 0.5,
            clip_margin: 0.2,
            no_overlap: false,
            min_overlap_distance: 0.8,
            grid_cell_size: 2.0,
            max_active: 25,
            limit_when_full: true,
            skip_chance: 0.2,
            placement_attempts: 5,
            trailing_distance: 10.0,
            seed: None,
            drop_scatter: 0.4,
            max_drops_per_trigger: 10,
        }
    }
}

fn require(field: &'static str, value: f64, ok: bool) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

impl SpawnerConfig {
    /// Check ranges and the cell-size precondition against `catalog`.
    pub fn validate(&self, catalog: &TemplateCatalog) -> Result<(), ConfigError> {
        require("track_width", self.track_width, self.track_width > 0.0)?;
        require("lead_distance", self.lead_distance, self.lead_distance >= 0.0)?;
        require("spawn_interval", self.spawn_interval, self.spawn_interval > 0.0)?;
        require("clip_margin", self.clip_margin, self.clip_margin >= 0.0)?;
        require(
            "min_overlap_distance",
            self.min_overlap_distance,
            self.min_overlap_distance >= 0.0,
        )?;
        require("grid_cell_size", self.grid_cell_size, self.grid_cell_size > 0.0)?;
        require(
            "skip_chance",
            self.skip_chance,
            (0.0..=1.0).contains(&self.skip_chance),
        )?;
        require(
            "trailing_distance",
            self.trailing_distance,
            self.trailing_distance >= 0.0,
        )?;
        require("drop_scatter", self.drop_scatter, self.drop_scatter >= 0.0)?;

        for template in catalog.templates() {
            if let Some(radius) = template.same_kind_radius {
                require("same_kind_radius", radius, radius >= 0.0)?;
            }
        }

        let global_in_use =
            self.no_overlap || catalog.templates().iter().any(|t| t.avoids_all_overlap());
        let mut min_distance = catalog.max_same_kind_radius();
        if global_in_use {
            min_distance = min_distance.max(self.min_overlap_distance);
        }
        if self.grid_cell_size < min_distance {
            return Err(ConfigError::CellTooSmall {
                cell_size: self.grid_cell_size,
                min_distance,
            });
        }
        Ok(())
    }

    /// Lateral bounds available for placement.
    pub fn lateral_bounds(&self) -> (f64, f64) {
        let half = self.track_width / 2.0;
        (-half + self.clip_margin, half - self.clip_margin)
    }
}

/// Check that patterns, drop tables and death behaviours only name known things.
pub fn validate_references(
    config: &SpawnerConfig,
    catalog: &TemplateCatalog,
    patterns: &[SpawnPattern],
    loot: &LootTables,
) -> Result<(), ConfigError> {
    if config.mode == SpawnMode::Patterns && patterns.is_empty() {
        return Err(ConfigError::NoPatterns);
    }
    for pattern in patterns {
        pattern.validate(catalog)?;
    }
    for table in loot.tables() {
        for template in table.templates() {
            if !catalog.contains(template) {
                return Err(ConfigError::UnknownTemplate {
                    context: format!("drop table '{}'", table.id),
                    template,
                });
            }
        }
    }
    for template in catalog.templates() {
        if let Some(table) = template.death.drop_table() {
            if loot.get(table).is_none() {
                return Err(ConfigError::UnknownDropTable {
                    template: template.id,
                    table: table.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::{DeathBehavior, ItemCategory, Template, TemplateFlags};
    use sf_loot::{DropEntry, DropTable};

    fn catalog(templates: Vec<Template>) -> TemplateCatalog {
        TemplateCatalog::new(templates).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let catalog = catalog(vec![Template::new(1, "Apple", 1.0, ItemCategory::Collectible)]);
        assert!(SpawnerConfig::default().validate(&catalog).is_ok());
    }

    #[test]
    fn cell_smaller_than_same_kind_radius_is_rejected() {
        let catalog = catalog(vec![
            Template::new(1, "Bomb", 1.0, ItemCategory::Hazard).with_same_kind_radius(3.0),
        ]);
        let err = SpawnerConfig::default().validate(&catalog).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CellTooSmall {
                cell_size: 2.0,
                min_distance: 3.0
            }
        );
    }

    #[test]
    fn global_distance_only_counts_when_used() {
        let catalog = catalog(vec![Template::new(1, "Apple", 1.0, ItemCategory::Collectible)]);
        let config = SpawnerConfig {
            min_overlap_distance: 4.0,
            ..Default::default()
        };
        assert!(config.validate(&catalog).is_ok());

        let config = SpawnerConfig {
            no_overlap: true,
            ..config
        };
        assert!(matches!(
            config.validate(&catalog),
            Err(ConfigError::CellTooSmall { .. })
        ));

        let flagged = TemplateCatalog::new(vec![Template::new(1, "Rock", 1.0, ItemCategory::Hazard)
            .with_flags(TemplateFlags::AVOID_ALL_OVERLAP)])
        .unwrap();
        let config = SpawnerConfig {
            min_overlap_distance: 4.0,
            ..Default::default()
        };
        assert!(config.validate(&flagged).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let catalog = catalog(vec![]);
        let bad_interval = SpawnerConfig {
            spawn_interval: 0.0,
            ..Default::default()
        };
        assert_eq!(
            bad_interval.validate(&catalog),
            Err(ConfigError::InvalidValue {
                field: "spawn_interval",
                value: 0.0
            })
        );

        let bad_skip = SpawnerConfig {
            skip_chance: 1.5,
            ..Default::default()
        };
        assert!(bad_skip.validate(&catalog).is_err());
    }

    #[test]
    fn references_must_resolve() {
        let catalog = catalog(vec![Template::new(1, "Crate", 1.0, ItemCategory::Hazard)
            .with_death(DeathBehavior::DropLoot {
                table: DropTableId::new("crate"),
            })]);
        let config = SpawnerConfig::default();

        let missing_table = LootTables::default();
        assert!(matches!(
            validate_references(&config, &catalog, &[], &missing_table),
            Err(ConfigError::UnknownDropTable { .. })
        ));

        let bad_entry = LootTables::new([DropTable::new(
            "crate",
            1.0,
            vec![DropEntry::singleton(TemplateId(99), 1.0)],
        )])
        .unwrap();
        assert!(matches!(
            validate_references(&config, &catalog, &[], &bad_entry),
            Err(ConfigError::UnknownTemplate { .. })
        ));

        let good = LootTables::new([DropTable::new(
            "crate",
            1.0,
            vec![DropEntry::singleton(TemplateId(1), 1.0)],
        )])
        .unwrap();
        assert!(validate_references(&config, &catalog, &[], &good).is_ok());

        let pattern_mode = SpawnerConfig {
            mode: SpawnMode::Patterns,
            ..Default::default()
        };
        assert_eq!(
            validate_references(&pattern_mode, &catalog, &[], &good),
            Err(ConfigError::NoPatterns)
        );
    }
}
