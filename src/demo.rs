//! Built-in manifest used when no manifest path is given.

use sf_core::{
    DeathBehavior, DropTableId, ItemCategory, Movement, PowerupKind, Template, TemplateFlags,
    TemplateId,
};
use sf_loot::{CooldownScope, DropEntry, DropTable};
use sf_persistence::SpawnerManifest;
use sf_spawn::{PatternEntry, SpawnPattern, SpawnerConfig};

pub const APPLE: TemplateId = TemplateId(1);
pub const AMMO: TemplateId = TemplateId(2);
pub const MAGNET: TemplateId = TemplateId(3);
pub const HEALTH: TemplateId = TemplateId(6);

pub fn demo_manifest() -> SpawnerManifest {
    let templates = vec![
        Template::new(1, "Apple", 6.0, ItemCategory::Collectible).with_pool_size(16),
        Template::new(2, "Ammo Box", 2.0, ItemCategory::Ammo),
        Template {
            powerup: PowerupKind::Magnet,
            duration: 6.0,
            ..Template::new(3, "Magnet", 0.4, ItemCategory::PowerUp)
                .with_flags(TemplateFlags::UNIQUE_ON_SCREEN)
        },
        Template::new(4, "Bomb", 1.5, ItemCategory::Hazard)
            .with_same_kind_radius(1.5)
            .with_flags(TemplateFlags::AVOID_ALL_OVERLAP),
        Template::new(5, "Crate", 1.0, ItemCategory::Hazard)
            .with_pool_size(4)
            .with_movement(Movement::Descend { speed: 0.5 })
            .with_death(DeathBehavior::DropLoot {
                table: DropTableId::new("crate"),
            }),
        Template {
            value: 25.0,
            ..Template::new(6, "Medkit", 0.0, ItemCategory::Health)
                .with_flags(TemplateFlags::UNIQUE_ON_SCREEN | TemplateFlags::AUTO_DESPAWN)
        },
    ];

    let crate_table = DropTable::new(
        "crate",
        0.8,
        vec![
            DropEntry::singleton(HEALTH, 1.0).with_cooldown(8.0),
            DropEntry::singleton(MAGNET, 0.5).with_cooldown(15.0),
            DropEntry::flexible(APPLE, 3.0, 2, 4),
            DropEntry::flexible(AMMO, 1.0, 1, 2).with_cooldown(2.0),
        ],
    )
    .with_scope(CooldownScope::Global);

    let apple_line = SpawnPattern {
        name: "apple line".into(),
        weight: 3.0,
        vertical_extent: 3.0,
        lanes: 1,
        x_jitter: Some(0.2),
        y_jitter: None,
        entries: (0..4)
            .map(|i| PatternEntry {
                template: APPLE,
                lane: 0,
                y_offset: i as f64 * 0.7,
            })
            .collect(),
    };
    let ammo_fork = SpawnPattern {
        name: "ammo fork".into(),
        weight: 1.0,
        vertical_extent: 2.5,
        lanes: 3,
        x_jitter: None,
        y_jitter: Some(0.1),
        entries: vec![
            PatternEntry {
                template: AMMO,
                lane: 0,
                y_offset: 1.0,
            },
            PatternEntry {
                template: APPLE,
                lane: 1,
                y_offset: 0.0,
            },
            PatternEntry {
                template: AMMO,
                lane: 2,
                y_offset: 1.0,
            },
        ],
    };

    SpawnerManifest {
        name: "Demo Run".into(),
        config: SpawnerConfig {
            seed: Some(2024),
            no_overlap: true,
            ..Default::default()
        },
        templates,
        drop_tables: vec![crate_table],
        patterns: vec![apple_line, ammo_fork],
    }
}
