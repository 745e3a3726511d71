use std::collections::HashMap;

use bevy::prelude::*;
use sf_core::{InstanceHandle, SimClock, TemplateId, WorldPos};
use sf_loot::LootTables;

use crate::spawner::Spawner;

/// Marks the entity whose position drives the frontier.
#[derive(Component, Debug, Default)]
pub struct SpawnReference;

/// Mirror entity of one active pooled instance.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedInstance {
    pub handle: InstanceHandle,
}

/// Whether the magnet power-up is currently running.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct MagnetState {
    pub active: bool,
}

/// Mirror entities keyed by instance handle.
#[derive(Resource, Debug, Default)]
pub struct InstanceEntities {
    entities: HashMap<InstanceHandle, Entity>,
}

impl InstanceEntities {
    pub fn get(&self, handle: InstanceHandle) -> Option<Entity> {
        self.entities.get(&handle).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct InstanceSpawned {
    pub handle: InstanceHandle,
    pub position: WorldPos,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct InstanceExpired {
    pub handle: InstanceHandle,
}

/// Sent by collaborators when an instance is destroyed (shot, exploded).
#[derive(Event, Debug, Clone, Copy)]
pub struct InstanceDestroyed {
    pub handle: InstanceHandle,
}

/// Sent by collaborators when a hit knocks loot off an instance that survives.
#[derive(Event, Debug, Clone, Copy)]
pub struct InstanceHit {
    pub handle: InstanceHandle,
}

/// Sent by collaborators when a pickup is consumed.
#[derive(Event, Debug, Clone, Copy)]
pub struct InstanceCollected {
    pub handle: InstanceHandle,
    pub template: TemplateId,
}

/// Sent by collaborators to start a new round.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ResetSpawner;

/// The per-frame spawner systems; input events sent before this set are handled the same frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpawnerSystems;

/// Spawn plugin: orchestrator resource, events and the per-frame systems.
pub struct SfSpawnPlugin;

impl Plugin for SfSpawnPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Spawner>()
            .init_resource::<LootTables>()
            .init_resource::<SimClock>()
            .init_resource::<MagnetState>()
            .init_resource::<InstanceEntities>()
            .add_event::<InstanceSpawned>()
            .add_event::<InstanceExpired>()
            .add_event::<InstanceDestroyed>()
            .add_event::<InstanceHit>()
            .add_event::<InstanceCollected>()
            .add_event::<ResetSpawner>()
            .add_systems(
                Update,
                (
                    track_reference,
                    handle_reset,
                    handle_collected,
                    handle_hit,
                    handle_destroyed,
                    drive_magnet,
                    tick_spawner,
                    sync_instance_entities,
                )
                    .chain()
                    .in_set(SpawnerSystems),
            );
    }
}

fn world_pos(transform: &Transform) -> WorldPos {
    WorldPos::new(transform.translation.x as f64, transform.translation.y as f64)
}

fn track_reference(
    reference: Query<&Transform, With<SpawnReference>>,
    mut spawner: ResMut<Spawner>,
) {
    if let Ok(transform) = reference.get_single() {
        spawner.set_reference_position(world_pos(transform));
    }
}

fn handle_reset(
    mut events: EventReader<ResetSpawner>,
    mut spawner: ResMut<Spawner>,
    mut loot: ResMut<LootTables>,
) {
    if events.read().count() == 0 {
        return;
    }
    spawner.reset();
    loot.reset_cooldowns();
}

fn handle_collected(mut events: EventReader<InstanceCollected>, mut spawner: ResMut<Spawner>) {
    for event in events.read() {
        spawner.on_instance_despawned(event.handle, event.template);
    }
}

fn handle_hit(
    mut events: EventReader<InstanceHit>,
    mut spawner: ResMut<Spawner>,
    mut loot: ResMut<LootTables>,
    clock: Res<SimClock>,
    mut spawned: EventWriter<InstanceSpawned>,
) {
    for event in events.read() {
        for handle in spawner.roll_drops_for(event.handle, &mut loot, clock.now()) {
            loot.forget_owner(handle);
            if let Some(instance) = spawner.instance(handle) {
                spawned.send(InstanceSpawned {
                    handle,
                    position: instance.position,
                });
            }
        }
    }
}

fn handle_destroyed(
    mut events: EventReader<InstanceDestroyed>,
    mut spawner: ResMut<Spawner>,
    mut loot: ResMut<LootTables>,
    clock: Res<SimClock>,
    mut spawned: EventWriter<InstanceSpawned>,
) {
    for event in events.read() {
        for handle in spawner.on_instance_destroyed(event.handle, &mut loot, clock.now()) {
            loot.forget_owner(handle);
            if let Some(instance) = spawner.instance(handle) {
                spawned.send(InstanceSpawned {
                    handle,
                    position: instance.position,
                });
            }
        }
    }
}

fn drive_magnet(
    reference: Query<&Transform, With<SpawnReference>>,
    magnet: Res<MagnetState>,
    clock: Res<SimClock>,
    mut spawner: ResMut<Spawner>,
) {
    let Ok(transform) = reference.get_single() else {
        return;
    };
    let up = transform.up();
    let forward = WorldPos::new(up.x as f64, up.y as f64);
    spawner.apply_magnet(world_pos(transform), forward, magnet.active, clock.delta());
}

fn tick_spawner(
    clock: Res<SimClock>,
    mut spawner: ResMut<Spawner>,
    mut loot: ResMut<LootTables>,
    mut spawned: EventWriter<InstanceSpawned>,
    mut expired: EventWriter<InstanceExpired>,
) {
    spawner.set_paused(clock.is_paused());
    let report = spawner.tick(clock.delta(), clock.now());
    for handle in report.expired {
        expired.send(InstanceExpired { handle });
    }
    for handle in report.spawned {
        // A reused slot is a new owner.
        loot.forget_owner(handle);
        if let Some(instance) = spawner.instance(handle) {
            spawned.send(InstanceSpawned {
                handle,
                position: instance.position,
            });
        }
    }
}

/// Keep one mirror entity per active instance, positioned like it.
fn sync_instance_entities(
    mut commands: Commands,
    spawner: Res<Spawner>,
    mut mirrors: ResMut<InstanceEntities>,
    mut transforms: Query<&mut Transform, With<SpawnedInstance>>,
) {
    mirrors.entities.retain(|handle, entity| {
        let keep = spawner.is_active(*handle);
        if !keep {
            commands.entity(*entity).despawn();
        }
        keep
    });

    for instance in spawner.active_instances() {
        let (x, y) = (instance.position.x as f32, instance.position.y as f32);
        match mirrors.entities.get(&instance.handle) {
            Some(&entity) => {
                if let Ok(mut transform) = transforms.get_mut(entity) {
                    transform.translation.x = x;
                    transform.translation.y = y;
                }
            }
            None => {
                let entity = commands
                    .spawn((
                        SpawnedInstance {
                            handle: instance.handle,
                        },
                        Transform::from_xyz(x, y, 0.0),
                    ))
                    .id();
                mirrors.entities.insert(instance.handle, entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnerConfig;
    use sf_core::{
        DeathBehavior, DropTableId, ItemCategory, SfCorePlugin, Template, TemplateCatalog,
    };
    use sf_loot::{DropEntry, DropTable};

    fn test_app() -> App {
        let catalog = TemplateCatalog::new(vec![
            Template::new(1, "Apple", 3.0, ItemCategory::Collectible),
            Template::new(2, "Bomb", 1.0, ItemCategory::Hazard).with_same_kind_radius(1.5),
        ])
        .unwrap();
        let config = SpawnerConfig {
            seed: Some(42),
            skip_chance: 0.0,
            ..Default::default()
        };

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, SfCorePlugin, SfSpawnPlugin))
            .insert_resource(Spawner::new(config, catalog, vec![]).unwrap());
        app.world_mut()
            .spawn((SpawnReference, Transform::from_xyz(0.0, 0.0, 0.0)));
        app
    }

    fn mirror_count(app: &mut App) -> usize {
        let world = app.world_mut();
        let mut query = world.query::<&SpawnedInstance>();
        query.iter(world).count()
    }

    fn move_reference(app: &mut App, y: f32) {
        let world = app.world_mut();
        let mut query = world.query_filtered::<&mut Transform, With<SpawnReference>>();
        for mut transform in query.iter_mut(world) {
            transform.translation.y = y;
        }
    }

    #[test]
    fn plugin_spawns_and_mirrors_instances() {
        let mut app = test_app();
        app.update();
        assert_eq!(app.world().resource::<Spawner>().frontier(), 10.0);

        move_reference(&mut app, 3.0);
        app.update();

        let active = app.world().resource::<Spawner>().active_count();
        assert!(active > 0);
        assert_eq!(app.world().resource::<InstanceEntities>().len(), active);
        assert_eq!(mirror_count(&mut app), active);
    }

    #[test]
    fn collected_and_reset_events_clear_instances() {
        let mut app = test_app();
        app.update();
        move_reference(&mut app, 3.0);
        app.update();

        let first = app
            .world()
            .resource::<Spawner>()
            .active_handles()
            .next()
            .unwrap();
        let before = app.world().resource::<Spawner>().active_count();
        app.world_mut().send_event(InstanceCollected {
            handle: first,
            template: first.template,
        });
        app.update();
        assert_eq!(app.world().resource::<Spawner>().active_count(), before - 1);
        assert_eq!(app.world().resource::<Spawner>().stats().consumed, 1);

        app.world_mut().send_event(ResetSpawner);
        app.update();
        {
            let spawner = app.world().resource::<Spawner>();
            assert_eq!(spawner.active_count(), 0);
            assert!(spawner.grid().is_empty());
            assert_eq!(spawner.unique_on_screen_count(), 0);
        }
        assert_eq!(mirror_count(&mut app), 0);
        assert!(app.world().resource::<InstanceEntities>().is_empty());
    }

    #[test]
    fn paused_clock_holds_the_frontier_back() {
        let mut app = test_app();
        app.update();
        app.world_mut().resource_mut::<SimClock>().set_paused(true);
        move_reference(&mut app, 5.0);
        app.update();

        {
            let spawner = app.world().resource::<Spawner>();
            assert!(spawner.is_paused());
            assert_eq!(spawner.active_count(), 0);
            assert_eq!(spawner.frontier(), 15.0);
            assert_eq!(spawner.stats().paused, 10);
        }
        assert_eq!(mirror_count(&mut app), 0);

        app.world_mut().resource_mut::<SimClock>().set_paused(false);
        app.update();
        assert_eq!(app.world().resource::<Spawner>().stats().rows, 10);

        move_reference(&mut app, 6.0);
        app.update();
        let spawner = app.world().resource::<Spawner>();
        assert!(!spawner.is_paused());
        assert_eq!(spawner.stats().rows, 12);
        assert!(spawner.active_count() > 0);
    }

    #[test]
    fn hit_event_spawns_drops_and_keeps_target() {
        let catalog = TemplateCatalog::new(vec![
            Template::new(1, "Barrel", 1.0, ItemCategory::Hazard).with_death(
                DeathBehavior::DropLoot {
                    table: DropTableId::new("barrel"),
                },
            ),
            Template::new(2, "Coin", 0.0, ItemCategory::Collectible),
        ])
        .unwrap();
        let loot = LootTables::new([DropTable::new(
            "barrel",
            1.0,
            vec![DropEntry::flexible(TemplateId(2), 1.0, 1, 3)],
        )])
        .unwrap();
        let config = SpawnerConfig {
            seed: Some(5),
            ..Default::default()
        };
        let mut spawner = Spawner::new(config, catalog, vec![]).unwrap();
        spawner.set_reference_position(WorldPos::new(0.0, 0.0));
        let barrel = spawner.spawn_drops(&[TemplateId(1)], WorldPos::new(0.0, 5.0), 0.0)[0];

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, SfCorePlugin, SfSpawnPlugin))
            .insert_resource(spawner)
            .insert_resource(loot);
        app.world_mut().send_event(InstanceHit { handle: barrel });
        app.update();

        let spawner = app.world().resource::<Spawner>();
        assert!(spawner.is_active(barrel));
        let coins = spawner
            .active_handles()
            .filter(|h| h.template == TemplateId(2))
            .count();
        assert!((1..=3).contains(&coins));
        assert_eq!(spawner.stats().destroyed, 0);
        // The barrel itself went in through spawn_drops.
        assert_eq!(spawner.stats().drops, coins as u64 + 1);
    }
}
