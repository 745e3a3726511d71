use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use sf_core::{ItemCategory, PowerupKind, SfCorePlugin, SimClock, WorldPos};
use sf_loot::SfLootPlugin;
use sf_persistence::{
    ensure_manifests_dir, manifest_path, save_manifest, ManifestIoError, SfPersistencePlugin,
};
use sf_spawn::{
    InstanceCollected, InstanceDestroyed, InstanceExpired, InstanceSpawned, MagnetState,
    SfSpawnPlugin, SpawnReference, Spawner, SpawnerSystems,
};
use std::path::PathBuf;
use std::time::Duration;

mod demo;

/// Forward speed of the scripted runner, units per second.
const RUN_SPEED: f32 = 6.0;
/// Lateral sway amplitude.
const SWAY: f32 = 1.5;
const PICKUP_RADIUS: f64 = 0.6;
/// Crates ahead of the runner closer than this are shot.
const SHOT_RANGE: f64 = 3.0;
const RUN_FRAMES: u32 = 900;
const REPORT_EVERY: u32 = 120;

/// Tracked entity standing in for the player.
#[derive(Component)]
struct Runner;

#[derive(Resource, Default)]
struct RunState {
    frames: u32,
    collected: u32,
    shot: u32,
    hits: u32,
    spawned_events: u32,
    expired_events: u32,
    magnet_until: f64,
}

fn main() {
    let arg = std::env::args().nth(1);

    if arg.as_deref() == Some("--write-demo") {
        let manifest = demo::demo_manifest();
        let path = manifest_path(&manifest.name);
        let result = ensure_manifests_dir()
            .map_err(ManifestIoError::from)
            .and_then(|_| save_manifest(&path, &manifest));
        match result {
            Ok(()) => println!("Demo manifest written to {}", path.display()),
            Err(err) => {
                eprintln!("Failed to write demo manifest: {}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
        LogPlugin::default(),
    ))
    .add_plugins((SfCorePlugin, SfLootPlugin, SfSpawnPlugin));

    match arg.map(PathBuf::from) {
        Some(path) => {
            app.add_plugins(SfPersistencePlugin::with_manifest(path));
        }
        None => match demo::demo_manifest().into_resources() {
            Ok((spawner, loot)) => {
                app.insert_resource(spawner).insert_resource(loot);
                app.add_plugins(SfPersistencePlugin::default());
            }
            Err(err) => {
                eprintln!("Built-in manifest is invalid: {}", err);
                std::process::exit(1);
            }
        },
    }

    app.init_resource::<RunState>()
        .add_systems(Startup, spawn_runner)
        .add_systems(
            Update,
            (move_runner, interact).chain().before(SpawnerSystems),
        )
        .add_systems(Update, report_progress.after(SpawnerSystems))
        .run();
}

fn spawn_runner(mut commands: Commands) {
    commands.spawn((Runner, SpawnReference, Transform::default()));
}

fn move_runner(clock: Res<SimClock>, mut runner: Query<&mut Transform, With<Runner>>) {
    for mut transform in &mut runner {
        transform.translation.y += RUN_SPEED * clock.delta() as f32;
        transform.translation.x = (clock.now() as f32 * 0.8).sin() * SWAY;
    }
}

/// Collect what the runner touches and shoot crates ahead of it.
fn interact(
    clock: Res<SimClock>,
    spawner: Res<Spawner>,
    runner: Query<&Transform, With<Runner>>,
    mut state: ResMut<RunState>,
    mut magnet: ResMut<MagnetState>,
    mut collected: EventWriter<InstanceCollected>,
    mut destroyed: EventWriter<InstanceDestroyed>,
) {
    let Ok(transform) = runner.get_single() else {
        return;
    };
    let head = WorldPos::new(transform.translation.x as f64, transform.translation.y as f64);

    for instance in spawner.active_instances() {
        let Some(template) = spawner.catalog().get(instance.handle.template) else {
            continue;
        };
        let dist = instance.position.distance(head);

        if template.death.drop_table().is_some() {
            if instance.position.y > head.y && dist < SHOT_RANGE {
                destroyed.send(InstanceDestroyed {
                    handle: instance.handle,
                });
                state.shot += 1;
            }
            continue;
        }
        if dist >= PICKUP_RADIUS {
            continue;
        }

        match template.category {
            ItemCategory::Hazard => state.hits += 1,
            ItemCategory::PowerUp if template.powerup == PowerupKind::Magnet => {
                state.magnet_until = clock.now() + template.duration;
                state.collected += 1;
            }
            _ => state.collected += 1,
        }
        collected.send(InstanceCollected {
            handle: instance.handle,
            template: template.id,
        });
    }

    magnet.active = clock.now() < state.magnet_until;
}

fn report_progress(
    spawner: Res<Spawner>,
    mut state: ResMut<RunState>,
    mut spawned: EventReader<InstanceSpawned>,
    mut expired: EventReader<InstanceExpired>,
    mut exit: EventWriter<AppExit>,
) {
    state.frames += 1;
    state.spawned_events += spawned.read().count() as u32;
    state.expired_events += expired.read().count() as u32;

    if state.frames % REPORT_EVERY == 0 {
        let stats = spawner.stats();
        info!(
            "frame {}: frontier {:.1}, {} active, {} rows ({} spawned, {} skipped, {} no room, {} full)",
            state.frames,
            spawner.frontier(),
            spawner.active_count(),
            stats.rows,
            stats.spawned,
            stats.skipped,
            stats.no_placement,
            stats.full
        );
    }

    if state.frames >= RUN_FRAMES {
        let stats = spawner.stats();
        info!(
            "run finished: {} collected, {} crates shot, {} hazard hits, {} drops, {} expired",
            state.collected, state.shot, state.hits, stats.drops, state.expired_events
        );
        debug!("{} spawn events observed", state.spawned_events);
        exit.send(AppExit::Success);
    }
}
