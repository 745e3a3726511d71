use bevy::prelude::*;
use std::path::PathBuf;

pub mod manifest_io;

pub use manifest_io::{
    ensure_manifests_dir, list_manifests_in, load_manifest, manifest_filename, manifest_path,
    save_manifest, ManifestIoError, SpawnerManifest, MANIFESTS_DIR,
};

/// Manifest file to load at startup.
#[derive(Resource, Debug, Clone)]
pub struct ManifestPath(pub PathBuf);

/// Name of the manifest the running spawner was built from.
#[derive(Resource, Debug, Clone, Default)]
pub struct LoadedManifest {
    pub name: String,
    pub path: Option<PathBuf>,
}

/// Persistence plugin: loads a spawner manifest into the engine resources.
///
/// Without a path the resources keep whatever the app inserted.
#[derive(Default)]
pub struct SfPersistencePlugin {
    pub manifest: Option<PathBuf>,
}

impl SfPersistencePlugin {
    pub fn with_manifest(path: impl Into<PathBuf>) -> Self {
        Self {
            manifest: Some(path.into()),
        }
    }
}

impl Plugin for SfPersistencePlugin {
    fn build(&self, app: &mut App) {
        if let Some(path) = &self.manifest {
            app.insert_resource(ManifestPath(path.clone()));
        }
        app.init_resource::<LoadedManifest>()
            .add_systems(Startup, load_manifest_on_startup);
    }
}

fn load_manifest_on_startup(path: Option<Res<ManifestPath>>, mut commands: Commands) {
    let Some(path) = path else {
        return;
    };

    let resources = load_manifest(&path.0).and_then(|manifest| {
        let name = manifest.name.clone();
        manifest.into_resources().map(|resources| (name, resources))
    });

    match resources {
        Ok((name, (spawner, loot))) => {
            info!(
                "loaded spawner manifest '{}' from {}: {} templates, {} patterns",
                name,
                path.0.display(),
                spawner.catalog().len(),
                spawner.patterns().len()
            );
            commands.insert_resource(spawner);
            commands.insert_resource(loot);
            commands.insert_resource(LoadedManifest {
                name,
                path: Some(path.0.clone()),
            });
        }
        Err(err) => warn!("failed to load manifest {}: {}", path.0.display(), err),
    }
}
