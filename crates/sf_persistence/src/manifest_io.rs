use serde::{Deserialize, Serialize};
use sf_core::{CatalogError, Template, TemplateCatalog};
use sf_loot::{DropTable, DropTableError, LootTables};
use sf_spawn::{validate_references, ConfigError, SpawnPattern, Spawner, SpawnerConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Default directory for spawner manifests.
pub const MANIFESTS_DIR: &str = "assets/spawners";

/// Everything a spawner needs at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpawnerManifest {
    pub name: String,
    pub config: SpawnerConfig,
    pub templates: Vec<Template>,
    pub drop_tables: Vec<DropTable>,
    pub patterns: Vec<SpawnPattern>,
}

impl SpawnerManifest {
    /// Check the manifest without consuming it.
    pub fn validate(&self) -> Result<(), ManifestIoError> {
        self.clone().into_resources().map(|_| ())
    }

    /// Build the runtime resources: a spawner over the template catalog, and the loot tables.
    pub fn into_resources(self) -> Result<(Spawner, LootTables), ManifestIoError> {
        let catalog = TemplateCatalog::new(self.templates)?;
        let loot = LootTables::new(self.drop_tables)?;
        validate_references(&self.config, &catalog, &self.patterns, &loot)?;
        let spawner = Spawner::new(self.config, catalog, self.patterns)?;
        Ok((spawner, loot))
    }
}

/// Error type for manifest I/O operations.
#[derive(Debug)]
pub enum ManifestIoError {
    Io(std::io::Error),
    Ron(ron::Error),
    RonSpanned(ron::error::SpannedError),
    Catalog(CatalogError),
    Config(ConfigError),
    DropTable(DropTableError),
}

impl From<std::io::Error> for ManifestIoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ron::Error> for ManifestIoError {
    fn from(err: ron::Error) -> Self {
        Self::Ron(err)
    }
}

impl From<ron::error::SpannedError> for ManifestIoError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::RonSpanned(err)
    }
}

impl From<CatalogError> for ManifestIoError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

impl From<ConfigError> for ManifestIoError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<DropTableError> for ManifestIoError {
    fn from(err: DropTableError) -> Self {
        Self::DropTable(err)
    }
}

impl std::fmt::Display for ManifestIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Ron(e) => write!(f, "RON serialization error: {}", e),
            Self::RonSpanned(e) => write!(f, "RON parse error: {}", e),
            Self::Catalog(e) => write!(f, "template catalog error: {}", e),
            Self::Config(e) => write!(f, "spawner config error: {}", e),
            Self::DropTable(e) => write!(f, "drop table error: {}", e),
        }
    }
}

impl std::error::Error for ManifestIoError {}

/// Save a manifest to a RON file.
pub fn save_manifest(path: &Path, manifest: &SpawnerManifest) -> Result<(), ManifestIoError> {
    let pretty_config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .separate_tuple_members(true);

    let ron_string = ron::ser::to_string_pretty(manifest, pretty_config)?;
    fs::write(path, ron_string)?;
    Ok(())
}

/// Load and validate a manifest from a RON file.
pub fn load_manifest(path: &Path) -> Result<SpawnerManifest, ManifestIoError> {
    let contents = fs::read_to_string(path)?;
    let manifest: SpawnerManifest = ron::from_str(&contents)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Ensure the manifests directory exists.
pub fn ensure_manifests_dir() -> Result<(), std::io::Error> {
    fs::create_dir_all(MANIFESTS_DIR)
}

/// List all `.ron` files in `dir`, sorted. A missing directory lists nothing.
pub fn list_manifests_in(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut manifests = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            manifests.push(path);
        }
    }

    manifests.sort();
    Ok(manifests)
}

/// Generate a filename from a manifest name.
pub fn manifest_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.ron", sanitized.to_lowercase())
}

/// Get the full path for a manifest file.
pub fn manifest_path(name: &str) -> PathBuf {
    Path::new(MANIFESTS_DIR).join(manifest_filename(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::{DeathBehavior, DropTableId, ItemCategory, TemplateId};
    use sf_loot::{CooldownScope, DropEntry};
    use sf_spawn::PatternEntry;
    use tempfile::tempdir;

    fn sample_manifest() -> SpawnerManifest {
        SpawnerManifest {
            name: "Meadow Run".into(),
            config: SpawnerConfig {
                seed: Some(3),
                no_overlap: true,
                ..Default::default()
            },
            templates: vec![
                Template::new(1, "Apple", 4.0, ItemCategory::Collectible),
                Template::new(2, "Crate", 1.0, ItemCategory::Hazard).with_death(
                    DeathBehavior::DropLoot {
                        table: DropTableId::new("crate"),
                    },
                ),
            ],
            drop_tables: vec![DropTable::new(
                "crate",
                0.5,
                vec![
                    DropEntry::singleton(TemplateId(1), 1.0).with_cooldown(4.0),
                    DropEntry::flexible(TemplateId(1), 2.0, 2, 3),
                ],
            )
            .with_scope(CooldownScope::PerOwner)],
            patterns: vec![SpawnPattern {
                name: "pair".into(),
                weight: 1.0,
                vertical_extent: 2.0,
                lanes: 2,
                x_jitter: Some(0.1),
                y_jitter: None,
                entries: vec![
                    PatternEntry {
                        template: TemplateId(1),
                        lane: 0,
                        y_offset: 0.0,
                    },
                    PatternEntry {
                        template: TemplateId(1),
                        lane: 1,
                        y_offset: 0.5,
                    },
                ],
            }],
        }
    }

    #[test]
    fn save_and_load_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meadow.ron");

        let manifest = sample_manifest();
        save_manifest(&path, &manifest).unwrap();

        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn manifest_builds_resources() {
        let (spawner, loot) = sample_manifest().into_resources().unwrap();
        assert_eq!(spawner.catalog().len(), 2);
        assert_eq!(spawner.patterns().len(), 1);
        assert!(loot.get(&DropTableId::new("crate")).is_some());
    }

    #[test]
    fn load_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.ron");

        let mut manifest = sample_manifest();
        manifest.config.grid_cell_size = 0.5;
        save_manifest(&path, &manifest).unwrap();

        let err = load_manifest(&path).unwrap_err();
        assert!(matches!(
            err,
            ManifestIoError::Config(ConfigError::CellTooSmall { .. })
        ));
    }

    #[test]
    fn load_rejects_duplicate_templates() {
        let mut manifest = sample_manifest();
        manifest
            .templates
            .push(Template::new(1, "Pear", 1.0, ItemCategory::Collectible));
        assert!(matches!(
            manifest.validate(),
            Err(ManifestIoError::Catalog(CatalogError::DuplicateId(_)))
        ));
    }

    #[test]
    fn load_reports_parse_and_io_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(name: \"oops\", templates: [").unwrap();
        assert!(matches!(
            load_manifest(&path),
            Err(ManifestIoError::RonSpanned(_))
        ));

        let missing = dir.path().join("missing.ron");
        assert!(matches!(load_manifest(&missing), Err(ManifestIoError::Io(_))));
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest: SpawnerManifest = ron::from_str("()").unwrap();
        assert_eq!(manifest.config, SpawnerConfig::default());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn list_manifests_only_returns_ron_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.ron"), "()").unwrap();
        fs::write(dir.path().join("a.ron"), "()").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let listed = list_manifests_in(dir.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.ron", "b.ron"]);

        assert!(list_manifests_in(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn manifest_filename_sanitizes() {
        assert_eq!(manifest_filename("Meadow Run"), "meadow_run.ron");
        assert_eq!(manifest_filename("Level-2"), "level-2.ron");
        assert_eq!(manifest_filename("Boss Rush!"), "boss_rush_.ron");
    }
}
