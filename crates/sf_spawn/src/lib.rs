pub mod config;
pub mod pattern;
pub mod plugin;
pub mod spawner;

pub use config::{validate_references, ConfigError, SpawnMode, SpawnerConfig};
pub use pattern::{pick_pattern, PatternEntry, SpawnPattern};
pub use plugin::{
    InstanceCollected, InstanceDestroyed, InstanceEntities, InstanceExpired, InstanceHit,
    InstanceSpawned, MagnetState, ResetSpawner, SfSpawnPlugin, SpawnReference, SpawnedInstance,
    SpawnerSystems,
};
pub use spawner::{RowOutcome, RowRecord, SpawnStats, Spawner, TickReport};
