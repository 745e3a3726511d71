use bevy::prelude::*;

pub mod catalog;
pub mod clock;
pub mod coords;
pub mod ids;
pub mod template;
pub mod weighted;

pub use catalog::{CatalogError, TemplateCatalog};
pub use clock::{advance_sim_clock, SimClock};
pub use coords::{CellCoord, WorldPos};
pub use ids::{DropTableId, InstanceHandle, TemplateId};
pub use template::{
    DeathBehavior, ItemCategory, MagnetParams, Movement, PowerupKind, Template, TemplateFlags,
};
pub use weighted::{select_weighted, total_weight};

/// Core plugin providing the simulation clock shared by the other crates.
pub struct SfCorePlugin;

impl Plugin for SfCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>()
            .add_systems(PreUpdate, advance_sim_clock);
    }
}
