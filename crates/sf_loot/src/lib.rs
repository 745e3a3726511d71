use bevy::prelude::*;
use rand::Rng;
use std::collections::HashMap;

pub mod cooldown;
pub mod table;

pub use cooldown::{CooldownBook, CooldownRegistry, CooldownScope};
pub use table::{DropEntry, DropKind, DropTable, DropTableError};

use sf_core::{DropTableId, InstanceHandle, TemplateId};

/// Registered drop tables plus every cooldown registry they arm.
#[derive(Resource, Debug, Clone, Default)]
pub struct LootTables {
    tables: HashMap<DropTableId, DropTable>,
    cooldowns: CooldownBook,
}

impl LootTables {
    pub fn new(tables: impl IntoIterator<Item = DropTable>) -> Result<Self, DropTableError> {
        let mut loot = Self::default();
        for table in tables {
            loot.insert(table)?;
        }
        Ok(loot)
    }

    /// Register or replace a table after validating it.
    pub fn insert(&mut self, table: DropTable) -> Result<(), DropTableError> {
        table.validate()?;
        self.tables.insert(table.id.clone(), table);
        Ok(())
    }

    pub fn get(&self, id: &DropTableId) -> Option<&DropTable> {
        self.tables.get(id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &DropTable> + '_ {
        self.tables.values()
    }

    pub fn cooldowns(&self) -> &CooldownBook {
        &self.cooldowns
    }

    /// Roll a registered table on behalf of `owner`.
    ///
    /// Returns `None` when no table is registered under `id`.
    pub fn roll(
        &mut self,
        id: &DropTableId,
        owner: Option<InstanceHandle>,
        max_total_drops: usize,
        now: f64,
        rng: &mut impl Rng,
    ) -> Option<Vec<TemplateId>> {
        let table = self.tables.get(id)?;
        let registry = self.cooldowns.registry_mut(table.scope, owner);
        Some(table.roll_drops(max_total_drops, now, registry, rng))
    }

    /// Release the per-owner registry of an instance that went back to its pool.
    pub fn forget_owner(&mut self, owner: InstanceHandle) {
        self.cooldowns.forget_owner(owner);
    }

    /// Clear every cooldown, global and per owner.
    pub fn reset_cooldowns(&mut self) {
        self.cooldowns.clear();
        info!("loot cooldowns reset");
    }
}

/// Loot plugin: owns the drop table resource.
pub struct SfLootPlugin;

impl Plugin for SfLootPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LootTables>();
    }
}
