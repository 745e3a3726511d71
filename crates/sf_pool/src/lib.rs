//! Per-template object pools.
//!
//! Each template owns a slab of instances split into an active partition and
//! a free list. Pools grow on demand and never shrink, so memory peaks at the
//! historical high-water mark of concurrent instances per template.

use bevy::log::debug;
use std::collections::HashMap;

use sf_core::{InstanceHandle, Template, TemplateId, WorldPos};

/// Error type for pool lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    UnknownTemplate(TemplateId),
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTemplate(id) => write!(f, "no pool registered for {}", id),
        }
    }
}

impl std::error::Error for PoolError {}

/// A live object created from a template.
///
/// Per-use state is reset on every activation, so a recycled instance never
/// carries position, timers or magnet locks from its previous life.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub handle: InstanceHandle,
    pub position: WorldPos,
    /// Simulation time of the latest activation.
    pub activated_at: f64,
    /// Locked onto a magnet pull.
    pub pulled: bool,
    active: bool,
}

impl Instance {
    fn new(handle: InstanceHandle) -> Self {
        Self {
            handle,
            position: WorldPos::ZERO,
            activated_at: 0.0,
            pulled: false,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        self.position = WorldPos::ZERO;
        self.activated_at = 0.0;
        self.pulled = false;
        self.active = true;
    }
}

/// Pool of one template: every slot is either active or on the free list.
#[derive(Debug, Clone, Default)]
pub struct PoolEntry {
    instances: Vec<Instance>,
    free: Vec<u32>,
    seed_size: usize,
}

impl PoolEntry {
    fn seeded(template: TemplateId, seed_size: usize) -> Self {
        let mut entry = Self {
            instances: Vec::with_capacity(seed_size),
            free: Vec::with_capacity(seed_size),
            seed_size,
        };
        for _ in 0..seed_size {
            let slot = entry.materialize(template);
            entry.free.push(slot);
        }
        // Lowest slots are handed out first.
        entry.free.reverse();
        entry
    }

    fn materialize(&mut self, template: TemplateId) -> u32 {
        let slot = self.instances.len() as u32;
        self.instances
            .push(Instance::new(InstanceHandle::new(template, slot)));
        slot
    }

    pub fn size(&self) -> usize {
        self.instances.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.instances.len() - self.free.len()
    }

    pub fn seed_size(&self) -> usize {
        self.seed_size
    }
}

/// Usage counters for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub active: usize,
    pub free: usize,
    /// Instances created beyond the seed size.
    pub grown: usize,
}

/// Object pools keyed by template id.
#[derive(Debug, Clone, Default)]
pub struct ObjectPool {
    pools: HashMap<TemplateId, PoolEntry>,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build pools for every template, each seeded with its declared pool size.
    pub fn from_templates<'a>(templates: impl IntoIterator<Item = &'a Template>) -> Self {
        let mut pool = Self::new();
        for template in templates {
            pool.register(template.id, template.pool_size);
        }
        pool
    }

    /// Register a template with `seed_size` pre-created instances.
    ///
    /// Registering an already known template leaves its pool untouched.
    pub fn register(&mut self, template: TemplateId, seed_size: usize) {
        self.pools
            .entry(template)
            .or_insert_with(|| PoolEntry::seeded(template, seed_size));
    }

    pub fn is_registered(&self, template: TemplateId) -> bool {
        self.pools.contains_key(&template)
    }

    /// Take a free instance of `template`, growing the pool when none is free.
    ///
    /// The returned instance is active with reset per-use state.
    pub fn get(&mut self, template: TemplateId) -> Result<InstanceHandle, PoolError> {
        let entry = self
            .pools
            .get_mut(&template)
            .ok_or(PoolError::UnknownTemplate(template))?;

        let slot = match entry.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = entry.materialize(template);
                debug!(
                    "pool for {} grew to {} instances (seed {})",
                    template,
                    entry.instances.len(),
                    entry.seed_size
                );
                slot
            }
        };

        let instance = &mut entry.instances[slot as usize];
        instance.activate();
        Ok(instance.handle)
    }

    /// Deactivate an instance and put it back on its free list.
    ///
    /// Returns whether the instance was active. Releasing an inactive or
    /// unknown handle is a no-op, since several collision paths may ask for
    /// the same return within one tick.
    pub fn release(&mut self, handle: InstanceHandle) -> bool {
        let Some(entry) = self.pools.get_mut(&handle.template) else {
            return false;
        };
        let Some(instance) = entry.instances.get_mut(handle.slot as usize) else {
            return false;
        };
        if !instance.active {
            return false;
        }

        instance.active = false;
        instance.pulled = false;
        entry.free.push(handle.slot);
        true
    }

    pub fn instance(&self, handle: InstanceHandle) -> Option<&Instance> {
        self.pools
            .get(&handle.template)?
            .instances
            .get(handle.slot as usize)
    }

    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Option<&mut Instance> {
        self.pools
            .get_mut(&handle.template)?
            .instances
            .get_mut(handle.slot as usize)
    }

    pub fn is_active(&self, handle: InstanceHandle) -> bool {
        self.instance(handle).is_some_and(Instance::is_active)
    }

    pub fn entry(&self, template: TemplateId) -> Option<&PoolEntry> {
        self.pools.get(&template)
    }

    pub fn stats(&self, template: TemplateId) -> Option<PoolStats> {
        self.pools.get(&template).map(|entry| PoolStats {
            size: entry.size(),
            active: entry.active_count(),
            free: entry.free_count(),
            grown: entry.size().saturating_sub(entry.seed_size),
        })
    }

    /// Active instances across every template.
    pub fn active_instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.pools
            .values()
            .flat_map(|entry| entry.instances.iter())
            .filter(|instance| instance.active)
    }

    pub fn total_active(&self) -> usize {
        self.pools.values().map(PoolEntry::active_count).sum()
    }

    /// Return every active instance to its free list.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for entry in self.pools.values_mut() {
            for instance in entry.instances.iter_mut().filter(|i| i.active) {
                instance.active = false;
                instance.pulled = false;
                entry.free.push(instance.handle.slot);
                released += 1;
            }
        }
        released
    }
}
