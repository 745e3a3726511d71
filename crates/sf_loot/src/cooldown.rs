use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sf_core::{InstanceHandle, TemplateId};

/// Which registry a drop table arms its cooldowns in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CooldownScope {
    /// One registry shared by every table and every owner: a reward on
    /// cooldown is on cooldown everywhere.
    #[default]
    Global,
    /// One registry per dropping instance.
    PerOwner,
}

/// Map of template id to the time after which it may drop again.
#[derive(Debug, Clone, Default)]
pub struct CooldownRegistry {
    next_allowed: HashMap<TemplateId, f64>,
}

impl CooldownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `template` is outside its cooldown window at `now`.
    pub fn is_ready(&self, template: TemplateId, now: f64) -> bool {
        self.next_allowed
            .get(&template)
            .map_or(true, |&next| now >= next)
    }

    /// Start a cooldown of `duration` seconds. Non-positive durations arm nothing.
    pub fn arm(&mut self, template: TemplateId, now: f64, duration: f64) {
        if duration > 0.0 {
            self.next_allowed.insert(template, now + duration);
        }
    }

    pub fn next_allowed(&self, template: TemplateId) -> Option<f64> {
        self.next_allowed.get(&template).copied()
    }

    pub fn len(&self) -> usize {
        self.next_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_allowed.is_empty()
    }

    pub fn clear(&mut self) {
        self.next_allowed.clear();
    }
}

/// All cooldown registries of a session.
#[derive(Debug, Clone, Default)]
pub struct CooldownBook {
    global: CooldownRegistry,
    per_owner: HashMap<InstanceHandle, CooldownRegistry>,
}

impl CooldownBook {
    /// Registry for a roll; per-owner rolls without an owner use the global one.
    pub fn registry_mut(
        &mut self,
        scope: CooldownScope,
        owner: Option<InstanceHandle>,
    ) -> &mut CooldownRegistry {
        match (scope, owner) {
            (CooldownScope::PerOwner, Some(owner)) => self.per_owner.entry(owner).or_default(),
            _ => &mut self.global,
        }
    }

    pub fn global(&self) -> &CooldownRegistry {
        &self.global
    }

    pub fn owner(&self, owner: InstanceHandle) -> Option<&CooldownRegistry> {
        self.per_owner.get(&owner)
    }

    /// Drop the registry of an owner that went back to its pool.
    pub fn forget_owner(&mut self, owner: InstanceHandle) {
        self.per_owner.remove(&owner);
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.per_owner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEM: TemplateId = TemplateId(5);

    #[test]
    fn cooldown_window_is_half_open() {
        let mut registry = CooldownRegistry::new();
        assert!(registry.is_ready(GEM, 0.0));

        registry.arm(GEM, 1.0, 2.0);
        assert!(!registry.is_ready(GEM, 1.0));
        assert!(!registry.is_ready(GEM, 2.99));
        assert!(registry.is_ready(GEM, 3.0));
    }

    #[test]
    fn zero_duration_never_arms() {
        let mut registry = CooldownRegistry::new();
        registry.arm(GEM, 1.0, 0.0);
        assert!(registry.is_empty());
        assert!(registry.is_ready(GEM, 1.0));
    }

    #[test]
    fn per_owner_registries_are_independent() {
        let a = InstanceHandle::new(TemplateId(1), 0);
        let b = InstanceHandle::new(TemplateId(1), 1);
        let mut book = CooldownBook::default();

        book.registry_mut(CooldownScope::PerOwner, Some(a)).arm(GEM, 0.0, 5.0);
        assert!(!book.registry_mut(CooldownScope::PerOwner, Some(a)).is_ready(GEM, 1.0));
        assert!(book.registry_mut(CooldownScope::PerOwner, Some(b)).is_ready(GEM, 1.0));
        assert!(book.global().is_ready(GEM, 1.0));

        book.forget_owner(a);
        assert!(book.owner(a).is_none());
    }

    #[test]
    fn global_scope_ignores_owner() {
        let a = InstanceHandle::new(TemplateId(1), 0);
        let mut book = CooldownBook::default();
        book.registry_mut(CooldownScope::Global, Some(a)).arm(GEM, 0.0, 5.0);
        assert!(!book.global().is_ready(GEM, 1.0));

        book.clear();
        assert!(book.global().is_ready(GEM, 1.0));
    }
}
