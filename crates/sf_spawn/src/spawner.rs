//! The spawn orchestrator: keeps a frontier ahead of the reference position
//! filled with pooled, grid-registered instances.

use std::collections::{BTreeSet, HashSet};

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sf_core::{DropTableId, InstanceHandle, Template, TemplateCatalog, TemplateId, WorldPos};
use sf_grid::SpatialHashGrid;
use sf_loot::LootTables;
use sf_pool::{Instance, ObjectPool, PoolError};

use crate::config::{ConfigError, SpawnMode, SpawnerConfig};
use crate::pattern::{pick_pattern, SpawnPattern};

/// What happened at one frontier row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowOutcome {
    Spawned(InstanceHandle),
    /// A pattern was laid out; `blocked` entries were refused by overlap or uniqueness rules.
    Pattern { placed: usize, blocked: usize },
    /// Skip roll hit.
    Skipped,
    /// Nothing to pick from.
    NoTemplate,
    UniqueBlocked(TemplateId),
    /// Retry budget ran out without a free lateral position.
    NoPlacement(TemplateId),
    /// The pool does not know the template.
    PoolMiss(TemplateId),
    /// Active limit reached; the row was passed over.
    Full,
    /// The run is paused; the row was passed over.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRecord {
    pub y: f64,
    pub outcome: RowOutcome,
}

/// Everything a single tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub rows: Vec<RowRecord>,
    pub spawned: Vec<InstanceHandle>,
    pub expired: Vec<InstanceHandle>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.spawned.is_empty() && self.expired.is_empty()
    }
}

/// Running counters since the spawner was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnStats {
    pub rows: u64,
    pub spawned: u64,
    pub skipped: u64,
    pub unique_blocked: u64,
    pub no_placement: u64,
    pub pool_misses: u64,
    pub full: u64,
    pub paused: u64,
    pub expired: u64,
    pub consumed: u64,
    pub destroyed: u64,
    pub drops: u64,
}

impl SpawnStats {
    fn record(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Spawned(_) => self.spawned += 1,
            RowOutcome::Pattern { placed, .. } => self.spawned += placed as u64,
            RowOutcome::Skipped | RowOutcome::NoTemplate => self.skipped += 1,
            RowOutcome::UniqueBlocked(_) => self.unique_blocked += 1,
            RowOutcome::NoPlacement(_) => self.no_placement += 1,
            RowOutcome::PoolMiss(_) => self.pool_misses += 1,
            RowOutcome::Full => self.full += 1,
            RowOutcome::Paused => self.paused += 1,
        }
    }
}

/// Spawn orchestrator resource.
///
/// Owns the catalog, the grid and the pools. Every instance in `active` is
/// active in its pool and registered in the grid at its current position.
#[derive(Resource)]
pub struct Spawner {
    config: SpawnerConfig,
    catalog: TemplateCatalog,
    patterns: Vec<SpawnPattern>,
    grid: SpatialHashGrid,
    pool: ObjectPool,
    rng: ChaCha8Rng,
    reference: Option<WorldPos>,
    frontier: f64,
    active: BTreeSet<InstanceHandle>,
    unique_on_screen: HashSet<TemplateId>,
    paused: bool,
    stats: SpawnStats,
}

impl Default for Spawner {
    fn default() -> Self {
        Self::build(SpawnerConfig::default(), TemplateCatalog::default(), Vec::new())
    }
}

impl Spawner {
    /// Validate `config` and `patterns` against `catalog` and build a spawner
    /// with one seeded pool per template.
    pub fn new(
        config: SpawnerConfig,
        catalog: TemplateCatalog,
        patterns: Vec<SpawnPattern>,
    ) -> Result<Self, ConfigError> {
        config.validate(&catalog)?;
        if config.mode == SpawnMode::Patterns && patterns.is_empty() {
            return Err(ConfigError::NoPatterns);
        }
        for pattern in &patterns {
            pattern.validate(&catalog)?;
        }
        Ok(Self::build(config, catalog, patterns))
    }

    fn build(config: SpawnerConfig, catalog: TemplateCatalog, patterns: Vec<SpawnPattern>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            grid: SpatialHashGrid::new(config.grid_cell_size),
            pool: ObjectPool::from_templates(catalog.templates()),
            rng,
            reference: None,
            frontier: 0.0,
            active: BTreeSet::new(),
            unique_on_screen: HashSet::new(),
            paused: false,
            stats: SpawnStats::default(),
            config,
            catalog,
            patterns,
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn patterns(&self) -> &[SpawnPattern] {
        &self.patterns
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn stats(&self) -> SpawnStats {
        self.stats
    }

    pub fn frontier(&self) -> f64 {
        self.frontier
    }

    pub fn reference(&self) -> Option<WorldPos> {
        self.reference
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_handles(&self) -> impl Iterator<Item = InstanceHandle> + '_ {
        self.active.iter().copied()
    }

    pub fn active_instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.active.iter().filter_map(|&handle| self.pool.instance(handle))
    }

    pub fn is_active(&self, handle: InstanceHandle) -> bool {
        self.active.contains(&handle)
    }

    pub fn instance(&self, handle: InstanceHandle) -> Option<&Instance> {
        self.pool.instance(handle).filter(|i| i.is_active())
    }

    pub fn is_unique_on_screen(&self, template: TemplateId) -> bool {
        self.unique_on_screen.contains(&template)
    }

    pub fn unique_on_screen_count(&self) -> usize {
        self.unique_on_screen.len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// While paused, ticks leave instances alone and pass over frontier rows.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Track a new reference position. The first call places the frontier
    /// `lead_distance` ahead of it.
    pub fn set_reference_position(&mut self, position: WorldPos) {
        if self.reference.is_none() {
            self.frontier = position.y + self.config.lead_distance;
        }
        self.reference = Some(position);
    }

    /// Run one simulation step: move, expire, then fill the frontier.
    ///
    /// Does nothing until a reference position has been set. A paused
    /// spawner only advances the frontier, recording each row as
    /// [`RowOutcome::Paused`].
    pub fn tick(&mut self, dt: f64, now: f64) -> TickReport {
        let mut report = TickReport::default();
        let Some(reference) = self.reference else {
            return report;
        };

        if self.paused {
            self.fill_frontier(reference, now, &mut report);
            return report;
        }

        self.advance_movement(dt);

        for handle in self.collect_expired(reference, now) {
            if self.despawn(handle) {
                self.stats.expired += 1;
                report.expired.push(handle);
            }
        }

        self.fill_frontier(reference, now, &mut report);
        report
    }

    fn advance_movement(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        for &handle in &self.active {
            let Some(template) = self.catalog.get(handle.template) else {
                continue;
            };
            if template.movement.is_static() {
                continue;
            }
            let Some(instance) = self.pool.instance_mut(handle) else {
                continue;
            };
            // Locked instances follow the magnet instead.
            if instance.pulled {
                continue;
            }
            let from = instance.position;
            let to = template.movement.step(from, dt);
            instance.position = to;
            self.grid.relocate(handle, from, to);
        }
    }

    fn collect_expired(&self, reference: WorldPos, now: f64) -> Vec<InstanceHandle> {
        let cutoff = reference.y - self.config.trailing_distance;
        self.active
            .iter()
            .copied()
            .filter(|&handle| {
                let Some(instance) = self.pool.instance(handle) else {
                    return true;
                };
                let timed_out = self.catalog.get(handle.template).is_some_and(|t| {
                    t.auto_despawns() && now >= instance.activated_at + t.duration
                });
                let behind = !instance.pulled && instance.position.y < cutoff;
                timed_out || behind
            })
            .collect()
    }

    fn fill_frontier(&mut self, reference: WorldPos, now: f64, report: &mut TickReport) {
        let horizon = reference.y + self.config.lead_distance;
        while horizon > self.frontier {
            let row = self.frontier;
            let full =
                self.config.limit_when_full && self.active.len() >= self.config.max_active;

            let (outcome, step) = if self.paused {
                (RowOutcome::Paused, self.config.spawn_interval)
            } else if full {
                (RowOutcome::Full, self.config.spawn_interval)
            } else {
                match self.config.mode {
                    SpawnMode::Dynamic => (self.attempt_spawn(row, now), self.config.spawn_interval),
                    SpawnMode::Patterns => self.spawn_pattern(row, now, &mut report.spawned),
                }
            };

            if let RowOutcome::Spawned(handle) = outcome {
                report.spawned.push(handle);
            }
            self.stats.record(outcome);
            report.rows.push(RowRecord { y: row, outcome });
            self.frontier += step;
        }
    }

    /// Try to place one weighted-random template on the row at `row_y`.
    pub fn attempt_spawn(&mut self, row_y: f64, now: f64) -> RowOutcome {
        if self.rng.gen::<f64>() < self.config.skip_chance {
            return RowOutcome::Skipped;
        }

        let Some(template) = self.catalog.pick(&mut self.rng) else {
            return RowOutcome::NoTemplate;
        };
        let id = template.id;
        let unique = template.is_unique_on_screen();
        if unique && self.unique_on_screen.contains(&id) {
            return RowOutcome::UniqueBlocked(id);
        }

        let Some(position) =
            find_placement(&self.config, &self.grid, template, row_y, &mut self.rng)
        else {
            debug!(
                "row {:.2}: no room for {} after {} attempts",
                row_y, template.name, self.config.placement_attempts
            );
            return RowOutcome::NoPlacement(id);
        };

        match self.activate(id, position, now, unique) {
            Ok(handle) => RowOutcome::Spawned(handle),
            Err(err) => {
                warn!("row {:.2} skipped: {}", row_y, err);
                RowOutcome::PoolMiss(id)
            }
        }
    }

    fn spawn_pattern(
        &mut self,
        row_y: f64,
        now: f64,
        spawned: &mut Vec<InstanceHandle>,
    ) -> (RowOutcome, f64) {
        let fallback = self.config.spawn_interval;
        let Some(pattern) = pick_pattern(&self.patterns, &mut self.rng) else {
            return (RowOutcome::NoTemplate, fallback);
        };
        let step = pattern.advance(fallback);
        let placements = pattern.layout(
            row_y,
            self.config.track_width,
            self.config.clip_margin,
            &mut self.rng,
        );

        let mut placed = 0;
        let mut blocked = 0;
        for (id, position) in placements {
            let Some(template) = self.catalog.get(id) else {
                warn!("pattern entry names unknown {}", id);
                blocked += 1;
                continue;
            };
            let unique = template.is_unique_on_screen();
            if (unique && self.unique_on_screen.contains(&id))
                || placement_blocked(&self.config, &self.grid, template, position)
            {
                blocked += 1;
                continue;
            }
            match self.activate(id, position, now, unique) {
                Ok(handle) => {
                    spawned.push(handle);
                    placed += 1;
                }
                Err(err) => {
                    warn!("pattern entry skipped: {}", err);
                    blocked += 1;
                }
            }
        }
        (RowOutcome::Pattern { placed, blocked }, step)
    }

    fn activate(
        &mut self,
        template: TemplateId,
        position: WorldPos,
        now: f64,
        unique: bool,
    ) -> Result<InstanceHandle, PoolError> {
        let handle = self.pool.get(template)?;
        if let Some(instance) = self.pool.instance_mut(handle) {
            instance.position = position;
            instance.activated_at = now;
        }
        self.grid.insert(handle, position);
        self.active.insert(handle);
        if unique {
            self.unique_on_screen.insert(template);
        }
        Ok(handle)
    }

    /// Take an instance out of play: grid, unique set, then pool.
    ///
    /// Returns false when the handle was not active.
    pub fn despawn(&mut self, handle: InstanceHandle) -> bool {
        if !self.active.remove(&handle) {
            return false;
        }
        if let Some(instance) = self.pool.instance(handle) {
            self.grid.remove(handle, instance.position);
        }
        if self
            .catalog
            .get(handle.template)
            .is_some_and(Template::is_unique_on_screen)
        {
            self.unique_on_screen.remove(&handle.template);
        }
        self.pool.release(handle);
        true
    }

    /// Bookkeeping hook for despawns decided outside the spawner, such as a
    /// pickup being collected.
    pub fn on_instance_despawned(&mut self, handle: InstanceHandle, template: TemplateId) -> bool {
        if handle.template != template {
            warn!("despawn notice for {} names {}", handle, template);
            return false;
        }
        let despawned = self.despawn(handle);
        if despawned {
            self.stats.consumed += 1;
        }
        despawned
    }

    /// Despawn a destroyed instance and spawn the loot its template drops.
    ///
    /// Returns the handles of the spawned drops.
    pub fn on_instance_destroyed(
        &mut self,
        handle: InstanceHandle,
        loot: &mut LootTables,
        now: f64,
    ) -> Vec<InstanceHandle> {
        let Some(origin) = self.instance(handle).map(|i| i.position) else {
            return Vec::new();
        };
        let table = self
            .catalog
            .get(handle.template)
            .and_then(|t| t.death.drop_table())
            .cloned();

        self.despawn(handle);
        self.stats.destroyed += 1;

        match table {
            Some(table) => self.drop_loot(handle, &table, origin, loot, now),
            None => Vec::new(),
        }
    }

    /// Roll the drop table of a live instance without despawning it, as when
    /// a hit knocks loot off a target that survives.
    pub fn roll_drops_for(
        &mut self,
        handle: InstanceHandle,
        loot: &mut LootTables,
        now: f64,
    ) -> Vec<InstanceHandle> {
        let Some(origin) = self.instance(handle).map(|i| i.position) else {
            return Vec::new();
        };
        let Some(table) = self
            .catalog
            .get(handle.template)
            .and_then(|t| t.death.drop_table())
            .cloned()
        else {
            return Vec::new();
        };
        self.drop_loot(handle, &table, origin, loot, now)
    }

    fn drop_loot(
        &mut self,
        owner: InstanceHandle,
        table: &DropTableId,
        origin: WorldPos,
        loot: &mut LootTables,
        now: f64,
    ) -> Vec<InstanceHandle> {
        let max = self.config.max_drops_per_trigger;
        let Some(drops) = loot.roll(table, Some(owner), max, now, &mut self.rng) else {
            warn!("{} drops from unregistered table '{}'", owner, table);
            return Vec::new();
        };
        self.spawn_drops(&drops, origin, now)
    }

    /// Place `templates` around `origin` within the drop scatter radius.
    ///
    /// Drops ignore overlap rules and the active limit but still respect
    /// unique-on-screen.
    pub fn spawn_drops(
        &mut self,
        templates: &[TemplateId],
        origin: WorldPos,
        now: f64,
    ) -> Vec<InstanceHandle> {
        let (min_x, max_x) = self.config.lateral_bounds();
        let (low, high) = (min_x.min(max_x), max_x.max(min_x));

        let mut spawned = Vec::with_capacity(templates.len());
        for &id in templates {
            let Some(template) = self.catalog.get(id) else {
                warn!("drop names unknown {}", id);
                continue;
            };
            let unique = template.is_unique_on_screen();
            if unique && self.unique_on_screen.contains(&id) {
                continue;
            }

            let offset = scatter_offset(self.config.drop_scatter, &mut self.rng);
            let position = WorldPos::new((origin.x + offset.x).clamp(low, high), origin.y + offset.y);
            match self.activate(id, position, now, unique) {
                Ok(handle) => spawned.push(handle),
                Err(err) => warn!("drop skipped: {}", err),
            }
        }
        self.stats.drops += spawned.len() as u64;
        spawned
    }

    /// Pull attractable instances toward `head`.
    ///
    /// While `magnet_active`, instances inside the magnet triangle ahead of
    /// `head` lock on. Locked instances keep moving toward `head` until they
    /// are pooled. Returns the number of instances moved.
    pub fn apply_magnet(
        &mut self,
        head: WorldPos,
        forward: WorldPos,
        magnet_active: bool,
        dt: f64,
    ) -> usize {
        let forward = forward.normalized();
        let can_lock = magnet_active && forward != WorldPos::ZERO;

        let mut moved = 0;
        for &handle in &self.active {
            let Some(template) = self.catalog.get(handle.template) else {
                continue;
            };
            if !template.is_attractable() {
                continue;
            }
            let Some(instance) = self.pool.instance_mut(handle) else {
                continue;
            };
            if !instance.pulled {
                if !can_lock || !template.magnet.contains(instance.position, head, forward) {
                    continue;
                }
                instance.pulled = true;
            }

            let from = instance.position;
            let to = from.move_towards(head, template.magnet.pull_speed * dt.max(0.0));
            instance.position = to;
            self.grid.relocate(handle, from, to);
            moved += 1;
        }
        moved
    }

    /// Return every active instance to its pool, clear grid and unique set,
    /// and put the frontier back at `reference + lead_distance`.
    ///
    /// Returns the released handles.
    pub fn reset(&mut self) -> Vec<InstanceHandle> {
        let released: Vec<InstanceHandle> = std::mem::take(&mut self.active).into_iter().collect();
        for &handle in &released {
            if let Some(instance) = self.pool.instance(handle) {
                self.grid.remove(handle, instance.position);
            }
            self.pool.release(handle);
        }
        self.grid.clear();
        self.unique_on_screen.clear();
        if let Some(reference) = self.reference {
            self.frontier = reference.y + self.config.lead_distance;
        }
        info!(
            "spawner reset: {} instances returned, frontier at {:.2}",
            released.len(),
            self.frontier
        );
        released
    }
}

fn overlap_rules_apply(config: &SpawnerConfig, template: &Template) -> bool {
    config.no_overlap || template.avoids_all_overlap() || template.same_kind_radius.is_some()
}

fn placement_blocked(
    config: &SpawnerConfig,
    grid: &SpatialHashGrid,
    template: &Template,
    position: WorldPos,
) -> bool {
    let general = (config.no_overlap || template.avoids_all_overlap())
        && grid.overlaps_any(position, config.min_overlap_distance);
    let same_kind = template
        .same_kind_radius
        .is_some_and(|radius| grid.overlaps_template(position, template.id, radius));
    general || same_kind
}

fn random_lateral(min_x: f64, max_x: f64, rng: &mut impl Rng) -> f64 {
    if min_x < max_x {
        rng.gen_range(min_x..max_x)
    } else {
        (min_x + max_x) / 2.0
    }
}

fn find_placement(
    config: &SpawnerConfig,
    grid: &SpatialHashGrid,
    template: &Template,
    row_y: f64,
    rng: &mut impl Rng,
) -> Option<WorldPos> {
    let (min_x, max_x) = config.lateral_bounds();
    if !overlap_rules_apply(config, template) {
        return Some(WorldPos::new(random_lateral(min_x, max_x, rng), row_y));
    }
    (0..config.placement_attempts)
        .map(|_| WorldPos::new(random_lateral(min_x, max_x, rng), row_y))
        .find(|&candidate| !placement_blocked(config, grid, template, candidate))
}

/// Uniform point in a disc of `radius`.
fn scatter_offset(radius: f64, rng: &mut impl Rng) -> WorldPos {
    if radius <= 0.0 {
        return WorldPos::ZERO;
    }
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let dist = radius * rng.gen::<f64>().sqrt();
    WorldPos::new(angle.cos() * dist, angle.sin() * dist)
}
