//! Spatial hash grid over active instance positions.
//!
//! Instances are bucketed by `floor(position / cell_size)`. Overlap queries
//! inspect the 3×3 block of cells around the query point, so the cell size
//! must be at least the largest distance ever queried. That precondition is
//! validated when the spawner configuration is loaded, not here.

use std::collections::HashMap;

use sf_core::{CellCoord, InstanceHandle, TemplateId, WorldPos};

/// One registered instance inside a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridEntry {
    pub handle: InstanceHandle,
    pub position: WorldPos,
}

impl GridEntry {
    pub fn template(&self) -> TemplateId {
        self.handle.template
    }
}

#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f64,
    cells: HashMap<CellCoord, Vec<GridEntry>>,
    len: usize,
}

impl SpatialHashGrid {
    /// Create a grid whose cells are `cell_size` wide on both axes.
    ///
    /// # Panics
    /// If `cell_size` is not a positive finite number.
    pub fn new(cell_size: f64) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "grid cell size must be positive, got {}",
            cell_size
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_of(&self, position: WorldPos) -> CellCoord {
        CellCoord::from_world(position, self.cell_size)
    }

    /// Register `handle` at `position`.
    pub fn insert(&mut self, handle: InstanceHandle, position: WorldPos) {
        let cell = self.cell_of(position);
        self.cells
            .entry(cell)
            .or_default()
            .push(GridEntry { handle, position });
        self.len += 1;
    }

    /// Deregister `handle` from the cell of `position`.
    ///
    /// `position` must be the one last used to insert the handle. Returns
    /// whether anything was removed; removing twice is a no-op.
    pub fn remove(&mut self, handle: InstanceHandle, position: WorldPos) -> bool {
        let cell = self.cell_of(position);
        let Some(entries) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(idx) = entries.iter().position(|e| e.handle == handle) else {
            return false;
        };

        entries.swap_remove(idx);
        if entries.is_empty() {
            self.cells.remove(&cell);
        }
        self.len -= 1;
        true
    }

    /// Move a registered handle from `from` to `to`.
    pub fn relocate(&mut self, handle: InstanceHandle, from: WorldPos, to: WorldPos) -> bool {
        if !self.remove(handle, from) {
            return false;
        }
        self.insert(handle, to);
        true
    }

    /// Whether any entry accepted by `filter` lies strictly closer than `min_distance` to `position`.
    pub fn query_overlap<F>(&self, position: WorldPos, min_distance: f64, filter: F) -> bool
    where
        F: Fn(&GridEntry) -> bool,
    {
        let min_sq = min_distance * min_distance;
        self.cell_of(position).neighborhood().any(|cell| {
            self.cells.get(&cell).is_some_and(|entries| {
                entries
                    .iter()
                    .any(|e| filter(e) && e.position.distance_squared(position) < min_sq)
            })
        })
    }

    /// Overlap against every registered instance.
    pub fn overlaps_any(&self, position: WorldPos, min_distance: f64) -> bool {
        self.query_overlap(position, min_distance, |_| true)
    }

    /// Overlap against instances of one template only.
    pub fn overlaps_template(&self, position: WorldPos, template: TemplateId, min_distance: f64) -> bool {
        self.query_overlap(position, min_distance, |e| e.template() == template)
    }

    /// Every entry in the 3×3 block around `position`.
    pub fn neighbors(&self, position: WorldPos) -> impl Iterator<Item = &GridEntry> + '_ {
        self.cell_of(position)
            .neighborhood()
            .filter_map(move |cell| self.cells.get(&cell))
            .flatten()
    }

    pub fn entries(&self) -> impl Iterator<Item = &GridEntry> + '_ {
        self.cells.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(template: u32, slot: u32) -> InstanceHandle {
        InstanceHandle::new(TemplateId(template), slot)
    }

    #[test]
    fn overlap_near_and_far() {
        let mut grid = SpatialHashGrid::new(2.0);
        grid.insert(handle(1, 0), WorldPos::new(0.0, 0.0));

        assert!(grid.overlaps_any(WorldPos::new(0.5, 0.5), 0.8));
        assert!(!grid.overlaps_any(WorldPos::new(5.0, 5.0), 0.8));
    }

    #[test]
    fn overlap_crosses_cell_boundaries() {
        let mut grid = SpatialHashGrid::new(2.0);
        // Just left of a cell boundary, query just right of it.
        grid.insert(handle(1, 0), WorldPos::new(1.9, 3.9));
        assert!(grid.overlaps_any(WorldPos::new(2.1, 4.1), 0.5));
        // Negative cells are neighbours of zero cells.
        grid.insert(handle(1, 1), WorldPos::new(-0.1, -0.1));
        assert!(grid.overlaps_any(WorldPos::new(0.1, 0.1), 0.5));
    }

    #[test]
    fn distance_equal_to_minimum_is_not_overlap() {
        let mut grid = SpatialHashGrid::new(2.0);
        grid.insert(handle(1, 0), WorldPos::new(0.0, 0.0));
        assert!(!grid.overlaps_any(WorldPos::new(1.0, 0.0), 1.0));
    }

    #[test]
    fn template_filter_ignores_other_kinds() {
        let mut grid = SpatialHashGrid::new(2.0);
        grid.insert(handle(1, 0), WorldPos::new(0.0, 0.0));

        assert!(!grid.overlaps_template(WorldPos::new(0.2, 0.0), TemplateId(2), 1.0));
        assert!(grid.overlaps_template(WorldPos::new(0.2, 0.0), TemplateId(1), 1.0));
    }

    #[test]
    fn remove_is_idempotent_and_drops_empty_cells() {
        let mut grid = SpatialHashGrid::new(2.0);
        let h = handle(1, 0);
        let pos = WorldPos::new(3.0, 3.0);
        grid.insert(h, pos);
        assert_eq!(grid.len(), 1);

        assert!(grid.remove(h, pos));
        assert!(!grid.remove(h, pos));
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
        assert!(!grid.overlaps_any(pos, 1.0));
    }

    #[test]
    fn relocate_moves_between_cells() {
        let mut grid = SpatialHashGrid::new(2.0);
        let h = handle(1, 0);
        grid.insert(h, WorldPos::new(0.0, 10.0));
        assert!(grid.relocate(h, WorldPos::new(0.0, 10.0), WorldPos::new(0.0, 4.0)));

        assert!(!grid.overlaps_any(WorldPos::new(0.0, 10.0), 0.5));
        assert!(grid.overlaps_any(WorldPos::new(0.0, 4.0), 0.5));
        assert_eq!(grid.len(), 1);
        assert!(!grid.relocate(handle(9, 9), WorldPos::ZERO, WorldPos::ZERO));
    }

    #[test]
    fn neighbors_only_reports_local_block() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(handle(1, 0), WorldPos::new(0.5, 0.5));
        grid.insert(handle(1, 1), WorldPos::new(1.5, 1.5));
        grid.insert(handle(1, 2), WorldPos::new(8.5, 8.5));

        let near: Vec<_> = grid.neighbors(WorldPos::new(0.5, 0.5)).map(|e| e.handle.slot).collect();
        assert_eq!(near.len(), 2);
        assert!(!near.contains(&2));
    }

    #[test]
    fn clear_empties_everything() {
        let mut grid = SpatialHashGrid::new(2.0);
        for slot in 0..10 {
            grid.insert(handle(1, slot), WorldPos::new(slot as f64, 0.0));
        }
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.entries().count(), 0);
    }
}
