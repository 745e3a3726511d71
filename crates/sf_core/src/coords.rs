use serde::{Deserialize, Serialize};

/// Continuous play-field position using f64 for precision.
///
/// `x` is the lateral axis across the track, `y` grows in the scroll direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const ZERO: WorldPos = WorldPos::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: WorldPos) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: WorldPos) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn dot(&self, other: WorldPos) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn sub(&self, other: WorldPos) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalized(&self) -> Self {
        let len = (self.x * self.x + self.y * self.y).sqrt();
        if len <= f64::EPSILON {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Move towards `target` by at most `max_step`, never overshooting it.
    pub fn move_towards(&self, target: WorldPos, max_step: f64) -> Self {
        let delta = target.sub(*self);
        let dist = self.distance(target);
        if dist <= max_step || dist <= f64::EPSILON {
            return target;
        }
        let dir = delta.normalized();
        self.offset(dir.x * max_step, dir.y * max_step)
    }
}

/// Key of a spatial hash cell: `floor(position / cell_size)` on each axis.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_world(pos: WorldPos, cell_size: f64) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            y: (pos.y / cell_size).floor() as i32,
        }
    }

    /// The 3×3 block of cells centred on this one, centre included.
    pub fn neighborhood(self) -> impl Iterator<Item = CellCoord> {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| CellCoord::new(self.x + dx, self.y + dy)))
    }
}
