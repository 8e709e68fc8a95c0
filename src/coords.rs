//! Spatial key types for the simulation grid.
//!
//! The simulator addresses qubits on a 2D integer grid via [`XY`], and
//! measurement events on the same grid extended by a discrete round index via
//! [`XYT`]. Stabilizer types and measurement bases are both two-valued and
//! share the [`Axis`] tag.

/// A 2D simulation-grid cell.
///
/// `must_be_active` is a query modifier: when set, lookups treat the cell as
/// nonexistent if it has been disabled (a hole). It participates in equality
/// so that active-only and plain addressing of the same cell remain distinct
/// keys, matching how the compiler builds its schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XY {
    pub x: i32,
    pub y: i32,
    pub must_be_active: bool,
}

impl XY {
    /// Cell at (x, y) with no activity requirement.
    pub fn new(x: i32, y: i32) -> Self {
        XY { x, y, must_be_active: false }
    }

    /// Cell at (x, y) that must not be disabled to be addressed.
    pub fn must_be_active(x: i32, y: i32) -> Self {
        XY { x, y, must_be_active: true }
    }

    /// The same cell with the activity requirement stripped.
    pub fn plain(&self) -> XY {
        XY::new(self.x, self.y)
    }

    /// Offset by (dx, dy), keeping the activity requirement.
    pub fn offset_by(&self, dx: i32, dy: i32) -> XY {
        XY { x: self.x + dx, y: self.y + dy, must_be_active: self.must_be_active }
    }

    /// True when `other` is an orthogonal grid neighbor of `self`.
    pub fn is_adjacent_to(&self, other: XY) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx + dy == 1
    }
}

/// The four orthogonal grid-neighbor offsets, in the fixed order used by the
/// stabilizer-extraction schedule: left, right, up, down.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A spacetime event: one measurement opportunity at cell (x, y) in round t.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XYT {
    pub x: i32,
    pub y: i32,
    pub t: i32,
}

impl XYT {
    pub fn new(x: i32, y: i32, t: i32) -> Self {
        XYT { x, y, t }
    }

    /// The grid cell this event lives on.
    pub fn xy(&self) -> XY {
        XY::new(self.x, self.y)
    }

    /// The same event shifted forward in time, used when composing stacks.
    pub fn shifted_t(&self, dt: i32) -> XYT {
        XYT { x: self.x, y: self.y, t: self.t + dt }
    }
}

/// Stabilizer type and measurement basis tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    pub fn opposite(&self) -> Axis {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    pub fn is_x(&self) -> bool {
        matches!(self, Axis::X)
    }

    pub fn is_z(&self) -> bool {
        matches!(self, Axis::Z)
    }
}
