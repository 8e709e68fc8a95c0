//! Lattice geometry for the simulated patch.
//!
//! The surface code packs two interleaved check sublattices and the data
//! qubits onto one integer grid: data qubits sit on mixed-parity cells
//! ((x + y) odd), X-check ancillas on odd-odd cells, and Z-check ancillas
//! on even-even cells. Horizontally or vertically adjacent checks of the
//! same type share one data qubit and commute trivially; diagonally
//! adjacent checks of opposite type share two and commute as well, so the
//! full set of plaquettes is simultaneously measurable.
//!
//! Code distance maps to physical extent through the pipe width: every
//! defect pipe is `(d + 3) / 4` plaquettes across per side, defects are
//! separated by three pipe widths, and one unit cell of the input geometry
//! spans eight pipe widths of lattice.

use crate::coords::XY;

/// Bounding region of a simulation, in lattice cells and rounds.
///
/// Bounds are inclusive; a max below its min denotes an empty extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationLayout {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_t: i32,
    pub max_t: i32,
}

impl SimulationLayout {
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32, min_t: i32, max_t: i32) -> Self {
        SimulationLayout { min_x, max_x, min_y, max_y, min_t, max_t }
    }

    /// Lattice width in cells, zero when the x extent is empty.
    pub fn width(&self) -> usize {
        (self.max_x + 1).max(0) as usize
    }

    /// Lattice height in cells, zero when the y extent is empty.
    pub fn height(&self) -> usize {
        (self.max_y + 1).max(0) as usize
    }

    /// Number of rounds, zero when the t extent is empty.
    pub fn num_rounds(&self) -> usize {
        (self.max_t - self.min_t + 1).max(0) as usize
    }

    /// Data qubits sit on mixed-parity cells.
    pub fn is_data(xy: XY) -> bool {
        (xy.x + xy.y).rem_euclid(2) == 1
    }

    /// Check ancillas occupy every even-parity cell.
    pub fn is_stabilizer(xy: XY) -> bool {
        (xy.x + xy.y).rem_euclid(2) == 0
    }

    /// X-check ancillas sit on odd-odd cells.
    pub fn is_x_stabilizer(xy: XY) -> bool {
        xy.x.rem_euclid(2) == 1 && xy.y.rem_euclid(2) == 1
    }

    /// Z-check ancillas sit on even-even cells.
    pub fn is_z_stabilizer(xy: XY) -> bool {
        xy.x.rem_euclid(2) == 0 && xy.y.rem_euclid(2) == 0
    }

    /// All X-type ancilla cells inside the layout, in row-major order.
    pub fn x_stabilizers(&self) -> Vec<XY> {
        self.stabilizers_matching(Self::is_x_stabilizer)
    }

    /// All Z-type ancilla cells inside the layout, in row-major order.
    pub fn z_stabilizers(&self) -> Vec<XY> {
        self.stabilizers_matching(Self::is_z_stabilizer)
    }

    fn stabilizers_matching(&self, pred: fn(XY) -> bool) -> Vec<XY> {
        let mut found = Vec::new();
        for y in self.min_y.max(0)..=self.max_y {
            for x in self.min_x.max(0)..=self.max_x {
                let xy = XY::new(x, y);
                if pred(xy) {
                    found.push(xy);
                }
            }
        }
        found
    }
}

/// Cross-section of a defect pipe, in plaquettes per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeSize {
    pub w: i32,
    pub h: i32,
}

/// Pipe cross-section needed to protect at code distance `d`.
pub fn code_distance_to_pipe_size(code_distance: i32) -> PipeSize {
    assert!(code_distance >= 1, "code distance must be positive");
    let side = (code_distance + 3) / 4;
    PipeSize { w: side, h: side }
}

/// Lattice cells between the near edges of adjacent defects.
pub fn pipe_separation(code_distance: i32) -> i32 {
    3 * code_distance_to_pipe_size(code_distance).w
}

/// Lattice cells spanned by one unit cell of the input geometry.
pub fn unit_cell_span(code_distance: i32) -> i32 {
    8 * code_distance_to_pipe_size(code_distance).w
}

/// Fraction of a unit cell occupied by a pipe along its short axes.
pub const PIPE_FRACTION: f64 = 1.0 / 8.0;

/// Unit-cell-local times at which the set of active pieces can change:
/// the start of the cell, the end of the entering pipe segment, the
/// midpoint, and the end of the mid-cell pipe segment.
pub fn important_unit_cell_times() -> [f64; 4] {
    [0.0, PIPE_FRACTION, 0.5, 0.5 + PIPE_FRACTION]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_size_at_distance_seven() {
        assert_eq!(code_distance_to_pipe_size(7), PipeSize { w: 2, h: 2 });
    }

    #[test]
    fn test_pipe_size_grows_with_distance() {
        assert_eq!(code_distance_to_pipe_size(1), PipeSize { w: 1, h: 1 });
        assert_eq!(code_distance_to_pipe_size(5), PipeSize { w: 2, h: 2 });
        assert_eq!(code_distance_to_pipe_size(9), PipeSize { w: 3, h: 3 });
        for d in 1..30 {
            let s = code_distance_to_pipe_size(d);
            let next = code_distance_to_pipe_size(d + 1);
            assert_eq!(s.w, s.h, "pipes stay square at d={}", d);
            assert!(next.w >= s.w, "pipe width never shrinks at d={}", d);
            assert!(next.w <= s.w + 1, "pipe width grows by at most one cell at d={}", d);
        }
    }

    #[test]
    fn test_cell_classification_partitions_the_lattice() {
        for y in 0..6 {
            for x in 0..6 {
                let xy = XY::new(x, y);
                let data = SimulationLayout::is_data(xy);
                let x_stab = SimulationLayout::is_x_stabilizer(xy);
                let z_stab = SimulationLayout::is_z_stabilizer(xy);
                assert_eq!(
                    data as u8 + x_stab as u8 + z_stab as u8,
                    1,
                    "({}, {}) must be exactly one of data, X check, Z check",
                    x,
                    y
                );
                assert_eq!(SimulationLayout::is_stabilizer(xy), x_stab || z_stab);
            }
        }
    }

    #[test]
    fn test_stabilizer_types_by_sublattice() {
        assert!(SimulationLayout::is_x_stabilizer(XY::new(1, 1)));
        assert!(SimulationLayout::is_x_stabilizer(XY::new(3, 1)));
        assert!(SimulationLayout::is_z_stabilizer(XY::new(0, 0)));
        assert!(SimulationLayout::is_z_stabilizer(XY::new(2, 4)));
        assert!(!SimulationLayout::is_stabilizer(XY::new(1, 0)));
    }

    #[test]
    fn test_neighboring_checks_share_an_even_number_of_data_qubits() {
        // Opposite-type checks are diagonal neighbors and overlap on two
        // data qubits, so the full check set commutes.
        let overlap = |a: XY, b: XY| {
            let mut n = 0;
            for (dx, dy) in crate::coords::NEIGHBOR_OFFSETS {
                for (ex, ey) in crate::coords::NEIGHBOR_OFFSETS {
                    if a.offset_by(dx, dy) == b.offset_by(ex, ey) {
                        n += 1;
                    }
                }
            }
            n
        };
        assert_eq!(overlap(XY::new(1, 1), XY::new(2, 2)), 2);
        assert_eq!(overlap(XY::new(1, 1), XY::new(0, 2)), 2);
        assert_eq!(overlap(XY::new(1, 1), XY::new(4, 4)), 0);
    }

    #[test]
    fn test_stabilizer_enumeration() {
        let layout = SimulationLayout::new(0, 2, 0, 2, 0, 0);
        assert_eq!(layout.x_stabilizers(), vec![XY::new(1, 1)]);
        assert_eq!(
            layout.z_stabilizers(),
            vec![XY::new(0, 0), XY::new(2, 0), XY::new(0, 2), XY::new(2, 2)]
        );
    }

    #[test]
    fn test_empty_extent_collapses_to_zero() {
        let layout = SimulationLayout::new(0, -1, 0, -1, 0, -1);
        assert_eq!(layout.width(), 0);
        assert_eq!(layout.height(), 0);
        assert_eq!(layout.num_rounds(), 0);
    }

    #[test]
    fn test_important_times_are_ordered_fractions() {
        let times = important_unit_cell_times();
        for pair in times.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(times[3] < 1.0);
    }
}
