//! One fixed-depth round of parallel operations.
//!
//! A [`Tile`] schedules, per grid cell: an optional initialization basis, a
//! column of depth-indexed single-step operations, and an optional
//! measurement basis. "Lockstep" is the logical model: all qubits execute
//! step i of their column at the same circuit depth, which the scheduler
//! guarantees by padding the columns of both endpoints of a two-qubit gate to
//! a common length before appending.
//!
//! Two-qubit gates are encoded directionally: the control cell gets a
//! `Control` tag and the target cell gets a tag naming which neighbor its
//! control sits in, so replay can reconstruct the pair from the target alone.

use smallvec::SmallVec;

use rand::Rng;
use std::collections::BTreeMap;

use crate::coords::{Axis, XY, XYT};
use crate::error::{Error, Result};
use crate::surface::{Measurement, Surface};

/// Direction from a gate target toward its control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Left,
    Right,
    Up,
    Down,
}

impl Dir {
    /// Grid offset from the target to the control.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
        }
    }

    fn from_offset(dx: i32, dy: i32) -> Option<Dir> {
        match (dx, dy) {
            (-1, 0) => Some(Dir::Left),
            (1, 0) => Some(Dir::Right),
            (0, -1) => Some(Dir::Up),
            (0, 1) => Some(Dir::Down),
            _ => None,
        }
    }
}

/// A single-step operation tag in a tile column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOp {
    /// Hadamard on this cell.
    H,
    /// This cell is the control of a two-qubit gate this step; replay is
    /// driven from the target side, so this is a no-op tag.
    Control,
    /// This cell is the target of a CNOT whose control sits in the named
    /// neighboring cell.
    CnotTargetOf(Dir),
    /// Pauli X, realized on the surface as H·S·S·H.
    PauliX,
    /// Pauli Z, realized on the surface as S·S.
    PauliZ,
}

/// An ordered sequence of per-step slots for one cell; `None` slots are
/// padding inserted to keep parallel gates depth-aligned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileColumn {
    ops: SmallVec<[Option<TileOp>; 8]>,
}

impl TileColumn {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn op_at(&self, step: usize) -> Option<TileOp> {
        self.ops.get(step).copied().flatten()
    }

    fn pad_to(&mut self, depth: usize) {
        while self.ops.len() < depth {
            self.ops.push(None);
        }
    }

    fn push(&mut self, op: TileOp) {
        self.ops.push(Some(op));
    }
}

/// One round of the compiled circuit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tile {
    initializations: BTreeMap<XY, Axis>,
    operations: BTreeMap<XY, TileColumn>,
    measurements: BTreeMap<XY, Axis>,
}

impl Tile {
    pub fn new() -> Self {
        Tile::default()
    }

    /// Common depth of the schedule (length of the longest column).
    pub fn depth(&self) -> usize {
        self.operations.values().map(TileColumn::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.initializations.is_empty()
            && self.operations.is_empty()
            && self.measurements.is_empty()
    }

    pub fn initialization_at(&self, xy: XY) -> Option<Axis> {
        self.initializations.get(&xy).copied()
    }

    pub fn measurement_at(&self, xy: XY) -> Option<Axis> {
        self.measurements.get(&xy).copied()
    }

    pub fn column_at(&self, xy: XY) -> Option<&TileColumn> {
        self.operations.get(&xy)
    }

    /// Cells scheduled for measurement, with their bases, in cell order.
    pub fn measurements(&self) -> impl Iterator<Item = (XY, Axis)> + '_ {
        self.measurements.iter().map(|(&xy, &axis)| (xy, axis))
    }

    /// Request that `target` start this round reset into an eigenstate of
    /// `axis`. Fails if already initialized or already operated on.
    pub fn init(&mut self, target: XY, axis: Axis) -> Result<()> {
        if self.initializations.contains_key(&target) {
            return Err(Error::DoubleInit(target));
        }
        if self.operations.get(&target).is_some_and(|col| !col.is_empty()) {
            return Err(Error::InitAfterOperations(target));
        }
        self.initializations.insert(target, axis);
        Ok(())
    }

    /// Request that `target` end this round measured along `axis`.
    pub fn measure(&mut self, target: XY, axis: Axis) -> Result<()> {
        if self.measurements.contains_key(&target) {
            return Err(Error::DoubleMeasure(target));
        }
        self.measurements.insert(target, axis);
        Ok(())
    }

    pub fn hadamard(&mut self, target: XY) {
        self.operations.entry(target).or_default().push(TileOp::H);
    }

    pub fn pauli_x(&mut self, target: XY) {
        self.operations.entry(target).or_default().push(TileOp::PauliX);
    }

    pub fn pauli_z(&mut self, target: XY) {
        self.operations.entry(target).or_default().push(TileOp::PauliZ);
    }

    /// Schedule a CNOT between orthogonal grid neighbors, aligning both
    /// columns to a common depth first so the pair executes in one step.
    pub fn cnot(&mut self, control: XY, target: XY) -> Result<()> {
        if !control.plain().is_adjacent_to(target.plain()) {
            return Err(Error::NonAdjacentCnot(control, target));
        }
        let dir = Dir::from_offset(control.x - target.x, control.y - target.y)
            .expect("adjacent cells always have a direction");
        let depth = self
            .operations
            .get(&control)
            .map_or(0, TileColumn::len)
            .max(self.operations.get(&target).map_or(0, TileColumn::len));
        let control_col = self.operations.entry(control).or_default();
        control_col.pad_to(depth);
        control_col.push(TileOp::Control);
        let target_col = self.operations.entry(target).or_default();
        target_col.pad_to(depth);
        target_col.push(TileOp::CnotTargetOf(dir));
        Ok(())
    }

    /// Pad every column to the current common depth, closing a parallel
    /// group so the next appends start on a fresh step.
    pub fn synchronize(&mut self) {
        let depth = self.depth();
        for col in self.operations.values_mut() {
            col.pad_to(depth);
        }
    }

    /// Replay this round on a surface: initializations, then the depth steps
    /// in order, then measurements recorded into `results` at round `t`.
    ///
    /// Measurements address cells through their stored coordinates, so
    /// active-only coordinates on disabled cells record nothing.
    pub fn simulate_on<R: Rng + ?Sized>(
        &self,
        surface: &mut Surface,
        t: i32,
        results: &mut BTreeMap<XYT, Measurement>,
        rng: &mut R,
    ) {
        for (&xy, &axis) in &self.initializations {
            surface.measure_and_reset(xy, rng);
            if axis.is_x() {
                surface.hadamard(xy);
            }
        }

        for step in 0..self.depth() {
            for (&xy, col) in &self.operations {
                match col.op_at(step) {
                    None | Some(TileOp::Control) => {}
                    Some(TileOp::H) => surface.hadamard(xy),
                    Some(TileOp::PauliX) => {
                        surface.hadamard(xy);
                        surface.phase(xy);
                        surface.phase(xy);
                        surface.hadamard(xy);
                    }
                    Some(TileOp::PauliZ) => {
                        surface.phase(xy);
                        surface.phase(xy);
                    }
                    Some(TileOp::CnotTargetOf(dir)) => {
                        let (dx, dy) = dir.offset();
                        surface.cnot(xy.offset_by(dx, dy), xy);
                    }
                }
            }
        }

        for (&xy, &axis) in &self.measurements {
            if !surface.has_qubit(xy) {
                continue;
            }
            if axis.is_x() {
                surface.hadamard(xy);
            }
            let m = surface.measure_and_reset(xy, rng);
            results.insert(XYT::new(xy.x, xy.y, t), m);
        }
    }
}
