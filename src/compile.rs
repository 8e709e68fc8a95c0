//! The braid compiler and simulation driver.
//!
//! Compilation walks a [`UnitCellMap`], determines the simulation bounding
//! box, and emits one [`TileStack`] per discretized transition instant. A
//! "clear X stabilizers" stack runs first: it measures every stabilizer once
//! (projecting the lattice into a definite eigenstate) and registers
//! parity-chain Z corrections up each odd column so every X plaquette whose
//! first outcome was -1 is restored to +1. Subsequent stacks measure the
//! stabilizers left enabled by the active pieces' occupied footprints, with
//! each piece contributing its signal-propagation edges.
//!
//! [`run_simulation`] drives the stacks across one persistent [`Surface`]
//! and collects every outcome into [`SimulationResults`].

use rand::Rng;
use std::collections::BTreeMap;

use crate::coords::{XY, XYT};
use crate::error::{Error, Result};
use crate::layout::{important_unit_cell_times, SimulationLayout};
use crate::plumbing::{FootprintRect, LocalizedPiece, PieceRegistry, SocketId, UnitCellMap};
use crate::stack::TileStack;
use crate::surface::{Measurement, Surface};

fn even_floor(v: i32) -> i32 {
    v - v.rem_euclid(2)
}

fn even_ceil(v: i32) -> i32 {
    v + v.rem_euclid(2)
}

/// Bounding box of the compiled simulation: the union of every piece's
/// footprint, padded by two cells and rounded to even boundaries so the
/// ancilla lattice has headroom, with the unit-cell y index as the time
/// extent. An empty map yields a degenerate empty layout; a piece whose
/// footprint reaches negative grid coordinates is rejected, since the
/// simulated lattice starts at the origin.
pub fn determine_simulation_layout(
    map: &UnitCellMap,
    registry: &PieceRegistry,
    code_distance: i32,
) -> Result<SimulationLayout> {
    let pieces = map.localized_pieces(registry)?;
    if pieces.is_empty() {
        return Ok(SimulationLayout::new(0, -1, 0, -1, 0, -1));
    }
    let mut layout = SimulationLayout::new(i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX, i32::MIN);
    for piece in &pieces {
        let fp = piece.footprint(code_distance);
        if fp.min_x < 0 || fp.min_y < 0 {
            return Err(Error::PieceOutOfBounds(piece.cell));
        }
        layout.min_x = layout.min_x.min(fp.min_x);
        layout.max_x = layout.max_x.max(fp.max_x);
        layout.min_y = layout.min_y.min(fp.min_y);
        layout.max_y = layout.max_y.max(fp.max_y);
        layout.min_t = layout.min_t.min(piece.cell.y);
        layout.max_t = layout.max_t.max(piece.cell.y);
    }
    layout.min_x = even_floor(layout.min_x - 2).max(0);
    layout.max_x = even_ceil(layout.max_x + 2);
    layout.min_y = even_floor(layout.min_y - 2).max(0);
    layout.max_y = even_ceil(layout.max_y + 2);
    Ok(layout)
}

/// One full stabilizer-measurement round per time slot in the layout.
pub fn make_measure_all_stabilizers_tile_stack(layout: &SimulationLayout) -> Result<TileStack> {
    let x_targets = layout.x_stabilizers();
    let z_targets = layout.z_stabilizers();
    let mut stack = TileStack::new();
    for t in layout.min_t..=layout.max_t {
        if t > layout.min_t {
            stack.start_new_tile();
        }
        stack.measure_stabilizers(&x_targets, &z_targets, &|_| true)?;
    }
    Ok(stack)
}

/// A single round that measures every stabilizer and registers the Z
/// corrections that restore all X plaquettes to +1.
///
/// Each X plaquette's correction is a chain of conditional Z gates on the
/// data cells directly above it in its column, running to the top boundary.
/// A chain flips its own plaquette once and every X plaquette further up an
/// even number of times, so overlapping chains cancel and each plaquette is
/// corrected exactly when its own first outcome was -1.
pub fn make_clear_x_stabilizers_tile_stack(layout: &SimulationLayout) -> Result<TileStack> {
    let x_targets = layout.x_stabilizers();
    let z_targets = layout.z_stabilizers();
    let mut stack = TileStack::new();
    stack.measure_stabilizers(&x_targets, &z_targets, &|_| true)?;
    for &stab in &x_targets {
        let control = XYT::new(stab.x, stab.y, 0);
        let mut row = stab.y - 1;
        while row >= 0 {
            stack.feedforward_z(control, XY::new(stab.x, row));
            row -= 2;
        }
    }
    Ok(stack)
}

/// Compile a structure into its ordered stacks: the clear-X stack, then one
/// stack per transition instant of every time step. Each instant's stack
/// carries the active pieces' propagation edges and measures every
/// stabilizer not covered by an active footprint.
pub fn unit_cell_map_to_tile_stacks(
    map: &UnitCellMap,
    registry: &PieceRegistry,
    code_distance: i32,
) -> Result<Vec<TileStack>> {
    let layout = determine_simulation_layout(map, registry, code_distance)?;
    let pieces = map.localized_pieces(registry)?;
    let x_targets = layout.x_stabilizers();
    let z_targets = layout.z_stabilizers();

    let mut stacks = vec![make_clear_x_stabilizers_tile_stack(&layout)?];
    for t_step in layout.min_t..=layout.max_t {
        for (transition, &local) in important_unit_cell_times().iter().enumerate() {
            let instant = t_step as f64 + local;
            let active: Vec<&LocalizedPiece> =
                pieces.iter().filter(|p| p.is_active_at(instant)).collect();

            let mut stack = TileStack::new();
            for piece in &active {
                if let Some(propagate) = piece.piece.propagate {
                    propagate(&mut stack, piece, code_distance, transition);
                }
            }
            let occupied: Vec<FootprintRect> =
                active.iter().map(|p| p.footprint(code_distance)).collect();
            let is_enabled = |xy: XY| !occupied.iter().any(|fp| fp.contains(xy));
            stack.measure_stabilizers(&x_targets, &z_targets, &is_enabled)?;
            stacks.push(stack);
        }
    }
    Ok(stacks)
}

/// Every measurement outcome of a completed simulation, keyed by event.
#[derive(Debug, Clone, Default)]
pub struct SimulationResults {
    measurements: BTreeMap<XYT, Measurement>,
}

impl SimulationResults {
    pub fn new(measurements: BTreeMap<XYT, Measurement>) -> Self {
        SimulationResults { measurements }
    }

    /// The outcome recorded at `event`, if that cell was measured then.
    pub fn get(&self, event: XYT) -> Option<Measurement> {
        self.measurements.get(&event).copied()
    }

    pub fn measurements(&self) -> &BTreeMap<XYT, Measurement> {
        &self.measurements
    }

    /// Display value for rendering a placed piece: the parity of every
    /// stabilizer outcome recorded inside the piece's footprint, across all
    /// rounds. `None` when nothing in the footprint was ever measured.
    pub fn display_value(&self, piece: &LocalizedPiece, code_distance: i32) -> Option<bool> {
        let fp = piece.footprint(code_distance);
        let mut seen = false;
        let mut parity = false;
        for (&event, m) in &self.measurements {
            if fp.contains(event.xy()) {
                seen = true;
                parity ^= m.result;
            }
        }
        seen.then_some(parity)
    }

    /// Display value looked up by location and socket.
    pub fn display_value_at(
        &self,
        registry: &PieceRegistry,
        cell: crate::plumbing::CellPoint,
        socket: SocketId,
        code_distance: i32,
    ) -> Option<bool> {
        let piece = LocalizedPiece { cell, piece: *registry.piece_for_socket(socket) };
        self.display_value(&piece, code_distance)
    }
}

/// Compile and run a structure on a fresh lattice, returning every outcome.
pub fn run_simulation<R: Rng + ?Sized>(
    map: &UnitCellMap,
    registry: &PieceRegistry,
    code_distance: i32,
    rng: &mut R,
) -> Result<SimulationResults> {
    let layout = determine_simulation_layout(map, registry, code_distance)?;
    let stacks = unit_cell_map_to_tile_stacks(map, registry, code_distance)?;
    let mut surface = Surface::new(layout.width(), layout.height());
    let mut measurements = BTreeMap::new();
    let mut base_t = 0;
    for stack in &stacks {
        stack.simulate_on(&mut surface, base_t, &mut measurements, rng)?;
        base_t += stack.num_tiles() as i32;
    }
    Ok(SimulationResults::new(measurements))
}
