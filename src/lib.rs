//! # braid-code-sim
//!
//! Compiler and exact stabilizer simulator for surface-code braiding diagrams.
//!
//! A braiding diagram is a 3D arrangement of plumbing pieces (defect lines,
//! junctions, and blocks) on a unit-cell grid, with one axis playing the role
//! of time. This crate compiles such a diagram into a time-ordered sequence of
//! stabilizer-measurement rounds and replays those rounds on an exact
//! (CHP-style tableau) stabilizer simulator, producing a measurement outcome
//! per spacetime event.
//!
//! ## Pipeline
//!
//! - [`plumbing::UnitCellMap`]: the edited 3D structure, with implied-neighbor
//!   resolution keeping it self-consistent.
//! - [`compile::unit_cell_map_to_tile_stacks`]: walks the structure, picks a
//!   simulation bounding box, and emits one [`stack::TileStack`] per
//!   discretized time transition.
//! - [`stack::TileStack`]: rounds of lockstep operations plus the classical
//!   propagation graph and pending Pauli feedforward. Measuring a qubit
//!   converts its pending quantum corrections into classical XOR edges.
//! - [`surface::Surface`]: one simulated qubit per grid cell on top of a
//!   [`chp::ChpState`] tableau; every measurement is immediately followed by a
//!   deterministic re-preparation to |0⟩.
//! - [`compile::SimulationResults`]: outcomes keyed by spacetime event, the
//!   only state that crosses the renderer boundary.
//!
//! Only Clifford-group dynamics are tracked (no amplitudes, no decoding);
//! state is exact bit-level linear algebra suitable for moderate qubit counts.

pub mod coords;
pub mod error;
pub mod pauli;
pub mod graph;
pub mod feedforward;
pub mod chp;
pub mod surface;
pub mod tile;
pub mod stack;
pub mod layout;
pub mod plumbing;
pub mod compile;

pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::pauli::*;
    pub use crate::graph::*;
    pub use crate::feedforward::*;
    pub use crate::chp::*;
    pub use crate::surface::*;
    pub use crate::tile::*;
    pub use crate::stack::*;
    pub use crate::layout::*;
    pub use crate::plumbing::*;
    pub use crate::compile::*;
}
