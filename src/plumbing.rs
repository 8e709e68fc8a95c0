//! The 3D structure the braid compiler consumes.
//!
//! A braiding diagram is a sparse map from integer cell coordinates to
//! occupied sockets. Each cell has eight sockets: a primal and a dual center
//! plus a primal and a dual pipe along each axis, where the y axis is time.
//! Pipes imply the two centers they join, so the map maintains the invariant
//! that every implied neighbor exists; centers may be removed only once no
//! remaining pipe implies them.
//!
//! Pieces are described by an immutable registry built once by a pure
//! constructor. Each descriptor is a capability record: the socket it fills,
//! its bounding box in unit coordinates relative to its cell, and an
//! optional signal-propagation callback invoked during compilation.

use std::collections::BTreeMap;

use crate::coords::{XY, XYT};
use crate::error::{Error, Result};
use crate::layout::{unit_cell_span, PIPE_FRACTION};
use crate::stack::TileStack;

/// A 3D unit-cell coordinate. `y` is the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CellPoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPoint {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        CellPoint { x, y, z }
    }

    pub fn offset_by(&self, dx: i32, dy: i32, dz: i32) -> CellPoint {
        CellPoint::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// One of the eight piece slots in a unit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SocketId {
    XPrimal,
    YPrimal,
    ZPrimal,
    XDual,
    YDual,
    ZDual,
    CenterPrimal,
    CenterDual,
}

impl SocketId {
    pub const ALL: [SocketId; 8] = [
        SocketId::XPrimal,
        SocketId::YPrimal,
        SocketId::ZPrimal,
        SocketId::XDual,
        SocketId::YDual,
        SocketId::ZDual,
        SocketId::CenterPrimal,
        SocketId::CenterDual,
    ];

    pub fn is_primal(&self) -> bool {
        matches!(
            self,
            SocketId::XPrimal | SocketId::YPrimal | SocketId::ZPrimal | SocketId::CenterPrimal
        )
    }

    /// Pieces that must silently also exist when this socket is occupied:
    /// a pipe implies the centers at both of its ends. Centers imply nothing.
    pub fn implied_neighbors(&self) -> &'static [((i32, i32, i32), SocketId)] {
        match self {
            SocketId::XPrimal => &[
                ((0, 0, 0), SocketId::CenterPrimal),
                ((1, 0, 0), SocketId::CenterPrimal),
            ],
            SocketId::YPrimal => &[
                ((0, 0, 0), SocketId::CenterPrimal),
                ((0, 1, 0), SocketId::CenterPrimal),
            ],
            SocketId::ZPrimal => &[
                ((0, 0, 0), SocketId::CenterPrimal),
                ((0, 0, 1), SocketId::CenterPrimal),
            ],
            SocketId::XDual => &[
                ((0, 0, 0), SocketId::CenterDual),
                ((1, 0, 0), SocketId::CenterDual),
            ],
            SocketId::YDual => &[
                ((0, 0, 0), SocketId::CenterDual),
                ((0, 1, 0), SocketId::CenterDual),
            ],
            SocketId::ZDual => &[
                ((0, 0, 0), SocketId::CenterDual),
                ((0, 0, 1), SocketId::CenterDual),
            ],
            SocketId::CenterPrimal | SocketId::CenterDual => &[],
        }
    }
}

/// An axis-aligned box in unit coordinates, half-open on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: [f64; 3],
    pub size: [f64; 3],
}

impl Box3 {
    pub fn new(min: [f64; 3], size: [f64; 3]) -> Self {
        Box3 { min, size }
    }

    pub fn shifted(&self, offset: [f64; 3]) -> Box3 {
        Box3 {
            min: [
                self.min[0] + offset[0],
                self.min[1] + offset[1],
                self.min[2] + offset[2],
            ],
            size: self.size,
        }
    }

    /// Whether `y` falls inside the box's vertical (time) extent.
    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.min[1] && y < self.min[1] + self.size[1]
    }
}

/// Inclusive rectangle of simulation-grid cells covered by a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootprintRect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl FootprintRect {
    pub fn contains(&self, xy: XY) -> bool {
        xy.x >= self.min_x && xy.x <= self.max_x && xy.y >= self.min_y && xy.y <= self.max_y
    }
}

/// Signal-propagation callback: contributes feedforward edges to the stack
/// being built for one transition instant.
pub type PropagateFn = fn(&mut TileStack, &LocalizedPiece, i32, usize);

/// An immutable piece descriptor.
#[derive(Debug, Clone, Copy)]
pub struct PlumbingPiece {
    pub name: &'static str,
    pub socket: SocketId,
    /// Bounds in unit coordinates relative to the piece's cell origin.
    pub bounds: Box3,
    pub propagate: Option<PropagateFn>,
}

/// A piece placed at a concrete cell.
#[derive(Debug, Clone, Copy)]
pub struct LocalizedPiece {
    pub cell: CellPoint,
    pub piece: PlumbingPiece,
}

impl LocalizedPiece {
    /// Bounds in absolute unit coordinates.
    pub fn bounds(&self) -> Box3 {
        self.piece
            .bounds
            .shifted([self.cell.x as f64, self.cell.y as f64, self.cell.z as f64])
    }

    /// Whether the piece is active at absolute time position `y`.
    pub fn is_active_at(&self, y: f64) -> bool {
        self.bounds().contains_y(y)
    }

    /// Simulation-grid cells covered by the piece's (x, z) projection at the
    /// given code distance. Grid x tracks unit x, grid y tracks unit z.
    pub fn footprint(&self, code_distance: i32) -> FootprintRect {
        let span = unit_cell_span(code_distance) as f64;
        let b = self.bounds();
        let scale = |lo: f64, len: f64| -> (i32, i32) {
            ((lo * span).floor() as i32, ((lo + len) * span).ceil() as i32 - 1)
        };
        let (min_x, max_x) = scale(b.min[0], b.size[0]);
        let (min_y, max_y) = scale(b.min[2], b.size[2]);
        FootprintRect { min_x, max_x, min_y, max_y }
    }
}

fn align_odd_down(v: i32) -> i32 {
    if v.rem_euclid(2) == 1 {
        v
    } else {
        v - 1
    }
}

fn align_odd_up(v: i32) -> i32 {
    if v.rem_euclid(2) == 1 {
        v
    } else {
        v + 1
    }
}

/// Propagation for horizontal pipes. At the pipe's first active transition,
/// the X check one row past the occupied band controls an X correction along
/// the pipe's low-edge data cells. That check sits outside every footprint
/// of the pipe and its implied centers, so the same stack measures it.
/// Where a corrected data cell borders a measured Z ancilla, readout
/// converts the correction into a classical edge, carrying the signal past
/// the pipe's end.
fn propagate_along_pipe(
    stack: &mut TileStack,
    piece: &LocalizedPiece,
    code_distance: i32,
    transition: usize,
) {
    let first_active = if piece.piece.socket.is_primal() { 0 } else { 2 };
    if transition != first_active {
        return;
    }
    let fp = piece.footprint(code_distance);
    match piece.piece.socket {
        SocketId::XPrimal | SocketId::XDual => {
            let mid = align_odd_down((fp.min_x + fp.max_x) / 2);
            let control = XYT::new(mid, align_odd_up(fp.max_y + 1), stack.current_t());
            for x in fp.min_x..=fp.max_x {
                if (x + fp.min_y).rem_euclid(2) == 1 {
                    stack.feedforward_x(control, XY::new(x, fp.min_y));
                }
            }
        }
        SocketId::ZPrimal | SocketId::ZDual => {
            let mid = align_odd_down((fp.min_y + fp.max_y) / 2);
            let control = XYT::new(align_odd_up(fp.max_x + 1), mid, stack.current_t());
            for y in fp.min_y..=fp.max_y {
                if (fp.min_x + y).rem_euclid(2) == 1 {
                    stack.feedforward_x(control, XY::new(fp.min_x, y));
                }
            }
        }
        _ => {}
    }
}

/// The fixed piece catalog, keyed by name, with socket-indexed defaults.
#[derive(Debug, Clone)]
pub struct PieceRegistry {
    by_name: BTreeMap<&'static str, PlumbingPiece>,
    by_socket: BTreeMap<SocketId, &'static str>,
}

impl PieceRegistry {
    /// The standard catalog: one piece per socket. Centers occupy a
    /// pipe-fraction cube at the cell origin (dual shifted by half a cell);
    /// pipes span from their low center to the next cell's center.
    pub fn standard() -> Self {
        let p = PIPE_FRACTION;
        let long = 1.0;
        let center = |name, socket, dual: f64| PlumbingPiece {
            name,
            socket,
            bounds: Box3::new([dual, dual, dual], [p, p, p]),
            propagate: None,
        };
        let pipe = |name, socket, axis: usize, dual: f64, propagate| {
            let mut min = [dual, dual, dual];
            let mut size = [p, p, p];
            min[axis] += p;
            size[axis] = long;
            PlumbingPiece { name, socket, bounds: Box3::new(min, size), propagate }
        };
        let pieces = [
            center("center_primal", SocketId::CenterPrimal, 0.0),
            center("center_dual", SocketId::CenterDual, 0.5),
            pipe("pipe_x_primal", SocketId::XPrimal, 0, 0.0, Some(propagate_along_pipe as PropagateFn)),
            pipe("pipe_y_primal", SocketId::YPrimal, 1, 0.0, None),
            pipe("pipe_z_primal", SocketId::ZPrimal, 2, 0.0, Some(propagate_along_pipe as PropagateFn)),
            pipe("pipe_x_dual", SocketId::XDual, 0, 0.5, Some(propagate_along_pipe as PropagateFn)),
            pipe("pipe_y_dual", SocketId::YDual, 1, 0.5, None),
            pipe("pipe_z_dual", SocketId::ZDual, 2, 0.5, Some(propagate_along_pipe as PropagateFn)),
        ];
        let mut by_name = BTreeMap::new();
        let mut by_socket = BTreeMap::new();
        for piece in pieces {
            by_name.insert(piece.name, piece);
            by_socket.insert(piece.socket, piece.name);
        }
        PieceRegistry { by_name, by_socket }
    }

    pub fn piece(&self, name: &'static str) -> Result<&PlumbingPiece> {
        self.by_name.get(name).ok_or(Error::UnknownPiece(name))
    }

    /// The catalog piece filling `socket`.
    pub fn piece_for_socket(&self, socket: SocketId) -> &PlumbingPiece {
        let name = self.by_socket[&socket];
        &self.by_name[name]
    }

    pub fn pieces(&self) -> impl Iterator<Item = &PlumbingPiece> + '_ {
        self.by_name.values()
    }
}

/// Sockets occupied within one cell, each holding a catalog piece name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCell {
    pieces: BTreeMap<SocketId, &'static str>,
}

impl UnitCell {
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece_at(&self, socket: SocketId) -> Option<&'static str> {
        self.pieces.get(&socket).copied()
    }
}

/// A sparse 3D structure of placed pieces.
#[derive(Debug, Clone, Default)]
pub struct UnitCellMap {
    cells: BTreeMap<CellPoint, UnitCell>,
}

impl UnitCellMap {
    pub fn new() -> Self {
        UnitCellMap { cells: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn piece_at(&self, cell: CellPoint, socket: SocketId) -> Option<&'static str> {
        self.cells.get(&cell).and_then(|c| c.piece_at(socket))
    }

    /// Place a piece by name, then restore the implied-neighbor invariant.
    pub fn put(
        &mut self,
        registry: &PieceRegistry,
        cell: CellPoint,
        name: &'static str,
    ) -> Result<()> {
        let piece = registry.piece(name)?;
        self.cells
            .entry(cell)
            .or_default()
            .pieces
            .insert(piece.socket, piece.name);
        self.add_implied_neighbors(registry);
        Ok(())
    }

    /// Fill every missing implied neighbor, to a fixpoint. A pipe's implied
    /// center can itself never imply more, but the loop does not rely on
    /// that.
    pub fn add_implied_neighbors(&mut self, registry: &PieceRegistry) {
        loop {
            let mut missing: Vec<(CellPoint, SocketId)> = Vec::new();
            for (&cell, unit) in &self.cells {
                for &socket in unit.pieces.keys() {
                    for &((dx, dy, dz), implied) in socket.implied_neighbors() {
                        let at = cell.offset_by(dx, dy, dz);
                        if self.piece_at(at, implied).is_none() {
                            missing.push((at, implied));
                        }
                    }
                }
            }
            if missing.is_empty() {
                return;
            }
            for (cell, socket) in missing {
                let piece = registry.piece_for_socket(socket);
                self.cells
                    .entry(cell)
                    .or_default()
                    .pieces
                    .insert(socket, piece.name);
            }
        }
    }

    /// Whether some other occupied socket implies the given slot.
    pub fn is_implied(&self, cell: CellPoint, socket: SocketId) -> bool {
        for (&other_cell, unit) in &self.cells {
            for &other_socket in unit.pieces.keys() {
                if other_cell == cell && other_socket == socket {
                    continue;
                }
                for &((dx, dy, dz), implied) in other_socket.implied_neighbors() {
                    if other_cell.offset_by(dx, dy, dz) == cell && implied == socket {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Remove the piece at the given slot unless another piece still implies
    /// it. Returns whether a removal happened.
    pub fn remove_if_lonely(&mut self, cell: CellPoint, socket: SocketId) -> bool {
        if self.piece_at(cell, socket).is_none() || self.is_implied(cell, socket) {
            return false;
        }
        if let Some(unit) = self.cells.get_mut(&cell) {
            unit.pieces.remove(&socket);
            if unit.is_empty() {
                self.cells.remove(&cell);
            }
            return true;
        }
        false
    }

    /// Every placed piece with its cell, in deterministic order.
    pub fn localized_pieces(&self, registry: &PieceRegistry) -> Result<Vec<LocalizedPiece>> {
        let mut found = Vec::new();
        for (&cell, unit) in &self.cells {
            for &name in unit.pieces.values() {
                found.push(LocalizedPiece { cell, piece: *registry.piece(name)? });
            }
        }
        Ok(found)
    }
}
