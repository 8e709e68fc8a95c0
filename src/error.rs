//! Fatal structural errors.
//!
//! Every variant here indicates that the braid structure or the compiler
//! produced an inconsistent schedule. There is no recovery path; callers
//! abort the current compile/simulate cycle and surface the error upward.

use thiserror::Error;

use crate::coords::XY;
use crate::plumbing::CellPoint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Two-qubit gates are only allowed between orthogonal grid neighbors.
    #[error("cnot between non-adjacent cells ({0:?}, {1:?})")]
    NonAdjacentCnot(XY, XY),

    /// A qubit may be initialized at most once per tile.
    #[error("cell {0:?} initialized twice in one tile")]
    DoubleInit(XY),

    /// Initialization must precede any operation on that qubit in the tile.
    #[error("cell {0:?} initialized after operations were already scheduled")]
    InitAfterOperations(XY),

    /// A qubit may be measured at most once per tile.
    #[error("cell {0:?} measured twice in one tile")]
    DoubleMeasure(XY),

    /// The classical propagation graph must be acyclic.
    #[error("classical propagation graph contains a cycle")]
    CyclicPropagation,

    /// Target relabeling must be a bijection.
    #[error("target relabeling collided on a key")]
    TargetCollision,

    /// Lookup of a piece name the registry does not define.
    #[error("unknown plumbing piece {0:?}")]
    UnknownPiece(&'static str),

    /// The simulation grid starts at the origin, so a piece whose footprint
    /// reaches negative grid coordinates cannot be compiled.
    #[error("piece at cell {0:?} extends to negative grid coordinates")]
    PieceOutOfBounds(CellPoint),
}

pub type Result<T> = std::result::Result<T, Error>;
