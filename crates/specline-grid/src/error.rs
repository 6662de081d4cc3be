//! Error types for grid and mesh construction.

use thiserror::Error;

/// Errors that can occur while assembling a grid or mesh.
#[derive(Error, Debug)]
pub enum GridError {
    /// The grid has no points at all.
    #[error("grid is empty")]
    Empty,

    /// A non-sink point has no Voronoi neighbors.
    #[error("non-sink point {0} has no neighbors")]
    IsolatedPoint(usize),

    /// Interior points must precede sink points in the arena.
    #[error("sink point {0} precedes an interior point")]
    SinkOrdering(usize),

    /// A neighbor relation points outside the arena.
    #[error("point {point}: neighbor index {neighbor} out of bounds")]
    NeighborOutOfBounds {
        /// The point carrying the bad relation.
        point: usize,
        /// The out-of-bounds neighbor index.
        neighbor: usize,
    },

    /// A cell vertex points outside the grid arena.
    #[error("cell {cell}: vertex index {vertex} out of bounds")]
    VertexOutOfBounds {
        /// The cell carrying the bad vertex.
        cell: usize,
        /// The out-of-bounds vertex index.
        vertex: usize,
    },
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
