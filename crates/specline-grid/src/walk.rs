//! The Delaunay chain-walker collaborator interface.
//!
//! The walker itself (the incremental face-to-face traversal of the
//! tessellation) belongs to the tessellation collaborator; this module
//! defines the query contract and the intercept records the ray tracer
//! consumes.

use specline_math::{Point3, Vec3};
use thiserror::Error;

/// Faces (and vertices) per tetrahedral cell.
pub const CELL_FACES: usize = 4;

/// Tolerance for point-in-face tests during a chain walk. Double
/// precision is much finer than this; the slack absorbs rounding
/// accumulated across long chains.
pub const WALK_EPSILON: f64 = 1.0e-6;

/// Vertices per triangular face.
pub const FACE_VERTICES: usize = 3;

/// The intersection of a ray with one face of a cell.
///
/// `face` is the index of the vertex opposite the intersected face, so the
/// face's own vertices are the cell's other three, in ascending slot order
/// (see [`crate::DelaunayCell::face_vertices`]). `bary` holds the
/// barycentric coordinates of the intersection point with respect to those
/// three vertices, in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceIntercept {
    /// Index (0..4) of the vertex opposite the intersected face.
    pub face: usize,
    /// Barycentric coordinates of the intersection point on the face.
    pub bary: [f64; FACE_VERTICES],
    /// Distance from the ray origin to the intersection point.
    pub dist: f64,
}

/// One cell traversed by a ray, with the intercept where the ray leaves it.
#[derive(Debug, Clone, Copy)]
pub struct CellCrossing {
    /// Index of the traversed cell in the mesh.
    pub cell: usize,
    /// Where the ray exits this cell.
    pub exit: FaceIntercept,
}

/// The ordered chain of cells a ray passes through.
#[derive(Debug, Clone)]
pub struct RayChain {
    /// Where the ray enters the first cell of the chain.
    pub entry: FaceIntercept,
    /// The traversed cells in path order, each with its exit intercept.
    pub crossings: Vec<CellCrossing>,
}

/// Failure modes of a chain walk. All of them make the affected ray a null
/// contribution; none is fatal to the render.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkError {
    /// The ray does not intersect the tessellation at all.
    #[error("ray does not intersect the tessellation")]
    Miss,

    /// The traversal hit degenerate geometry (e.g. a ray running along a
    /// face) and could not continue.
    #[error("degenerate geometry during chain walk")]
    Degenerate,
}

/// The chain-walking query offered by the tessellation collaborator.
pub trait ChainWalker: Sync {
    /// Walk a ray (given by origin and direction, pointing away from the
    /// observer) through the tessellation, returning the ordered chain of
    /// traversed cells or a failure.
    fn walk(&self, origin: &Point3, dir: &Vec3) -> Result<RayChain, WalkError>;
}
