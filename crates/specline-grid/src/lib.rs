#![warn(missing_docs)]

//! Unstructured model grid and tessellation interfaces for specline.
//!
//! The model is a cloud of grid points carrying physical fields, connected
//! by Voronoi neighbor relations and (optionally) tessellated into Delaunay
//! cells. Both stores are index-based arenas: neighbor and vertex relations
//! are plain indices into the owning vectors, never pointers.
//!
//! # Architecture
//!
//! - [`Grid`] / [`GridPoint`] - the point arena with per-point physics
//! - [`DelaunayMesh`] / [`DelaunayCell`] - the tetrahedral cell arena
//! - [`ChainWalker`] - the collaborator interface that walks a ray through
//!   the Delaunay complex, yielding per-cell entry/exit intercepts
//!
//! Grid construction, field assignment, and the tessellation algorithm
//! itself live with external collaborators; this crate only defines the
//! shapes the ray tracer consumes.

pub mod cell;
pub mod error;
pub mod point;
pub mod walk;

pub use cell::{DelaunayCell, DelaunayMesh};
pub use error::{GridError, Result};
pub use point::{Grid, GridPoint, Neighbor, PointSpecies};
pub use walk::{
    CellCrossing, ChainWalker, FaceIntercept, RayChain, WalkError, CELL_FACES, FACE_VERTICES,
    WALK_EPSILON,
};
