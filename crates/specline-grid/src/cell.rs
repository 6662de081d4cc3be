//! The Delaunay cell arena.

use specline_math::{Point3, Vec3};

use crate::error::{GridError, Result};
use crate::point::Grid;
use crate::walk::{CELL_FACES, FACE_VERTICES};

/// A tetrahedral Delaunay cell: four vertex indices into the grid arena,
/// a centroid, and an id equal to its index in the cell list.
#[derive(Debug, Clone)]
pub struct DelaunayCell {
    /// Index of this cell in the mesh.
    pub id: usize,
    /// Vertex indices into the grid-point arena.
    pub vertices: [usize; CELL_FACES],
    /// Mean of the four vertex positions.
    pub centroid: Point3,
}

impl DelaunayCell {
    /// The three vertex indices of face `face` (the face opposite vertex
    /// `face`), in ascending vertex-slot order.
    ///
    /// Barycentric coordinates attached to a [`crate::FaceIntercept`] refer
    /// to the vertices in exactly this order.
    pub fn face_vertices(&self, face: usize) -> [usize; FACE_VERTICES] {
        let mut out = [0usize; FACE_VERTICES];
        let mut n = 0;
        for (slot, &v) in self.vertices.iter().enumerate() {
            if slot != face {
                out[n] = v;
                n += 1;
            }
        }
        out
    }
}

/// The tessellation arena: an immutable list of tetrahedral cells produced
/// by the external tessellation collaborator.
#[derive(Debug, Clone)]
pub struct DelaunayMesh {
    cells: Vec<DelaunayCell>,
}

impl DelaunayMesh {
    /// Build the mesh from raw vertex tuples, computing centroids and
    /// assigning ids equal to list indices.
    pub fn new(vertex_tuples: Vec<[usize; CELL_FACES]>, grid: &Grid) -> Result<Self> {
        let mut cells = Vec::with_capacity(vertex_tuples.len());
        for (id, vertices) in vertex_tuples.into_iter().enumerate() {
            let mut sum = Vec3::zeros();
            for &v in &vertices {
                if v >= grid.len() {
                    return Err(GridError::VertexOutOfBounds { cell: id, vertex: v });
                }
                sum += grid.points()[v].position.coords;
            }
            cells.push(DelaunayCell {
                id,
                vertices,
                centroid: Point3::from(sum / CELL_FACES as f64),
            });
        }
        Ok(Self { cells })
    }

    /// The cell arena.
    pub fn cells(&self) -> &[DelaunayCell] {
        &self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the mesh holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
