//! The grid-point arena and Voronoi neighbor relations.

use specline_math::{Point3, Vec3};

use crate::error::{GridError, Result};

/// Per-species raw fields stored on a grid point.
///
/// Populations and number densities are produced by the external
/// level-population solver; this crate only carries them.
#[derive(Debug, Clone)]
pub struct PointSpecies {
    /// Reciprocal Doppler width (thermal + turbulent), in s/m.
    pub binv: f64,
    /// Number density of the species, in m^-3.
    pub nmol: f64,
    /// Fractional level populations, one per energy level.
    pub pops: Vec<f64>,
    /// Dust emission coefficient per line.
    pub dust: Vec<f64>,
    /// Dust opacity per line.
    pub knu: Vec<f64>,
}

/// A Voronoi neighbor relation: the vector from the owning point to its
/// neighbor (the shared face lies at the midpoint, normal to this vector)
/// and the neighbor's index in the point arena.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Vector from the owning point to the neighboring point.
    pub face_dir: Vec3,
    /// Index of the neighboring point.
    pub point: usize,
}

/// One point of the unstructured model grid.
#[derive(Debug, Clone)]
pub struct GridPoint {
    /// Position in model space.
    pub position: Point3,
    /// Bulk velocity of the material at this point.
    pub velocity: Vec3,
    /// Local magnetic field vector.
    pub b_field: Vec3,
    /// Sink points sit on the model boundary and carry background-only
    /// field values.
    pub sink: bool,
    /// Per-species fields.
    pub species: Vec<PointSpecies>,
    /// Voronoi neighbor relations.
    pub neighbors: Vec<Neighbor>,
}

/// The grid arena. Interior (emitting) points come first, sink (boundary)
/// points after; the arena is immutable once built.
#[derive(Debug, Clone)]
pub struct Grid {
    points: Vec<GridPoint>,
    n_interior: usize,
}

impl Grid {
    /// Assemble a grid from points, validating the arena invariants:
    /// interior points precede sinks, every interior point has at least one
    /// neighbor, and all neighbor indices are in bounds.
    pub fn new(points: Vec<GridPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(GridError::Empty);
        }

        let n_interior = points.iter().take_while(|p| !p.sink).count();
        for (i, p) in points.iter().enumerate().skip(n_interior) {
            if !p.sink {
                return Err(GridError::SinkOrdering(i));
            }
        }

        for (i, p) in points.iter().enumerate() {
            if !p.sink && p.neighbors.is_empty() {
                return Err(GridError::IsolatedPoint(i));
            }
            for nb in &p.neighbors {
                if nb.point >= points.len() {
                    return Err(GridError::NeighborOutOfBounds {
                        point: i,
                        neighbor: nb.point,
                    });
                }
            }
        }

        Ok(Self { points, n_interior })
    }

    /// All points, interior first.
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// The interior (non-sink) points.
    pub fn interior(&self) -> &[GridPoint] {
        &self.points[..self.n_interior]
    }

    /// Number of points in the arena.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the arena is empty. Construction rejects empty grids, so
    /// this is always false for a built `Grid`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of interior points.
    pub fn n_interior(&self) -> usize {
        self.n_interior
    }

    /// Index of the point nearest to `pos`. Linear scan over the arena;
    /// ties resolve to the lowest index.
    pub fn nearest(&self, pos: &Point3) -> usize {
        let mut best = 0;
        let mut best_d2 = (pos - self.points[0].position).norm_squared();
        for (i, p) in self.points.iter().enumerate().skip(1) {
            let d2 = (pos - p.position).norm_squared();
            if d2 < best_d2 {
                best = i;
                best_d2 = d2;
            }
        }
        best
    }
}
