//! Voronoi face tracing: the exit face of the current cell along a ray.

use specline_grid::Grid;
use specline_math::{Point3, Vec3};

/// The outcome of a face trace: the distance to the cell's exit face and
/// the index of the point whose cell lies beyond it.
#[derive(Debug, Clone, Copy)]
pub struct FaceExit {
    /// Distance from the ray position to the exit face, always positive.
    pub ds: f64,
    /// Index of the next cell's grid point. Equal to the current index
    /// when no face qualified (boundary policy: the walk stays in the
    /// current cell and the caller's path bound terminates it).
    pub next: usize,
}

/// Find the nearest Voronoi face of cell `posn` crossed by the ray at `x`
/// in direction `dx`.
///
/// Each neighbor relation defines a face plane through the midpoint of the
/// point-to-neighbor vector, normal to that vector. The signed distance
/// along the ray is `(face_point - x) . n / (dx . n)`; faces parallel to
/// the ray are skipped. The winner is the smallest distance above
/// `cutoff` and below `span`, the remaining distance to the model's far
/// side.
pub fn exit_face(grid: &Grid, posn: usize, x: &Point3, dx: &Vec3, cutoff: f64, span: f64) -> FaceExit {
    let point = &grid.points()[posn];
    let mut ds = span;
    let mut next = None;

    for nb in &point.neighbors {
        let face_point = point.position + 0.5 * nb.face_dir;
        let numerator = (face_point - x).dot(&nb.face_dir);
        let denominator = dx.dot(&nb.face_dir);
        if denominator.abs() > 0.0 {
            let dist = numerator / denominator;
            if dist < ds && dist > cutoff {
                ds = dist;
                next = Some(nb.point);
            }
        }
    }

    FaceExit {
        ds,
        next: next.unwrap_or(posn),
    }
}
