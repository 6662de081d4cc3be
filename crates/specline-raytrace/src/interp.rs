//! Barycentric and along-path interpolation of field bundles.
//!
//! The smooth tracer keeps exactly three of these records alive: the
//! entry and exit faces of the current cell and the working segment
//! midpoint. Each is overwritten every cell/segment; nothing here is ever
//! persisted.

use specline_grid::{FaceIntercept, Grid, FACE_VERTICES};
use specline_math::{Point3, Vec3};
use specline_mol::{MolData, PointAux, SpeciesAux};

/// A bundle of field values interpolated at a point on a cell face (or,
/// for the working record, between two faces).
#[derive(Debug, Clone)]
pub struct InterpRecord {
    /// Displacement of the point along the ray direction.
    pub x_cmpnt_ray: f64,
    /// Position of the point in model space.
    pub position: Point3,
    /// Interpolated magnetic field.
    pub b_field: Vec3,
    /// Interpolated per-species auxiliary quantities.
    pub mol: Vec<SpeciesAux>,
}

impl InterpRecord {
    /// An all-zero record shaped for the given species tables.
    pub fn zeroed(mols: &[MolData]) -> Self {
        Self {
            x_cmpnt_ray: 0.0,
            position: Point3::origin(),
            b_field: Vec3::zeros(),
            mol: mols.iter().map(SpeciesAux::zeroed).collect(),
        }
    }
}

/// Fill `dst` with the field bundle at a face intercept.
///
/// `vert_ids` are the grid indices of the face's three vertices in the
/// order the intercept's barycentric coordinates refer to, and
/// `x_cmpnts` their displacements along the ray direction.
pub fn bary_interp(
    dst: &mut InterpRecord,
    icpt: &FaceIntercept,
    grid: &Grid,
    aux: &[PointAux],
    vert_ids: &[usize; FACE_VERTICES],
    x_cmpnts: &[f64; FACE_VERTICES],
) {
    dst.x_cmpnt_ray = 0.0;
    dst.position = Point3::origin();
    dst.b_field = Vec3::zeros();
    for sp in &mut dst.mol {
        sp.binv = 0.0;
        sp.spec_num_dens.fill(0.0);
        sp.dust.fill(0.0);
        sp.knu.fill(0.0);
    }

    for vi in 0..FACE_VERTICES {
        let w = icpt.bary[vi];
        let gi = vert_ids[vi];
        let gp = &grid.points()[gi];

        dst.x_cmpnt_ray += w * x_cmpnts[vi];
        dst.position += w * gp.position.coords;
        dst.b_field += w * gp.b_field;

        for (sp, src) in dst.mol.iter_mut().zip(&aux[gi].mol) {
            sp.binv += w * src.binv;
            for (d, s) in sp.spec_num_dens.iter_mut().zip(&src.spec_num_dens) {
                *d += w * s;
            }
            for (d, s) in sp.dust.iter_mut().zip(&src.dust) {
                *d += w * s;
            }
            for (d, s) in sp.knu.iter_mut().zip(&src.knu) {
                *d += w * s;
            }
        }
    }
}

/// Fill `dst` with the bundle at fraction `frac` of the way from `entry`
/// to `exit`, interpolating every quantity linearly. Velocity is absent
/// here on purpose: the tracer resamples it from the continuous field at
/// the interpolated position.
pub fn segment_interp(dst: &mut InterpRecord, entry: &InterpRecord, exit: &InterpRecord, frac: f64) {
    dst.x_cmpnt_ray = entry.x_cmpnt_ray + frac * (exit.x_cmpnt_ray - entry.x_cmpnt_ray);
    dst.position = entry.position + frac * (exit.position - entry.position);
    dst.b_field = entry.b_field + frac * (exit.b_field - entry.b_field);

    for ((sp, en), ex) in dst.mol.iter_mut().zip(&entry.mol).zip(&exit.mol) {
        sp.binv = en.binv + frac * (ex.binv - en.binv);
        for ((d, a), b) in sp
            .spec_num_dens
            .iter_mut()
            .zip(&en.spec_num_dens)
            .zip(&ex.spec_num_dens)
        {
            *d = a + frac * (b - a);
        }
        for ((d, a), b) in sp.dust.iter_mut().zip(&en.dust).zip(&ex.dust) {
            *d = a + frac * (b - a);
        }
        for ((d, a), b) in sp.knu.iter_mut().zip(&en.knu).zip(&ex.knu) {
            *d = a + frac * (b - a);
        }
    }
}
