//! Continuum, line, and polarized source-function evaluation.
//!
//! All three operate on precomputed [`SpeciesAux`] bundles so they are
//! equally usable with per-point values (piecewise tracer) and with
//! barycentrically interpolated values (smooth tracer).

use specline_math::Vec3;

use crate::aux::SpeciesAux;
use crate::consts::HPIP;
use crate::data::MolData;

/// Maximum linear polarization fraction of dust emission.
pub const MAX_POLARIZATION: f64 = 0.15;

/// Add the continuum (dust) contribution for one line to the emission and
/// absorption coefficients, returning the updated pair.
pub fn continuum(aux: &SpeciesAux, li: usize, jnu: f64, alpha: f64) -> (f64, f64) {
    (jnu + aux.dust[li] * aux.knu[li], alpha + aux.knu[li])
}

/// Add one spectral line's contribution, weighted by the line-shape value
/// `vfac`, to the emission and absorption coefficients.
pub fn line(
    md: &MolData,
    vfac: f64,
    aux: &SpeciesAux,
    li: usize,
    jnu: f64,
    alpha: f64,
) -> (f64, f64) {
    let upper = aux.spec_num_dens[md.lau[li]];
    let lower = aux.spec_num_dens[md.lal[li]];
    (
        jnu + vfac * HPIP * upper * md.aeinst[li],
        alpha + vfac * HPIP * (lower * md.beinstl[li] - upper * md.beinstu[li]),
    )
}

/// Polarized (Stokes I, Q, U) source function for dust emission in a
/// magnetic field, plus the optical-depth increment over a path `ds`.
///
/// `incl` is the inclination of the image line of sight. The Stokes
/// weights come from the plane-of-sky projection of the field: `gamma` is
/// the angle of the field out of the plane of the sky and `phi` its
/// position angle within it.
pub fn polarized(
    ds: f64,
    b: &Vec3,
    md: &MolData,
    aux: &SpeciesAux,
    li: usize,
    incl: f64,
) -> ([f64; 3], f64) {
    let upper = aux.spec_num_dens[md.lau[li]];
    let lower = aux.spec_num_dens[md.lal[li]];
    let jnu = upper * md.aeinst[li] * HPIP;
    let alpha = (lower * md.beinstl[li] - upper * md.beinstu[li]) * HPIP;
    let dtau = alpha * ds;

    if alpha == 0.0 {
        return ([0.0; 3], dtau);
    }

    let (cos_2phi, sin_2phi, cos2_gamma) = stokes_trig(b, incl);
    let snu = jnu / alpha * md.norminv;
    (
        [
            snu * (1.0 - MAX_POLARIZATION * (cos2_gamma - 2.0 / 3.0)),
            snu * MAX_POLARIZATION * cos_2phi * cos2_gamma,
            snu * MAX_POLARIZATION * sin_2phi * cos2_gamma,
        ],
        dtau,
    )
}

/// Trigonometric weights of the field orientation seen by the observer:
/// `(cos 2phi, sin 2phi, cos^2 gamma)`.
fn stokes_trig(b: &Vec3, incl: f64) -> (f64, f64, f64) {
    // Rotate the field into the observer frame (inclination about x).
    let (s, c) = incl.sin_cos();
    let bx = b.x;
    let by = b.y * c + b.z * s;
    let bz = -b.y * s + b.z * c;

    let b2d = bx * bx + by * by;
    let b2 = b2d + bz * bz;
    if b2 == 0.0 {
        // No field direction: unpolarized.
        return (0.0, 0.0, 0.0);
    }
    if b2d == 0.0 {
        // Field along the line of sight: no preferred sky angle.
        return (0.0, 0.0, 0.0);
    }
    (
        (bx * bx - by * by) / b2d,
        2.0 * bx * by / b2d,
        b2d / b2,
    )
}
