//! The line-profile weight at a velocity offset from line center.

use crate::fastexp::exp_neg;

/// Dimensionless argument above which the profile is cut to exactly zero.
/// A Gaussian at this argument is far below any representable
/// contribution; the cutoff guards the exponential against over/underflow
/// rather than approximating a tail.
pub const PROFILE_CUTOFF: f64 = 2500.0;

/// The line-profile weight for a velocity offset `v` from line center and
/// a reciprocal Doppler width `binv`.
#[inline]
pub fn profile(v: f64, binv: f64) -> f64 {
    let val = v.abs() * binv;
    if val <= PROFILE_CUTOFF {
        exp_neg(val * val)
    } else {
        0.0
    }
}

/// Average line-profile weight over a path, given the projected bulk
/// velocity at equally spaced sub-points along it.
///
/// `deltav` is the recession velocity of the channel under consideration
/// (already corrected for source velocity and line displacement); line
/// center occurs where it equals the local projected velocity.
pub fn amp_sampled(proj_vels: &[f64], binv: f64, deltav: f64) -> f64 {
    if proj_vels.is_empty() {
        return 0.0;
    }
    let sum: f64 = proj_vels.iter().map(|&pv| profile(deltav - pv, binv)).sum();
    sum / proj_vels.len() as f64
}

/// Line-profile weight at a single projected bulk velocity. The smooth
/// tracer samples velocity once per path segment instead of averaging,
/// since velocity varies too non-linearly across a cell for either
/// averaging or linear interpolation to hold.
#[inline]
pub fn amp_point(proj_vel: f64, binv: f64, deltav: f64) -> f64 {
    profile(deltav - proj_vel, binv)
}
