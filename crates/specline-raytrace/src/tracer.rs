//! The two ray integrators: piecewise-constant Voronoi walking and
//! smooth Delaunay-chain interpolation.
//!
//! Both solve the same RTE per channel; they differ only in how fields
//! are evaluated along the path. A notional photon starts at the side of
//! the model nearest the observer and propagates in the receding
//! direction until it leaves the far side.

use specline_grid::{ChainWalker, DelaunayMesh, Grid};
use specline_math::{Point3, Vec3};
use specline_mol::{self as mol, LineRef, MolData, PointAux, SpeciesAux};
use specline_mol::consts::CLIGHT;

use crate::facetrace::exit_face;
use crate::fastexp::exp_neg;
use crate::interp::{bary_interp, segment_interp, InterpRecord};
use crate::lineshape::{amp_point, amp_sampled};
use crate::ray::{channel_velocity, RaySpectrum};
use crate::render::ResolvedImage;
use crate::rte::segment_terms;

/// Velocity sub-samples per cell in the piecewise tracer.
pub const N_VEL_STEPS: usize = 10;

/// Interpolation segments per Delaunay cell in the smooth tracer.
pub const N_SEGMENTS: usize = 5;

/// The model's continuous bulk-velocity field, supplied by the physics
/// collaborator. Absent for pre-gridded models, which only carry
/// per-point velocities.
pub trait VelocityField: Sync {
    /// Bulk velocity at a position in model space.
    fn velocity(&self, position: &Point3) -> Vec3;
}

/// Everything a tracer needs to integrate one ray. Shared read-only
/// across all worker threads.
pub struct TraceContext<'a> {
    /// The model grid.
    pub grid: &'a Grid,
    /// Species line tables.
    pub mols: &'a [MolData],
    /// Precomputed per-point auxiliary quantities.
    pub aux: &'a [PointAux],
    /// Flattened cross-species line list.
    pub lines: &'a [LineRef],
    /// Resolved per-image parameters.
    pub img: &'a ResolvedImage,
    /// Render Stokes channels instead of spectral channels.
    pub polarization: bool,
    /// Square of the model radius.
    pub radius_squ: f64,
    /// Face-tracing cutoff distance.
    pub cutoff: f64,
    /// Continuous velocity field, if the model has one.
    pub velocity: Option<&'a dyn VelocityField>,
}

/// A ray integrator: fills one ray's per-channel intensity and optical
/// depth for an image-plane offset. Implementations are selected once per
/// image.
pub trait RayIntegrator: Sync {
    /// Integrate the RTE along the ray through image-plane offset
    /// `(xp, yp)`, leaving the result in `ray`.
    ///
    /// A ray that misses the model or the tessellation leaves `ray` all
    /// zero; that null result is physically meaningful, not an error.
    fn integrate(&self, xp: f64, yp: f64, ctx: &TraceContext<'_>, ray: &mut RaySpectrum);
}

/// Entry geometry shared by both tracers: the model-frame starting point
/// and direction for a ray at image offset `(xp, yp)`, or `None` when the
/// offset lies outside the model's projected disk.
fn enter_model(xp: f64, yp: f64, ctx: &TraceContext<'_>) -> Option<(Point3, Vec3, f64)> {
    if xp * xp + yp * yp > ctx.radius_squ {
        return None;
    }
    // Of the two intersections between the line of sight and the model
    // sphere, this is the one nearer the observer.
    let zp = -(ctx.radius_squ - xp * xp - yp * yp).sqrt();
    let x = Point3::from(ctx.img.rotation.to_model(&Vec3::new(xp, yp, zp)));
    let dx = ctx.img.rotation.line_of_sight();
    Some((x, dx, zp))
}

/// The continuum line index: the image transition when lines are being
/// rendered, line 0 otherwise.
fn continuum_line(ctx: &TraceContext<'_>) -> usize {
    if ctx.img.do_line {
        ctx.img.trans
    } else {
        0
    }
}

/// Red shift of a line with respect to the image frequency (or the
/// explicit image transition), expressed as a velocity.
fn line_red_shift(ctx: &TraceContext<'_>, md: &MolData, li: usize) -> f64 {
    match ctx.img.explicit_trans {
        Some(t) => (md.freq[t] - md.freq[li]) / md.freq[t] * CLIGHT,
        None => (ctx.img.freq - md.freq[li]) / ctx.img.freq * CLIGHT,
    }
}

/// Accumulate one path step's spectral-line and continuum contribution
/// into every channel. `vfac` maps a channel's velocity offset and a
/// species' reciprocal Doppler width to the line-shape weight for this
/// step.
fn accumulate_emission(
    ray: &mut RaySpectrum,
    ctx: &TraceContext<'_>,
    mol_aux: &[SpeciesAux],
    ds: f64,
    vfac: impl Fn(f64, f64) -> f64,
) {
    let img = ctx.img;
    let (cont_jnu, cont_alpha) = mol::continuum(&mol_aux[0], continuum_line(ctx), 0.0, 0.0);
    let half_band = img.bandwidth * 0.5;

    for ichan in 0..ray.nchan() {
        let mut jnu = cont_jnu;
        let mut alpha = cont_alpha;
        let v_chan = channel_velocity(ichan, img.nchan, img.velres);

        for lr in ctx.lines {
            let md = &ctx.mols[lr.mol];
            let line_freq = md.freq[lr.line];
            if img.do_line
                && line_freq > img.freq - half_band
                && line_freq < img.freq + half_band
            {
                let deltav = v_chan - img.source_vel - line_red_shift(ctx, md, lr.line);
                let weight = vfac(deltav, mol_aux[lr.mol].binv);
                (jnu, alpha) = mol::line(md, weight, &mol_aux[lr.mol], lr.line, jnu, alpha);
            }
        }

        let dtau = alpha * ds;
        let remnant = segment_terms(dtau).remnant * jnu * ctx.mols[0].norminv * ds;
        ray.intensity[ichan] += exp_neg(ray.tau[ichan]) * remnant;
        ray.tau[ichan] += dtau;
    }
}

/// Accumulate one path step's Stokes contributions in polarized mode.
fn accumulate_polarized(
    ray: &mut RaySpectrum,
    ctx: &TraceContext<'_>,
    mol_aux: &[SpeciesAux],
    b_field: &Vec3,
    ds: f64,
) {
    debug_assert!(ray.nchan() <= 3);
    let (snu, dtau) = mol::polarized(ds, b_field, &ctx.mols[0], &mol_aux[0], 0, ctx.img.theta);
    for s in 0..ray.nchan() {
        ray.intensity[s] += exp_neg(ray.tau[s]) * (1.0 - exp_neg(dtau)) * snu[s];
        ray.tau[s] += dtau;
    }
}

/// Add the cosmic-background contribution, attenuated by the total
/// optical depth, to every channel.
fn add_background(ray: &mut RaySpectrum, ctx: &TraceContext<'_>) {
    let cmb = ctx.mols[0].local_cmb[ctx.img.trans];
    for ichan in 0..ray.nchan() {
        ray.intensity[ichan] += exp_neg(ray.tau[ichan]) * cmb;
    }
}

/// The piecewise-constant tracer: walks the Voronoi tessellation cell to
/// cell, holding all fields constant within each cell.
pub struct PiecewiseTracer;

impl RayIntegrator for PiecewiseTracer {
    fn integrate(&self, xp: f64, yp: f64, ctx: &TraceContext<'_>, ray: &mut RaySpectrum) {
        ray.reset();
        let Some((mut x, dx, zp)) = enter_model(xp, yp, ctx) else {
            return;
        };

        let span_total = 2.0 * zp.abs();
        let mut posn = ctx.grid.nearest(&x);
        let mut col = 0.0;
        let mut proj_vels = [0.0f64; N_VEL_STEPS];

        loop {
            let exit = exit_face(ctx.grid, posn, &x, &dx, ctx.cutoff, span_total - col);
            let ds = exit.ds;

            if ctx.polarization {
                let gp = &ctx.grid.points()[posn];
                accumulate_polarized(ray, ctx, &ctx.aux[posn].mol, &gp.b_field, ds);
            } else if let Some(vf) = ctx.velocity {
                // Sample the projected bulk velocity along the step; the
                // line shape is averaged over these samples.
                for (i, pv) in proj_vels.iter_mut().enumerate() {
                    let d = i as f64 * ds / N_VEL_STEPS as f64;
                    *pv = dx.dot(&vf.velocity(&(x + dx * d)));
                }
                accumulate_emission(ray, ctx, &ctx.aux[posn].mol, ds, |deltav, binv| {
                    amp_sampled(&proj_vels, binv, deltav)
                });
            } else {
                // Pre-gridded model: one evaluation from the cell's
                // stored velocity.
                let pv = dx.dot(&ctx.grid.points()[posn].velocity);
                accumulate_emission(ray, ctx, &ctx.aux[posn].mol, ds, |deltav, binv| {
                    amp_point(pv, binv, deltav)
                });
            }

            x += dx * ds;
            col += ds;
            posn = exit.next;
            if col >= span_total {
                break;
            }
        }

        add_background(ray, ctx);
    }
}

/// The smooth tracer: follows the ray's chain of Delaunay cells,
/// interpolating fields barycentrically at entry and exit faces and
/// linearly between them, in [`N_SEGMENTS`] sub-segments per cell.
pub struct SmoothTracer<'a> {
    mesh: &'a DelaunayMesh,
    walker: &'a dyn ChainWalker,
    velocity: &'a dyn VelocityField,
}

impl<'a> SmoothTracer<'a> {
    /// Build a smooth tracer over a tessellation.
    pub fn new(
        mesh: &'a DelaunayMesh,
        walker: &'a dyn ChainWalker,
        velocity: &'a dyn VelocityField,
    ) -> Self {
        Self {
            mesh,
            walker,
            velocity,
        }
    }

    /// Displacements of three face vertices along the ray direction.
    fn ray_components(&self, grid: &Grid, dir: &Vec3, vert_ids: &[usize; 3]) -> [f64; 3] {
        let mut out = [0.0f64; 3];
        for (o, &gi) in out.iter_mut().zip(vert_ids) {
            *o = dir.dot(&grid.points()[gi].position.coords);
        }
        out
    }
}

impl RayIntegrator for SmoothTracer<'_> {
    fn integrate(&self, xp: f64, yp: f64, ctx: &TraceContext<'_>, ray: &mut RaySpectrum) {
        ray.reset();
        let Some((x, dir, _)) = enter_model(xp, yp, ctx) else {
            return;
        };

        // A failed chain walk means this ray contributes nothing; the
        // rest of the image is unaffected.
        let Ok(chain) = self.walker.walk(&x, &dir) else {
            return;
        };
        let Some(first) = chain.crossings.first() else {
            return;
        };

        let cells = self.mesh.cells();
        let mut entry_rec = InterpRecord::zeroed(ctx.mols);
        let mut exit_rec = InterpRecord::zeroed(ctx.mols);
        let mut mid_rec = InterpRecord::zeroed(ctx.mols);

        let vert_ids = cells[first.cell].face_vertices(chain.entry.face);
        let x_cmpnts = self.ray_components(ctx.grid, &dir, &vert_ids);
        bary_interp(&mut entry_rec, &chain.entry, ctx.grid, ctx.aux, &vert_ids, &x_cmpnts);

        for crossing in &chain.crossings {
            let cell = &cells[crossing.cell];
            let vert_ids = cell.face_vertices(crossing.exit.face);
            let x_cmpnts = self.ray_components(ctx.grid, &dir, &vert_ids);
            bary_interp(&mut exit_rec, &crossing.exit, ctx.grid, ctx.aux, &vert_ids, &x_cmpnts);

            let ds = (exit_rec.x_cmpnt_ray - entry_rec.x_cmpnt_ray) / N_SEGMENTS as f64;

            for si in 0..N_SEGMENTS {
                let frac = (si as f64 + 0.5) / N_SEGMENTS as f64;
                segment_interp(&mut mid_rec, &entry_rec, &exit_rec, frac);

                if ctx.polarization {
                    accumulate_polarized(ray, ctx, &mid_rec.mol, &mid_rec.b_field, ds);
                } else {
                    // Velocity is resampled from the continuous field at
                    // the segment midpoint; interpolating it linearly
                    // across a cell is not accurate enough.
                    let pv = dir.dot(&self.velocity.velocity(&mid_rec.position));
                    accumulate_emission(ray, ctx, &mid_rec.mol, ds, |deltav, binv| {
                        amp_point(pv, binv, deltav)
                    });
                }
            }

            // The exit record becomes the next cell's entry record.
            std::mem::swap(&mut entry_rec, &mut exit_rec);
        }

        add_background(ray, ctx);
    }
}
