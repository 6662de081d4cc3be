//! The image render orchestrator: channel resolution, density-adaptive
//! ray counts, parallel dispatch, and per-pixel accumulation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use specline_grid::{ChainWalker, DelaunayMesh, Grid};
use specline_math::Rotation;
use specline_mol::consts::CLIGHT;
use specline_mol::{build_aux, line_refs, MolData};

use crate::config::{ImageParams, RayAlgorithm, RenderConfig};
use crate::error::{RenderError, Result};
use crate::ray::RaySpectrum;
use crate::tracer::{PiecewiseTracer, RayIntegrator, SmoothTracer, TraceContext, VelocityField};

/// Multiplier for deriving independent per-pixel random seeds from the
/// master seed.
const SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Progress is reported only when it has advanced by at least this much.
const PROGRESS_STEP: f64 = 0.002;

/// The model inputs to a render, all owned by external collaborators and
/// borrowed for the duration of one image.
pub struct Scene<'a> {
    /// The model grid.
    pub grid: &'a Grid,
    /// Species line tables; species 0 supplies the continuum and the
    /// cosmic background.
    pub mols: &'a [MolData],
    /// Continuous bulk-velocity field, if the model has one. Without it
    /// the piecewise tracer falls back to per-point stored velocities.
    pub velocity: Option<&'a dyn VelocityField>,
    /// Delaunay tessellation, required by the smooth tracer.
    pub mesh: Option<&'a DelaunayMesh>,
    /// Chain walker over `mesh`, required by the smooth tracer.
    pub walker: Option<&'a dyn ChainWalker>,
}

/// Fully determined per-image parameters, derived from [`ImageParams`]
/// at render start.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    /// Image side length in pixels.
    pub pxls: usize,
    /// Linear size of one pixel at the model's distance.
    pub size: f64,
    /// Pixel coordinate of the image center.
    pub centre: f64,
    /// Number of channels (3 in polarized mode).
    pub nchan: usize,
    /// Channel width as a velocity, m/s.
    pub velres: f64,
    /// Total bandwidth, Hz.
    pub bandwidth: f64,
    /// Image center frequency, Hz.
    pub freq: f64,
    /// The transition the image is tuned to.
    pub trans: usize,
    /// The transition index the caller fixed explicitly, if any.
    pub explicit_trans: Option<usize>,
    /// Whether spectral lines contribute.
    pub do_line: bool,
    /// Bulk recession velocity of the source, m/s.
    pub source_vel: f64,
    /// Inclination of the line of sight for the polarized source
    /// function.
    pub theta: f64,
    /// Observer-to-model rotation.
    pub rotation: Rotation,
}

/// One image pixel's accumulators.
#[derive(Debug, Clone)]
pub struct Pixel {
    /// Mean ray intensity per channel.
    pub intensity: Vec<f64>,
    /// Mean ray optical depth per channel.
    pub tau: Vec<f64>,
    /// Number of rays cast for this pixel.
    pub num_rays: u32,
}

impl Pixel {
    fn new(nchan: usize) -> Self {
        Self {
            intensity: vec![0.0; nchan],
            tau: vec![0.0; nchan],
            num_rays: 0,
        }
    }
}

/// The rendered cube: per-pixel, per-channel intensity and optical depth,
/// plus the transition the image ended up tuned to.
#[derive(Debug, Clone)]
pub struct ImageCube {
    /// Image side length in pixels.
    pub pxls: usize,
    /// Number of channels.
    pub nchan: usize,
    /// The resolved transition index.
    pub trans: usize,
    pixels: Vec<Pixel>,
}

impl ImageCube {
    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// The pixel at column `xi`, row `yi`.
    pub fn pixel(&self, xi: usize, yi: usize) -> &Pixel {
        &self.pixels[yi * self.pxls + xi]
    }
}

/// Derive the fully determined image parameters: fill in the image
/// frequency from the transition (or vice versa), derive whichever of
/// {channel count, velocity resolution, bandwidth} is unset from the
/// other two, and select the transition nearest the image frequency when
/// none is explicit.
pub fn resolve_image(
    img: &ImageParams,
    mols: &[MolData],
    polarization: bool,
) -> Result<ResolvedImage> {
    if img.pxls == 0 {
        return Err(RenderError::Config("image must have at least one pixel".into()));
    }
    if !(img.imgres > 0.0) {
        return Err(RenderError::Config("imgres must be positive".into()));
    }
    if !(img.distance > 0.0) {
        return Err(RenderError::Config("distance must be positive".into()));
    }
    let Some(md0) = mols.first() else {
        return Err(RenderError::Config("at least one species is required".into()));
    };
    if md0.nline == 0 || md0.freq.is_empty() {
        return Err(RenderError::Config("species 0 has no lines".into()));
    }
    if let Some(t) = img.trans {
        if t >= md0.nline {
            return Err(RenderError::Config(format!(
                "transition {t} out of range ({} lines)",
                md0.nline
            )));
        }
    }

    let freq = match img.freq {
        Some(f) => f,
        None => {
            let t = img.trans.ok_or(RenderError::UnresolvedFrequency)?;
            md0.freq[t]
        }
    };

    let (nchan, velres, bandwidth) = if polarization {
        // Polarized images carry the three Stokes channels.
        (3, img.velres.unwrap_or(0.0), img.bandwidth.unwrap_or(0.0))
    } else {
        match (img.nchan, img.velres, img.bandwidth) {
            (None, Some(vr), Some(bw)) => {
                let n = (bw / (vr / CLIGHT * freq)) as usize;
                (n, vr, bw)
            }
            (Some(n), None, Some(bw)) => (n, bw * CLIGHT / freq / n as f64, bw),
            (Some(n), Some(vr), _) => (n, vr, n as f64 * vr / CLIGHT * freq),
            _ => return Err(RenderError::UnderdeterminedChannels),
        }
    };
    if nchan == 0 {
        return Err(RenderError::Config("image has no spectral channels".into()));
    }

    let trans = match img.trans {
        Some(t) => t,
        None => {
            let mut best = 0;
            let mut best_delta = (freq - md0.freq[0]).abs();
            for (li, &f) in md0.freq.iter().enumerate().skip(1) {
                let delta = (freq - f).abs();
                if delta < best_delta {
                    best = li;
                    best_delta = delta;
                }
            }
            best
        }
    };

    Ok(ResolvedImage {
        pxls: img.pxls,
        size: img.distance * img.imgres,
        centre: img.pxls as f64 / 2.0,
        nchan,
        velres,
        bandwidth,
        freq,
        trans,
        explicit_trans: img.trans,
        do_line: img.do_line,
        source_vel: img.source_vel,
        theta: img.theta,
        rotation: img.rotation.clone(),
    })
}

/// Bin the projected interior grid points into pixels and floor at the
/// antialiasing minimum. Returns the total active ray count.
fn assign_ray_counts(pixels: &mut [Pixel], grid: &Grid, img: &ResolvedImage, antialias: u32) -> u64 {
    for gp in grid.interior() {
        // The inverse (transpose) rotation: grid coordinates into the
        // observer frame, where the tracers rotate the other way.
        let p = img.rotation.to_image(&gp.position.coords);
        let xf = (p.x / img.size + img.centre).floor();
        let yf = (p.y / img.size + img.centre).floor();
        if xf >= 0.0 && yf >= 0.0 && (xf as usize) < img.pxls && (yf as usize) < img.pxls {
            pixels[yf as usize * img.pxls + xf as usize].num_rays += 1;
        }
    }

    let mut total = 0u64;
    for px in pixels.iter_mut() {
        px.num_rays = px.num_rays.max(antialias);
        total += u64::from(px.num_rays);
    }
    total
}

/// Render one image cube.
///
/// Pixels are processed in parallel with work-stealing scheduling; each
/// pixel and all of its rays belong to exactly one task, which holds the
/// only mutable reference to that pixel's accumulators. `progress`, if
/// given, receives monotonically non-decreasing completion fractions.
pub fn render(
    scene: &Scene<'_>,
    cfg: &RenderConfig,
    img: &ImageParams,
    progress: Option<&(dyn Fn(f64) + Sync)>,
) -> Result<ImageCube> {
    cfg.validate()?;
    let algorithm = RayAlgorithm::from_selector(cfg.trace_algorithm)?;
    let resolved = resolve_image(img, scene.mols, cfg.polarization)?;

    let aux = build_aux(scene.grid, scene.mols);
    let lines = line_refs(scene.mols);

    let ctx = TraceContext {
        grid: scene.grid,
        mols: scene.mols,
        aux: &aux,
        lines: &lines,
        img: &resolved,
        polarization: cfg.polarization,
        radius_squ: cfg.radius * cfg.radius,
        cutoff: cfg.cutoff(),
        velocity: scene.velocity,
    };

    // The algorithm is a per-image static choice; an unrecognized
    // selector was already rejected above.
    let smooth;
    let tracer: &dyn RayIntegrator = match algorithm {
        RayAlgorithm::Piecewise => &PiecewiseTracer,
        RayAlgorithm::Smooth => {
            let mesh = scene.mesh.ok_or(RenderError::MissingTessellation)?;
            let walker = scene.walker.ok_or(RenderError::MissingTessellation)?;
            let velocity = scene.velocity.ok_or(RenderError::MissingVelocityField)?;
            smooth = SmoothTracer::new(mesh, walker, velocity);
            &smooth
        }
    };

    let mut pixels: Vec<Pixel> = (0..resolved.pxls * resolved.pxls)
        .map(|_| Pixel::new(resolved.nchan))
        .collect();
    let total_rays = assign_ray_counts(&mut pixels, scene.grid, &resolved, cfg.antialias);
    log::debug!(
        "rendering {px}x{px} pixels, {nc} channels, {nr} rays ({alg:?})",
        px = resolved.pxls,
        nc = resolved.nchan,
        nr = total_rays,
        alg = algorithm,
    );

    let rays_done = AtomicU64::new(0);
    let last_reported = Mutex::new(0.0f64);
    let denom = (total_rays.saturating_sub(1)).max(1) as f64;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.threads)
        .build()
        .map_err(|e| RenderError::Config(e.to_string()))?;

    pool.install(|| {
        pixels.par_iter_mut().enumerate().for_each(|(ppi, px)| {
            let xi = (ppi % resolved.pxls) as f64;
            let yi = (ppi / resolved.pxls) as f64;
            let mut rng =
                SmallRng::seed_from_u64(cfg.seed ^ (ppi as u64 + 1).wrapping_mul(SEED_STRIDE));
            let mut ray = RaySpectrum::new(resolved.nchan);
            let weight = 1.0 / f64::from(px.num_rays);

            for _ in 0..px.num_rays {
                let xp = -resolved.size * (rng.gen::<f64>() + xi - resolved.centre);
                let yp = resolved.size * (rng.gen::<f64>() + yi - resolved.centre);
                tracer.integrate(xp, yp, &ctx, &mut ray);
                for c in 0..resolved.nchan {
                    px.intensity[c] += ray.intensity[c] * weight;
                    px.tau[c] += ray.tau[c] * weight;
                }
            }

            let done = rays_done.fetch_add(u64::from(px.num_rays), Ordering::Relaxed)
                + u64::from(px.num_rays);
            if let Some(report) = progress {
                let frac = (done as f64 / denom).min(1.0);
                // Serialized under the lock so reported values never
                // regress, and throttled to meaningful increments.
                if let Ok(mut last) = last_reported.lock() {
                    if frac - *last >= PROGRESS_STEP || (frac >= 1.0 && *last < 1.0) {
                        *last = frac;
                        report(frac);
                    }
                }
            }
        });
    });

    Ok(ImageCube {
        pxls: resolved.pxls,
        nchan: resolved.nchan,
        trans: resolved.trans,
        pixels,
    })
}
