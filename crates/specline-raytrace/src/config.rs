//! Render configuration and per-image parameters.

use serde::{Deserialize, Serialize};
use specline_math::Rotation;

use crate::error::{RenderError, Result};

/// Which ray tracer integrates each ray of an image. Selected once per
/// image, never re-decided per ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayAlgorithm {
    /// Cell-to-cell Voronoi walk with piecewise-constant fields.
    Piecewise,
    /// Delaunay chain walk with barycentric field interpolation.
    Smooth,
}

impl RayAlgorithm {
    /// Map the configuration selector to an algorithm. Anything other
    /// than 0 or 1 is a fatal configuration error.
    pub fn from_selector(selector: u32) -> Result<Self> {
        match selector {
            0 => Ok(Self::Piecewise),
            1 => Ok(Self::Smooth),
            n => Err(RenderError::UnknownAlgorithm(n)),
        }
    }
}

/// Model-level render parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Model radius; the model is spherical and rays outside its projected
    /// disk are skipped.
    pub radius: f64,
    /// Smallest length scale of the model. The face-tracing cutoff is
    /// derived from this.
    pub min_scale: f64,
    /// Minimum number of rays per image pixel.
    pub antialias: u32,
    /// Worker thread count; 0 lets the pool pick.
    pub threads: usize,
    /// Render Stokes I/Q/U channels instead of spectral channels.
    pub polarization: bool,
    /// Ray-tracing algorithm selector: 0 = piecewise-constant,
    /// 1 = Delaunay-smooth.
    pub trace_algorithm: u32,
    /// Master seed for the per-pixel random streams.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            min_scale: 1.0e-3,
            antialias: 1,
            threads: 0,
            polarization: false,
            trace_algorithm: 0,
            seed: 178_490,
        }
    }
}

impl RenderConfig {
    /// Validate ranges. The algorithm selector is checked separately at
    /// render start via [`RayAlgorithm::from_selector`].
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0) {
            return Err(RenderError::Config("radius must be positive".into()));
        }
        if !(self.min_scale > 0.0) {
            return Err(RenderError::Config("min_scale must be positive".into()));
        }
        if self.antialias < 1 {
            return Err(RenderError::Config("antialias must be at least 1".into()));
        }
        Ok(())
    }

    /// Lower bound on accepted face distances, well below any real cell
    /// size but above floating noise.
    pub(crate) fn cutoff(&self) -> f64 {
        self.min_scale * 1.0e-7
    }
}

/// Per-image geometry and spectral parameters.
///
/// The spectral axis may be partially specified: whichever of
/// {channel count, velocity resolution, bandwidth} is unset is derived
/// from the other two at render start.
#[derive(Debug, Clone)]
pub struct ImageParams {
    /// Image side length in pixels.
    pub pxls: usize,
    /// Angular size of one pixel, radians.
    pub imgres: f64,
    /// Distance from observer to model.
    pub distance: f64,
    /// Image center frequency, Hz. Unset: taken from the transition.
    pub freq: Option<f64>,
    /// Explicit transition index into species 0. Unset: the transition
    /// nearest `freq` is used.
    pub trans: Option<usize>,
    /// Number of spectral channels.
    pub nchan: Option<usize>,
    /// Channel width as a velocity, m/s.
    pub velres: Option<f64>,
    /// Total bandwidth, Hz.
    pub bandwidth: Option<f64>,
    /// Bulk recession velocity of the source, m/s.
    pub source_vel: f64,
    /// Whether spectral lines contribute (otherwise continuum only).
    pub do_line: bool,
    /// Inclination of the line of sight, used by the polarized source
    /// function.
    pub theta: f64,
    /// Rotation relating the observer frame to the model frame.
    pub rotation: Rotation,
}

impl ImageParams {
    /// Parameters for a `pxls` x `pxls` image with everything else left to
    /// defaults or derivation.
    pub fn new(pxls: usize, imgres: f64, distance: f64) -> Self {
        Self {
            pxls,
            imgres,
            distance,
            freq: None,
            trans: None,
            nchan: None,
            velres: None,
            bandwidth: None,
            source_vel: 0.0,
            do_line: true,
            theta: 0.0,
            rotation: Rotation::identity(),
        }
    }
}
