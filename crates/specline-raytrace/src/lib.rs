#![warn(missing_docs)]

//! Ray tracing and RTE integration over unstructured model grids.
//!
//! This crate turns a model grid (with precomputed physical fields and
//! level populations) into a synthetic spectral-line image cube: for each
//! image pixel and each channel it integrates the radiative transfer
//! equation along randomly sampled lines of sight through the model.
//!
//! # Architecture
//!
//! - [`lineshape`] - the line-profile weight at a velocity offset
//! - [`facetrace`] - exit-face search for the Voronoi cell walk
//! - [`interp`] - barycentric field interpolation for the smooth tracer
//! - [`rte`] - numerically safe per-segment RTE terms
//! - [`tracer`] - the two [`RayIntegrator`] implementations
//! - [`render`] - the per-image orchestrator: channel resolution,
//!   density-adaptive ray counts, parallel dispatch, accumulation
//!
//! # Example
//!
//! ```ignore
//! use specline_raytrace::{render, ImageParams, RenderConfig, Scene};
//!
//! let scene = Scene {
//!     grid: &grid,
//!     mols: &mols,
//!     velocity: Some(&model),
//!     mesh: None,
//!     walker: None,
//! };
//! let cfg = RenderConfig { radius: model_radius, ..Default::default() };
//! let mut img = ImageParams::new(256, 1.0e-6, 3.0e18);
//! img.trans = Some(1);
//! img.nchan = Some(60);
//! img.velres = Some(100.0);
//!
//! let cube = render(&scene, &cfg, &img, None)?;
//! ```

pub mod config;
pub mod error;
pub mod facetrace;
pub mod fastexp;
pub mod interp;
pub mod lineshape;
pub mod ray;
pub mod render;
pub mod rte;
pub mod tracer;

#[cfg(test)]
mod scenario;

pub use config::{ImageParams, RayAlgorithm, RenderConfig};
pub use error::{RenderError, Result};
pub use ray::RaySpectrum;
pub use render::{render, resolve_image, ImageCube, Pixel, ResolvedImage, Scene};
pub use tracer::{
    PiecewiseTracer, RayIntegrator, SmoothTracer, TraceContext, VelocityField, N_SEGMENTS,
    N_VEL_STEPS,
};
