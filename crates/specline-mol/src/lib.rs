#![warn(missing_docs)]

//! Molecular line data and source functions for specline.
//!
//! This crate carries the radiating-species tables produced by the external
//! molecular-data loader (frequencies, Einstein coefficients, level
//! indices, cosmic-background intensities), precomputes the per-grid-point
//! auxiliary quantities the ray tracer needs in its hot loop, and evaluates
//! the continuum, line, and polarized source functions.

pub mod aux;
pub mod consts;
pub mod data;
pub mod source;

pub use aux::{build_aux, PointAux, SpeciesAux};
pub use data::{line_refs, LineRef, MolData, MolDataError};
pub use source::{continuum, line, polarized, MAX_POLARIZATION};
