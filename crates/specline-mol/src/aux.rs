//! Per-grid-point auxiliary quantities.
//!
//! These are the products the RTE needs at every step of every ray. They
//! are derived once per render from the raw per-point fields so the hot
//! loop never recomputes them.

use specline_grid::Grid;

use crate::data::MolData;

/// Auxiliary quantities for one species at one grid point (or, inside the
/// smooth tracer, barycentrically interpolated at a point on a cell face).
#[derive(Debug, Clone, Default)]
pub struct SpeciesAux {
    /// Reciprocal Doppler width.
    pub binv: f64,
    /// `binv * nmol * pops[level]` per level.
    pub spec_num_dens: Vec<f64>,
    /// Dust emission coefficient per line.
    pub dust: Vec<f64>,
    /// Dust opacity per line.
    pub knu: Vec<f64>,
}

impl SpeciesAux {
    /// An all-zero bundle shaped for `md`, used as an interpolation slot.
    pub fn zeroed(md: &MolData) -> Self {
        Self {
            binv: 0.0,
            spec_num_dens: vec![0.0; md.nlev],
            dust: vec![0.0; md.nline],
            knu: vec![0.0; md.nline],
        }
    }
}

/// Auxiliary quantities for all species at one grid point.
#[derive(Debug, Clone, Default)]
pub struct PointAux {
    /// One bundle per species.
    pub mol: Vec<SpeciesAux>,
}

/// Precompute auxiliary quantities for every grid point.
///
/// Sink points carry zero densities, so their bundles come out zero and
/// contribute nothing to any ray.
pub fn build_aux(grid: &Grid, mols: &[MolData]) -> Vec<PointAux> {
    grid.points()
        .iter()
        .map(|gp| PointAux {
            mol: mols
                .iter()
                .enumerate()
                .map(|(mi, md)| {
                    let sp = &gp.species[mi];
                    let spec_num_dens = (0..md.nlev)
                        .map(|ei| sp.binv * sp.nmol * sp.pops[ei])
                        .collect();
                    SpeciesAux {
                        binv: sp.binv,
                        spec_num_dens,
                        dust: sp.dust.clone(),
                        knu: sp.knu.clone(),
                    }
                })
                .collect(),
        })
        .collect()
}
