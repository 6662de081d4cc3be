//! Radiating-species line tables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Line tables for one radiating species, as produced by the external
/// molecular-data loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MolData {
    /// Number of energy levels.
    pub nlev: usize,
    /// Number of radiative transitions.
    pub nline: usize,
    /// Rest frequency per line, Hz.
    pub freq: Vec<f64>,
    /// Einstein A coefficient per line.
    pub aeinst: Vec<f64>,
    /// Einstein B coefficient (upper level) per line.
    pub beinstu: Vec<f64>,
    /// Einstein B coefficient (lower level) per line.
    pub beinstl: Vec<f64>,
    /// Upper level index per line.
    pub lau: Vec<usize>,
    /// Lower level index per line.
    pub lal: Vec<usize>,
    /// Cosmic-background intensity per line, in the same normalized units
    /// as the emergent intensities.
    pub local_cmb: Vec<f64>,
    /// Line-profile normalization.
    pub norm: f64,
    /// Reciprocal of `norm`.
    pub norminv: f64,
}

/// Validation failures for a species table.
#[derive(Error, Debug)]
pub enum MolDataError {
    /// A per-line table has the wrong length.
    #[error("table `{table}` has {got} entries, expected {expected}")]
    TableLength {
        /// Name of the offending table.
        table: &'static str,
        /// Actual length.
        got: usize,
        /// Expected length.
        expected: usize,
    },

    /// A level index is out of range.
    #[error("line {line}: level index {level} out of range (nlev = {nlev})")]
    LevelOutOfRange {
        /// Offending line.
        line: usize,
        /// Offending level index.
        level: usize,
        /// Number of levels.
        nlev: usize,
    },
}

impl MolData {
    /// Check table lengths and level indices against `nlev`/`nline`.
    pub fn validate(&self) -> Result<(), MolDataError> {
        let per_line: [(&'static str, usize); 6] = [
            ("freq", self.freq.len()),
            ("aeinst", self.aeinst.len()),
            ("beinstu", self.beinstu.len()),
            ("beinstl", self.beinstl.len()),
            ("lau", self.lau.len()),
            ("lal", self.lal.len()),
        ];
        for (table, got) in per_line {
            if got != self.nline {
                return Err(MolDataError::TableLength {
                    table,
                    got,
                    expected: self.nline,
                });
            }
        }
        if self.local_cmb.len() != self.nline {
            return Err(MolDataError::TableLength {
                table: "local_cmb",
                got: self.local_cmb.len(),
                expected: self.nline,
            });
        }
        for li in 0..self.nline {
            for level in [self.lau[li], self.lal[li]] {
                if level >= self.nlev {
                    return Err(MolDataError::LevelOutOfRange {
                        line: li,
                        level,
                        nlev: self.nlev,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A (species, line) pair in the flattened cross-species line list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef {
    /// Species index.
    pub mol: usize,
    /// Line index within that species.
    pub line: usize,
}

/// Flatten all species' lines into one list, in species-major order. The
/// ray tracer scans this list per channel so that blended lines of
/// different species can contribute to the same channel.
pub fn line_refs(mols: &[MolData]) -> Vec<LineRef> {
    let mut refs = Vec::new();
    for (mi, md) in mols.iter().enumerate() {
        for li in 0..md.nline {
            refs.push(LineRef { mol: mi, line: li });
        }
    }
    refs
}
