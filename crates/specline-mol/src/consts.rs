//! Physical constants (SI units).

/// Speed of light, m/s.
pub const CLIGHT: f64 = 2.99792458e8;

/// Planck constant, J s.
pub const HPLANCK: f64 = 6.62607015e-34;

/// Boltzmann constant, J/K.
pub const KBOLTZ: f64 = 1.380649e-23;

/// Square root of pi.
pub const SPI: f64 = 1.772_453_850_905_516;

/// h c / (4 pi sqrt(pi)) - the prefactor shared by line emission and
/// absorption coefficients.
pub const HPIP: f64 = HPLANCK * CLIGHT / (4.0 * std::f64::consts::PI * SPI);
