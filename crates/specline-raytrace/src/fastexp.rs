//! Negative exponential, with an optional fast approximation.
//!
//! The line-shape and attenuation hot paths only ever need `exp(-x)`. The
//! `fast-exp` feature swaps the libm call for a range-reduced polynomial
//! that agrees with the exact value to a few parts in 1e5, which is below
//! image-output precision.

/// `exp(-x)`.
#[cfg(not(feature = "fast-exp"))]
#[inline]
pub fn exp_neg(x: f64) -> f64 {
    (-x).exp()
}

/// `exp(-x)`, approximated.
///
/// Range-reduces `x = n ln2 + r` with `r` in `[0, ln2)` and evaluates a
/// sixth-order alternating series for `exp(-r)`; the `2^-n` factor is a
/// direct exponent-field write. Non-positive arguments (masing cells make
/// negative optical depths possible) fall back to the exact call.
#[cfg(feature = "fast-exp")]
#[inline]
pub fn exp_neg(x: f64) -> f64 {
    use std::f64::consts::{LN_2, LOG2_E};

    if !(x > 0.0) {
        return (-x).exp();
    }
    if x > 700.0 {
        return 0.0;
    }
    let n = (x * LOG2_E).floor();
    let r = x - n * LN_2;
    let p = 1.0
        - r * (1.0
            - r * (0.5
                - r * (1.0 / 6.0
                    - r * (1.0 / 24.0 - r * (1.0 / 120.0 - r / 720.0)))));
    let scale = f64::from_bits(((1023 - n as i64) as u64) << 52);
    p * scale
}
