#![warn(missing_docs)]

//! Math types for the specline radiative transfer engine.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! unstructured-grid ray tracing: points, vectors, directions, and the
//! image-plane rotation used to orient a model with respect to an observer.

use nalgebra::{Matrix3, Unit, Vector3};

/// A point in 3D model space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D model space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D model space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A 3x3 matrix.
pub type Mat3 = Matrix3<f64>;

/// The rotation relating the observer (image) frame to the model frame.
///
/// Column convention: columns 0 and 1 are the image-plane x and y axes
/// expressed in model coordinates; column 2 is the line of sight, pointing
/// away from the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotation {
    /// The underlying orthonormal matrix.
    pub matrix: Mat3,
}

impl Rotation {
    /// Identity rotation: the image plane coincides with the model x-y plane
    /// and the line of sight runs along +z.
    pub fn identity() -> Self {
        Self {
            matrix: Mat3::identity(),
        }
    }

    /// Rotation about the model X axis by `angle` radians.
    pub fn about_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat3::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the model Y axis by `angle` radians.
    pub fn about_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat3::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the model Z axis by `angle` radians.
    pub fn about_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat3::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Compose with another rotation: `self` applied after `other`.
    pub fn compose(&self, other: &Rotation) -> Rotation {
        Rotation {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a vector from the observer frame into the model frame.
    pub fn to_model(&self, v: &Vec3) -> Vec3 {
        self.matrix * v
    }

    /// Map a vector from the model frame into the observer frame.
    ///
    /// The matrix is orthonormal, so the inverse is the transpose.
    pub fn to_image(&self, v: &Vec3) -> Vec3 {
        self.matrix.tr_mul(v)
    }

    /// The line of sight in model coordinates, pointing away from the
    /// observer.
    pub fn line_of_sight(&self) -> Vec3 {
        self.matrix.column(2).into_owned()
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}
