//! Error types for image rendering.

use thiserror::Error;

/// Fatal configuration errors surfaced by the render entry point.
///
/// Geometric failures of individual rays are deliberately not represented
/// here: a ray that misses the mesh contributes zero and the render
/// continues.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The ray-tracing algorithm selector is not 0 or 1.
    #[error("unrecognized ray-tracing algorithm selector {0}")]
    UnknownAlgorithm(u32),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Neither an image frequency nor a transition index was given.
    #[error("image frequency is unset and no transition is given")]
    UnresolvedFrequency,

    /// Too few of {channel count, velocity resolution, bandwidth} are set
    /// to derive the rest.
    #[error("channel count, velocity resolution and bandwidth are underdetermined")]
    UnderdeterminedChannels,

    /// Smooth tracing was selected without a mesh or chain walker.
    #[error("smooth ray tracing requires a Delaunay mesh and chain walker")]
    MissingTessellation,

    /// Smooth tracing was selected without a continuous velocity field.
    #[error("smooth ray tracing requires a continuous velocity field")]
    MissingVelocityField,
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
