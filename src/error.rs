//! Typed errors surfaced at the façade call boundary.
//!
//! Local geometric failures inside the engines (a pivot attempt failing
//! emptiness, a walk crossing to a neighbor, a duplicate point being
//! skipped) are never represented here; they are ordinary control flow.

/// Every hard failure the reconstruction façade can report.
///
/// `InvalidInput` is split into several concrete variants rather than one
/// catch-all so callers can match on the specific problem.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    /// The point cloud contained zero points.
    #[error("point cloud is empty")]
    EmptyPointCloud,

    /// A point's position or normal had a NaN or infinite component.
    #[error("point {index} has a non-finite position or normal")]
    NonFiniteCoordinate {
        /// Index of the offending point in the input slice.
        index: usize,
    },

    /// A point's normal had zero length.
    #[error("point {index} has a zero-length normal")]
    ZeroNormal {
        /// Index of the offending point in the input slice.
        index: usize,
    },

    /// The pivot radius was zero or negative.
    #[error("pivot radius must be strictly positive, got {radius}")]
    NonPositiveRadius {
        /// The radius value supplied by the caller.
        radius: f32,
    },

    /// The Delaunay hull bootstrap produced a zero-area initial face,
    /// which happens when more than six input points are collinear.
    #[error(
        "Delaunay hull bootstrap degenerated near point {index}: too many collinear input points"
    )]
    DegenerateGeometry {
        /// Index of a point involved in the degenerate face.
        index: usize,
    },
}
