#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![doc = include_str!("../README.md")]

/// Typed errors surfaced at the reconstruction façade.
pub mod error;

mod ball_pivoting;
mod delaunay;
mod grid;
mod math;
mod mesh;
#[cfg(test)]
mod test;

use glam::Vec3;

use error::ReconstructError;

/// An oriented sample: a position and a unit normal in ℝ³, immutable after
/// ingestion and identified by its position in the input slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Position of the point.
    pub pos: Vec3,
    /// Normal of the point. Need not be unit length on input, but must be
    /// non-zero; callers that pass unnormalized normals get orientation
    /// checks computed against the normalized direction.
    pub normal: Vec3,
}

/// An output triangle: three indices into the caller's input point slice,
/// wound by the right-hand rule so the geometric normal `(b-a)x(c-a)`
/// faces outward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle(pub [u32; 3]);

impl Triangle {
    /// The three vertex indices, in winding order.
    #[must_use]
    pub const fn vertices(&self) -> [u32; 3] {
        self.0
    }
}

/// Wall-time breakdown for a single ball-pivoting run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BallPivotingStats {
    /// Total wall time for the call, in microseconds.
    pub total_micros: u64,
    /// Time spent searching for seed triangles, in microseconds.
    pub seed_search_micros: u64,
    /// Time spent pivoting the ball around front edges, in microseconds.
    pub pivot_micros: u64,
    /// Number of triangles in the returned mesh.
    pub triangle_count: usize,
    /// The largest the active edge front grew to during the run.
    pub front_peak_size: usize,
    /// Whether a seed triangle was found at all. When `false` the
    /// returned triangle list is empty and the run is flagged
    /// `Unreconstructable` rather than treated as a hard failure.
    pub seed_found: bool,
}

fn validate_points(points: &[Point]) -> Result<(), ReconstructError> {
    if points.is_empty() {
        return Err(ReconstructError::EmptyPointCloud);
    }
    for (index, p) in points.iter().enumerate() {
        if !p.pos.is_finite() || !p.normal.is_finite() {
            return Err(ReconstructError::NonFiniteCoordinate { index });
        }
        if p.normal == Vec3::ZERO {
            return Err(ReconstructError::ZeroNormal { index });
        }
    }
    Ok(())
}

fn validate_radius(radius: f32) -> Result<(), ReconstructError> {
    if !(radius > 0.0) {
        return Err(ReconstructError::NonPositiveRadius { radius });
    }
    Ok(())
}

/// Reconstructs a mesh via spherical Delaunay triangulation.
///
/// The input points are projected radially onto the unit sphere and
/// triangulated; triangles touching the six auxiliary bootstrap vertices
/// are dropped from the result, so the output references only the
/// caller's own points.
///
/// # Errors
///
/// Returns [`ReconstructError::EmptyPointCloud`] for an empty slice,
/// [`ReconstructError::NonFiniteCoordinate`] or
/// [`ReconstructError::ZeroNormal`] for a malformed point, and
/// [`ReconstructError::DegenerateGeometry`] when more than six input
/// points are collinear and the hull bootstrap cannot form a non-degenerate
/// initial face.
pub fn reconstruct_delaunay(points: &[Point]) -> Result<Vec<Triangle>, ReconstructError> {
    validate_points(points)?;

    let positions: Vec<Vec3> = points.iter().map(|p| p.pos).collect();
    let (triangles, _stats) = delaunay::reconstruct(&positions)?;

    Ok(triangles.into_iter().map(Triangle).collect())
}

/// Reconstructs a mesh via ball-pivoting.
///
/// # Errors
///
/// Returns [`ReconstructError::EmptyPointCloud`],
/// [`ReconstructError::NonFiniteCoordinate`], [`ReconstructError::ZeroNormal`]
/// or [`ReconstructError::NonPositiveRadius`] at the call boundary. A run
/// that finds no seed triangle is not an error: it returns an empty
/// triangle list. Use [`reconstruct_ball_pivoting_measured`] to observe
/// whether a seed was found without inferring it from an empty result.
pub fn reconstruct_ball_pivoting(
    points: &[Point],
    radius: f32,
) -> Result<Vec<Triangle>, ReconstructError> {
    validate_points(points)?;
    validate_radius(radius)?;

    let output = ball_pivoting::reconstruct(points, radius);
    Ok(output.triangles.into_iter().map(Triangle).collect())
}

/// Same as [`reconstruct_ball_pivoting`], plus a wall-time breakdown
/// (the timed variant).
///
/// # Errors
///
/// See [`reconstruct_ball_pivoting`].
pub fn reconstruct_ball_pivoting_measured(
    points: &[Point],
    radius: f32,
) -> Result<(Vec<Triangle>, BallPivotingStats), ReconstructError> {
    validate_points(points)?;
    validate_radius(radius)?;

    let output = ball_pivoting::reconstruct(points, radius);
    let stats = BallPivotingStats {
        total_micros: u64::try_from(output.stats.total.as_micros()).unwrap_or(u64::MAX),
        seed_search_micros: u64::try_from(output.stats.seed_search.as_micros())
            .unwrap_or(u64::MAX),
        pivot_micros: u64::try_from(output.stats.pivot.as_micros()).unwrap_or(u64::MAX),
        triangle_count: output.triangles.len(),
        front_peak_size: output.stats.front_peak_size,
        seed_found: output.stats.seed_found,
    };

    Ok((output.triangles.into_iter().map(Triangle).collect(), stats))
}
