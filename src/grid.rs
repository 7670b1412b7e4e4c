//! Uniform-grid spatial index over the input point cloud.
//!
//! Cell size is twice the radius passed to [`SpatialIndex::build`], so any
//! point within that radius of a query position lies in the query's cell or
//! one of its 26 neighbors. The index is immutable once built; both
//! the seed search and the pivoting step of the ball-pivoting engine query
//! it but never mutate it.

use std::ops::Div;

use glam::IVec3;
use glam::Vec3;
use glam::ivec3;

use crate::Point;

/// Bucket-based near-neighbor index over a point cloud.
#[derive(Clone, Debug)]
pub(crate) struct SpatialIndex {
    cell_size: f32,
    dims: IVec3,
    lower: Vec3,
    cells: Vec<Vec<u32>>,
}

impl SpatialIndex {
    /// Builds an index sized for queries up to `max_query_radius`. The
    /// ball-pivoting engine queries both `2 * pivot_radius` (neighborhood
    /// search) and `pivot_radius` (emptiness checks), so callers build with
    /// `max_query_radius = 2.0 * pivot_radius`.
    pub(crate) fn build(points: &[Point], max_query_radius: f32) -> Self {
        let cell_size = 2.0 * max_query_radius;

        let mut lower = points[0].pos;
        let mut upper = points[0].pos;
        for p in points {
            lower = lower.min(p.pos);
            upper = upper.max(p.pos);
        }

        let ceil_float = (upper - lower).ceil().div(cell_size);
        let dims = ivec3(
            ceil_float.x as i32,
            ceil_float.y as i32,
            ceil_float.z as i32,
        )
        .max(ivec3(1, 1, 1));

        let mut index = Self {
            cell_size,
            dims,
            lower,
            cells: vec![Vec::new(); (dims.x * dims.y * dims.z) as usize],
        };

        for (i, p) in points.iter().enumerate() {
            let cell = index.cell_index(p.pos);
            let offset = index.cell_offset(cell);
            index.cells[offset].push(i as u32);
        }

        index
    }

    fn cell_index(&self, point: Vec3) -> IVec3 {
        let diff = (point - self.lower) / self.cell_size;
        ivec3(diff.x as i32, diff.y as i32, diff.z as i32).clamp(ivec3(0, 0, 0), self.dims - 1)
    }

    fn cell_offset(&self, index: IVec3) -> usize {
        (index.z * self.dims.x * self.dims.y + index.y * self.dims.x + index.x) as usize
    }

    /// Returns the indices of every point within `radius` of `center`,
    /// filtered by exact squared distance over the 3x3x3 neighborhood of
    /// cells around `center`. Boundary cells are handled by clamping the
    /// neighborhood to valid ranges.
    pub(crate) fn query_ball(&self, points: &[Point], center: Vec3, radius: f32) -> Vec<u32> {
        let center_cell = self.cell_index(center);
        let radius_sq = radius * radius;
        let mut result = Vec::new();

        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let cell = center_cell + ivec3(dx, dy, dz);
                    if cell.x < 0
                        || cell.y < 0
                        || cell.z < 0
                        || cell.x >= self.dims.x
                        || cell.y >= self.dims.y
                        || cell.z >= self.dims.z
                    {
                        continue;
                    }
                    let offset = self.cell_offset(cell);
                    for &idx in &self.cells[offset] {
                        if (points[idx as usize].pos - center).length_squared() <= radius_sq {
                            result.push(idx);
                        }
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pt(x: f32, y: f32, z: f32) -> Point {
        Point {
            pos: Vec3::new(x, y, z),
            normal: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn query_ball_finds_nearby_points_only() {
        let points = vec![pt(0.0, 0.0, 0.0), pt(0.05, 0.0, 0.0), pt(5.0, 5.0, 5.0)];
        let index = SpatialIndex::build(&points, 0.2);
        let mut hits = index.query_ball(&points, Vec3::ZERO, 0.1);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn query_ball_handles_grid_boundary() {
        let points = vec![pt(-1.0, -1.0, -1.0), pt(1.0, 1.0, 1.0)];
        let index = SpatialIndex::build(&points, 0.5);
        let hits = index.query_ball(&points, Vec3::new(-1.0, -1.0, -1.0), 0.01);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn single_point_builds_degenerate_grid() {
        let points = vec![pt(1.0, 2.0, 3.0)];
        let index = SpatialIndex::build(&points, 1.0);
        let hits = index.query_ball(&points, Vec3::new(1.0, 2.0, 3.0), 0.001);
        assert_eq!(hits, vec![0]);
    }
}
