use std::collections::HashMap;
use std::collections::HashSet;

use glam::Vec3;

use crate::Point;
use crate::Triangle;
use crate::reconstruct_ball_pivoting;
use crate::reconstruct_ball_pivoting_measured;
use crate::reconstruct_delaunay;

fn pt(pos: Vec3, normal: Vec3) -> Point {
    Point { pos, normal }
}

fn octahedron_points() -> Vec<Point> {
    vec![
        pt(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        pt(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        pt(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        pt(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
        pt(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)),
        pt(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -1.0)),
    ]
}

/// Mirrors the original demo's sampling loop: one point per pole plus a
/// `slices` x `(stacks - 1)` grid in between.
fn spherical_cloud(slices: i32, stacks: i32) -> Vec<Point> {
    let mut points = vec![pt(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -1.0))];

    for slice in 0..slices {
        for stack in 1..stacks {
            let yaw = (f64::from(slice) / f64::from(slices)) * 2.0 * std::f64::consts::PI;
            let z = ((f64::from(stack) / f64::from(stacks) - 0.5) * std::f64::consts::PI).sin();
            let r = (1.0 - z * z).sqrt();

            let v = Vec3::new((r * yaw.sin()) as f32, (r * yaw.cos()) as f32, z as f32);
            points.push(pt(v, v.normalize()));
        }
    }

    points.push(pt(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)));
    points
}

/// Concentric rings of points in the y=0 plane, normal (0,1,0), standing in
/// for a uniform disk sampling without a random-number dependency.
fn disk_cloud(rings: i32, points_per_ring: i32, radius: f32) -> Vec<Point> {
    let mut points = vec![pt(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0))];
    for ring in 1..=rings {
        let r = radius * ring as f32 / rings as f32;
        for i in 0..points_per_ring {
            let theta = (f64::from(i) / f64::from(points_per_ring)) * 2.0 * std::f64::consts::PI;
            let x = r * theta.cos() as f32;
            let z = r * theta.sin() as f32;
            points.push(pt(Vec3::new(x, 0.0, z), Vec3::new(0.0, 1.0, 0.0)));
        }
    }
    points
}

fn triangle_normal(points: &[Point], t: &Triangle) -> Vec3 {
    let [a, b, c] = t.vertices();
    let a = points[a as usize].pos;
    let b = points[b as usize].pos;
    let c = points[c as usize].pos;
    (b - a).cross(c - a)
}

fn average_normal(points: &[Point], t: &Triangle) -> Vec3 {
    let [a, b, c] = t.vertices();
    (points[a as usize].normal + points[b as usize].normal + points[c as usize].normal) / 3.0
}

fn assert_orientation_consistent(points: &[Point], triangles: &[Triangle]) {
    for t in triangles {
        let normal = triangle_normal(points, t);
        let avg = average_normal(points, t);
        assert!(
            normal.dot(avg) >= -1e-3,
            "triangle {t:?} faces against its vertex normals"
        );
    }
}

fn assert_no_duplicate_triangles(triangles: &[Triangle]) {
    let mut seen = HashSet::new();
    for t in triangles {
        let mut v = t.vertices();
        v.sort_unstable();
        assert!(seen.insert(v), "duplicate triangle {t:?}");
    }
}

fn assert_edge_manifold(triangles: &[Triangle]) {
    let mut edge_count: HashMap<(u32, u32), u32> = HashMap::new();
    for t in triangles {
        let [a, b, c] = t.vertices();
        for (x, y) in [(a, b), (b, c), (c, a)] {
            let key = if x < y { (x, y) } else { (y, x) };
            *edge_count.entry(key).or_insert(0) += 1;
        }
    }
    for (edge, count) in edge_count {
        assert!(count <= 2, "edge {edge:?} shared by {count} triangles");
    }
}

#[test]
fn octahedron_delaunay_is_the_eight_canonical_faces() {
    let points = octahedron_points();
    let triangles = reconstruct_delaunay(&points).unwrap();
    let expected: Vec<Triangle> = [
        [0, 2, 4],
        [0, 4, 3],
        [0, 3, 5],
        [0, 5, 2],
        [1, 4, 2],
        [1, 3, 4],
        [1, 5, 3],
        [1, 2, 5],
    ]
    .into_iter()
    .map(Triangle)
    .collect();
    assert_eq!(triangles, expected);
    assert_orientation_consistent(&points, &triangles);
    assert_no_duplicate_triangles(&triangles);
}

#[test]
fn octahedron_ball_pivoting_covers_the_sphere() {
    let points = octahedron_points();
    let triangles = reconstruct_ball_pivoting(&points, 1.5).unwrap();
    assert_eq!(triangles.len(), 8);
    assert_orientation_consistent(&points, &triangles);
    assert_no_duplicate_triangles(&triangles);
    assert_edge_manifold(&triangles);
}

#[test]
fn spherical_grid_delaunay_is_closed() {
    let points = spherical_cloud(20, 10);
    let triangles = reconstruct_delaunay(&points).unwrap();

    // A closed triangulated sphere satisfies Euler's formula V - E + F = 2
    // with 3F = 2E, i.e. F = 2V - 4.
    assert_eq!(triangles.len(), 2 * points.len() - 4);
    assert_orientation_consistent(&points, &triangles);
    assert_no_duplicate_triangles(&triangles);
    assert_edge_manifold(&triangles);
}

#[test]
fn disk_ball_pivoting_stays_in_plane() {
    let points = disk_cloud(8, 40, 1.6);
    let triangles = reconstruct_ball_pivoting(&points, 0.35).unwrap();
    assert!(!triangles.is_empty(), "expected at least one triangle over the disk");

    for t in &triangles {
        for idx in t.vertices() {
            assert!(points[idx as usize].pos.y.abs() < 0.01);
        }
    }
    assert_orientation_consistent(&points, &triangles);
    assert_edge_manifold(&triangles);
}

#[test]
fn coincident_duplicates_reconstruct_to_nothing() {
    let points = vec![pt(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)); 10];

    let delaunay = reconstruct_delaunay(&points).unwrap();
    assert!(delaunay.is_empty());

    let bpa = reconstruct_ball_pivoting(&points, 0.5).unwrap();
    assert!(bpa.is_empty());
}

#[test]
fn sub_radius_separation_is_unreconstructable() {
    let radius = 0.5;
    let points = vec![
        pt(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        pt(Vec3::new(4.0 * radius, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ];

    let (triangles, stats) = reconstruct_ball_pivoting_measured(&points, radius).unwrap();
    assert!(triangles.is_empty());
    assert!(!stats.seed_found);
}

#[test]
fn spherical_grid_reconstruction_is_deterministic() {
    let points = spherical_cloud(20, 10);
    let first = reconstruct_delaunay(&points).unwrap();
    let second = reconstruct_delaunay(&points).unwrap();
    assert_eq!(first, second);

    let first_bpa = reconstruct_ball_pivoting(&points, 0.3).unwrap();
    let second_bpa = reconstruct_ball_pivoting(&points, 0.3).unwrap();
    assert_eq!(first_bpa, second_bpa);
}

#[test]
fn tetrahedron_ball_pivoting_closes_up() {
    let points = vec![
        pt(Vec3::new(0.0, 0.0, 0.0), Vec3::new(-1.0, -1.0, -1.0).normalize()),
        pt(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        pt(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        pt(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)),
    ];

    let triangles = reconstruct_ball_pivoting(&points, 2.0).unwrap();
    assert_eq!(triangles.len(), 4);
    assert_no_duplicate_triangles(&triangles);
    assert_edge_manifold(&triangles);
}

#[test]
fn cube_ball_pivoting_closes_up() {
    let corners = [
        (-1.0, -1.0, -1.0),
        (-1.0, 1.0, -1.0),
        (1.0, 1.0, -1.0),
        (1.0, -1.0, -1.0),
        (-1.0, -1.0, 1.0),
        (-1.0, 1.0, 1.0),
        (1.0, 1.0, 1.0),
        (1.0, -1.0, 1.0),
    ];
    let points: Vec<Point> = corners
        .into_iter()
        .map(|(x, y, z)| {
            let pos = Vec3::new(x, y, z);
            pt(pos, pos.normalize())
        })
        .collect();

    let triangles = reconstruct_ball_pivoting(&points, 2.5).unwrap();
    assert_eq!(triangles.len(), 2 * points.len() - 4);
    assert_no_duplicate_triangles(&triangles);
    assert_edge_manifold(&triangles);
}
