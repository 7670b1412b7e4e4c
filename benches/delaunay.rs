use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use glam::Vec3;
use reconstruct_rs::Point;
use reconstruct_rs::reconstruct_delaunay;

fn spherical_cloud(slices: i32, stacks: i32) -> Vec<Point> {
    let mut points = vec![Point {
        pos: Vec3::new(0.0, 0.0, -1.0),
        normal: Vec3::new(0.0, 0.0, -1.0),
    }];

    for slice in 0..slices {
        for stack in 1..stacks {
            let yaw = (f64::from(slice) / f64::from(slices)) * 2.0 * std::f64::consts::PI;
            let z = ((f64::from(stack) / f64::from(stacks) - 0.5) * std::f64::consts::PI).sin();
            let r = (1.0 - z * z).sqrt();

            let v = Vec3::new((r * yaw.sin()) as f32, (r * yaw.cos()) as f32, z as f32);
            points.push(Point { pos: v, normal: v.normalize() });
        }
    }

    points.push(Point {
        pos: Vec3::new(0.0, 0.0, 1.0),
        normal: Vec3::new(0.0, 0.0, 1.0),
    });
    points
}

pub fn sphere_100_50(criterion: &mut Criterion) {
    let cloud = spherical_cloud(100, 50);

    criterion.bench_function("sphere_100_50_delaunay", |b| {
        b.iter(|| {
            let triangles = reconstruct_delaunay(black_box(&cloud)).unwrap();
            assert_eq!(triangles.len(), 2 * cloud.len() - 4);
        });
    });
}

criterion_group!(benches, sphere_100_50);
criterion_main!(benches);
