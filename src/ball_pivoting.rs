//! Ball-pivoting reconstruction: seed triangle search plus edge-front
//! pivoting.
//!
//! Topology lives in `mesh::MeshPoint`/`MeshEdge`/`MeshFace`; this module
//! owns the control flow that grows the front until it and the supply of
//! unused points are both exhausted.

use core::cell::RefCell;
use core::f32::consts::PI;
use std::rc::Rc;
use std::time::Instant;

use glam::Vec3;

use crate::Point;
use crate::grid::SpatialIndex;
use crate::math::ball_center;
use crate::math::triangle_normal;
use crate::mesh::EdgeStatus;
use crate::mesh::MeshEdge;
use crate::mesh::MeshFace;
use crate::mesh::MeshPoint;

/// Relative tolerance on emptiness and circumradius checks, expressed as a
/// fraction of the pivot radius.
const RELATIVE_EPSILON: f32 = 1e-6;

/// Tie-break window for the pivot-angle comparison: candidates whose angles
/// differ by less than this are treated as equal and broken by vertex
/// index.
const ANGLE_EPSILON: f32 = 1e-5;

/// Raw counters and elapsed time gathered during a single reconstruction
/// run; the façade maps this onto the public `BallPivotingStats`.
#[derive(Debug, Default)]
pub(crate) struct RunStats {
    pub(crate) total: std::time::Duration,
    pub(crate) seed_search: std::time::Duration,
    pub(crate) pivot: std::time::Duration,
    pub(crate) front_peak_size: usize,
    pub(crate) seed_found: bool,
}

pub(crate) struct Output {
    pub(crate) triangles: Vec<[u32; 3]>,
    pub(crate) stats: RunStats,
}

fn mesh_points(points: &[Point]) -> Vec<Rc<RefCell<MeshPoint>>> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Rc::new(RefCell::new(MeshPoint::from_input(p, i as u32))))
        .collect()
}

fn is_ball_empty(
    points: &[Point],
    index: &SpatialIndex,
    center: Vec3,
    radius: f32,
    exclude: &[u32],
) -> bool {
    let eps = RELATIVE_EPSILON * radius;
    let threshold_sq = (radius - eps).max(0.0).powi(2);
    !index.query_ball(points, center, radius).into_iter().any(|idx| {
        if exclude.contains(&idx) {
            return false;
        }
        (points[idx as usize].pos - center).length_squared() < threshold_sq
    })
}

struct SeedResult {
    face: MeshFace,
    ball_center: Vec3,
}

/// Finds the first seed triangle, scanning unused points in input order.
fn find_seed_triangle(
    points: &[Point],
    mesh: &[Rc<RefCell<MeshPoint>>],
    index: &SpatialIndex,
    radius: f32,
) -> Option<SeedResult> {
    for p_idx in 0..points.len() {
        if mesh[p_idx].borrow().used {
            continue;
        }
        let p = &mesh[p_idx];
        let mut neighborhood: Vec<u32> = index
            .query_ball(points, points[p_idx].pos, 2.0 * radius)
            .into_iter()
            .filter(|&i| i != p_idx as u32)
            .collect();
        neighborhood.sort_by(|&a, &b| {
            let da = (points[a as usize].pos - points[p_idx].pos).length_squared();
            let db = (points[b as usize].pos - points[p_idx].pos).length_squared();
            da.total_cmp(&db)
        });

        for &q_idx in &neighborhood {
            for &s_idx in &neighborhood {
                if q_idx == s_idx {
                    continue;
                }

                let (b_idx, c_idx) = {
                    let avg_normal =
                        (points[p_idx].normal + points[q_idx].normal + points[s_idx].normal)
                            .normalize();
                    let normal =
                        triangle_normal(points[p_idx].pos, points[q_idx].pos, points[s_idx].pos);
                    if normal.dot(avg_normal) < 0.0 {
                        (s_idx, q_idx)
                    } else {
                        (q_idx, s_idx)
                    }
                };

                let Some(center) = ball_center(
                    points[p_idx].pos,
                    points[b_idx as usize].pos,
                    points[c_idx as usize].pos,
                    radius,
                ) else {
                    continue;
                };

                if is_ball_empty(
                    points,
                    index,
                    center,
                    radius,
                    &[p_idx as u32, b_idx, c_idx],
                ) {
                    let q = mesh[b_idx as usize].clone();
                    let s = mesh[c_idx as usize].clone();
                    p.borrow_mut().used = true;
                    q.borrow_mut().used = true;
                    s.borrow_mut().used = true;
                    return Some(SeedResult {
                        face: MeshFace([p.clone(), q, s]),
                        ball_center: center,
                    });
                }
            }
        }
    }
    None
}

fn get_active_edge(front: &mut Vec<Rc<RefCell<MeshEdge>>>) -> Option<Rc<RefCell<MeshEdge>>> {
    loop {
        match front.last() {
            None => return None,
            Some(e) => {
                if e.borrow().status == EdgeStatus::Active {
                    return Some(e.clone());
                }
            }
        }
        front.pop();
    }
}

struct PivotResult {
    point: Rc<RefCell<MeshPoint>>,
    center: Vec3,
}

/// Rotates the ball around edge `e`, returning the vertex it next touches.
fn ball_pivot(
    e: &Rc<RefCell<MeshEdge>>,
    points: &[Point],
    mesh: &[Rc<RefCell<MeshPoint>>],
    index: &SpatialIndex,
    radius: f32,
) -> Option<PivotResult> {
    let a = e.borrow().a.clone();
    let b = e.borrow().b.clone();
    let o = e.borrow().opposite.clone();
    let m = (a.borrow().pos + b.borrow().pos) / 2.0;
    let old_center_vec = (e.borrow().center - m).normalize();

    let exclude = [a.borrow().index, b.borrow().index, o.borrow().index];
    let candidates: Vec<u32> = index
        .query_ball(points, m, 2.0 * radius)
        .into_iter()
        .filter(|i| !exclude.contains(i))
        .collect();

    let mut best: Option<(f32, u32, Vec3)> = None;

    'candidates: for &x_idx in &candidates {
        let x = &mesh[x_idx as usize];
        let new_face_normal = triangle_normal(b.borrow().pos, a.borrow().pos, x.borrow().pos);

        if new_face_normal.dot(x.borrow().normal) < 0.0 {
            continue;
        }

        let Some(c) = ball_center(b.borrow().pos, a.borrow().pos, x.borrow().pos, radius) else {
            continue;
        };

        let new_center_vec = (c - m).normalize();
        if new_center_vec.dot(new_face_normal) < 0.0 {
            continue;
        }

        // A point already joined to a or b by a frozen edge cannot be
        // pivoted to again: the quadrilateral would double-cover a face.
        for ee in &x.borrow().edges {
            let ee = ee.borrow();
            let other = if Rc::ptr_eq(&ee.a, x) { &ee.b } else { &ee.a };
            if ee.status == EdgeStatus::Frozen
                && (Rc::ptr_eq(other, &a) || Rc::ptr_eq(other, &b))
            {
                continue 'candidates;
            }
        }

        let mut angle = old_center_vec
            .dot(new_center_vec)
            .clamp(-1.0, 1.0)
            .acos();
        if new_center_vec
            .cross(old_center_vec)
            .dot(a.borrow().pos - b.borrow().pos)
            < 0.0
        {
            angle += PI;
        }

        let better = match best {
            None => true,
            Some((best_angle, best_idx, _)) => {
                if (angle - best_angle).abs() < ANGLE_EPSILON {
                    x_idx < best_idx
                } else {
                    angle < best_angle
                }
            }
        };
        if better {
            best = Some((angle, x_idx, c));
        }
    }

    let (_, x_idx, center) = best?;
    if !is_ball_empty(points, index, center, radius, &[a.borrow().index, b.borrow().index, x_idx]) {
        return None;
    }

    Some(PivotResult {
        point: mesh[x_idx as usize].clone(),
        center,
    })
}

const fn not_used(p: &MeshPoint) -> bool {
    !p.used
}

fn on_front(p: &MeshPoint) -> bool {
    p.edges.iter().any(|e| e.borrow().status == EdgeStatus::Active)
}

fn freeze(e: &Rc<RefCell<MeshEdge>>) {
    e.borrow_mut().status = EdgeStatus::Frozen;
}

fn output_triangle(f: &MeshFace, triangles: &mut Vec<[u32; 3]>) {
    triangles.push([
        f.0[0].borrow().index,
        f.0[1].borrow().index,
        f.0[2].borrow().index,
    ]);
}

/// Splits the active edge `e_ij` at the newly accepted vertex `o_k`,
/// producing the two new front edges `(a, o_k)` and `(o_k, b)`.
fn join(
    e_ij: &Rc<RefCell<MeshEdge>>,
    o_k: &Rc<RefCell<MeshPoint>>,
    o_k_ball_center: Vec3,
    front: &mut Vec<Rc<RefCell<MeshEdge>>>,
) -> (Rc<RefCell<MeshEdge>>, Rc<RefCell<MeshEdge>>) {
    let e_ik = Rc::new(RefCell::new(MeshEdge::new(
        &e_ij.borrow().a,
        o_k,
        &e_ij.borrow().b.clone(),
        o_k_ball_center,
    )));
    let e_kj = Rc::new(RefCell::new(MeshEdge::new(
        o_k,
        &e_ij.borrow().b,
        &e_ij.borrow().a.clone(),
        o_k_ball_center,
    )));

    e_ik.borrow_mut().next = Some(e_kj.clone());
    e_ik.borrow_mut().prev.clone_from(&e_ij.borrow().prev);
    if let Some(prev) = &e_ij.borrow().prev {
        prev.borrow_mut().next = Some(e_ik.clone());
    }
    e_ij.borrow().a.borrow_mut().edges.push(e_ik.clone());

    e_kj.borrow_mut().prev = Some(e_ik.clone());
    e_kj.borrow_mut().next.clone_from(&e_ij.borrow().next);
    if let Some(next) = &e_ij.borrow().next {
        next.borrow_mut().prev = Some(e_kj.clone());
    }
    e_ij.borrow().b.borrow_mut().edges.push(e_kj.clone());

    {
        let mut o_k_inner = o_k.borrow_mut();
        o_k_inner.used = true;
        o_k_inner.edges.push(e_ik.clone());
        o_k_inner.edges.push(e_kj.clone());
    }

    front.push(e_ik.clone());
    front.push(e_kj.clone());
    freeze(e_ij);

    (e_ik, e_kj)
}

fn find_reverse_edge_on_front(edge: &Rc<RefCell<MeshEdge>>) -> Option<Rc<RefCell<MeshEdge>>> {
    for e in &edge.borrow().a.borrow().edges {
        if Rc::ptr_eq(&e.borrow().a, &edge.borrow().b) {
            return Some(e.clone());
        }
    }
    None
}

/// Freezes two edges that a new triangle has paired front-to-front,
/// stitching the doubly-linked front list back together around them.
fn glue(a: &Rc<RefCell<MeshEdge>>, b: &Rc<RefCell<MeshEdge>>) {
    let a_next_is_b = a.borrow().next.as_ref().is_some_and(|n| Rc::ptr_eq(n, b));
    let a_prev_is_b = a.borrow().prev.as_ref().is_some_and(|p| Rc::ptr_eq(p, b));
    let b_next_is_a = b.borrow().next.as_ref().is_some_and(|n| Rc::ptr_eq(n, a));
    let b_prev_is_a = b.borrow().prev.as_ref().is_some_and(|p| Rc::ptr_eq(p, a));

    if a_next_is_b && a_prev_is_b && b_next_is_a && b_prev_is_a {
        freeze(a);
        freeze(b);
        return;
    }

    if a_next_is_b && b_prev_is_a {
        if let Some(a_prev) = a.borrow().prev.clone() {
            a_prev.borrow_mut().next.clone_from(&b.borrow().next);
        }
        if let Some(b_next) = b.borrow().next.clone() {
            b_next.borrow_mut().prev.clone_from(&a.borrow().prev);
        }
        freeze(a);
        freeze(b);
        return;
    }

    if a_prev_is_b && b_next_is_a {
        let b_next = b.borrow().next.clone();
        a.borrow_mut().next = b_next;
        let a_prev = a.borrow().prev.clone();
        b.borrow_mut().prev = a_prev;
        freeze(a);
        freeze(b);
        return;
    }

    if let Some(a_prev) = a.borrow().prev.clone() {
        a_prev.borrow_mut().next.clone_from(&b.borrow().next);
    }
    if let Some(b_next) = b.borrow().next.clone() {
        b_next.borrow_mut().prev.clone_from(&a.borrow().prev);
    }
    if let Some(a_next) = a.borrow().next.clone() {
        a_next.borrow_mut().prev.clone_from(&b.borrow().prev);
    }
    if let Some(b_prev) = b.borrow().prev.clone() {
        b_prev.borrow_mut().next.clone_from(&a.borrow().next);
    }
    freeze(a);
    freeze(b);
}

/// Runs the ball-pivoting reconstruction to completion, always gathering
/// timing so the façade can expose it for the `_measured` entry point
/// without running the algorithm twice.
pub(crate) fn reconstruct(points: &[Point], radius: f32) -> Output {
    let run_start = Instant::now();
    let mesh = mesh_points(points);
    let index = SpatialIndex::build(points, 2.0 * radius);

    let seed_start = Instant::now();
    let seed = find_seed_triangle(points, &mesh, &index, radius);
    let seed_search_elapsed = seed_start.elapsed();

    let Some(seed) = seed else {
        log::debug!("ball pivoting: no seed triangle found among {} points", points.len());
        return Output {
            triangles: Vec::new(),
            stats: RunStats {
                total: run_start.elapsed(),
                seed_search: seed_search_elapsed,
                pivot: std::time::Duration::ZERO,
                front_peak_size: 0,
                seed_found: false,
            },
        };
    };

    let mut triangles = Vec::new();
    output_triangle(&seed.face, &mut triangles);

    let [p0, p1, p2] = seed.face.0;
    let e0 = Rc::new(RefCell::new(MeshEdge::new(&p0, &p1, &p2, seed.ball_center)));
    let e1 = Rc::new(RefCell::new(MeshEdge::new(&p1, &p2, &p0, seed.ball_center)));
    let e2 = Rc::new(RefCell::new(MeshEdge::new(&p2, &p0, &p1, seed.ball_center)));

    e0.borrow_mut().prev = Some(e2.clone());
    e0.borrow_mut().next = Some(e1.clone());
    e1.borrow_mut().prev = Some(e0.clone());
    e1.borrow_mut().next = Some(e2.clone());
    e2.borrow_mut().prev = Some(e1.clone());
    e2.borrow_mut().next = Some(e0.clone());

    p0.borrow_mut().edges = vec![e0.clone(), e2.clone()];
    p1.borrow_mut().edges = vec![e0.clone(), e1.clone()];
    p2.borrow_mut().edges = vec![e1.clone(), e2.clone()];

    let mut front = vec![e0, e1, e2];
    let mut front_peak_size = front.len();
    let mut pivot_elapsed = std::time::Duration::ZERO;

    loop {
        while let Some(e_ij) = get_active_edge(&mut front) {
            front_peak_size = front_peak_size.max(front.len());

            let pivot_start = Instant::now();
            let pivoted = ball_pivot(&e_ij, points, &mesh, &index, radius);
            pivot_elapsed += pivot_start.elapsed();

            let mut grew = false;
            if let Some(candidate) = &pivoted {
                let is_new = not_used(&candidate.point.borrow());
                let is_reachable = is_new || on_front(&candidate.point.borrow());
                if is_reachable {
                    grew = true;
                    output_triangle(
                        &MeshFace([e_ij.borrow().a.clone(), candidate.point.clone(), e_ij.borrow().b.clone()]),
                        &mut triangles,
                    );

                    let (e_ik, e_kj) = join(&e_ij, &candidate.point, candidate.center, &mut front);
                    if let Some(e_ki) = find_reverse_edge_on_front(&e_ik) {
                        glue(&e_ik, &e_ki);
                    }
                    if let Some(e_jk) = find_reverse_edge_on_front(&e_kj) {
                        glue(&e_kj, &e_jk);
                    }
                }
            }

            if !grew {
                e_ij.borrow_mut().status = EdgeStatus::Boundary;
            }
        }

        let seed = find_seed_triangle(points, &mesh, &index, radius);
        let Some(seed) = seed else {
            break;
        };

        output_triangle(&seed.face, &mut triangles);
        let [p0, p1, p2] = seed.face.0;
        let e0 = Rc::new(RefCell::new(MeshEdge::new(&p0, &p1, &p2, seed.ball_center)));
        let e1 = Rc::new(RefCell::new(MeshEdge::new(&p1, &p2, &p0, seed.ball_center)));
        let e2 = Rc::new(RefCell::new(MeshEdge::new(&p2, &p0, &p1, seed.ball_center)));
        e0.borrow_mut().prev = Some(e2.clone());
        e0.borrow_mut().next = Some(e1.clone());
        e1.borrow_mut().prev = Some(e0.clone());
        e1.borrow_mut().next = Some(e2.clone());
        e2.borrow_mut().prev = Some(e1.clone());
        e2.borrow_mut().next = Some(e0.clone());
        p0.borrow_mut().edges.extend([e0.clone(), e2.clone()]);
        p1.borrow_mut().edges.extend([e0.clone(), e1.clone()]);
        p2.borrow_mut().edges.extend([e1.clone(), e2.clone()]);
        front.extend([e0, e1, e2]);
    }

    log::debug!(
        "ball pivoting: {} triangles, front peak {}, seed search {:?}, pivot {:?}",
        triangles.len(),
        front_peak_size,
        seed_search_elapsed,
        pivot_elapsed
    );

    Output {
        triangles,
        stats: RunStats {
            total: run_start.elapsed(),
            seed_search: seed_search_elapsed,
            pivot: pivot_elapsed,
            front_peak_size,
            seed_found: true,
        },
    }
}
