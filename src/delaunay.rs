//! Spherical Delaunay reconstruction: radial projection onto the unit
//! sphere, incremental insertion by triangle walk, and Lawson-flip local
//! optimization.
//!
//! Topology is an arena of triangles addressed by `u32` index rather than
//! the source's pointer graph: splitting, diagonal flips, and neighbor
//! fixups all operate on indices into `self.triangles`, and `None` stands
//! in for "no neighbor" (never actually reached on a closed hull, but kept
//! honest to the type).

use std::time::Instant;

use glam::Vec3;
use glam::vec3;

use crate::error::ReconstructError;
use crate::math::signed_volume;

/// Positions of the six auxiliary vertices used to bootstrap the hull,
/// matching the axis order the source's neighbor tables assume.
const AUXILIARY_POSITIONS: [Vec3; 6] = [
    vec3(1.0, 0.0, 0.0),
    vec3(-1.0, 0.0, 0.0),
    vec3(0.0, 1.0, 0.0),
    vec3(0.0, -1.0, 0.0),
    vec3(0.0, 0.0, 1.0),
    vec3(0.0, 0.0, -1.0),
];

const INITIAL_VERTEX_0: [usize; 8] = [0, 0, 0, 0, 1, 1, 1, 1];
const INITIAL_VERTEX_1: [usize; 8] = [4, 3, 5, 2, 2, 4, 3, 5];
const INITIAL_VERTEX_2: [usize; 8] = [2, 4, 3, 5, 4, 3, 5, 2];
const INITIAL_NEIGHBOR_0: [usize; 8] = [1, 2, 3, 0, 7, 4, 5, 6];
const INITIAL_NEIGHBOR_1: [usize; 8] = [4, 5, 6, 7, 0, 1, 2, 3];
const INITIAL_NEIGHBOR_2: [usize; 8] = [3, 0, 1, 2, 5, 6, 7, 4];

/// A safety bound on walk restarts: the walk's fallback path should be
/// unreachable on well-formed input, but a malformed one must not spin
/// forever.
const MAX_WALK_RESTARTS_FACTOR: usize = 4;

#[derive(Clone, Copy, Debug)]
struct DTriangle {
    vertex: [u32; 3],
    neighbor: [Option<u32>; 3],
}

/// Counters and wall time gathered during a single run, logged at
/// `debug!` level rather than returned to callers.
#[derive(Debug, Default)]
pub(crate) struct DelaunayStats {
    pub(crate) walk_steps: u64,
    pub(crate) local_optimizations: u64,
    pub(crate) elapsed: std::time::Duration,
}

struct Engine {
    /// Projected positions: first six are auxiliary slots, the rest mirror
    /// the caller's input slice one-to-one.
    dots: Vec<Vec3>,
    is_auxiliary: Vec<bool>,
    /// Maps an arena dot index back to the caller's input index; `None`
    /// for auxiliary slots that were never substituted.
    source_index: Vec<Option<u32>>,
    triangles: Vec<DTriangle>,
    stats: DelaunayStats,
}

impl Engine {
    fn fix_neighborhood(&mut self, target: Option<u32>, old_id: u32, new_id: u32) {
        let Some(target) = target else { return };
        for slot in &mut self.triangles[target as usize].neighbor {
            if *slot == Some(old_id) {
                *slot = Some(new_id);
                break;
            }
        }
    }

    /// Replaces triangle `t_idx` (which contains projected point `dot` in
    /// its spherical interior) with three triangles sharing `dot`.
    fn split(&mut self, t_idx: u32, dot: u32) {
        let old_v = self.triangles[t_idx as usize].vertex;
        let old_n = self.triangles[t_idx as usize].neighbor;

        let new1_idx = self.triangles.len() as u32;
        let new2_idx = new1_idx + 1;

        let new1 = DTriangle {
            vertex: [dot, old_v[1], old_v[2]],
            neighbor: [Some(t_idx), old_n[1], Some(new2_idx)],
        };
        let new2 = DTriangle {
            vertex: [dot, old_v[2], old_v[0]],
            neighbor: [Some(new1_idx), old_n[2], Some(t_idx)],
        };

        self.triangles[t_idx as usize] = DTriangle {
            vertex: [dot, old_v[0], old_v[1]],
            neighbor: [Some(new2_idx), old_n[0], Some(new1_idx)],
        };
        self.triangles.push(new1);
        self.triangles.push(new2);

        self.fix_neighborhood(old_n[1], t_idx, new1_idx);
        self.fix_neighborhood(old_n[2], t_idx, new2_idx);

        // A triangle on a closed hull always has all three neighbors; a
        // `None` here would mean a boundary edge, which never occurs
        // before the final auxiliary-vertex sweep. Skip rather than panic
        // if it ever does.
        if let Some(opt0) = old_n[0] {
            self.do_local_optimization(t_idx, opt0);
        }
        if let Some(opt1) = old_n[1] {
            self.do_local_optimization(new1_idx, opt1);
        }
        if let Some(opt2) = old_n[2] {
            self.do_local_optimization(new2_idx, opt2);
        }
    }

    /// Checks whether `t1`'s opposite vertex violates Delaunay legality
    /// against `t0` and, if so, flips the shared diagonal. Preserves the
    /// source's early exit: stop scanning the moment a vertex is found
    /// legal, rather than checking all three.
    fn do_local_optimization(&mut self, t0: u32, t1: u32) {
        self.stats.local_optimizations += 1;

        let t0_vertex = self.triangles[t0 as usize].vertex;
        let t1_vertex = self.triangles[t1 as usize].vertex;

        for &w in &t1_vertex {
            if t0_vertex.contains(&w) {
                continue;
            }

            let w_pos = self.dots[w as usize];
            let det = signed_volume(
                w_pos - self.dots[t0_vertex[0] as usize],
                w_pos - self.dots[t0_vertex[1] as usize],
                w_pos - self.dots[t0_vertex[2] as usize],
            );

            if det <= 0.0 {
                break;
            }

            if self.try_swap_diagonal(t0, t1) {
                return;
            }
        }
    }

    /// Given adjacent triangles `t0`/`t1` sharing edge `e`, replaces them
    /// with the two triangles sharing the quadrilateral's other diagonal.
    fn try_swap_diagonal(&mut self, t0_idx: u32, t1_idx: u32) -> bool {
        for j in 0..3 {
            for k in 0..3 {
                let t0v = self.triangles[t0_idx as usize].vertex;
                let t1v = self.triangles[t1_idx as usize].vertex;
                if t1v.contains(&t0v[j]) || t0v.contains(&t1v[k]) {
                    continue;
                }

                let t0n = self.triangles[t0_idx as usize].neighbor;
                let t1n = self.triangles[t1_idx as usize].neighbor;

                self.triangles[t0_idx as usize].vertex[(j + 2) % 3] = t1v[k];
                self.triangles[t1_idx as usize].vertex[(k + 2) % 3] = t0v[j];

                self.triangles[t0_idx as usize].neighbor[(j + 1) % 3] = t1n[(k + 2) % 3];
                self.triangles[t1_idx as usize].neighbor[(k + 1) % 3] = t0n[(j + 2) % 3];
                self.triangles[t0_idx as usize].neighbor[(j + 2) % 3] = Some(t1_idx);
                self.triangles[t1_idx as usize].neighbor[(k + 2) % 3] = Some(t0_idx);

                let fix_t0 = self.triangles[t0_idx as usize].neighbor[(j + 1) % 3];
                self.fix_neighborhood(fix_t0, t1_idx, t0_idx);
                let fix_t1 = self.triangles[t1_idx as usize].neighbor[(k + 1) % 3];
                self.fix_neighborhood(fix_t1, t0_idx, t1_idx);

                // See the matching comment in `split`: these are always
                // `Some` on a closed hull, but a stray `None` is skipped
                // rather than a panic.
                if let Some(a) = t0n[j] {
                    self.do_local_optimization(t0_idx, a);
                }
                if let Some(b) = self.triangles[t0_idx as usize].neighbor[(j + 1) % 3] {
                    self.do_local_optimization(t0_idx, b);
                }
                if let Some(c) = t1n[k] {
                    self.do_local_optimization(t1_idx, c);
                }
                if let Some(d) = self.triangles[t1_idx as usize].neighbor[(k + 1) % 3] {
                    self.do_local_optimization(t1_idx, d);
                }

                return true;
            }
        }
        false
    }

    fn has_coincident_vertex(&self, t_idx: u32, pos: Vec3) -> bool {
        self.triangles[t_idx as usize]
            .vertex
            .iter()
            .any(|&v| self.dots[v as usize] == pos)
    }

    /// Walks the triangulation to locate the triangle containing `dot`,
    /// then splits it (or skips a duplicate). Bounded restarts guard the
    /// "cannot determine" fallback.
    fn insert_dot(&mut self, dot: u32) {
        let pos = self.dots[dot as usize];
        let max_steps = self.triangles.len() * MAX_WALK_RESTARTS_FACTOR + 16;
        let mut restart_cursor = 0u32;
        let mut current = 0u32;

        for _ in 0..max_steps {
            self.stats.walk_steps += 1;
            let t = self.triangles[current as usize];

            let d0 = signed_volume(
                self.dots[t.vertex[0] as usize],
                self.dots[t.vertex[1] as usize],
                pos,
            );
            let d1 = signed_volume(
                self.dots[t.vertex[1] as usize],
                self.dots[t.vertex[2] as usize],
                pos,
            );
            let d2 = signed_volume(
                self.dots[t.vertex[2] as usize],
                self.dots[t.vertex[0] as usize],
                pos,
            );

            if d0 >= 0.0 && d1 >= 0.0 && d2 >= 0.0 {
                if !self.has_coincident_vertex(current, pos) {
                    self.split(current, dot);
                }
                return;
            }

            // Precedence follows SPEC §4.3: cross the edge opposite the
            // single negative determinant, or opposite the single
            // non-negative one when two are negative. A missing neighbor
            // here is as unreachable on a closed hull as the "no
            // determinant is non-negative" case below; both fall through
            // to the same bounded restart rather than panicking.
            let next = if d1 >= 0.0 && d2 >= 0.0 {
                t.neighbor[0]
            } else if d0 >= 0.0 && d2 >= 0.0 {
                t.neighbor[1]
            } else if d0 >= 0.0 && d1 >= 0.0 {
                t.neighbor[2]
            } else if d0 >= 0.0 {
                t.neighbor[1]
            } else if d1 >= 0.0 {
                t.neighbor[2]
            } else if d2 >= 0.0 {
                t.neighbor[0]
            } else {
                None
            };

            match next {
                Some(n) => current = n,
                None => {
                    restart_cursor = (restart_cursor + 1) % self.triangles.len() as u32;
                    current = restart_cursor;
                }
            }
        }
    }
}

/// Reconstructs a triangle list from `points` via spherical Delaunay
/// triangulation.
pub(crate) fn reconstruct(
    positions: &[Vec3],
) -> Result<(Vec<[u32; 3]>, DelaunayStats), ReconstructError> {
    let start = Instant::now();
    let n = positions.len();

    let projected: Vec<Vec3> = positions.iter().map(|p| p.normalize_or_zero()).collect();

    let mut initial_vertex = [0u32, 1, 2, 3, 4, 5];
    let mut min_distance = [f32::INFINITY; 6];
    for (i, &proj) in projected.iter().enumerate() {
        let distance: [f32; 6] =
            std::array::from_fn(|axis| (AUXILIARY_POSITIONS[axis] - proj).length());
        for axis in 0..6 {
            let is_nearest_axis = distance.iter().all(|&d| distance[axis] <= d);
            if is_nearest_axis && distance[axis] < min_distance[axis] {
                min_distance[axis] = distance[axis];
                initial_vertex[axis] = 6 + i as u32;
            }
        }
    }

    let mut dots = AUXILIARY_POSITIONS.to_vec();
    let mut is_auxiliary = vec![true; 6];
    let mut source_index: Vec<Option<u32>> = vec![None; 6];
    for (i, &proj) in projected.iter().enumerate() {
        dots.push(proj);
        is_auxiliary.push(false);
        source_index.push(Some(i as u32));
    }

    let mut triangles = Vec::with_capacity(8 + 2 * n.saturating_sub(6));
    for face in 0..8 {
        triangles.push(DTriangle {
            vertex: [
                initial_vertex[INITIAL_VERTEX_0[face]],
                initial_vertex[INITIAL_VERTEX_1[face]],
                initial_vertex[INITIAL_VERTEX_2[face]],
            ],
            neighbor: [
                Some(INITIAL_NEIGHBOR_0[face] as u32),
                Some(INITIAL_NEIGHBOR_1[face] as u32),
                Some(INITIAL_NEIGHBOR_2[face] as u32),
            ],
        });
    }

    for face in &triangles {
        let normal = (dots[face.vertex[1] as usize] - dots[face.vertex[0] as usize])
            .cross(dots[face.vertex[2] as usize] - dots[face.vertex[0] as usize]);
        if normal.length_squared() <= f32::EPSILON {
            let locating = face
                .vertex
                .iter()
                .find_map(|&v| source_index[v as usize])
                .unwrap_or(0);
            return Err(ReconstructError::DegenerateGeometry { index: locating as usize });
        }
    }

    let mut visited = vec![false; n];
    for &v in &initial_vertex {
        if let Some(src) = source_index[v as usize] {
            visited[src as usize] = true;
        }
    }

    let mut engine = Engine {
        dots,
        is_auxiliary,
        source_index,
        triangles,
        stats: DelaunayStats::default(),
    };

    for i in 0..n {
        if visited[i] {
            continue;
        }
        engine.insert_dot(6 + i as u32);
    }

    // The walk/split/flip math above follows the source's left-handed
    // determinant convention, which leaves `t.vertex` wound so its
    // right-hand-rule normal points into the sphere. Swap the last two
    // indices here, at the output boundary only, so returned triangles
    // face outward; the internal topology is left untouched.
    let output: Vec<[u32; 3]> = engine
        .triangles
        .iter()
        .filter(|t| !t.vertex.iter().any(|&v| engine.is_auxiliary[v as usize]))
        .map(|t| {
            [
                engine.source_index[t.vertex[0] as usize].expect("non-auxiliary vertex"),
                engine.source_index[t.vertex[2] as usize].expect("non-auxiliary vertex"),
                engine.source_index[t.vertex[1] as usize].expect("non-auxiliary vertex"),
            ]
        })
        .collect();

    engine.stats.elapsed = start.elapsed();
    log::debug!(
        "spherical delaunay: {} triangles, {} walk steps, {} local optimizations, {:?}",
        output.len(),
        engine.stats.walk_steps,
        engine.stats.local_optimizations,
        engine.stats.elapsed
    );

    Ok((output, engine.stats))
}
