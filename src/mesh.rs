//! Half-edge front records for the ball-pivoting engine.
//!
//! Pivoting needs mutable access to overlapping vertex neighborhoods as the
//! front grows: a point gains new edges every time a triangle is emitted
//! against it from a different direction. This keeps an `Rc<RefCell<_>>`
//! graph rather than the arena-and-index layout used for the Delaunay
//! topology in `delaunay.rs`.

use core::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::Point;

/// A point in 3D space with a normal vector, its input index, and the list
/// of mesh edges currently incident to it.
#[derive(Clone, Debug)]
pub(crate) struct MeshPoint {
    pub(crate) pos: Vec3,
    pub(crate) normal: Vec3,
    /// Index of this point in the caller's input slice.
    pub(crate) index: u32,
    pub(crate) used: bool,
    pub(crate) edges: Vec<Rc<RefCell<MeshEdge>>>,
}

impl MeshPoint {
    pub(crate) fn from_input(point: &Point, index: u32) -> Self {
        Self {
            pos: point.pos,
            normal: point.normal,
            index,
            used: false,
            edges: vec![],
        }
    }
}

/// Lifecycle state of a front edge. Transitions are monotone:
/// `Active -> {Boundary, Frozen}`, `Boundary -> Frozen`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum EdgeStatus {
    #[default]
    Active,
    Boundary,
    Frozen,
}

#[derive(Clone, Debug)]
pub(crate) struct MeshEdge {
    pub(crate) a: Rc<RefCell<MeshPoint>>,
    pub(crate) b: Rc<RefCell<MeshPoint>>,
    pub(crate) opposite: Rc<RefCell<MeshPoint>>,
    pub(crate) center: Vec3,
    pub(crate) prev: Option<Rc<RefCell<MeshEdge>>>,
    pub(crate) next: Option<Rc<RefCell<MeshEdge>>>,
    pub(crate) status: EdgeStatus,
}

impl MeshEdge {
    pub(crate) fn new(
        a: &Rc<RefCell<MeshPoint>>,
        b: &Rc<RefCell<MeshPoint>>,
        opposite: &Rc<RefCell<MeshPoint>>,
        center: Vec3,
    ) -> Self {
        Self {
            a: a.clone(),
            b: b.clone(),
            opposite: opposite.clone(),
            center,
            prev: None,
            next: None,
            status: EdgeStatus::Active,
        }
    }
}

/// A triangle referencing three mesh points, used internally while the
/// front is being grown. Converted to index triples at the façade boundary.
#[derive(Clone, Debug)]
pub(crate) struct MeshFace(pub(crate) [Rc<RefCell<MeshPoint>>; 3]);
