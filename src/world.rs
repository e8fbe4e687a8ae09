// Copyright 2026 The RBP developers. This file is part of RBP.
//
// RBP is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// RBP is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with RBP. If not, see <http://www.gnu.org/licenses/>.

use std::mem;
use std::ops::{Index, IndexMut};

use cgmath::{EuclideanSpace, InnerSpace, Matrix3, Point3, Vector3, Zero};

use crate::error::PhysicsError;
use crate::geom::{vec3_f64, BoundingSphere, CollisionRidge, CollisionTriangle, GEOMETRY_EPSILON};
use crate::integrator::RigidBodyIntegrator;
use crate::sat::CollisionVertices;
use crate::wheel::Wheel;

/// A body-local collision edge with its orientation tolerance.
#[derive(Copy, Clone, Debug)]
pub struct LocalRidge {
    pub a: Vector3<f32>,
    pub b: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub min_cos: f32,
}

/// Convex collision geometry of a movable body, body-local.
///
/// Only what the narrow phase consumes: the hull vertices and the edges
/// that may act as separating-axis candidates.
#[derive(Clone, Debug)]
pub struct CollisionShape {
    pub points: Vec<Vector3<f32>>,
    pub ridges: Vec<LocalRidge>,
}

impl CollisionShape {
    pub fn new(
        points: Vec<Vector3<f32>>,
        ridges: Vec<LocalRidge>,
    ) -> Result<CollisionShape, PhysicsError> {
        for p in &points {
            if !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite() {
                return Err(PhysicsError::NonFiniteGeometry);
            }
        }
        for r in &ridges {
            if !r.min_cos.is_finite() || vec3_f64(r.normal).magnitude2() < GEOMETRY_EPSILON {
                return Err(PhysicsError::DegenerateRidgeNormal);
            }
        }
        Ok(CollisionShape { points, ridges })
    }

    /// Radius of the smallest origin-centered sphere containing the
    /// shape.
    pub fn bounding_radius(&self) -> f32 {
        let mut r2 = 0.0f32;
        for p in &self.points {
            r2 = r2.max(p.magnitude2());
        }
        for ridge in &self.ridges {
            r2 = r2.max(ridge.a.magnitude2()).max(ridge.b.magnitude2());
        }
        r2.sqrt()
    }

    pub fn world_vertices(
        &self,
        rotation: &Matrix3<f32>,
        position: &Point3<f64>,
        out: &mut CollisionVertices,
    ) {
        for p in &self.points {
            out.insert(position.to_vec() + vec3_f64(*rotation * *p));
        }
    }

    pub fn world_ridges(
        &self,
        rotation: &Matrix3<f32>,
        position: &Point3<f64>,
    ) -> Vec<CollisionRidge> {
        self.ridges
            .iter()
            .map(|r| CollisionRidge {
                a: position.to_vec() + vec3_f64(*rotation * r.a),
                b: position.to_vec() + vec3_f64(*rotation * r.b),
                normal: vec3_f64(*rotation * r.normal),
                min_cos: r.min_cos as f64,
            })
            .collect()
    }
}

/// A movable body: its integrator plus optional collision geometry.
/// Bodies without a shape are simulated but never collide.
#[derive(Clone, Debug)]
pub struct Body {
    pub integrator: RigidBodyIntegrator,
    pub shape: Option<CollisionShape>,
}

impl Body {
    pub fn new(integrator: RigidBodyIntegrator) -> Body {
        Body {
            integrator,
            shape: None,
        }
    }

    pub fn with_shape(integrator: RigidBodyIntegrator, shape: CollisionShape) -> Body {
        Body {
            integrator,
            shape: Some(shape),
        }
    }

    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.shape.as_ref().map(|s| BoundingSphere {
            center: self.integrator.pulses.position,
            radius: s.bounding_radius() as f64,
        })
    }
}

/// Immovable collision geometry: triangles plus the ridges between them.
#[derive(Clone, Debug)]
pub struct StaticMesh {
    triangles: Vec<CollisionTriangle>,
    ridges: Vec<CollisionRidge>,
    bounding: BoundingSphere,
}

impl StaticMesh {
    /// The triangles and ridges have validated themselves at
    /// construction; this only derives the bounding volume.
    pub fn new(triangles: Vec<CollisionTriangle>, ridges: Vec<CollisionRidge>) -> StaticMesh {
        let mut center = Vector3::zero();
        let mut count = 0.0;
        for t in &triangles {
            for v in &t.vertices {
                center += *v;
                count += 1.0;
            }
        }
        if count > 0.0 {
            center /= count;
        }
        let mut r2 = 0.0f64;
        for t in &triangles {
            for v in &t.vertices {
                r2 = r2.max((v - center).magnitude2());
            }
        }
        StaticMesh {
            triangles,
            ridges,
            bounding: BoundingSphere {
                center: Point3::from_vec(center),
                radius: r2.sqrt(),
            },
        }
    }

    pub fn triangles(&self) -> &[CollisionTriangle] {
        &self.triangles
    }

    pub fn ridges(&self) -> &[CollisionRidge] {
        &self.ridges
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding
    }
}

/// Stable handle into a `BodySet`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

enum BodyEntry {
    FreeListEnd,
    FreeListPtr { next_free: usize },
    Occupied(Body),
}

/// Body storage with stable handles.
///
/// Removing a body leaves a hole that later insertions reclaim, so
/// handles held by contacts and wheels stay valid across unrelated
/// removals. Indexing a vacant handle is a programmer error and panics.
pub struct BodySet {
    len: usize,
    free_list: Option<usize>,
    entries: Vec<BodyEntry>,
}

impl BodySet {
    pub fn new() -> BodySet {
        BodySet {
            len: 0,
            free_list: None,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a body, reusing a vacant spot when one exists.
    pub fn insert(&mut self, body: Body) -> BodyHandle {
        self.len += 1;
        if let Some(free) = self.free_list {
            self.free_list = match self.entries[free] {
                BodyEntry::FreeListEnd => None,
                BodyEntry::FreeListPtr { next_free } => Some(next_free),
                BodyEntry::Occupied(_) => unreachable!(),
            };
            self.entries[free] = BodyEntry::Occupied(body);
            BodyHandle(free)
        } else {
            let i = self.entries.len();
            self.entries.push(BodyEntry::Occupied(body));
            BodyHandle(i)
        }
    }

    /// Remove a body, adding its spot to the free list.
    pub fn remove(&mut self, h: BodyHandle) -> Body {
        let new_entry = if let Some(free) = self.free_list {
            BodyEntry::FreeListPtr { next_free: free }
        } else {
            BodyEntry::FreeListEnd
        };
        self.free_list = Some(h.0);
        if let BodyEntry::Occupied(body) = mem::replace(&mut self.entries[h.0], new_entry) {
            self.len -= 1;
            body
        } else {
            panic!("handle {} is not occupied", h.0);
        }
    }

    pub fn contains(&self, h: BodyHandle) -> bool {
        match self.entries.get(h.0) {
            Some(BodyEntry::Occupied(_)) => true,
            _ => false,
        }
    }

    /// Distinct mutable access to two bodies, as needed by two-body
    /// contacts.
    pub fn get2_mut(&mut self, a: BodyHandle, b: BodyHandle) -> (&mut Body, &mut Body) {
        assert_ne!(a.0, b.0, "get2_mut requires two distinct handles");
        let (lo, hi, swapped) = if a.0 < b.0 {
            (a.0, b.0, false)
        } else {
            (b.0, a.0, true)
        };
        let (left, right) = self.entries.split_at_mut(hi);
        let x = match &mut left[lo] {
            BodyEntry::Occupied(body) => body,
            _ => panic!("handle {} is not occupied", lo),
        };
        let y = match &mut right[0] {
            BodyEntry::Occupied(body) => body,
            _ => panic!("handle {} is not occupied", hi),
        };
        if swapped {
            (y, x)
        } else {
            (x, y)
        }
    }

    pub fn handles<'a>(&'a self) -> impl Iterator<Item = BodyHandle> + 'a {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            if let BodyEntry::Occupied(_) = e {
                Some(BodyHandle(i))
            } else {
                None
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.entries.iter().filter_map(|e| {
            if let BodyEntry::Occupied(body) = e {
                Some(body)
            } else {
                None
            }
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.entries.iter_mut().filter_map(|e| {
            if let BodyEntry::Occupied(body) = e {
                Some(body)
            } else {
                None
            }
        })
    }
}

impl Index<BodyHandle> for BodySet {
    type Output = Body;

    fn index(&self, h: BodyHandle) -> &Body {
        if let BodyEntry::Occupied(ref body) = self.entries[h.0] {
            body
        } else {
            panic!("handle {} is not occupied", h.0)
        }
    }
}

impl IndexMut<BodyHandle> for BodySet {
    fn index_mut(&mut self, h: BodyHandle) -> &mut Body {
        if let BodyEntry::Occupied(ref mut body) = self.entries[h.0] {
            body
        } else {
            panic!("handle {} is not occupied", h.0)
        }
    }
}

/// Everything the simulation steps: bodies, their tires, and the static
/// collision meshes they run on.
pub struct PhysicsWorld {
    pub bodies: BodySet,
    pub meshes: Vec<StaticMesh>,
    pub wheels: Vec<Wheel>,
    deferred_deletes: Vec<BodyHandle>,
}

impl PhysicsWorld {
    pub fn new() -> PhysicsWorld {
        PhysicsWorld {
            bodies: BodySet::new(),
            meshes: Vec::new(),
            wheels: Vec::new(),
            deferred_deletes: Vec::new(),
        }
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        self.bodies.insert(body)
    }

    pub fn add_mesh(&mut self, mesh: StaticMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_wheel(&mut self, wheel: Wheel) -> usize {
        self.wheels.push(wheel);
        self.wheels.len() - 1
    }

    /// Schedule a body for removal. The removal happens at the end of
    /// the current tick, never in the middle of a sub-step, so contacts
    /// and wheels referring to the body stay valid until then.
    pub fn schedule_delete_advance_time(&mut self, h: BodyHandle) {
        self.deferred_deletes.push(h);
    }

    /// Process scheduled removals, dropping the bodies and any wheels
    /// attached to them. Returns how many bodies were removed.
    pub(crate) fn drain_deferred(&mut self) -> usize {
        let deferred = mem::replace(&mut self.deferred_deletes, Vec::new());
        let mut removed = 0;
        for h in deferred {
            if self.bodies.contains(h) {
                self.wheels.retain(|w| w.body != h);
                self.bodies.remove(h);
                removed += 1;
            }
        }
        removed
    }

    /// Ground-feedback spin for the `tire_id`-th wheel of `body`.
    pub fn angular_velocity_at_tire(&self, body: BodyHandle, tire_id: usize) -> f32 {
        let wheel = self
            .wheels
            .iter()
            .filter(|w| w.body == body)
            .nth(tire_id)
            .unwrap_or_else(|| panic!("body has no tire {}", tire_id));
        wheel.angular_velocity_at_tire(&self.bodies[wheel.body].integrator.pulses)
    }
}
