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

use std::collections::HashMap;
use std::mem;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::{PhysicsEngineConfig, ResolveCollisionType};
use crate::constraint::{solve_contacts, ContactInfo, ContactPoint, PlaneConstraint};
use crate::geom::vec3_f32;
use crate::sat::{CollisionVertices, SatOverlapCombiner};
use crate::world::{BodyHandle, PhysicsWorld};

/// A debug marker emitted by the simulation, e.g. at contact points.
#[derive(Clone, Debug)]
pub struct Beacon {
    pub position: Point3<f64>,
    pub label: &'static str,
}

/// Double-buffered beacon storage.
///
/// The simulation pushes into the current buffer; `swap` retires it once
/// per tick. Readers (typically the render thread, between ticks) only
/// ever see the previous tick's beacons, so beacon output is delayed by
/// exactly one frame.
#[derive(Default)]
pub struct BeaconBuffer {
    current: Vec<Beacon>,
    previous: Vec<Beacon>,
}

impl BeaconBuffer {
    pub fn new() -> BeaconBuffer {
        BeaconBuffer {
            current: Vec::new(),
            previous: Vec::new(),
        }
    }

    pub fn push(&mut self, beacon: Beacon) {
        self.current.push(beacon);
    }

    /// Retire the current buffer. Called once per tick by the driver.
    pub fn swap(&mut self) {
        mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    /// The beacons of the last completed tick.
    pub fn previous(&self) -> &[Beacon] {
        &self.previous
    }
}

/// The per-frame driver.
///
/// One call to `run` performs a configured number of oversampled
/// sub-steps, each running collision detection, the sequential impulse
/// solver and integration in that order, then retires the beacon buffer
/// and processes deferred deletions. Sub-steps are strictly sequential;
/// each one reads the state its predecessor wrote.
pub struct PhysicsIteration {
    pub cfg: PhysicsEngineConfig,
    pub gravity: Vector3<f32>,
    /// Position-error gain of generated contacts.
    pub beta: f32,
    /// Slop-adjusted bias gain of generated contacts.
    pub beta2: f32,
    pub slop: f32,
    /// Overlap below which a previous frame's contact normal is kept.
    pub max_keep_normal: f64,
    pub beacons: BeaconBuffer,
    sticky_normals: HashMap<(BodyHandle, usize), Vector3<f64>>,
}

impl PhysicsIteration {
    pub fn new(cfg: PhysicsEngineConfig) -> PhysicsIteration {
        PhysicsIteration {
            cfg,
            gravity: Vector3::new(0.0, -9.8, 0.0),
            beta: 0.5,
            beta2: 0.2,
            slop: 0.001,
            max_keep_normal: 0.02,
            beacons: BeaconBuffer::new(),
            sticky_normals: HashMap::new(),
        }
    }

    /// Advance the world by one tick.
    pub fn run(&mut self, world: &mut PhysicsWorld) {
        let tick_dt = self.cfg.dt * self.cfg.oversampling as f32;
        for body in world.bodies.iter_mut() {
            body.integrator.reset_forces();
            body.integrator.integrate_gravity(self.gravity);
        }
        // Tires act once per tick; their reaction holds as a constant
        // force over all sub-steps.
        {
            let (wheels, bodies) = (&mut world.wheels, &mut world.bodies);
            for wheel in wheels.iter_mut() {
                let body = &mut bodies[wheel.body];
                wheel.advance_time(&mut body.integrator, tick_dt);
            }
        }
        for i in 0..self.cfg.oversampling {
            let ncontacts = self.sub_step(world);
            trace!("sub-step {}: {} contacts", i, ncontacts);
        }
        self.beacons.swap();
        let removed = world.drain_deferred();
        if removed > 0 {
            debug!("removed {} bodies at end of tick", removed);
            let bodies = &world.bodies;
            self.sticky_normals.retain(|&(h, _), _| bodies.contains(h));
        }
    }

    /// One collision + solve + integrate pass.
    fn sub_step(&mut self, world: &mut PhysicsWorld) -> usize {
        let mut contacts: SmallVec<[ContactInfo; 16]> = SmallVec::new();
        for h in world.bodies.handles() {
            let body = &world.bodies[h];
            let shape = match &body.shape {
                Some(shape) => shape,
                None => continue,
            };
            let sphere = match body.bounding_sphere() {
                Some(sphere) => sphere,
                None => continue,
            };
            let pulses = &body.integrator.pulses;
            for (mi, mesh) in world.meshes.iter().enumerate() {
                let key = (h, mi);
                if !sphere.overlaps(&mesh.bounding_sphere()) {
                    self.sticky_normals.remove(&key);
                    continue;
                }
                // Narrow phase: only geometry near the body participates.
                let mut verts0 = CollisionVertices::new();
                let mut near_triangles: SmallVec<[usize; 32]> = SmallVec::new();
                for (ti, tri) in mesh.triangles().iter().enumerate() {
                    if tri.bounding_sphere().overlaps(&sphere) {
                        for v in &tri.vertices {
                            verts0.insert(*v);
                        }
                        near_triangles.push(ti);
                    }
                }
                if verts0.is_empty() {
                    self.sticky_normals.remove(&key);
                    continue;
                }
                let mut verts1 = CollisionVertices::new();
                shape.world_vertices(&pulses.rotation, &pulses.position, &mut verts1);
                if verts1.is_empty() {
                    continue;
                }
                let body_ridges = shape.world_ridges(&pulses.rotation, &pulses.position);
                let mut combiner = SatOverlapCombiner::new(&verts0, &verts1);
                if let Some(prev) = self.sticky_normals.get(&key) {
                    combiner.combine_sticky_normal(*prev, self.max_keep_normal);
                }
                for ridge in mesh.ridges() {
                    if !ridge.bounding_sphere().overlaps(&sphere) {
                        continue;
                    }
                    for body_ridge in &body_ridges {
                        combiner.combine_ridges(ridge, body_ridge);
                    }
                }
                for &ti in near_triangles.iter() {
                    combiner.combine_plane(mesh.triangles()[ti].normal);
                }
                match combiner.best() {
                    Some((normal, overlap)) if overlap > 0.0 => {
                        self.sticky_normals.insert(key, normal);
                        // Support plane of the mesh along the winning
                        // normal; every penetrating body vertex becomes
                        // one contact against it.
                        let mut max0 = f64::NEG_INFINITY;
                        for v in verts0.iter() {
                            max0 = max0.max(v.dot(normal));
                        }
                        let pc = PlaneConstraint::new(
                            vec3_f32(normal),
                            -max0 as f32,
                            self.slop,
                        );
                        for v in verts1.iter() {
                            let x = Point3::from_vec(*v);
                            if pc.active(x) {
                                contacts.push(ContactInfo::one_body(
                                    h,
                                    pc,
                                    ContactPoint {
                                        beta: self.beta,
                                        beta2: self.beta2,
                                        position: x,
                                    },
                                ));
                            }
                        }
                    }
                    _ => {
                        self.sticky_normals.remove(&key);
                    }
                }
            }
        }
        match self.cfg.resolve_collision_type {
            ResolveCollisionType::SequentialPulses => {
                solve_contacts(&mut world.bodies, &mut contacts, self.cfg.dt);
            }
        }
        for body in world.bodies.iter_mut() {
            body.integrator.advance_time(self.cfg.dt, &self.cfg);
        }
        for contact in contacts.iter() {
            self.beacons.push(Beacon {
                position: contact.position(),
                label: "contact",
            });
        }
        contacts.len()
    }
}

#[cfg(test)]
mod tests {
    mod iteration {
        use cgmath::{InnerSpace, Matrix3, Point3, SquareMatrix, Vector3, Zero};

        use crate::config::PhysicsEngineConfig;
        use crate::geom::CollisionTriangle;
        use crate::integrator::RigidBodyIntegrator;
        use crate::iteration::*;
        use crate::pulses::{InertiaTensor, RigidBodyPulses};
        use crate::world::{Body, CollisionShape, PhysicsWorld, StaticMesh};

        fn ground_mesh(half: f64) -> StaticMesh {
            let a = Vector3::new(-half, 0.0, -half);
            let b = Vector3::new(half, 0.0, -half);
            let c = Vector3::new(half, 0.0, half);
            let d = Vector3::new(-half, 0.0, half);
            StaticMesh::new(
                vec![
                    CollisionTriangle::new(a, c, b).unwrap(),
                    CollisionTriangle::new(a, d, c).unwrap(),
                ],
                Vec::new(),
            )
        }

        fn cube_body(position: Point3<f64>, half: f32) -> Body {
            let mut points = Vec::new();
            for &x in &[-half, half] {
                for &y in &[-half, half] {
                    for &z in &[-half, half] {
                        points.push(Vector3::new(x, y, z));
                    }
                }
            }
            Body::with_shape(
                RigidBodyIntegrator::new(RigidBodyPulses::new(
                    position,
                    Matrix3::identity(),
                    1.0,
                    Vector3::zero(),
                    InertiaTensor::diagonal(Vector3::new(1.0, 1.0, 1.0)),
                )),
                CollisionShape::new(points, Vec::new()).unwrap(),
            )
        }

        fn one_substep_config() -> PhysicsEngineConfig {
            PhysicsEngineConfig {
                oversampling: 1,
                dt: 1.0 / 60.0,
                ..PhysicsEngineConfig::default()
            }
        }

        #[test]
        fn test_cube_drops_onto_mesh_and_rests() {
            let mut world = PhysicsWorld::new();
            world.add_mesh(ground_mesh(5.0));
            let h = world.add_body(cube_body(Point3::new(0.0, 0.5, 0.0), 0.1));
            let mut iteration = PhysicsIteration::new(one_substep_config());
            for _ in 0..240 {
                iteration.run(&mut world);
            }
            let pulses = &world.bodies[h].integrator.pulses;
            assert!(pulses.v.magnitude() <= 0.011);
            // At rest the stabilization bias balances gravity with a
            // small residual penetration of the bottom face.
            assert!(pulses.position.y > 0.08);
            assert!(pulses.position.y < 0.12);
        }

        #[test]
        fn test_oversampling_splits_the_tick() {
            // Free fall far above the ground: two sub-steps at dt/2 per
            // tick land on the same trajectory as two plain steps.
            let mut world_a = PhysicsWorld::new();
            let ha = world_a.add_body(cube_body(Point3::new(0.0, 100.0, 0.0), 0.1));
            let mut oversampled = PhysicsIteration::new(PhysicsEngineConfig {
                oversampling: 2,
                dt: 1.0 / 120.0,
                ..PhysicsEngineConfig::default()
            });
            oversampled.run(&mut world_a);

            let mut world_b = PhysicsWorld::new();
            let hb = world_b.add_body(cube_body(Point3::new(0.0, 100.0, 0.0), 0.1));
            let mut plain = PhysicsIteration::new(PhysicsEngineConfig {
                oversampling: 1,
                dt: 1.0 / 120.0,
                ..PhysicsEngineConfig::default()
            });
            plain.run(&mut world_b);
            plain.run(&mut world_b);

            let ya = world_a.bodies[ha].integrator.pulses.position.y;
            let yb = world_b.bodies[hb].integrator.pulses.position.y;
            assert!((ya - yb).abs() < 1e-9);
        }

        #[test]
        fn test_beacons_are_delayed_one_tick() {
            let mut world = PhysicsWorld::new();
            world.add_mesh(ground_mesh(5.0));
            // Already resting in penetration: contacts from the first
            // tick on.
            let h = world.add_body(cube_body(Point3::new(0.0, 0.095, 0.0), 0.1));
            let mut iteration = PhysicsIteration::new(one_substep_config());
            assert!(iteration.beacons.previous().is_empty());
            iteration.run(&mut world);
            // The contacts of tick one become readable only after it
            // completed.
            assert!(!iteration.beacons.previous().is_empty());
            assert_eq!(iteration.beacons.previous()[0].label, "contact");
            // Once the body is gone the next swap retires the old
            // markers.
            world.schedule_delete_advance_time(h);
            iteration.run(&mut world);
            iteration.run(&mut world);
            assert!(iteration.beacons.previous().is_empty());
        }

        #[test]
        fn test_scheduled_delete_processed_at_end_of_tick() {
            let mut world = PhysicsWorld::new();
            let h = world.add_body(cube_body(Point3::new(0.0, 1.0, 0.0), 0.1));
            world.schedule_delete_advance_time(h);
            assert!(world.bodies.contains(h));
            let mut iteration = PhysicsIteration::new(one_substep_config());
            iteration.run(&mut world);
            assert!(!world.bodies.contains(h));
            assert!(world.bodies.is_empty());
        }
    }
}
