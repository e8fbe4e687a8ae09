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

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix, Matrix3, Point3, Rad, SquareMatrix, Vector3, Zero};

use crate::geom::{vec3_f32, vec3_f64, VectorAtPosition};
use crate::integrator::RigidBodyIntegrator;
use crate::pulses::RigidBodyPulses;
use crate::world::BodyHandle;

/// An elastic contact point with a stiction limit.
///
/// The spring pulls the attached material point back towards a world
/// anchor. While the tangential pull stays under `friction_force` the
/// anchor holds still (stiction); beyond it the anchor slides towards
/// the material point until the pull saturates at the limit (kinetic
/// friction).
#[derive(Copy, Clone, Debug)]
pub struct StickySpring {
    pub point_of_contact: Vector3<f64>,
    pub stiffness: f32,
    pub friction_force: f32,
}

impl StickySpring {
    /// Compute the spring force for the current position of the material
    /// point, sliding the anchor if stiction is exceeded. `normal` is
    /// the contact normal; the normal component of the pull is purely
    /// elastic and never causes sliding.
    pub fn update_position(&mut self, position: Vector3<f64>, normal: Vector3<f32>) -> Vector3<f32> {
        let f = vec3_f32(self.point_of_contact - position) * self.stiffness;
        let f_n = normal * f.dot(normal);
        let f_t = f - f_n;
        let f_t_len = f_t.magnitude();
        if f_t_len > self.friction_force {
            let dir = f_t / f_t_len;
            let excess = (f_t_len - self.friction_force) / self.stiffness;
            self.point_of_contact -= vec3_f64(dir) * excess as f64;
            f_n + f_t * (self.friction_force / f_t_len)
        } else {
            f
        }
    }
}

/// One slot of a wheel's contact-point ring.
#[derive(Copy, Clone, Debug)]
pub struct SpringExt {
    pub active: bool,
    /// Contact position, body-local. Rotated by the wheel's own spin on
    /// every update, independent of chassis motion.
    pub position: Vector3<f32>,
    /// World-space contact normal recorded at intersection time.
    pub normal: Vector3<f32>,
    pub spring: StickySpring,
}

impl SpringExt {
    fn inactive() -> SpringExt {
        SpringExt {
            active: false,
            position: Vector3::zero(),
            normal: Vector3::zero(),
            spring: StickySpring {
                point_of_contact: Vector3::zero(),
                stiffness: 0.0,
                friction_force: 0.0,
            },
        }
    }
}

/// A tire modelled as a rotating ring of sticky contact points.
///
/// Slots are assigned round-robin on `notify_intersection`; the cycling
/// index is the whole replacement policy, no age is tracked. A slot dies
/// when its rotated body-local position drifts further than `max_dist`
/// from its anchor.
#[derive(Clone, Debug)]
pub struct StickyWheel {
    /// Spin axis, body-local, unit length.
    rotation_axis: Vector3<f32>,
    max_dist: f32,
    springs: Vec<SpringExt>,
    next_spring: usize,
    /// The wheel's own angular velocity about `rotation_axis`.
    w: f32,
    /// Accumulated spin angle, wrapped into [0, 2 pi).
    angle_x: f32,
    power: f32,
}

impl StickyWheel {
    pub fn new(rotation_axis: Vector3<f32>, nsprings: usize, max_dist: f32) -> StickyWheel {
        assert!(nsprings > 0, "a wheel needs at least one spring slot");
        StickyWheel {
            rotation_axis: rotation_axis.normalize(),
            max_dist,
            springs: vec![SpringExt::inactive(); nsprings],
            next_spring: 0,
            w: 0.0,
            angle_x: 0.0,
            power: 0.0,
        }
    }

    /// Record a ground contact in the next slot of the ring.
    pub fn notify_intersection(
        &mut self,
        rotation: &Matrix3<f32>,
        translation: &Point3<f64>,
        pt: Point3<f64>,
        normal: Vector3<f32>,
        stiffness: f32,
        friction_force: f32,
    ) {
        let slot = self.next_spring;
        self.next_spring = (self.next_spring + 1) % self.springs.len();
        self.springs[slot] = SpringExt {
            active: true,
            position: rotation.transpose() * vec3_f32(pt - *translation),
            normal,
            spring: StickySpring {
                point_of_contact: pt.to_vec(),
                stiffness,
                friction_force,
            },
        };
    }

    /// Advance the wheel by `dt` under the chassis pose and return the
    /// total ground reaction force.
    ///
    /// Every active slot is spun about the wheel axis, deactivated if it
    /// drifted out of range, and otherwise fed through its spring. Slot
    /// forces are divided by the slot count so the total reaction does
    /// not depend on how many slots the wheel was tuned with. Mechanical
    /// power transferred at the ground accumulates from the force
    /// component along `power_axis`, with the lever arm taken from the
    /// slot's current distance to the spin axis rather than the nominal
    /// wheel radius.
    pub fn update_position(
        &mut self,
        rotation: &Matrix3<f32>,
        translation: &Point3<f64>,
        power_axis: Vector3<f32>,
        dt: f32,
    ) -> Vector3<f32> {
        self.power = 0.0;
        let mut force = Vector3::zero();
        let nsprings = self.springs.len() as f32;
        let angle = self.w * dt;
        let spin = if angle != 0.0 {
            Matrix3::from_axis_angle(self.rotation_axis, Rad(angle))
        } else {
            Matrix3::identity()
        };
        for s in self.springs.iter_mut() {
            if !s.active {
                continue;
            }
            s.position = spin * s.position;
            let world = (*translation + vec3_f64(*rotation * s.position)).to_vec();
            if (world - s.spring.point_of_contact).magnitude() > self.max_dist as f64 {
                s.active = false;
                continue;
            }
            let f = s.spring.update_position(world, s.normal) / nsprings;
            force += f;
            let radial = s.position - self.rotation_axis * s.position.dot(self.rotation_axis);
            self.power += power_axis.dot(f) * radial.magnitude() * self.w;
        }
        self.angle_x = (self.angle_x + angle).rem_euclid(2.0 * PI);
        force
    }

    /// Additive spin input, e.g. from engine torque.
    pub fn accelerate(&mut self, amount: f32) {
        self.w += amount;
    }

    pub fn angular_velocity(&self) -> f32 {
        self.w
    }

    pub fn angle(&self) -> f32 {
        self.angle_x
    }

    /// Power transferred at the ground during the last update.
    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn rotation_axis(&self) -> Vector3<f32> {
        self.rotation_axis
    }

    pub fn springs(&self) -> &[SpringExt] {
        &self.springs
    }
}

/// A tire coupled to a chassis body.
///
/// Once per tick the wheel spins its contact ring, collects the ground
/// reaction and feeds it back to the chassis as a force at the
/// attachment point.
#[derive(Clone, Debug)]
pub struct Wheel {
    pub body: BodyHandle,
    /// Attachment point on the chassis, body-local.
    pub position: Vector3<f32>,
    /// Drive direction at the contact, body-local.
    pub power_axis: Vector3<f32>,
    pub radius: f32,
    pub stiffness: f32,
    pub friction_force: f32,
    pub sticky: StickyWheel,
}

impl Wheel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        body: BodyHandle,
        position: Vector3<f32>,
        rotation_axis: Vector3<f32>,
        power_axis: Vector3<f32>,
        radius: f32,
        nsprings: usize,
        max_dist: f32,
        stiffness: f32,
        friction_force: f32,
    ) -> Wheel {
        Wheel {
            body,
            position,
            power_axis,
            radius,
            stiffness,
            friction_force,
            sticky: StickyWheel::new(rotation_axis, nsprings, max_dist),
        }
    }

    /// Record a ground contact for this tire.
    pub fn notify_intersection(
        &mut self,
        pulses: &RigidBodyPulses,
        pt: Point3<f64>,
        normal: Vector3<f32>,
    ) {
        self.sticky.notify_intersection(
            &pulses.rotation,
            &pulses.position,
            pt,
            normal,
            self.stiffness,
            self.friction_force,
        );
    }

    /// One tick of tire dynamics: spin the ring and apply the ground
    /// reaction to the chassis.
    pub fn advance_time(&mut self, body: &mut RigidBodyIntegrator, dt: f32) {
        let rotation = body.pulses.rotation;
        let translation = body.pulses.position;
        let power_axis = rotation * self.power_axis;
        let f = self.sticky.update_position(&rotation, &translation, power_axis, dt);
        if f != Vector3::zero() {
            let at = translation + vec3_f64(rotation * self.position);
            body.integrate_force(&VectorAtPosition {
                vector: f,
                position: at,
            });
        }
    }

    /// The spin the ground would impose on a freely rolling tire:
    /// tangential chassis velocity at the attachment point over the
    /// wheel radius.
    pub fn angular_velocity_at_tire(&self, pulses: &RigidBodyPulses) -> f32 {
        let at = pulses.position + vec3_f64(pulses.rotation * self.position);
        let forward = pulses.rotation * self.power_axis;
        pulses.velocity_at_position(at).dot(forward) / self.radius
    }
}

#[cfg(test)]
mod tests {
    mod wheel {
        use approx::assert_relative_eq;
        use cgmath::{InnerSpace, Matrix3, Point3, SquareMatrix, Vector3, Zero};

        use crate::wheel::*;

        #[test]
        fn test_sticky_spring_elastic_regime() {
            let mut spring = StickySpring {
                point_of_contact: Vector3::new(0.0, 0.0, 0.0),
                stiffness: 10.0,
                friction_force: 5.0,
            };
            let f = spring.update_position(
                Vector3::new(0.2, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            );
            assert_relative_eq!(f, Vector3::new(-2.0, 0.0, 0.0), epsilon = 1e-6);
            // Under the stiction limit the anchor holds still.
            assert_eq!(spring.point_of_contact, Vector3::new(0.0, 0.0, 0.0));
        }

        #[test]
        fn test_sticky_spring_slides_at_limit() {
            let mut spring = StickySpring {
                point_of_contact: Vector3::new(0.0, 0.0, 0.0),
                stiffness: 10.0,
                friction_force: 1.0,
            };
            let f = spring.update_position(
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            );
            // Force saturates at the kinetic limit...
            assert_relative_eq!(f.magnitude(), 1.0, epsilon = 1e-5);
            assert!(f.x < 0.0);
            // ...and the anchor slid towards the contact so the residual
            // stretch carries exactly the limit force.
            assert_relative_eq!(
                spring.point_of_contact.x,
                1.9,
                epsilon = 1e-5
            );
        }

        #[test]
        fn test_normal_pull_never_slides() {
            let mut spring = StickySpring {
                point_of_contact: Vector3::new(0.0, 0.0, 0.0),
                stiffness: 10.0,
                friction_force: 1.0,
            };
            // Displacement purely along the contact normal: elastic, no
            // matter how large.
            let f = spring.update_position(
                Vector3::new(0.0, -3.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            );
            assert_relative_eq!(f, Vector3::new(0.0, 30.0, 0.0), epsilon = 1e-4);
            assert_eq!(spring.point_of_contact, Vector3::new(0.0, 0.0, 0.0));
        }

        #[test]
        fn test_round_robin_slot_replacement() {
            let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), 3, 1.0);
            let rot = Matrix3::identity();
            let tr = Point3::new(0.0, 0.0, 0.0);
            let n = Vector3::new(0.0, 1.0, 0.0);
            for i in 0..4 {
                wheel.notify_intersection(
                    &rot,
                    &tr,
                    Point3::new(i as f64, -1.0, 0.0),
                    n,
                    100.0,
                    10.0,
                );
            }
            // The fourth contact landed in slot 0 again; slots 1 and 2
            // keep the second and third.
            let springs = wheel.springs();
            assert_eq!(springs[0].spring.point_of_contact.x, 3.0);
            assert_eq!(springs[1].spring.point_of_contact.x, 1.0);
            assert_eq!(springs[2].spring.point_of_contact.x, 2.0);
            assert!(springs.iter().all(|s| s.active));
        }

        #[test]
        fn test_reaction_force_independent_of_slot_count() {
            let rot = Matrix3::identity();
            let n = Vector3::new(0.0, 1.0, 0.0);
            let pt = Point3::new(0.0, -1.0, 0.0);
            let mut total = Vec::new();
            for &nsprings in &[1usize, 4] {
                let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), nsprings, 10.0);
                for _ in 0..nsprings {
                    wheel.notify_intersection(&rot, &Point3::new(0.0, 0.0, 0.0), pt, n, 100.0, 1000.0);
                }
                // The chassis rose by 0.1 since the contacts were made;
                // every slot is stretched the same way.
                let f = wheel.update_position(
                    &rot,
                    &Point3::new(0.0, 0.1, 0.0),
                    Vector3::new(0.0, 0.0, 1.0),
                    0.0,
                );
                total.push(f);
            }
            assert_relative_eq!(total[0], total[1], epsilon = 1e-4);
            assert_relative_eq!(total[0], Vector3::new(0.0, -10.0, 0.0), epsilon = 1e-4);
        }

        #[test]
        fn test_slot_deactivates_beyond_max_dist() {
            let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), 1, 0.5);
            let rot = Matrix3::identity();
            wheel.notify_intersection(
                &rot,
                &Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                100.0,
                10.0,
            );
            assert!(wheel.springs()[0].active);
            // Drag the chassis a full meter sideways: the slot's world
            // position is now far from its anchor and the slot dies.
            let f = wheel.update_position(
                &rot,
                &Point3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
                1.0 / 60.0,
            );
            assert!(!wheel.springs()[0].active);
            assert_eq!(f, Vector3::zero());
        }

        #[test]
        fn test_spin_rotates_stored_contacts() {
            let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), 1, 10.0);
            let rot = Matrix3::identity();
            let tr = Point3::new(0.0, 0.0, 0.0);
            wheel.notify_intersection(
                &rot,
                &tr,
                Point3::new(0.0, -1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                100.0,
                1000.0,
            );
            // Quarter turn about +x in one step: (0,-1,0) -> (0,0,-1).
            let dt = 1.0 / 60.0;
            wheel.accelerate(std::f32::consts::FRAC_PI_2 / dt);
            wheel.update_position(&rot, &tr, Vector3::new(0.0, 0.0, 1.0), dt);
            let p = wheel.springs()[0].position;
            assert_relative_eq!(p, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-4);
            assert_relative_eq!(wheel.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        }

        #[test]
        fn test_angle_wraps() {
            let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), 1, 10.0);
            let rot = Matrix3::identity();
            let tr = Point3::new(0.0, 0.0, 0.0);
            wheel.accelerate(3.0 * std::f32::consts::PI);
            wheel.update_position(&rot, &tr, Vector3::new(0.0, 0.0, 1.0), 1.0);
            assert_relative_eq!(wheel.angle(), std::f32::consts::PI, epsilon = 1e-3);
        }

        #[test]
        fn test_wheel_feeds_reaction_into_chassis() {
            use crate::integrator::RigidBodyIntegrator;
            use crate::pulses::{InertiaTensor, RigidBodyPulses};
            use crate::world::{Body, BodySet};

            let mut bodies = BodySet::new();
            let h = bodies.insert(Body::new(RigidBodyIntegrator::new(RigidBodyPulses::new(
                Point3::new(0.0, 0.0, 0.0),
                Matrix3::identity(),
                1.0,
                Vector3::zero(),
                InertiaTensor::diagonal(Vector3::new(1.0, 1.0, 1.0)),
            ))));
            let mut wheel = Wheel::new(
                h,
                Vector3::new(0.0, -0.5, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
                0.5,
                1,
                1.0,
                100.0,
                1000.0,
            );
            wheel.notify_intersection(
                &bodies[h].integrator.pulses,
                Point3::new(0.0, -1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            );
            // Lift the chassis by 0.1: the stretched contact spring pulls
            // it back down through the attachment point.
            bodies[h].integrator.pulses.position.y = 0.1;
            let body = &mut bodies[h];
            wheel.advance_time(&mut body.integrator, 1.0 / 60.0);
            assert_relative_eq!(
                body.integrator.a,
                Vector3::new(0.0, -10.0, 0.0),
                epsilon = 1e-4
            );
            // Force line passes under the center of mass along y: no
            // torque.
            assert_relative_eq!(body.integrator.t, Vector3::zero(), epsilon = 1e-4);
        }

        #[test]
        fn test_power_uses_current_contact_radius() {
            let mut wheel = StickyWheel::new(Vector3::new(1.0, 0.0, 0.0), 1, 10.0);
            let rot = Matrix3::identity();
            let tr = Point3::new(0.0, 0.0, 0.0);
            // Anchor 0.1 ahead (+z) of the stored contact point, one
            // meter below the axis.
            wheel.notify_intersection(
                &rot,
                &tr,
                Point3::new(0.0, -1.0, 0.1),
                Vector3::new(0.0, 1.0, 0.0),
                10.0,
                1000.0,
            );
            wheel.springs[0].position.z = 0.0;
            wheel.accelerate(2.0);
            // dt = 0 keeps the geometry fixed so the expected numbers
            // stay exact: f = (0,0,1), lever arm 1, w = 2.
            wheel.update_position(&rot, &tr, Vector3::new(0.0, 0.0, 1.0), 0.0);
            assert_relative_eq!(wheel.power(), 2.0, epsilon = 1e-4);
        }
    }
}
