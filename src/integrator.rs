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

use cgmath::{InnerSpace, Matrix3, Rad, Vector3, Zero};

use crate::config::PhysicsEngineConfig;
use crate::geom::{vec3_f32, vec3_f64, VectorAtPosition};
use crate::pulses::RigidBodyPulses;

/// Semi-implicit Euler integration of one rigid body.
///
/// Forces and torques accumulate between steps and only become velocity
/// inside `advance_time`; impulses go straight to the wrapped pulses.
#[derive(Clone, Debug)]
pub struct RigidBodyIntegrator {
    pub pulses: RigidBodyPulses,
    /// Accumulated acceleration.
    pub a: Vector3<f32>,
    /// Accumulated torque.
    pub t: Vector3<f32>,
}

impl RigidBodyIntegrator {
    pub fn new(pulses: RigidBodyPulses) -> RigidBodyIntegrator {
        RigidBodyIntegrator {
            pulses,
            a: Vector3::zero(),
            t: Vector3::zero(),
        }
    }

    /// Accumulate a force applied at a world-space point. Immovable
    /// bodies ignore forces entirely.
    pub fn integrate_force(&mut self, f: &VectorAtPosition) {
        if !self.pulses.mass.is_finite() {
            return;
        }
        self.a += f.vector / self.pulses.mass;
        let r = vec3_f32(f.position - self.pulses.com_world());
        self.t += r.cross(f.vector);
    }

    /// Gravity acts on the center of mass and produces no torque.
    pub fn integrate_gravity(&mut self, g: Vector3<f32>) {
        if !self.pulses.mass.is_finite() {
            return;
        }
        self.a += g;
    }

    pub fn reset_forces(&mut self) {
        self.a = Vector3::zero();
        self.t = Vector3::zero();
    }

    /// Advance the body by `dt`.
    ///
    /// Velocity first, then position (semi-implicit Euler). A body whose
    /// linear and angular speeds both fall under the configured thresholds
    /// is dropped to exact rest: `v`, `l` and `w` are zeroed and the
    /// positional update is skipped. This is a hard cut, not a damping
    /// term; repeated calls on a resting body leave it bit-for-bit
    /// unchanged.
    pub fn advance_time(&mut self, dt: f32, cfg: &PhysicsEngineConfig) {
        let p = &mut self.pulses;
        let a = if self.a.magnitude() < cfg.min_acceleration {
            Vector3::zero()
        } else {
            self.a
        };
        p.v += a * dt;
        p.l += self.t * dt;
        p.update_angular_velocity();
        if p.v.magnitude() < cfg.min_velocity && p.w.magnitude() < cfg.min_angular_velocity {
            p.v = Vector3::zero();
            p.l = Vector3::zero();
            p.w = Vector3::zero();
            return;
        }
        p.position += vec3_f64(p.v) * dt as f64;
        let w_dt = p.w * dt;
        let angle = w_dt.magnitude();
        if angle > 0.0 {
            p.rotation = Matrix3::from_axis_angle(w_dt / angle, Rad(angle)) * p.rotation;
        }
    }
}
