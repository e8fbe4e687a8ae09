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

use cgmath::{InnerSpace, Matrix, Matrix3, Point3, SquareMatrix, Vector3, Zero};

use crate::error::PhysicsError;
use crate::geom::{vec3_f32, vec3_f64, VectorAtPosition};

/// The moment of inertia of a body, in body-local coordinates.
///
/// The diagonal representation supports `INFINITY` entries to lock an
/// axis: a locked axis never acquires angular velocity, no matter what
/// torque accumulates on it. Full tensors must be symmetric positive
/// definite with finite entries; they are resolved against angular
/// momentum with a Cholesky solve.
#[derive(Copy, Clone, Debug)]
pub enum InertiaTensor {
    Diagonal(Vector3<f32>),
    Full(Matrix3<f32>),
}

impl InertiaTensor {
    pub fn diagonal(d: Vector3<f32>) -> InertiaTensor {
        InertiaTensor::Diagonal(d)
    }

    /// A full tensor rejects non-finite entries up front; axis locking is
    /// only expressible in the diagonal representation.
    pub fn full(i: Matrix3<f32>) -> Result<InertiaTensor, PhysicsError> {
        for c in 0..3 {
            for r in 0..3 {
                if !i[c][r].is_finite() {
                    return Err(PhysicsError::NonFiniteInertia);
                }
            }
        }
        Ok(InertiaTensor::Full(i))
    }

    /// Solves `I_abs * x = y` for `x`, where `I_abs = R * I * R^t` is the
    /// world-oriented tensor. For diagonal tensors this is an element-wise
    /// divide in body coordinates, with locked axes contributing zero by
    /// an explicit branch rather than by IEEE division semantics.
    pub fn apply_inverse(&self, rotation: &Matrix3<f32>, y: Vector3<f32>) -> Vector3<f32> {
        match self {
            InertiaTensor::Diagonal(d) => {
                let local = rotation.transpose() * y;
                *rotation
                    * Vector3::new(
                        div_locked(local.x, d.x),
                        div_locked(local.y, d.y),
                        div_locked(local.z, d.z),
                    )
            }
            InertiaTensor::Full(i) => {
                let i_abs = *rotation * *i * rotation.transpose();
                solve_symmetric(&i_abs, y)
            }
        }
    }

    /// `I_abs * w`. Locked axes carry no representable momentum and map
    /// to zero.
    pub fn momentum(&self, rotation: &Matrix3<f32>, w: Vector3<f32>) -> Vector3<f32> {
        match self {
            InertiaTensor::Diagonal(d) => {
                let local = rotation.transpose() * w;
                *rotation
                    * Vector3::new(
                        mul_locked(local.x, d.x),
                        mul_locked(local.y, d.y),
                        mul_locked(local.z, d.z),
                    )
            }
            InertiaTensor::Full(i) => *rotation * *i * rotation.transpose() * w,
        }
    }
}

#[inline(always)]
fn div_locked(n: f32, d: f32) -> f32 {
    if d.is_finite() {
        n / d
    } else {
        0.0
    }
}

#[inline(always)]
fn mul_locked(n: f32, d: f32) -> f32 {
    if d.is_finite() {
        n * d
    } else {
        0.0
    }
}

/// Solve `a * x = b` for a symmetric positive definite `a` by Cholesky
/// decomposition.
fn solve_symmetric(a: &Matrix3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    let l11 = a[0][0].sqrt();
    let l21 = a[0][1] / l11;
    let l31 = a[0][2] / l11;
    let l22 = (a[1][1] - l21 * l21).sqrt();
    let l32 = (a[1][2] - l31 * l21) / l22;
    let l33 = (a[2][2] - l31 * l31 - l32 * l32).sqrt();
    let y1 = b.x / l11;
    let y2 = (b.y - l21 * y1) / l22;
    let y3 = (b.z - l31 * y1 - l32 * y2) / l33;
    let x3 = y3 / l33;
    let x2 = (y2 - l32 * x3) / l22;
    let x1 = (y1 - l21 * x2 - l31 * x3) / l11;
    Vector3::new(x1, x2, x3)
}

/// Instantaneous kinematic state of one rigid body.
///
/// Positions are double precision, velocities and rotation single. The
/// angular state keeps both the momentum `l` and the velocity `w`; after
/// any momentum change, `update_angular_velocity` restores the invariant
/// `w = R * I^-1 * R^t * l`. The rotation matrix is not renormalized:
/// per-step angular increments are assumed short enough that drift stays
/// negligible over the lifetime of a body.
#[derive(Clone, Debug)]
pub struct RigidBodyPulses {
    pub position: Point3<f64>,
    pub rotation: Matrix3<f32>,
    pub v: Vector3<f32>,
    pub w: Vector3<f32>,
    /// Angular momentum, world space.
    pub l: Vector3<f32>,
    /// `INFINITY` marks an immovable body.
    pub mass: f32,
    /// Center of mass, body-local.
    pub com: Vector3<f32>,
    pub inertia: InertiaTensor,
}

impl RigidBodyPulses {
    pub fn new(
        position: Point3<f64>,
        rotation: Matrix3<f32>,
        mass: f32,
        com: Vector3<f32>,
        inertia: InertiaTensor,
    ) -> RigidBodyPulses {
        RigidBodyPulses {
            position,
            rotation,
            v: Vector3::zero(),
            w: Vector3::zero(),
            l: Vector3::zero(),
            mass,
            com,
            inertia,
        }
    }

    /// An immovable body: infinite mass, all axes locked.
    pub fn immovable(position: Point3<f64>) -> RigidBodyPulses {
        RigidBodyPulses::new(
            position,
            Matrix3::identity(),
            f32::INFINITY,
            Vector3::zero(),
            InertiaTensor::diagonal(Vector3::new(
                f32::INFINITY,
                f32::INFINITY,
                f32::INFINITY,
            )),
        )
    }

    pub fn com_world(&self) -> Point3<f64> {
        self.position + vec3_f64(self.rotation * self.com)
    }

    /// Velocity of the material point of the body currently at `p`.
    pub fn velocity_at_position(&self, p: Point3<f64>) -> Vector3<f32> {
        self.v + self.w.cross(vec3_f32(p - self.position))
    }

    /// Restore `w` from `l` under the current orientation.
    pub fn update_angular_velocity(&mut self) {
        self.w = self.inertia.apply_inverse(&self.rotation, self.l);
    }

    /// Generalized inverse of the resistance the body offers against an
    /// impulse along `vp`: `1 / (1/m + (r x n) . I_abs^-1 (r x n))`.
    ///
    /// Returns zero when both the mass and every involved axis are
    /// locked; an impulse against such a body is a no-op.
    pub fn effective_mass(&self, vp: &VectorAtPosition) -> f32 {
        let r = vec3_f32(vp.position - self.com_world());
        let rn = r.cross(vp.vector);
        let linear = if self.mass.is_finite() {
            1.0 / self.mass
        } else {
            0.0
        };
        let denom = linear + rn.dot(self.inertia.apply_inverse(&self.rotation, rn));
        if denom > 0.0 {
            1.0 / denom
        } else {
            0.0
        }
    }

    /// Apply an instantaneous impulse, updating `v` and `w` and then
    /// recomputing the stored angular momentum.
    pub fn integrate_impulse(&mut self, j: &VectorAtPosition) {
        if self.mass.is_finite() {
            self.v += j.vector / self.mass;
        }
        let r = vec3_f32(j.position - self.com_world());
        self.w += self
            .inertia
            .apply_inverse(&self.rotation, r.cross(j.vector));
        self.l = self.inertia.momentum(&self.rotation, self.w);
    }
}
