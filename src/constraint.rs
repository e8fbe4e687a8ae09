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

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::geom::{vec3_f64, VectorAtPosition};
use crate::world::{BodyHandle, BodySet};

/// Number of passes the sequential solver makes over all contacts.
///
/// The solver always runs the full count; there is no residual check and
/// no abort path. A configuration that has not converged after the last
/// pass simply keeps its residual penetration until the next step.
pub const CONTACT_SOLVER_ITERATIONS: usize = 100;

/// A unilateral non-penetration constraint against a plane.
///
/// `overlap(x)` is positive when `x` penetrates the plane. Constraints
/// are rebuilt from detected contacts every sub-step and die with it;
/// nothing is warm-started.
#[derive(Copy, Clone, Debug)]
pub struct PlaneConstraint {
    pub normal: Vector3<f32>,
    pub intercept: f32,
    /// Penetration depth below which no corrective bias applies.
    pub slop: f32,
    /// Clamp bounds for the applied impulse. Carried for generality; the
    /// sequential solve below does not apply them.
    pub lambda_min: f32,
    pub lambda_max: f32,
}

impl PlaneConstraint {
    pub fn new(normal: Vector3<f32>, intercept: f32, slop: f32) -> PlaneConstraint {
        PlaneConstraint {
            normal,
            intercept,
            slop,
            lambda_min: -f32::INFINITY,
            lambda_max: f32::INFINITY,
        }
    }

    pub fn overlap(&self, x: Point3<f64>) -> f32 {
        -(vec3_f64(self.normal).dot(x.to_vec()) + self.intercept as f64) as f32
    }

    pub fn active(&self, x: Point3<f64>) -> bool {
        self.overlap(x) > 0.0
    }

    pub fn bias(&self, x: Point3<f64>) -> f32 {
        (self.overlap(x) - self.slop).max(0.0)
    }
}

/// Stabilization gains and the world-space contact point.
///
/// `beta` weights the raw position error, `beta2` the slop-adjusted bias;
/// both enter the impulse scaled by `1/dt`.
#[derive(Copy, Clone, Debug)]
pub struct ContactPoint {
    pub beta: f32,
    pub beta2: f32,
    pub position: Point3<f64>,
}

/// A contact between one movable body and static geometry.
#[derive(Clone, Debug)]
pub struct ContactInfo1 {
    pub body: BodyHandle,
    pub pc: PlaneConstraint,
    pub cp: ContactPoint,
    /// Target normal velocity, the restitution seam. Zero for the plain
    /// contacts generated by the collision pipeline.
    pub b: f32,
    pub lambda_total: f32,
}

/// A contact between two movable bodies. The constraint normal points
/// from `body1` towards `body0`.
#[derive(Clone, Debug)]
pub struct ContactInfo2 {
    pub body0: BodyHandle,
    pub body1: BodyHandle,
    pub pc: PlaneConstraint,
    pub cp: ContactPoint,
    pub b: f32,
    pub lambda_total: f32,
}

/// One active contact constraint, dispatched on its body count.
#[derive(Clone, Debug)]
pub enum ContactInfo {
    OneBody(ContactInfo1),
    TwoBody(ContactInfo2),
}

impl ContactInfo {
    pub fn one_body(body: BodyHandle, pc: PlaneConstraint, cp: ContactPoint) -> ContactInfo {
        ContactInfo::OneBody(ContactInfo1 {
            body,
            pc,
            cp,
            b: 0.0,
            lambda_total: 0.0,
        })
    }

    pub fn two_body(
        body0: BodyHandle,
        body1: BodyHandle,
        pc: PlaneConstraint,
        cp: ContactPoint,
    ) -> ContactInfo {
        ContactInfo::TwoBody(ContactInfo2 {
            body0,
            body1,
            pc,
            cp,
            b: 0.0,
            lambda_total: 0.0,
        })
    }

    pub fn position(&self) -> Point3<f64> {
        match self {
            ContactInfo::OneBody(c) => c.cp.position,
            ContactInfo::TwoBody(c) => c.cp.position,
        }
    }

    /// Net impulse applied over all solver passes. Callers use this as a
    /// contact force estimate, e.g. for damage thresholds.
    pub fn lambda_total(&self) -> f32 {
        match self {
            ContactInfo::OneBody(c) => c.lambda_total,
            ContactInfo::TwoBody(c) => c.lambda_total,
        }
    }

    /// One sequential impulse correction.
    ///
    /// Separated contacts receive nothing. For active contacts the
    /// impulse is the effective mass times the velocity error plus the
    /// Baumgarte terms; it is applied without clamping, so a single pass
    /// may overshoot and later passes pull back.
    pub fn solve(&mut self, bodies: &mut BodySet, dt: f32) {
        match self {
            ContactInfo::OneBody(c) => {
                if !c.pc.active(c.cp.position) {
                    return;
                }
                let rb = &mut bodies[c.body].integrator.pulses;
                let v_rel = rb.velocity_at_position(c.cp.position).dot(c.pc.normal);
                let em = rb.effective_mass(&VectorAtPosition {
                    vector: c.pc.normal,
                    position: c.cp.position,
                });
                let lambda = -em
                    * (-v_rel
                        + c.b
                        + 1.0 / dt
                            * (c.cp.beta * c.pc.overlap(c.cp.position)
                                - c.cp.beta2 * c.pc.bias(c.cp.position)));
                rb.integrate_impulse(&VectorAtPosition {
                    vector: c.pc.normal * -lambda,
                    position: c.cp.position,
                });
                c.lambda_total += lambda;
            }
            ContactInfo::TwoBody(c) => {
                if !c.pc.active(c.cp.position) {
                    return;
                }
                let (b0, b1) = bodies.get2_mut(c.body0, c.body1);
                let p0 = &mut b0.integrator.pulses;
                let p1 = &mut b1.integrator.pulses;
                let v_rel = (p0.velocity_at_position(c.cp.position)
                    - p1.velocity_at_position(c.cp.position))
                .dot(c.pc.normal);
                let vp = VectorAtPosition {
                    vector: c.pc.normal,
                    position: c.cp.position,
                };
                let em = combine_effective_mass(p0.effective_mass(&vp), p1.effective_mass(&vp));
                let lambda = -em
                    * (-v_rel
                        + c.b
                        + 1.0 / dt
                            * (c.cp.beta * c.pc.overlap(c.cp.position)
                                - c.cp.beta2 * c.pc.bias(c.cp.position)));
                p0.integrate_impulse(&VectorAtPosition {
                    vector: c.pc.normal * -lambda,
                    position: c.cp.position,
                });
                p1.integrate_impulse(&VectorAtPosition {
                    vector: c.pc.normal * lambda,
                    position: c.cp.position,
                });
                c.lambda_total += lambda;
            }
        }
    }
}

/// Series combination of two per-body effective masses. Two fully locked
/// bodies yield zero, which turns the impulse into a no-op.
#[inline(always)]
fn combine_effective_mass(em0: f32, em1: f32) -> f32 {
    let d0 = if em0 > 0.0 { 1.0 / em0 } else { f32::INFINITY };
    let d1 = if em1 > 0.0 { 1.0 / em1 } else { f32::INFINITY };
    let denom = d0 + d1;
    if denom.is_finite() && denom > 0.0 {
        1.0 / denom
    } else {
        0.0
    }
}

/// Gauss-Seidel over all contacts: every pass applies one correction per
/// contact, in container order, for a fixed number of passes.
pub fn solve_contacts(bodies: &mut BodySet, contacts: &mut [ContactInfo], dt: f32) {
    for _ in 0..CONTACT_SOLVER_ITERATIONS {
        for contact in contacts.iter_mut() {
            contact.solve(bodies, dt);
        }
    }
}
