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
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Maximum tolerance for error when classifying geometry as degenerate.
pub const GEOMETRY_EPSILON: f64 = 0.000001;

#[inline(always)]
pub fn vec3_f32(v: Vector3<f64>) -> Vector3<f32> {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

#[inline(always)]
pub fn vec3_f64(v: Vector3<f32>) -> Vector3<f64> {
    Vector3::new(v.x as f64, v.y as f64, v.z as f64)
}

/// A world-space vector applied at a world-space point.
///
/// Used for impulses and forces; the application point determines the
/// angular contribution. Positions are double precision so that far-away
/// objects do not lose contact resolution, vectors stay single precision.
#[derive(Copy, Clone, Debug)]
pub struct VectorAtPosition {
    pub vector: Vector3<f32>,
    pub position: Point3<f64>,
}

/// Bounding spheres are a point and a radius, in world coordinates.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn overlaps(&self, rhs: &BoundingSphere) -> bool {
        let r = self.radius + rhs.radius;
        (rhs.center - self.center).magnitude2() <= r * r
    }
}

/// One triangle of a static collision mesh, with its outward face normal
/// precomputed at ingestion time.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionTriangle {
    pub vertices: [Vector3<f64>; 3],
    pub normal: Vector3<f64>,
}

impl CollisionTriangle {
    /// Build a triangle from three counter-clockwise vertices.
    ///
    /// Fails fast on non-finite coordinates and on degenerate (collinear)
    /// triangles; both are data errors, not runtime conditions.
    pub fn new(
        a: Vector3<f64>,
        b: Vector3<f64>,
        c: Vector3<f64>,
    ) -> Result<CollisionTriangle, PhysicsError> {
        for v in &[a, b, c] {
            if !finite(*v) {
                return Err(PhysicsError::NonFiniteGeometry);
            }
        }
        let n = (b - a).cross(c - a);
        if n.magnitude2() < GEOMETRY_EPSILON {
            return Err(PhysicsError::DegenerateTriangleNormal);
        }
        Ok(CollisionTriangle {
            vertices: [a, b, c],
            normal: n.normalize(),
        })
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        let c = (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0;
        let r = (self.vertices[0] - c)
            .magnitude2()
            .max((self.vertices[1] - c).magnitude2())
            .max((self.vertices[2] - c).magnitude2())
            .sqrt();
        BoundingSphere {
            center: Point3::from_vec(c),
            radius: r,
        }
    }

    /// Intercept of the triangle's supporting plane, in the convention
    /// used by plane constraints: a point `x` is below the surface when
    /// `normal . x + intercept < 0`.
    pub fn intercept(&self) -> f64 {
        -self.normal.dot(self.vertices[0])
    }
}

/// A mesh edge used as a separating-axis candidate.
///
/// `normal` is the averaged normal of the adjacent faces; `min_cos` is the
/// orientation tolerance deciding which axis directions the ridge may
/// produce. Convex edges carry a small `min_cos`, flat edges a value near
/// one, which excludes them from generating sideways normals.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRidge {
    pub a: Vector3<f64>,
    pub b: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub min_cos: f64,
}

impl CollisionRidge {
    pub fn new(
        a: Vector3<f64>,
        b: Vector3<f64>,
        normal: Vector3<f64>,
        min_cos: f64,
    ) -> Result<CollisionRidge, PhysicsError> {
        if !finite(a) || !finite(b) || !finite(normal) || !min_cos.is_finite() {
            return Err(PhysicsError::NonFiniteGeometry);
        }
        if normal.magnitude2() < GEOMETRY_EPSILON {
            return Err(PhysicsError::DegenerateRidgeNormal);
        }
        Ok(CollisionRidge {
            a,
            b,
            normal: normal.normalize(),
            min_cos,
        })
    }

    /// Edge direction, unnormalized.
    pub fn tangent(&self) -> Vector3<f64> {
        self.b - self.a
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: Point3::from_vec((self.a + self.b) / 2.0),
            radius: (self.b - self.a).magnitude() / 2.0,
        }
    }
}

#[inline(always)]
fn finite(v: Vector3<f64>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    mod geom {
        use cgmath::{Point3, Vector3};

        use crate::error::PhysicsError;
        use crate::geom::*;

        #[test]
        fn test_triangle_normal() {
            let tri = CollisionTriangle::new(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, -1.0),
            )
            .unwrap();
            assert_eq!(tri.normal, Vector3::new(0.0, 1.0, 0.0));
            assert_eq!(tri.intercept(), 0.0);
        }

        #[test]
        fn test_degenerate_triangle_rejected() {
            let r = CollisionTriangle::new(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
            );
            assert_eq!(r, Err(PhysicsError::DegenerateTriangleNormal));
        }

        #[test]
        fn test_degenerate_ridge_rejected() {
            let r = CollisionRidge::new(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
                0.5,
            );
            assert_eq!(r, Err(PhysicsError::DegenerateRidgeNormal));

            let r = CollisionRidge::new(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, f64::NAN),
                Vector3::new(0.0, 1.0, 0.0),
                0.5,
            );
            assert_eq!(r, Err(PhysicsError::NonFiniteGeometry));
        }

        #[test]
        fn test_bounding_sphere_overlap() {
            let a = BoundingSphere {
                center: Point3::new(0.0, 0.0, 0.0),
                radius: 1.0,
            };
            let b = BoundingSphere {
                center: Point3::new(0.0, 2.0, 0.0),
                radius: 1.0,
            };
            let c = BoundingSphere {
                center: Point3::new(0.0, 3.0, 0.0),
                radius: 1.0,
            };
            assert!(a.overlaps(&b));
            assert!(!a.overlaps(&c));
        }
    }
}
