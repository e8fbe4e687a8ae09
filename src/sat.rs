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

use std::cmp::Ordering;

use cgmath::{InnerSpace, Vector3};

use crate::geom::CollisionRidge;

/// Cross products with a squared length under this threshold come from
/// parallel or near-parallel edges and are skipped as axis candidates.
pub const DEGENERATE_AXIS_EPSILON: f64 = 1e-6;

/// Slack subtracted from a ridge's `min_cos` when filtering candidate
/// axes against its orientation cone.
pub const MIN_COS_SLACK: f64 = 1e-4;

/// An ordered, deduplicated set of world-space points.
///
/// Points are kept sorted lexicographically, which both deduplicates
/// vertices shared between adjacent triangles and fixes the iteration
/// order, keeping axis evaluation deterministic across runs.
#[derive(Clone, Debug, Default)]
pub struct CollisionVertices {
    verts: Vec<Vector3<f64>>,
}

impl CollisionVertices {
    pub fn new() -> CollisionVertices {
        CollisionVertices { verts: Vec::new() }
    }

    pub fn insert(&mut self, v: Vector3<f64>) {
        match self.verts.binary_search_by(|p| lex_cmp(p, &v)) {
            Ok(_) => {}
            Err(i) => self.verts.insert(i, v),
        }
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.verts.iter()
    }
}

fn lex_cmp(a: &Vector3<f64>, b: &Vector3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Overlap of two point sets along `n`, in the `verts0 -> verts1`
/// direction: `max(v . n, v in verts0) - min(v . n, v in verts1)`.
/// A positive result means the projections overlap along `n`.
pub fn sat_overlap_signed(
    n: Vector3<f64>,
    verts0: &CollisionVertices,
    verts1: &CollisionVertices,
) -> f64 {
    debug_assert!(!verts0.is_empty() && !verts1.is_empty());
    let mut max0 = f64::NEG_INFINITY;
    for v in verts0.iter() {
        max0 = max0.max(v.dot(n));
    }
    let mut min1 = f64::INFINITY;
    for v in verts1.iter() {
        min1 = min1.min(v.dot(n));
    }
    max0 - min1
}

/// Both directional overlaps along `l` in one pass over the vertices:
/// the first result is `max1 - min0` (the overlap along `-l`), the
/// second `max0 - min1` (the overlap along `l`). The caller picks the
/// smaller one to obtain the minimal translation direction without
/// assuming how `l` is oriented.
pub fn sat_overlap_unsigned(
    l: Vector3<f64>,
    verts0: &CollisionVertices,
    verts1: &CollisionVertices,
) -> (f64, f64) {
    debug_assert!(!verts0.is_empty() && !verts1.is_empty());
    let mut min0 = f64::INFINITY;
    let mut max0 = f64::NEG_INFINITY;
    for v in verts0.iter() {
        let d = v.dot(l);
        min0 = min0.min(d);
        max0 = max0.max(d);
    }
    let mut min1 = f64::INFINITY;
    let mut max1 = f64::NEG_INFINITY;
    for v in verts1.iter() {
        let d = v.dot(l);
        min1 = min1.min(d);
        max1 = max1.max(d);
    }
    (max1 - min0, max0 - min1)
}

/// Selects the separating axis of minimal overlap between two vertex
/// sets.
///
/// Candidates are offered in a fixed order: first an optional sticky
/// normal carried over from the previous frame, then ridge-pair cross
/// products, then face normals. The best normal points from the first
/// vertex set towards the second. Ties keep the first-seen candidate;
/// callers must therefore iterate their ridges and faces in a stable
/// order.
pub struct SatOverlapCombiner<'a> {
    verts0: &'a CollisionVertices,
    verts1: &'a CollisionVertices,
    best_normal: Option<Vector3<f64>>,
    best_min_overlap: f64,
    keep_sticky: bool,
}

impl<'a> SatOverlapCombiner<'a> {
    pub fn new(
        verts0: &'a CollisionVertices,
        verts1: &'a CollisionVertices,
    ) -> SatOverlapCombiner<'a> {
        SatOverlapCombiner {
            verts0,
            verts1,
            best_normal: None,
            best_min_overlap: f64::INFINITY,
            keep_sticky: false,
        }
    }

    /// Offer the previous frame's contact normal. While its overlap
    /// stays below `max_keep_normal` it is retained outright and later
    /// candidates are ignored; this hysteresis stops the normal from
    /// flickering between near-tied axes at shallow contacts.
    pub fn combine_sticky_normal(&mut self, normal: Vector3<f64>, max_keep_normal: f64) {
        let overlap = sat_overlap_signed(normal, self.verts0, self.verts1);
        if overlap < max_keep_normal {
            self.best_normal = Some(normal);
            self.best_min_overlap = overlap;
            self.keep_sticky = true;
        }
    }

    /// Offer the cross product of two ridge edges as a candidate axis.
    ///
    /// Near-parallel edges are skipped silently. Each surviving
    /// direction must lie inside both ridges' orientation cones, with
    /// `r0` seen from the first set and `r1` from the second.
    pub fn combine_ridges(&mut self, r0: &CollisionRidge, r1: &CollisionRidge) {
        if self.keep_sticky {
            return;
        }
        let axis = r0.tangent().cross(r1.tangent());
        if axis.magnitude2() < DEGENERATE_AXIS_EPSILON {
            return;
        }
        let axis = axis.normalize();
        let (overlap_neg, overlap_pos) = sat_overlap_unsigned(axis, self.verts0, self.verts1);
        let candidates = if overlap_pos <= overlap_neg {
            [(axis, overlap_pos), (-axis, overlap_neg)]
        } else {
            [(-axis, overlap_neg), (axis, overlap_pos)]
        };
        for &(axis, overlap) in candidates.iter() {
            if axis.dot(r0.normal) >= r0.min_cos - MIN_COS_SLACK
                && (-axis).dot(r1.normal) >= r1.min_cos - MIN_COS_SLACK
            {
                self.combine(axis, overlap);
                return;
            }
        }
    }

    /// Offer a face normal of the first set (oriented towards the
    /// second) as a candidate axis.
    pub fn combine_plane(&mut self, normal: Vector3<f64>) {
        if self.keep_sticky {
            return;
        }
        let overlap = sat_overlap_signed(normal, self.verts0, self.verts1);
        self.combine(normal, overlap);
    }

    fn combine(&mut self, normal: Vector3<f64>, overlap: f64) {
        if overlap < self.best_min_overlap {
            self.best_normal = Some(normal);
            self.best_min_overlap = overlap;
        }
    }

    /// The winning axis and its overlap, if any candidate survived.
    pub fn best(&self) -> Option<(Vector3<f64>, f64)> {
        self.best_normal.map(|n| (n, self.best_min_overlap))
    }
}
