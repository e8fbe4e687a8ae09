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

use thiserror::Error;

/// Structural and precondition failures.
///
/// These represent bad input data or programmer errors, not recoverable
/// runtime conditions. They are raised when geometry or configuration is
/// ingested and propagate with `?`; nothing catches them to retry.
/// Numerical edge cases inside the solver (near-parallel edges, near-zero
/// denominators) are not errors, they are silently skipped candidates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("ridge has triangle-normal close to or equal 0")]
    DegenerateRidgeNormal,
    #[error("triangle has normal close to or equal 0")]
    DegenerateTriangleNormal,
    #[error("non-finite collision geometry")]
    NonFiniteGeometry,
    #[error("full inertia tensor has a non-finite entry")]
    NonFiniteInertia,
    #[error("unknown resolve collision type: {0}")]
    UnknownResolveCollisionType(String),
}
