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

//! A low-level rigid body contact and constraint solving core intended
//! for use in 3D video game development.
//!
//! # Simulation overview
//!
//! The simulation advances in ticks driven by [`PhysicsIteration`]. Each
//! tick runs a configured number of oversampled sub-steps, and every
//! sub-step performs the same three phases in order:
//!
//! - *Collision detection*: bounding spheres prune body/mesh pairs, then
//!   [`SatOverlapCombiner`] picks the separating axis of minimal overlap
//!   among the previous frame's sticky normal, ridge-pair cross products
//!   and face normals. Penetrating vertices become [`ContactInfo`]
//!   constraints.
//! - *Constraint solving*: [`solve_contacts`] applies sequential
//!   impulses with Baumgarte stabilization over a fixed iteration count.
//! - *Integration*: every [`RigidBodyIntegrator`] turns accumulated
//!   forces into velocity and velocity into position, dropping bodies
//!   below the configured velocity thresholds to exact rest.
//!
//! Tires are modelled separately by [`StickyWheel`], a ring of sticky
//! spring contacts whose reaction force feeds back into the chassis
//! once per tick.
//!
//! The core is single threaded by design: sub-steps read state written
//! by their predecessors and nothing inside a tick suspends or runs
//! concurrently. Debug beacons cross to the render thread through an
//! explicitly double-buffered [`BeaconBuffer`] and are therefore always
//! one frame behind.

mod config;
pub use crate::config::*;

mod constraint;
pub use crate::constraint::*;

mod error;
pub use crate::error::*;

mod geom;
pub use crate::geom::*;

mod integrator;
pub use crate::integrator::*;

mod iteration;
pub use crate::iteration::*;

mod pulses;
pub use crate::pulses::*;

mod sat;
pub use crate::sat::*;

mod wheel;
pub use crate::wheel::*;

mod world;
pub use crate::world::*;
