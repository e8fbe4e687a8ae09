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

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// How contacts discovered during a sub-step are resolved.
///
/// Parsed from scene scripts, hence the `FromStr` impl. Only sequential
/// impulses are implemented.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveCollisionType {
    SequentialPulses,
}

impl FromStr for ResolveCollisionType {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, PhysicsError> {
        match s {
            "sequential_pulses" => Ok(ResolveCollisionType::SequentialPulses),
            other => Err(PhysicsError::UnknownResolveCollisionType(other.to_string())),
        }
    }
}

/// Tuning constants for the simulation loop.
///
/// `dt` is the duration of one sub-step; a full tick advances time by
/// `oversampling * dt`. The `min_*` thresholds are zero-clamps: residuals
/// below them are dropped to exactly zero rather than integrated forever.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct PhysicsEngineConfig {
    /// Collision + integration sub-steps per tick.
    pub oversampling: u32,
    /// Seconds per sub-step.
    pub dt: f32,
    /// Linear velocities below this are candidates for the rest clamp.
    pub min_velocity: f32,
    /// Angular velocities below this are candidates for the rest clamp.
    pub min_angular_velocity: f32,
    /// Accumulated accelerations below this are dropped before integration.
    pub min_acceleration: f32,
    pub resolve_collision_type: ResolveCollisionType,
}

impl Default for PhysicsEngineConfig {
    fn default() -> Self {
        PhysicsEngineConfig {
            oversampling: 2,
            dt: 1.0 / 60.0 / 2.0,
            min_velocity: 1e-2,
            min_angular_velocity: 1e-2,
            min_acceleration: 1e-2,
            resolve_collision_type: ResolveCollisionType::SequentialPulses,
        }
    }
}

#[cfg(test)]
mod tests {
    mod config {
        use crate::config::*;
        use crate::error::PhysicsError;

        #[test]
        fn test_resolve_collision_type_from_str() {
            assert_eq!(
                "sequential_pulses".parse::<ResolveCollisionType>(),
                Ok(ResolveCollisionType::SequentialPulses)
            );
            assert_eq!(
                "penalty_forces".parse::<ResolveCollisionType>(),
                Err(PhysicsError::UnknownResolveCollisionType(
                    "penalty_forces".to_string()
                ))
            );
        }

        #[test]
        fn test_default_tick_duration() {
            let cfg = PhysicsEngineConfig::default();
            let tick = cfg.dt * cfg.oversampling as f32;
            assert!((tick - 1.0 / 60.0).abs() < 1e-6);
        }
    }
}
