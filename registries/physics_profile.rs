/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

pub const PHYSICS_ID_DEFAULT: &str = "physics:liquid";
pub const PHYSICS_ID_GAS: &str = "physics:gas";
pub const PHYSICS_ID_SOLID: &str = "physics:solid";

/// Tuning constants for the force-directed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsProfile {
    pub name: String,
    /// Coulomb-style constant; repulsion between two nodes is
    /// `repulsion / distance²`.
    pub repulsion: f32,
    /// Spring stiffness along edges.
    pub attraction: f32,
    /// Rest length of an edge spring.
    pub ideal_edge_length: f32,
    /// Fraction of velocity kept between steps, in `0.0..1.0`.
    pub damping: f32,
    /// Upper bound on how far a node may move in one step.
    pub max_step: f32,
    /// The simulation counts as converged once the summed displacement of a
    /// step falls below this.
    pub convergence_threshold: f32,
}

impl Default for PhysicsProfile {
    fn default() -> Self {
        Self {
            name: "Liquid".to_string(),
            repulsion: 12_000.0,
            attraction: 0.06,
            ideal_edge_length: 160.0,
            damping: 0.55,
            max_step: 40.0,
            convergence_threshold: 0.5,
        }
    }
}

impl PhysicsProfile {
    /// Loose, spread-out clusters.
    pub fn gas() -> Self {
        Self {
            name: "Gas".to_string(),
            repulsion: 24_000.0,
            attraction: 0.03,
            ideal_edge_length: 220.0,
            damping: 0.7,
            max_step: 60.0,
            convergence_threshold: 1.0,
        }
    }

    /// Tight layouts that settle quickly.
    pub fn solid() -> Self {
        Self {
            name: "Solid".to_string(),
            repulsion: 6_000.0,
            attraction: 0.12,
            ideal_edge_length: 110.0,
            damping: 0.35,
            max_step: 20.0,
            convergence_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhysicsProfileResolution {
    pub requested_id: String,
    pub resolved_id: String,
    pub matched: bool,
    pub fallback_used: bool,
    pub profile: PhysicsProfile,
}

#[derive(Debug, Clone)]
pub struct PhysicsProfileRegistry {
    profiles: HashMap<String, PhysicsProfile>,
    fallback_id: String,
}

impl PhysicsProfileRegistry {
    pub fn register(&mut self, physics_id: &str, profile: PhysicsProfile) {
        self.profiles
            .insert(physics_id.trim().to_ascii_lowercase(), profile);
    }

    pub fn register_core_seed_defaults(&mut self) {
        self.register(PHYSICS_ID_DEFAULT, PhysicsProfile::default());
        self.register(PHYSICS_ID_GAS, PhysicsProfile::gas());
        self.register(PHYSICS_ID_SOLID, PhysicsProfile::solid());
    }

    pub fn resolve(&self, physics_id: &str) -> PhysicsProfileResolution {
        let requested = physics_id.trim().to_ascii_lowercase();
        let fallback_profile = self
            .profiles
            .get(&self.fallback_id)
            .cloned()
            .unwrap_or_default();

        if let Some(profile) = self.profiles.get(&requested).cloned() {
            return PhysicsProfileResolution {
                requested_id: requested.clone(),
                resolved_id: requested,
                matched: true,
                fallback_used: false,
                profile,
            };
        }

        if !requested.is_empty() {
            warn!(
                "unknown physics profile `{requested}`, falling back to `{}`",
                self.fallback_id
            );
        }
        PhysicsProfileResolution {
            requested_id: requested,
            resolved_id: self.fallback_id.clone(),
            matched: false,
            fallback_used: true,
            profile: fallback_profile,
        }
    }
}

impl Default for PhysicsProfileRegistry {
    fn default() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
            fallback_id: PHYSICS_ID_DEFAULT.to_string(),
        };
        registry.register_core_seed_defaults();
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_profile_registry_resolves_default() {
        let registry = PhysicsProfileRegistry::default();
        let resolution = registry.resolve(PHYSICS_ID_DEFAULT);

        assert!(resolution.matched);
        assert!(!resolution.fallback_used);
        assert_eq!(resolution.resolved_id, PHYSICS_ID_DEFAULT);
        assert_eq!(resolution.profile.name, "Liquid");
    }

    #[test]
    fn test_physics_profile_registry_is_case_insensitive() {
        let registry = PhysicsProfileRegistry::default();
        let resolution = registry.resolve("  Physics:SOLID ");

        assert!(resolution.matched);
        assert_eq!(resolution.profile, PhysicsProfile::solid());
    }

    #[test]
    fn test_unknown_or_empty_id_falls_back_to_liquid() {
        let registry = PhysicsProfileRegistry::default();
        for id in ["physics:plasma", ""] {
            let resolution = registry.resolve(id);
            assert!(!resolution.matched);
            assert!(resolution.fallback_used);
            assert_eq!(resolution.resolved_id, PHYSICS_ID_DEFAULT);
            assert_eq!(resolution.profile.name, "Liquid");
        }
    }

    #[test]
    fn test_profile_partial_toml_uses_defaults() {
        let profile: PhysicsProfile = toml::from_str("repulsion = 1.0").unwrap();
        assert_eq!(profile.repulsion, 1.0);
        assert_eq!(profile.damping, PhysicsProfile::default().damping);
    }
}
