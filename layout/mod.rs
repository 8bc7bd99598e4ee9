/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Automatic layout.
//!
//! `LayoutEngine` is a small state machine over [`LayoutStrategy`]. It only
//! ever writes node positions; node and edge sets are never touched.
//!
//! Force runs are incremental: either driven synchronously with
//! [`LayoutEngine::tick`], or offloaded with [`LayoutEngine::spawn_force`]
//! and fed back through [`LayoutEngine::accept`]. Each run carries a
//! generation number so snapshots from a cancelled or superseded run are
//! dropped.

use euclid::default::Point2D;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::LayoutConfig;
use crate::graph::{GraphModel, NodeId};
use crate::registries::physics_profile::{PhysicsProfile, PhysicsProfileRegistry};

pub mod force;
pub mod hierarchical;
pub mod task;

pub use force::ForceSimulation;
pub use hierarchical::HierarchicalParams;
pub use task::{ForceLayoutHandle, LayoutOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    /// Positions change only through explicit drags.
    #[default]
    None,
    Force,
    Hierarchical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Running,
    Converged,
    /// Stopped at the step budget without converging.
    StepLimit,
}

/// Intermediate or final snapshot of a force run.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProgress {
    pub generation: u64,
    pub steps: usize,
    pub total_delta: f32,
    pub status: LayoutStatus,
    pub positions: Vec<(NodeId, Point2D<f32>)>,
}

impl LayoutProgress {
    pub fn is_final(&self) -> bool {
        self.status != LayoutStatus::Running
    }
}

pub struct LayoutEngine {
    strategy: LayoutStrategy,
    config: LayoutConfig,
    profiles: PhysicsProfileRegistry,
    profile: PhysicsProfile,
    generation: u64,
    /// Synchronously driven force run.
    stepping: Option<ForceSimulation>,
    /// Cancellation for an offloaded force run.
    background: Option<CancellationToken>,
    /// Replacement background run started by [`Self::on_model_changed`],
    /// waiting for the host to collect it.
    respawned: Option<ForceLayoutHandle>,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        let profiles = PhysicsProfileRegistry::default();
        let resolution = profiles.resolve(&config.physics_profile);
        if resolution.fallback_used {
            debug!(
                "layout physics profile `{}` resolved to `{}`",
                resolution.requested_id, resolution.resolved_id
            );
        }
        Self {
            strategy: LayoutStrategy::None,
            config,
            profiles,
            profile: resolution.profile,
            generation: 0,
            stepping: None,
            background: None,
            respawned: None,
        }
    }

    pub fn strategy(&self) -> LayoutStrategy {
        self.strategy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn physics_profile(&self) -> &PhysicsProfile {
        &self.profile
    }

    pub fn profiles_mut(&mut self) -> &mut PhysicsProfileRegistry {
        &mut self.profiles
    }

    /// Switch the physics profile. Takes effect on the next force run.
    pub fn set_physics_profile(&mut self, physics_id: &str) -> bool {
        let resolution = self.profiles.resolve(physics_id);
        if resolution.fallback_used {
            debug!(
                "physics profile `{}` resolved to `{}`",
                resolution.requested_id, resolution.resolved_id
            );
        }
        self.config.physics_profile = resolution.resolved_id;
        self.profile = resolution.profile;
        resolution.matched
    }

    pub fn is_running(&self) -> bool {
        self.stepping.is_some() || self.background.is_some()
    }

    /// Switch strategy and recompute from scratch. Any force run in flight
    /// is cancelled first.
    pub fn set_strategy(&mut self, strategy: LayoutStrategy, model: &mut GraphModel) -> Vec<NodeId> {
        self.cancel();
        self.strategy = strategy;
        self.recompute(model)
    }

    /// Full recomputation under the current strategy.
    ///
    /// Hierarchical layout is applied immediately and the moved ids are
    /// returned. Force layout starts a new run driven by [`Self::tick`];
    /// nothing moves until then.
    pub fn recompute(&mut self, model: &mut GraphModel) -> Vec<NodeId> {
        self.cancel();
        self.generation += 1;
        match self.strategy {
            LayoutStrategy::None => Vec::new(),
            LayoutStrategy::Hierarchical => {
                let layout = hierarchical::compute(model, &HierarchicalParams::from(&self.config));
                if !layout.reversed.is_empty() {
                    debug!(
                        "hierarchical layout reversed {} edge(s) to break cycles",
                        layout.reversed.len()
                    );
                }
                model.apply_positions(layout.positions)
            },
            LayoutStrategy::Force => {
                self.stepping = Some(self.simulation(model));
                Vec::new()
            },
        }
    }

    /// React to a structural change (nodes or edges added or removed).
    ///
    /// A force run that was offloaded stays offloaded: the old task is
    /// cancelled and a new one is spawned, to be collected with
    /// [`Self::take_respawned`]. Outside a tokio runtime the new run is
    /// driven by [`Self::tick`] instead.
    pub fn on_model_changed(&mut self, model: &mut GraphModel) -> Vec<NodeId> {
        if self.strategy == LayoutStrategy::None {
            return Vec::new();
        }
        if self.background.is_some() {
            if tokio::runtime::Handle::try_current().is_ok() {
                let handle = self.spawn_force(model);
                debug!("respawned background force layout as run {}", handle.generation);
                self.respawned = Some(handle);
                return Vec::new();
            }
            debug!("no tokio runtime, force layout continues as synchronous steps");
        }
        self.recompute(model)
    }

    /// Background run started by [`Self::on_model_changed`] in place of a
    /// superseded one. Its snapshots go to [`Self::accept`] like any other.
    pub fn take_respawned(&mut self) -> Option<ForceLayoutHandle> {
        self.respawned.take()
    }

    /// Advance a synchronously driven force run by at most `budget` steps and
    /// write the positions into `model`.
    pub fn tick(&mut self, model: &mut GraphModel, budget: usize) -> Option<LayoutProgress> {
        let simulation = self.stepping.as_mut()?;
        simulation.advance(budget);
        let progress = simulation.progress(self.generation);
        model.apply_positions(progress.positions.iter().cloned());
        if progress.is_final() {
            debug!(
                "force layout finished after {} step(s): {:?}",
                progress.steps, progress.status
            );
            self.stepping = None;
        }
        Some(progress)
    }

    /// Drive the current force run to the end in chunks.
    pub fn run_to_completion(&mut self, model: &mut GraphModel) -> Option<LayoutProgress> {
        let chunk = self.config.chunk_steps.max(1);
        let mut last = None;
        while self.stepping.is_some() {
            last = self.tick(model, chunk);
        }
        last
    }

    /// Start a force run as a background task. The caller forwards received
    /// snapshots to [`Self::accept`].
    pub fn spawn_force(&mut self, model: &GraphModel) -> ForceLayoutHandle {
        self.cancel();
        self.strategy = LayoutStrategy::Force;
        self.generation += 1;
        let token = CancellationToken::new();
        self.background = Some(token.clone());
        task::spawn_force_layout(
            self.simulation(model),
            self.generation,
            self.config.chunk_steps.max(1),
            token,
        )
    }

    /// Apply a snapshot from a background run. Snapshots from an older
    /// generation are ignored.
    pub fn accept(&mut self, progress: &LayoutProgress, model: &mut GraphModel) -> bool {
        if progress.generation != self.generation || self.background.is_none() {
            debug!(
                "dropping stale layout snapshot (generation {}, current {})",
                progress.generation, self.generation
            );
            return false;
        }
        model.apply_positions(progress.positions.iter().cloned());
        if progress.is_final() {
            self.background = None;
        }
        true
    }

    /// Stop any force run. Positions already written stay.
    pub fn cancel(&mut self) {
        self.respawned = None;
        if self.stepping.take().is_some() {
            debug!("cancelled force layout run {}", self.generation);
        }
        if let Some(token) = self.background.take() {
            token.cancel();
            debug!("cancelled background force layout run {}", self.generation);
        }
    }

    fn simulation(&self, model: &GraphModel) -> ForceSimulation {
        ForceSimulation::new(model, self.profile.clone(), self.config.max_force_steps)
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl Drop for LayoutEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}
