/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Force-directed layout stepper.
//!
//! Every pair of nodes repels with `repulsion / d²`; every edge pulls its
//! endpoints together with `attraction * (d - ideal_edge_length)`;
//! velocities are damped each step and capped at `max_step`. The run ends
//! at the step budget or once the summed displacement of a step drops below
//! the profile's convergence threshold.
//!
//! The stepper owns a copy of the positions, so it can run off the model
//! (see `layout::task`) and hand back snapshots.

use std::f32::consts::{PI, TAU};

use euclid::default::{Point2D, Vector2D};

use super::{LayoutProgress, LayoutStatus};
use crate::graph::{GraphModel, NodeId};
use crate::registries::physics_profile::PhysicsProfile;

/// Smallest distance used in force terms.
const MIN_DISTANCE: f32 = 1.0;
/// Golden angle, used to spread coincident nodes deterministically.
const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);

#[derive(Debug, Clone)]
pub struct ForceSimulation {
    ids: Vec<NodeId>,
    positions: Vec<Point2D<f32>>,
    velocities: Vec<Vector2D<f32>>,
    pinned: Vec<bool>,
    edges: Vec<(usize, usize)>,
    profile: PhysicsProfile,
    max_steps: usize,
    steps: usize,
    last_delta: f32,
    status: LayoutStatus,
}

impl ForceSimulation {
    /// Snapshot `model` into a new simulation. Nodes without a position are
    /// seeded on a circle around the origin, in insertion order.
    pub fn new(model: &GraphModel, profile: PhysicsProfile, max_steps: usize) -> Self {
        let count = model.node_count();
        let seed_radius = profile.ideal_edge_length * (count.max(1) as f32).sqrt();

        let mut ids = Vec::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        let mut pinned = Vec::with_capacity(count);
        for (i, node) in model.nodes().enumerate() {
            ids.push(node.id().clone());
            pinned.push(node.pinned);
            positions.push(node.position.unwrap_or_else(|| {
                let angle = TAU * i as f32 / count.max(1) as f32;
                Point2D::new(seed_radius * angle.cos(), seed_radius * angle.sin())
            }));
        }

        let mut edges = Vec::with_capacity(model.edge_count());
        for edge in model.edges() {
            let (Some(s), Some(t)) = (model.node_order(edge.source()), model.node_order(edge.target()))
            else {
                continue;
            };
            if s != t {
                edges.push((s, t));
            }
        }

        Self {
            velocities: vec![Vector2D::zero(); ids.len()],
            ids,
            positions,
            pinned,
            edges,
            profile,
            max_steps,
            steps: 0,
            last_delta: f32::INFINITY,
            status: LayoutStatus::Running,
        }
    }

    pub fn status(&self) -> LayoutStatus {
        self.status
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.status != LayoutStatus::Running
    }

    pub fn positions(&self) -> Vec<(NodeId, Point2D<f32>)> {
        self.ids
            .iter()
            .cloned()
            .zip(self.positions.iter().copied())
            .collect()
    }

    /// Run up to `budget` steps. Returns the status after the chunk.
    pub fn advance(&mut self, budget: usize) -> LayoutStatus {
        for _ in 0..budget {
            if self.is_finished() {
                break;
            }
            if self.steps >= self.max_steps {
                self.status = LayoutStatus::StepLimit;
                break;
            }
            self.last_delta = self.step();
            self.steps += 1;
            if self.last_delta < self.profile.convergence_threshold {
                self.status = LayoutStatus::Converged;
            } else if self.steps >= self.max_steps {
                self.status = LayoutStatus::StepLimit;
            }
        }
        self.status
    }

    pub fn progress(&self, generation: u64) -> LayoutProgress {
        LayoutProgress {
            generation,
            steps: self.steps,
            total_delta: self.last_delta,
            status: self.status,
            positions: self.positions(),
        }
    }

    /// One integration step. Returns the summed displacement.
    fn step(&mut self) -> f32 {
        let count = self.positions.len();
        let mut forces = vec![Vector2D::<f32>::zero(); count];

        for i in 0..count {
            for j in (i + 1)..count {
                let (direction, distance) = separation(self.positions[i], self.positions[j], i + j);
                let push = direction * (self.profile.repulsion / (distance * distance));
                forces[i] += push;
                forces[j] -= push;
            }
        }

        for (s, t) in &self.edges {
            let delta = self.positions[*t] - self.positions[*s];
            let distance = delta.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let pull =
                delta / distance * (self.profile.attraction * (distance - self.profile.ideal_edge_length));
            forces[*s] += pull;
            forces[*t] -= pull;
        }

        let mut total = 0.0;
        for (i, force) in forces.into_iter().enumerate() {
            if self.pinned[i] {
                self.velocities[i] = Vector2D::zero();
                continue;
            }
            let mut velocity = (self.velocities[i] + force) * self.profile.damping;
            let speed = velocity.length();
            if !speed.is_finite() {
                velocity = Vector2D::zero();
            } else if speed > self.profile.max_step {
                velocity = velocity * (self.profile.max_step / speed);
            }
            self.velocities[i] = velocity;
            self.positions[i] += velocity;
            total += velocity.length();
        }
        total
    }
}

/// Unit vector from `b` to `a` and their distance, floored at
/// [`MIN_DISTANCE`]. Coincident points get a deterministic direction.
fn separation(a: Point2D<f32>, b: Point2D<f32>, salt: usize) -> (Vector2D<f32>, f32) {
    let delta = a - b;
    let length = delta.length();
    if length > f32::EPSILON {
        return (delta / length, length.max(MIN_DISTANCE));
    }
    let angle = GOLDEN_ANGLE * salt as f32;
    (Vector2D::new(angle.cos(), angle.sin()), MIN_DISTANCE)
}
