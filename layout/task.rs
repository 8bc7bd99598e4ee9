/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Background force layout.
//!
//! The simulation runs in chunks on the tokio runtime, yielding between
//! chunks so pointer handling on the same runtime is never starved.
//! Snapshots arrive on a bounded channel; a cancelled token or a dropped
//! receiver ends the run at the next chunk boundary.

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ForceSimulation, LayoutProgress, LayoutStatus};

const PROGRESS_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    Converged { steps: usize },
    StepLimit { steps: usize },
    Cancelled { steps: usize },
}

pub struct ForceLayoutHandle {
    pub generation: u64,
    pub progress: mpsc::Receiver<LayoutProgress>,
    token: CancellationToken,
    join: JoinHandle<LayoutOutcome>,
}

impl ForceLayoutHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end. A task that panicked or was aborted counts
    /// as cancelled.
    pub async fn finish(self) -> LayoutOutcome {
        let ForceLayoutHandle { join, .. } = self;
        join.await
            .unwrap_or(LayoutOutcome::Cancelled { steps: 0 })
    }
}

/// Spawn `simulation` on the current tokio runtime.
///
/// Must be called from within a runtime context.
pub fn spawn_force_layout(
    mut simulation: ForceSimulation,
    generation: u64,
    chunk_steps: usize,
    token: CancellationToken,
) -> ForceLayoutHandle {
    let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let task_token = token.clone();
    let join = tokio::spawn(async move {
        loop {
            if task_token.is_cancelled() {
                debug!("force layout {generation} cancelled after {} step(s)", simulation.steps());
                return LayoutOutcome::Cancelled {
                    steps: simulation.steps(),
                };
            }

            let status = simulation.advance(chunk_steps);
            let progress = simulation.progress(generation);
            tokio::select! {
                _ = task_token.cancelled() => {
                    return LayoutOutcome::Cancelled { steps: simulation.steps() };
                }
                sent = tx.send(progress) => {
                    if sent.is_err() {
                        return LayoutOutcome::Cancelled { steps: simulation.steps() };
                    }
                }
            }

            match status {
                LayoutStatus::Running => tokio::task::yield_now().await,
                LayoutStatus::Converged => {
                    return LayoutOutcome::Converged {
                        steps: simulation.steps(),
                    };
                },
                LayoutStatus::StepLimit => {
                    return LayoutOutcome::StepLimit {
                        steps: simulation.steps(),
                    };
                },
            }
        }
    });

    ForceLayoutHandle {
        generation,
        progress: rx,
        token,
        join,
    }
}
