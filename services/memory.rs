/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-process sketch backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ServiceError, SketchService};
use crate::error::CanvasError;
use crate::graph::snapshot::SketchSnapshot;
use crate::graph::{EdgeId, EdgeSpec, GraphModel, NodeId, NodePatch, NodeSpec};
use crate::registries::type_catalog::{TypeCatalog, TypeCatalogSnapshot};

#[derive(Default)]
struct MemoryState {
    sketches: HashMap<String, GraphModel>,
    /// Served by `fetch_type_catalog` and enforced on every sketch.
    catalog: TypeCatalog,
    /// Error returned by the next call, whatever it is.
    fail_next: Option<ServiceError>,
}

/// Keeps every sketch as a [`GraphModel`] behind a mutex. Clones share
/// state.
#[derive(Clone, Default)]
pub struct MemorySketchService {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySketchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sketch(&self, sketch_id: impl Into<String>, snapshot: SketchSnapshot) {
        let mut state = self.state.lock();
        let model = GraphModel::from_snapshot(snapshot, state.catalog.clone());
        state.sketches.insert(sketch_id.into(), model);
    }

    /// Replace the type catalog for every sketch, current and future.
    pub fn set_type_catalog(&self, snapshot: TypeCatalogSnapshot) {
        let mut state = self.state.lock();
        state.catalog = TypeCatalog::from_snapshot(snapshot);
        let catalog = state.catalog.clone();
        for model in state.sketches.values_mut() {
            model.set_catalog(catalog.clone());
        }
    }

    /// Current backend copy of a sketch.
    pub fn snapshot(&self, sketch_id: &str) -> Option<SketchSnapshot> {
        self.state
            .lock()
            .sketches
            .get(sketch_id)
            .map(GraphModel::to_snapshot)
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: ServiceError) {
        self.state.lock().fail_next = Some(error);
    }

    fn with_sketch<T>(
        &self,
        sketch_id: &str,
        f: impl FnOnce(&mut GraphModel) -> Result<T, CanvasError>,
    ) -> Result<T, ServiceError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        let model = state
            .sketches
            .get_mut(sketch_id)
            .ok_or_else(|| ServiceError::NotFound(sketch_id.to_string()))?;
        f(model).map_err(|e| ServiceError::Rejected(e.to_string()))
    }
}

impl SketchService for MemorySketchService {
    async fn fetch_sketch(&self, sketch_id: &str) -> Result<SketchSnapshot, ServiceError> {
        self.with_sketch(sketch_id, |model| Ok(model.to_snapshot()))
    }

    async fn fetch_neighbors(
        &self,
        sketch_id: &str,
        node_id: &NodeId,
    ) -> Result<SketchSnapshot, ServiceError> {
        self.with_sketch(sketch_id, |model| {
            if !model.contains_node(node_id) {
                return Err(CanvasError::missing_node(node_id));
            }
            let mut neighborhood = SketchSnapshot::default();
            for (node, edge) in model.neighbors(node_id) {
                if !neighborhood.nodes.iter().any(|known| known.id() == node.id()) {
                    neighborhood.nodes.push(node.clone());
                }
                neighborhood.edges.push(edge.clone());
            }
            Ok(neighborhood)
        })
    }

    async fn fetch_type_catalog(&self) -> Result<TypeCatalogSnapshot, ServiceError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        Ok(state.catalog.to_snapshot())
    }

    async fn create_node(
        &self,
        sketch_id: &str,
        id: &NodeId,
        spec: &NodeSpec,
    ) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| {
            model.add_node_with_id(id.clone(), spec.clone()).map(|_| ())
        })
    }

    async fn create_edge(
        &self,
        sketch_id: &str,
        id: &EdgeId,
        source: &NodeId,
        target: &NodeId,
        spec: &EdgeSpec,
    ) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| {
            model
                .add_edge_with_id(id.clone(), source, target, spec.clone())
                .map(|_| ())
        })
    }

    async fn update_node(
        &self,
        sketch_id: &str,
        id: &NodeId,
        patch: &NodePatch,
    ) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| model.update_node(id, patch.clone()))
    }

    async fn delete_nodes(&self, sketch_id: &str, ids: &[NodeId]) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| {
            model.remove_nodes(ids);
            Ok(())
        })
    }

    async fn delete_edges(&self, sketch_id: &str, ids: &[EdgeId]) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| {
            model.remove_edges(ids);
            Ok(())
        })
    }

    async fn merge_nodes(
        &self,
        sketch_id: &str,
        primary: &NodeId,
        secondaries: &[NodeId],
    ) -> Result<(), ServiceError> {
        self.with_sketch(sketch_id, |model| model.merge_nodes(primary, secondaries))
    }
}
