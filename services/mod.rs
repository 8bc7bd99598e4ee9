/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Command layer between the canvas and the sketch backend.
//!
//! [`SketchSession`] owns the [`GraphModel`] of one open sketch. Every
//! structural command is validated against the local model, sent through
//! a [`SketchService`], and applied locally only once the backend accepted
//! it, so a failed call never leaves the canvas ahead of the backend.

use std::future::Future;

use log::{debug, warn};

use crate::error::{CanvasError, CanvasResult};
use crate::graph::handles::ConnectionConstraints;
use crate::graph::snapshot::SketchSnapshot;
use crate::graph::{EdgeId, EdgeSpec, GraphModel, NodeId, NodePatch, NodeSpec};
use crate::registries::type_catalog::{TypeCatalog, TypeCatalogSnapshot};

pub mod memory;

pub use memory::MemorySketchService;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("sketch `{0}` not found")]
    NotFound(String),
    /// The backend refused the command.
    #[error("backend rejected request: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Backend operations on a sketch graph.
pub trait SketchService {
    fn fetch_sketch(
        &self,
        sketch_id: &str,
    ) -> impl Future<Output = Result<SketchSnapshot, ServiceError>> + Send;

    /// Nodes adjacent to `node_id` together with the edges linking them to
    /// it.
    fn fetch_neighbors(
        &self,
        sketch_id: &str,
        node_id: &NodeId,
    ) -> impl Future<Output = Result<SketchSnapshot, ServiceError>> + Send;

    /// Node and edge types the backend accepts.
    fn fetch_type_catalog(
        &self,
    ) -> impl Future<Output = Result<TypeCatalogSnapshot, ServiceError>> + Send;

    fn create_node(
        &self,
        sketch_id: &str,
        id: &NodeId,
        spec: &NodeSpec,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn create_edge(
        &self,
        sketch_id: &str,
        id: &EdgeId,
        source: &NodeId,
        target: &NodeId,
        spec: &EdgeSpec,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn update_node(
        &self,
        sketch_id: &str,
        id: &NodeId,
        patch: &NodePatch,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn delete_nodes(
        &self,
        sketch_id: &str,
        ids: &[NodeId],
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn delete_edges(
        &self,
        sketch_id: &str,
        ids: &[EdgeId],
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn merge_nodes(
        &self,
        sketch_id: &str,
        primary: &NodeId,
        secondaries: &[NodeId],
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

pub struct SketchSession<S> {
    sketch_id: String,
    service: S,
    model: GraphModel,
    constraints: ConnectionConstraints,
}

impl<S: SketchService> SketchSession<S> {
    /// Fetch the backend's type catalog and the sketch, and build the model.
    pub async fn open(service: S, sketch_id: impl Into<String>) -> CanvasResult<Self> {
        let catalog = service
            .fetch_type_catalog()
            .await
            .inspect_err(|e| warn!("fetch type catalog failed: {e}"))?;
        debug!(
            "backend catalog has {} node type(s) and {} edge type(s)",
            catalog.node_types.len(),
            catalog.edge_types.len()
        );
        Self::open_with_catalog(service, sketch_id, TypeCatalog::from_snapshot(catalog)).await
    }

    /// Fetch the sketch and build its model against a catalog the host
    /// already has.
    pub async fn open_with_catalog(
        service: S,
        sketch_id: impl Into<String>,
        catalog: TypeCatalog,
    ) -> CanvasResult<Self> {
        let sketch_id = sketch_id.into();
        let snapshot = service.fetch_sketch(&sketch_id).await?;
        debug!(
            "opened sketch `{sketch_id}` with {} node(s) and {} edge(s)",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(Self {
            model: GraphModel::from_snapshot(snapshot, catalog),
            sketch_id,
            service,
            constraints: ConnectionConstraints::default(),
        })
    }

    pub fn sketch_id(&self) -> &str {
        &self.sketch_id
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Direct access for presentation-only changes (positions, selection,
    /// visibility) that the backend does not track.
    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Connection-point capacities applied to anchored edges.
    pub fn constraints_mut(&mut self) -> &mut ConnectionConstraints {
        &mut self.constraints
    }

    pub fn into_model(self) -> GraphModel {
        self.model
    }

    /// Replace the local model with a fresh fetch. The selection is lost.
    pub async fn reload(&mut self) -> CanvasResult<()> {
        let snapshot = self.service.fetch_sketch(&self.sketch_id).await?;
        self.model = GraphModel::from_snapshot(snapshot, self.model.catalog().clone());
        Ok(())
    }

    /// Re-read the backend's type catalog. Existing nodes are kept even if
    /// their type is no longer listed.
    pub async fn refresh_type_catalog(&mut self) -> CanvasResult<()> {
        let catalog = self.service.fetch_type_catalog().await?;
        self.model.set_catalog(TypeCatalog::from_snapshot(catalog));
        Ok(())
    }

    /// Fetch the neighborhood of `node_id` and merge it into the model.
    /// Returns the ids of nodes that were not loaded before.
    pub async fn load_neighbors(&mut self, node_id: &NodeId) -> CanvasResult<Vec<NodeId>> {
        if !self.model.contains_node(node_id) {
            return Err(CanvasError::missing_node(node_id));
        }
        let neighborhood = self
            .service
            .fetch_neighbors(&self.sketch_id, node_id)
            .await
            .inspect_err(|e| warn!("fetch neighbors failed: {e}"))?;
        let added = self.model.merge_snapshot(neighborhood);
        debug!("loaded {} new neighbor(s) of `{node_id}`", added.len());
        Ok(added)
    }

    pub async fn create_node(&mut self, spec: NodeSpec) -> CanvasResult<NodeId> {
        self.model.validate_node_spec(&spec)?;
        let id = NodeId::generate();
        self.service
            .create_node(&self.sketch_id, &id, &spec)
            .await
            .inspect_err(|e| warn!("create node failed: {e}"))?;
        self.model.add_node_with_id(id, spec)
    }

    pub async fn create_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        spec: EdgeSpec,
    ) -> CanvasResult<EdgeId> {
        self.model.validate_edge(source, target, &spec.edge_type)?;
        self.constraints.check_edge(&self.model, source, target, &spec)?;
        let id = EdgeId::generate();
        self.service
            .create_edge(&self.sketch_id, &id, source, target, &spec)
            .await
            .inspect_err(|e| warn!("create edge failed: {e}"))?;
        self.model.add_edge_with_id(id, source, target, spec)
    }

    pub async fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> CanvasResult<()> {
        if !self.model.contains_node(id) {
            return Err(CanvasError::missing_node(id));
        }
        self.service
            .update_node(&self.sketch_id, id, &patch)
            .await
            .inspect_err(|e| warn!("update node failed: {e}"))?;
        self.model.update_node(id, patch)
    }

    /// Delete nodes and their incident edges. Ids that are not in the
    /// model are skipped and never sent to the backend.
    pub async fn delete_nodes(&mut self, ids: &[NodeId]) -> CanvasResult<usize> {
        let present: Vec<NodeId> = ids
            .iter()
            .filter(|id| self.model.contains_node(id))
            .cloned()
            .collect();
        if present.len() < ids.len() {
            debug!("skipping {} unknown node id(s) in delete", ids.len() - present.len());
        }
        if present.is_empty() {
            return Ok(0);
        }
        self.service
            .delete_nodes(&self.sketch_id, &present)
            .await
            .inspect_err(|e| warn!("delete nodes failed: {e}"))?;
        Ok(self.model.remove_nodes(&present))
    }

    pub async fn delete_edges(&mut self, ids: &[EdgeId]) -> CanvasResult<usize> {
        if let Some(missing) = ids.iter().find(|id| !self.model.contains_edge(id)) {
            return Err(CanvasError::missing_edge(missing));
        }
        if ids.is_empty() {
            return Ok(0);
        }
        self.service
            .delete_edges(&self.sketch_id, ids)
            .await
            .inspect_err(|e| warn!("delete edges failed: {e}"))?;
        Ok(self.model.remove_edges(ids))
    }

    /// Merge `secondaries` into `primary`. The merge is rehearsed on a copy
    /// of the model first so validation errors never reach the backend.
    pub async fn merge_nodes(&mut self, primary: &NodeId, secondaries: &[NodeId]) -> CanvasResult<()> {
        let mut staged = self.model.clone();
        staged.merge_nodes(primary, secondaries)?;
        self.service
            .merge_nodes(&self.sketch_id, primary, secondaries)
            .await
            .inspect_err(|e| warn!("merge nodes failed: {e}"))?;
        self.model = staged;
        Ok(())
    }
}
