/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spatial index for node hit-testing.
//!
//! Nodes are indexed by their graph-space bounding box so lasso selection
//! and pointer picking use an R*-tree query instead of a full node scan.

use euclid::default::{Box2D, Point2D};
use rstar::{AABB, RTree, RTreeObject};

use crate::graph::{GraphModel, NodeId};

struct IndexedNode {
    envelope: AABB<[f32; 2]>,
    id: NodeId,
    /// Insertion rank in the model, for stable result order.
    order: usize,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R*-tree over node boxes, in graph space. Callers convert screen
/// coordinates through the viewport before querying.
pub struct NodeSpatialIndex {
    tree: RTree<IndexedNode>,
}

impl NodeSpatialIndex {
    /// Build from `(id, center, half_extent)` tuples.
    pub fn build(nodes: impl IntoIterator<Item = (NodeId, Point2D<f32>, f32)>) -> Self {
        let entries: Vec<_> = nodes
            .into_iter()
            .enumerate()
            .map(|(order, (id, center, half))| IndexedNode {
                envelope: AABB::from_corners(
                    [center.x - half, center.y - half],
                    [center.x + half, center.y + half],
                ),
                id,
                order,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index every visible, positioned node of `model` as a square of edge
    /// length `node_size`.
    pub fn from_model(model: &GraphModel, node_size: f32) -> Self {
        let half = node_size * 0.5;
        Self::build(model.nodes().filter(|node| !node.hidden).filter_map(|node| {
            node.position
                .map(|position| (node.id().clone(), position, half))
        }))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids whose box intersects `rect`, in model insertion order.
    pub fn nodes_intersecting(&self, rect: Box2D<f32>) -> Vec<NodeId> {
        let aabb = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        let mut hits: Vec<&IndexedNode> = self.tree.locate_in_envelope_intersecting(&aabb).collect();
        hits.sort_by_key(|entry| entry.order);
        hits.into_iter().map(|entry| entry.id.clone()).collect()
    }

    /// Topmost node under `point`. Later-inserted nodes draw on top.
    pub fn node_at(&self, point: Point2D<f32>) -> Option<NodeId> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .max_by_key(|entry| entry.order)
            .map(|entry| entry.id.clone())
    }
}

/// Normalized rectangle spanned by two drag corners.
pub fn rect_from_corners(a: Point2D<f32>, b: Point2D<f32>) -> Box2D<f32> {
    Box2D::new(a.min(b), a.max(b))
}
