/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layered (Sugiyama-style) layout.
//!
//! Phases:
//!   1. Cycle removal: a greedy vertex ordering approximates a small
//!      feedback arc set; edges pointing backwards in it are reversed.
//!   2. Layer assignment: longest path from the sources.
//!   3. Crossing reduction: alternating barycenter sweeps.
//!   4. Coordinates: layers stacked top to bottom, each row centered on x = 0.
//!
//! Every phase breaks ties by node or edge insertion order, so the same
//! model always produces the same layout.

use euclid::default::Point2D;
use indexmap::IndexMap;
use log::{Level, debug, log_enabled};

use crate::config::LayoutConfig;
use crate::graph::{EdgeId, GraphModel, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalParams {
    pub layer_spacing: f32,
    pub node_spacing: f32,
    pub sweeps: usize,
}

impl From<&LayoutConfig> for HierarchicalParams {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            layer_spacing: config.layer_spacing,
            node_spacing: config.node_spacing,
            sweeps: config.ordering_sweeps,
        }
    }
}

impl Default for HierarchicalParams {
    fn default() -> Self {
        Self::from(&LayoutConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalLayout {
    /// Node ids per layer, in final left-to-right order.
    pub layers: Vec<Vec<NodeId>>,
    pub layer_of: IndexMap<NodeId, usize>,
    /// Edges whose direction was flipped to break cycles.
    pub reversed: Vec<EdgeId>,
    /// Edges as laid out (after reversal), as node indices into
    /// `layer_of`. Self-loops are excluded.
    pub dag_edges: Vec<(usize, usize)>,
    pub positions: Vec<(NodeId, Point2D<f32>)>,
}

pub fn compute(model: &GraphModel, params: &HierarchicalParams) -> HierarchicalLayout {
    let ids: Vec<NodeId> = model.nodes().map(|node| node.id().clone()).collect();
    let index_of: IndexMap<&NodeId, usize> =
        ids.iter().enumerate().map(|(i, id)| (id, i)).collect();

    let mut edges: Vec<(usize, usize, &EdgeId)> = Vec::new();
    for edge in model.edges() {
        let (Some(&s), Some(&t)) = (index_of.get(edge.source()), index_of.get(edge.target()))
        else {
            continue;
        };
        if s != t {
            edges.push((s, t, edge.id()));
        }
    }

    let order = greedy_fas_ordering(ids.len(), &edges);
    let mut rank = vec![0usize; ids.len()];
    for (position, node) in order.iter().enumerate() {
        rank[*node] = position;
    }

    let mut reversed = Vec::new();
    let mut dag_edges = Vec::with_capacity(edges.len());
    for (s, t, id) in &edges {
        if rank[*s] > rank[*t] {
            reversed.push((*id).clone());
            dag_edges.push((*t, *s));
        } else {
            dag_edges.push((*s, *t));
        }
    }

    let layer_index = assign_layers(ids.len(), &order, &dag_edges);
    let mut layers = group_layers(&layer_index);
    reduce_crossings(&mut layers, &layer_index, &dag_edges, params.sweeps);

    let mut positions = Vec::with_capacity(ids.len());
    for (depth, row) in layers.iter().enumerate() {
        let offset = (row.len() as f32 - 1.0) * 0.5;
        for (slot, node) in row.iter().enumerate() {
            positions.push((
                ids[*node].clone(),
                Point2D::new(
                    (slot as f32 - offset) * params.node_spacing,
                    depth as f32 * params.layer_spacing,
                ),
            ));
        }
    }

    let layout = HierarchicalLayout {
        layers: layers
            .iter()
            .map(|row| row.iter().map(|node| ids[*node].clone()).collect())
            .collect(),
        layer_of: ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), layer_index[i]))
            .collect(),
        reversed,
        dag_edges,
        positions,
    };
    if log_enabled!(Level::Debug) {
        debug!(
            "hierarchical layout: {} layer(s), {} crossing(s) after {} sweep(s)",
            layout.layers.len(),
            count_crossings(&layout),
            params.sweeps
        );
    }
    layout
}

/// Greedy Eades-Lin-Smyth heuristic: peel sinks to the back and sources to
/// the front; when neither exists, move the node with the largest
/// `out - in` degree to the front. The backward edges are a feedback arc
/// set but not necessarily a minimum one; the forward edges form a DAG.
fn greedy_fas_ordering(count: usize, edges: &[(usize, usize, &EdgeId)]) -> Vec<usize> {
    let mut successors = vec![Vec::new(); count];
    let mut predecessors = vec![Vec::new(); count];
    let mut out_deg = vec![0i64; count];
    let mut in_deg = vec![0i64; count];
    for (s, t, _) in edges {
        successors[*s].push(*t);
        predecessors[*t].push(*s);
        out_deg[*s] += 1;
        in_deg[*t] += 1;
    }

    let mut active = vec![true; count];
    let mut remaining = count;
    let mut front = Vec::with_capacity(count);
    let mut back = Vec::new();

    let remove = |node: usize, active: &mut [bool], out_deg: &mut [i64], in_deg: &mut [i64]| {
        active[node] = false;
        for succ in &successors[node] {
            if active[*succ] {
                in_deg[*succ] -= 1;
            }
        }
        for pred in &predecessors[node] {
            if active[*pred] {
                out_deg[*pred] -= 1;
            }
        }
    };

    while remaining > 0 {
        loop {
            let Some(sink) = (0..count).find(|n| active[*n] && out_deg[*n] == 0) else {
                break;
            };
            remove(sink, &mut active, &mut out_deg, &mut in_deg);
            back.push(sink);
            remaining -= 1;
        }
        loop {
            let Some(source) = (0..count).find(|n| active[*n] && in_deg[*n] == 0) else {
                break;
            };
            remove(source, &mut active, &mut out_deg, &mut in_deg);
            front.push(source);
            remaining -= 1;
        }
        if remaining == 0 {
            break;
        }
        // Lowest index wins ties: `max_by_key` keeps the last maximum, so
        // scan in reverse.
        let Some(best) = (0..count)
            .rev()
            .filter(|n| active[*n])
            .max_by_key(|n| out_deg[*n] - in_deg[*n])
        else {
            break;
        };
        remove(best, &mut active, &mut out_deg, &mut in_deg);
        front.push(best);
        remaining -= 1;
    }

    back.reverse();
    front.extend(back);
    front
}

/// Longest-path layering. `order` is a topological order of `dag_edges`.
fn assign_layers(count: usize, order: &[usize], dag_edges: &[(usize, usize)]) -> Vec<usize> {
    let mut incoming = vec![Vec::new(); count];
    for (s, t) in dag_edges {
        incoming[*t].push(*s);
    }
    let mut layer = vec![0usize; count];
    for node in order {
        layer[*node] = incoming[*node]
            .iter()
            .map(|pred| layer[*pred] + 1)
            .max()
            .unwrap_or(0);
    }
    layer
}

fn group_layers(layer_index: &[usize]) -> Vec<Vec<usize>> {
    let depth = layer_index.iter().copied().max().map_or(0, |max| max + 1);
    let mut layers = vec![Vec::new(); depth];
    for (node, layer) in layer_index.iter().enumerate() {
        layers[*layer].push(node);
    }
    layers
}

/// Alternate downward and upward barycenter sweeps. A node's barycenter is
/// the mean slot of its neighbors in the adjacent layer; nodes with no
/// such neighbor keep their current slot. Ties fall back to insertion
/// order.
fn reduce_crossings(
    layers: &mut [Vec<usize>],
    layer_index: &[usize],
    dag_edges: &[(usize, usize)],
    sweeps: usize,
) {
    if layers.len() < 2 {
        return;
    }
    let mut neighbors = vec![Vec::new(); layer_index.len()];
    for (s, t) in dag_edges {
        neighbors[*s].push(*t);
        neighbors[*t].push(*s);
    }
    let mut slot = vec![0usize; layer_index.len()];
    for row in layers.iter() {
        for (i, node) in row.iter().enumerate() {
            slot[*node] = i;
        }
    }

    for sweep in 0..sweeps {
        let downward = sweep % 2 == 0;
        let rows: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len() - 1).rev().collect()
        };
        for row in rows {
            let adjacent = if downward { row - 1 } else { row + 1 };
            let mut keyed: Vec<(f32, usize)> = layers[row]
                .iter()
                .map(|node| {
                    let (sum, n) = neighbors[*node]
                        .iter()
                        .filter(|other| layer_index[**other] == adjacent)
                        .fold((0.0f32, 0usize), |(sum, n), other| {
                            (sum + slot[*other] as f32, n + 1)
                        });
                    let barycenter = if n == 0 {
                        slot[*node] as f32
                    } else {
                        sum / n as f32
                    };
                    (barycenter, *node)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            layers[row] = keyed.into_iter().map(|(_, node)| node).collect();
            for (i, node) in layers[row].iter().enumerate() {
                slot[*node] = i;
            }
        }
    }
}

/// Number of edge crossings between consecutive layers.
pub fn count_crossings(layout: &HierarchicalLayout) -> usize {
    let mut slot: IndexMap<usize, (usize, usize)> = IndexMap::new();
    for (depth, row) in layout.layers.iter().enumerate() {
        for (i, id) in row.iter().enumerate() {
            if let Some(index) = layout.layer_of.get_index_of(id) {
                slot.insert(index, (depth, i));
            }
        }
    }
    let spans: Vec<(usize, usize, usize)> = layout
        .dag_edges
        .iter()
        .filter_map(|(s, t)| {
            let (ls, ps) = *slot.get(s)?;
            let (lt, pt) = *slot.get(t)?;
            (lt == ls + 1).then_some((ls, ps, pt))
        })
        .collect();
    let mut crossings = 0;
    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            if a.0 == b.0 && (a.1 < b.1 && a.2 > b.2 || a.1 > b.1 && a.2 < b.2) {
                crossings += 1;
            }
        }
    }
    crossings
}
