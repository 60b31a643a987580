//! Mode-restricted Dijkstra router over the network.

use std::collections::{BTreeSet, HashMap};

use pathfinding::prelude::dijkstra;
use tracing::trace;

use super::{Path, PathFinder};
use crate::domain::{LinkId, Network, NodeId, TransportMode};

/// Outgoing link in the routing graph.
#[derive(Debug, Clone)]
struct Edge {
    link: LinkId,
    to: NodeId,
    length: f64,
    cost: u64,
}

/// Least-cost router on the links that allow a given set of modes.
///
/// Link length is the cost. The graph is copied out of the network at
/// construction time, so the router does not borrow the network.
#[derive(Debug, Clone)]
pub struct NetworkRouter {
    modes: BTreeSet<TransportMode>,
    adjacency: HashMap<NodeId, Vec<Edge>>,
}

impl NetworkRouter {
    /// Build a router over every link allowing any of `modes`.
    pub fn new(network: &Network, modes: BTreeSet<TransportMode>) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<Edge>> = HashMap::new();
        for link in network.links().filter(|l| l.allows_any(&modes)) {
            adjacency.entry(link.from.clone()).or_default().push(Edge {
                link: link.id.clone(),
                to: link.to.clone(),
                length: link.length,
                cost: cost_of(link.length),
            });
        }
        // Network iteration order is arbitrary; keep tie-breaking stable
        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| a.link.cmp(&b.link));
        }
        Self { modes, adjacency }
    }

    /// The network modes this router may use.
    pub fn modes(&self) -> &BTreeSet<TransportMode> {
        &self.modes
    }

    fn edges(&self, node: &NodeId) -> &[Edge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cheapest link from `from` directly to `to`.
    fn cheapest_edge(&self, from: &NodeId, to: &NodeId) -> Option<&Edge> {
        self.edges(from)
            .iter()
            .filter(|e| &e.to == to)
            .min_by_key(|e| e.cost)
    }
}

impl PathFinder for NetworkRouter {
    fn least_cost_path(&self, from: &NodeId, to: &NodeId) -> Option<Path> {
        if from == to {
            return Some(Path::empty());
        }

        let (nodes, _) = dijkstra(
            from,
            |node| {
                self.edges(node)
                    .iter()
                    .map(|e| (e.to.clone(), e.cost))
                    .collect::<Vec<_>>()
            },
            |node| node == to,
        )?;

        let mut path = Path::empty();
        for pair in nodes.windows(2) {
            let edge = self.cheapest_edge(&pair[0], &pair[1])?;
            path.links.push(edge.link.clone());
            path.cost += edge.length;
        }

        trace!(
            from = %from,
            to = %to,
            links = path.links.len(),
            cost = path.cost,
            "least cost path"
        );
        Some(path)
    }
}

/// Upper bound on the cost of one link, so path sums cannot overflow.
const MAX_LINK_COST: u64 = u64::MAX / 1024;

/// Integer routing cost: length in centimetres.
fn cost_of(length: f64) -> u64 {
    ((length.max(0.0) * 100.0).round() as u64).min(MAX_LINK_COST)
}
