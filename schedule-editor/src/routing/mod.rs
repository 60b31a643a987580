//! Least-cost path search between network nodes.
//!
//! The editor treats routing as an oracle behind the [`PathFinder`] trait.
//! Each transport mode is assigned one router; modes whose routes use the
//! same set of network modes share an instance.

mod network_router;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{LinkId, Network, NodeId, TransitSchedule, TransportMode};

pub use network_router::NetworkRouter;

/// A path through the network as found by a router.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Links between the start and end node, in travel order.
    pub links: Vec<LinkId>,
    /// Total cost of the links.
    pub cost: f64,
}

impl Path {
    /// The path from a node to itself.
    pub fn empty() -> Self {
        Self {
            links: Vec::new(),
            cost: 0.0,
        }
    }
}

/// Trait for least-cost path search.
///
/// This abstraction allows the rewriter to be tested with canned paths.
pub trait PathFinder {
    /// Find the least-cost path from `from` to `to`.
    ///
    /// Returns `None` if `to` is unreachable. A path from a node to itself
    /// has no links.
    fn least_cost_path(&self, from: &NodeId, to: &NodeId) -> Option<Path>;
}

/// Router per transport mode.
#[derive(Clone, Default)]
pub struct RouterAssignment {
    routers: HashMap<TransportMode, Arc<dyn PathFinder>>,
}

impl RouterAssignment {
    /// Create an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `router` to `mode`, replacing any previous assignment.
    pub fn insert(&mut self, mode: TransportMode, router: Arc<dyn PathFinder>) {
        self.routers.insert(mode, router);
    }

    /// The router for `mode`, if one is assigned.
    pub fn get(&self, mode: &TransportMode) -> Option<&dyn PathFinder> {
        self.routers.get(mode).map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    /// Infer routers from the schedule's transport modes and the network
    /// modes their routes actually use.
    ///
    /// Each schedule mode is routed on every link that allows any network
    /// mode seen on that mode's current link sequences. One
    /// [`NetworkRouter`] is built per distinct set of network modes.
    pub fn infer(schedule: &TransitSchedule, network: &Network) -> Self {
        info!("inferring routers from schedule transport modes and used network modes");

        let mut mode_assignments: BTreeMap<TransportMode, BTreeSet<TransportMode>> = BTreeMap::new();
        for (route_ref, route) in schedule.routes() {
            let used = mode_assignments
                .entry(route.transport_mode.clone())
                .or_default();
            for link_id in &route.links {
                match network.link(link_id) {
                    Some(link) => used.extend(link.allowed_modes.iter().cloned()),
                    None => debug!(route = %route_ref, link = %link_id, "route uses unknown link"),
                }
            }
        }

        let mut shared: HashMap<BTreeSet<TransportMode>, Arc<dyn PathFinder>> = HashMap::new();
        let mut assignment = Self::new();
        for (mode, network_modes) in mode_assignments {
            let router = shared
                .entry(network_modes.clone())
                .or_insert_with(|| {
                    let router: Arc<dyn PathFinder> =
                        Arc::new(NetworkRouter::new(network, network_modes.clone()));
                    router
                })
                .clone();
            debug!(mode = %mode, network_modes = ?network_modes, "assigned router");
            assignment.insert(mode, router);
        }

        info!(
            modes = assignment.len(),
            routers = shared.len(),
            "router inference complete"
        );
        assignment
    }
}

impl fmt::Debug for RouterAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modes: Vec<&TransportMode> = self.routers.keys().collect();
        modes.sort();
        f.debug_struct("RouterAssignment")
            .field("modes", &modes)
            .finish()
    }
}
