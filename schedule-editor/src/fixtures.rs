//! Test scenarios and fake routers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    Coord, LineId, Link, LinkId, Network, Node, NodeId, ParentId, RouteId, RouteRef, StopFacility,
    StopFacilityId, TransitLine, TransitRoute, TransitRouteStop, TransitSchedule, TransportMode,
};
use crate::routing::{Path, PathFinder, RouterAssignment};

pub fn link_id(s: &str) -> LinkId {
    LinkId::parse(s).unwrap()
}

pub fn node_id(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

pub fn facility_id(s: &str) -> StopFacilityId {
    StopFacilityId::parse(s).unwrap()
}

pub fn parent_id(s: &str) -> ParentId {
    ParentId::parse(s).unwrap()
}

pub fn links(ids: &[&str]) -> Vec<LinkId> {
    ids.iter().map(|l| link_id(l)).collect()
}

pub fn route_ref(line: &str, route: &str) -> RouteRef {
    RouteRef::new(LineId::parse(line).unwrap(), RouteId::parse(route).unwrap())
}

pub fn bus() -> TransportMode {
    TransportMode::parse("bus").unwrap()
}

/// Builder for a network plus schedule.
#[derive(Default)]
pub struct ScenarioBuilder {
    network: Network,
    schedule: TransitSchedule,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bus link of length 10, creating its end nodes as needed.
    pub fn link(self, id: &str, from: &str, to: &str) -> Self {
        self.link_with_modes(id, from, to, &["bus"])
    }

    /// Add a link of length 10 allowing `modes`.
    pub fn link_with_modes(mut self, id: &str, from: &str, to: &str, modes: &[&str]) -> Self {
        for n in [from, to] {
            if self.network.node(&node_id(n)).is_none() {
                self.network.add_node(Node {
                    id: node_id(n),
                    coord: Coord::new(0.0, 0.0),
                });
            }
        }
        self.network
            .add_link(Link {
                id: link_id(id),
                from: node_id(from),
                to: node_id(to),
                length: 10.0,
                allowed_modes: modes.iter().map(|m| TransportMode::parse(m).unwrap()).collect(),
            })
            .unwrap();
        self
    }

    /// Add a facility. `id` is either `parent` or `parent.link:L`; parent
    /// facilities take `link` as their governing link.
    pub fn facility(mut self, id: &str, link: Option<&str>) -> Self {
        let facility = StopFacility::new(
            facility_id(id),
            format!("Stop {id}"),
            Coord::new(0.0, 0.0),
            link.map(link_id),
        )
        .unwrap();
        self.schedule.add_facility(facility).unwrap();
        self
    }

    /// Add the child facility `parent.link:link`.
    pub fn child(self, parent: &str, link: &str) -> Self {
        let id = format!("{parent}.link:{link}");
        self.facility(&id, Some(link))
    }

    /// Add a bus route, creating its line as needed.
    pub fn route(mut self, line: &str, route: &str, stops: &[&str], route_links: &[&str]) -> Self {
        let line_id = LineId::parse(line).unwrap();
        if self.schedule.line(&line_id).is_none() {
            self.schedule.add_line(TransitLine::new(line_id.clone())).unwrap();
        }
        let mut r = TransitRoute::new(RouteId::parse(route).unwrap(), bus());
        r.stops = stops
            .iter()
            .map(|s| TransitRouteStop::new(facility_id(s)))
            .collect();
        r.links = links(route_links);
        self.schedule.line_mut(&line_id).unwrap().add_route(r).unwrap();
        self
    }

    pub fn build(self) -> (TransitSchedule, Network) {
        (self.schedule, self.network)
    }
}

/// Corridor network with one route `L1/r1`:
///
/// ```text
/// n0 -A-> n1 -m1-> n2 -B-> n3 -m2-> n4 -C-> n5
///          \               ^  (B2: n2 -> n3)
///           p1 -> n6 -X-> n7 -p2 -> n2
/// n9 -Z-> n10 (isolated)
/// ```
///
/// Stops `s1@A, s2@B, s3@C`, links `[A, m1, B, m2, C]`. Child facility
/// `s2.link:B2` exists but is unused.
pub fn corridor() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .link("A", "n0", "n1")
        .link("m1", "n1", "n2")
        .link("B", "n2", "n3")
        .link("B2", "n2", "n3")
        .link("m2", "n3", "n4")
        .link("C", "n4", "n5")
        .link("p1", "n1", "n6")
        .link("X", "n6", "n7")
        .link("p2", "n7", "n2")
        .link("Z", "n9", "n10")
        .child("s1", "A")
        .child("s2", "B")
        .child("s2", "B2")
        .child("s3", "C")
        .route(
            "L1",
            "r1",
            &["s1.link:A", "s2.link:B", "s3.link:C"],
            &["A", "m1", "B", "m2", "C"],
        )
}

/// Router that answers from a fixed table; unknown pairs are unreachable.
#[derive(Default)]
pub struct FixedPaths {
    paths: HashMap<(NodeId, NodeId), Vec<LinkId>>,
}

impl FixedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, from: &str, to: &str, path: &[&str]) -> Self {
        self.paths.insert((node_id(from), node_id(to)), links(path));
        self
    }
}

impl PathFinder for FixedPaths {
    fn least_cost_path(&self, from: &NodeId, to: &NodeId) -> Option<Path> {
        if from == to {
            return Some(Path::empty());
        }
        self.paths.get(&(from.clone(), to.clone())).map(|links| Path {
            links: links.clone(),
            cost: links.len() as f64,
        })
    }
}

/// Assign `router` to the bus mode.
pub fn bus_routers(router: impl PathFinder + 'static) -> RouterAssignment {
    let mut routers = RouterAssignment::new();
    routers.insert(bus(), Arc::new(router));
    routers
}
