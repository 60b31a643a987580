//! Route geometry rewriting.
//!
//! Three algorithms keep a route's link sequence consistent with the network
//! and with its stops' governing links:
//!
//! - [`RouteRewriter::reroute_via_link`] replaces the segment that passes a
//!   given link with one that passes another link instead.
//! - [`RouteRewriter::rebuild_segment`] splices new paths between two
//!   consecutive stops through a via link.
//! - [`RouteRewriter::refresh`] regenerates the whole sequence from the stop
//!   list.
//!
//! All of them compute a new sequence without touching the route. Callers
//! commit the result, so a failed rewrite never leaves a partial splice.

use tracing::{debug, warn};

use crate::config::MissingPathPolicy;
use crate::domain::{Link, LinkId, Network, NodeId, RouteRef, TransitRoute, TransitRouteStop};
use crate::error::{EditError, NotFound};
use crate::registry::StopFacilityRegistry;
use crate::routing::{PathFinder, RouterAssignment};

/// Result of a reroute request.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// The route does not pass the link; nothing to do.
    Unchanged,
    /// The new link sequence.
    Rerouted(Vec<LinkId>),
}

impl Rewrite {
    /// Commit the new sequence to `route`. Returns true if the route changed.
    pub fn apply_to(self, route: &mut TransitRoute) -> bool {
        match self {
            Rewrite::Unchanged => false,
            Rewrite::Rerouted(links) => {
                route.links = links;
                true
            }
        }
    }
}

/// Computes new link sequences for routes.
pub struct RouteRewriter<'a> {
    network: &'a Network,
    routers: &'a RouterAssignment,
    facilities: &'a StopFacilityRegistry,
    missing_path: MissingPathPolicy,
}

impl<'a> RouteRewriter<'a> {
    /// Create a rewriter over the given network, routers and facility table.
    pub fn new(
        network: &'a Network,
        routers: &'a RouterAssignment,
        facilities: &'a StopFacilityRegistry,
        missing_path: MissingPathPolicy,
    ) -> Self {
        Self {
            network,
            routers,
            facilities,
            missing_path,
        }
    }

    /// Reroute the segment of `route` that passes `old` so it passes `via`.
    ///
    /// The segment is the one following the last stop passed before `old`.
    /// `old` must not be the governing link of any stop of the route: moving
    /// it would silently disconnect that stop.
    pub fn reroute_via_link(
        &self,
        at: &RouteRef,
        route: &TransitRoute,
        old: &LinkId,
        via: &LinkId,
    ) -> Result<Rewrite, EditError> {
        let reference_links = route
            .stops
            .iter()
            .map(|stop| self.governing_link(at, stop))
            .collect::<Result<Vec<_>, _>>()?;

        if reference_links.contains(&old) {
            return Err(EditError::invalid(
                at,
                format!("link {old} is referenced by a stop facility, change the stop's reference link instead"),
            ));
        }
        self.link(via)?;

        let Some(old_pos) = route.links.iter().position(|l| l == old) else {
            warn!(route = %at, link = %old, "link not on route, nothing to reroute");
            return Ok(Rewrite::Unchanged);
        };

        let from = self
            .match_stops(at, route)?
            .iter()
            .rposition(|&pos| pos < old_pos)
            .ok_or_else(|| EditError::invalid(at, format!("link {old} precedes the first stop")))?;
        self.rebuild_segment(at, route, from, via).map(Rewrite::Rerouted)
    }

    /// Rebuild the segment after stop `from_stop` so that it passes `via`.
    ///
    /// The links up to the stop's governing link and from the next stop's
    /// governing link onwards are kept verbatim; only the middle is routed.
    pub fn rebuild_segment(
        &self,
        at: &RouteRef,
        route: &TransitRoute,
        from_stop: usize,
        via: &LinkId,
    ) -> Result<Vec<LinkId>, EditError> {
        let to_stop = from_stop + 1;
        if to_stop >= route.stops.len() {
            return Err(EditError::OutOfRange {
                route: at.clone(),
                index: from_stop,
            });
        }

        let cut_from = self.link(self.governing_link(at, &route.stops[from_stop])?)?;
        let cut_to = self.link(self.governing_link(at, &route.stops[to_stop])?)?;
        let via_link = self.link(via)?;

        let positions = self.stop_positions(at, route, to_stop + 1)?;
        let before_cut = &route.links[..=positions[from_stop]];
        let after_cut = &route.links[positions[to_stop]..];

        let router = self.router(at, route)?;
        let path1 = self.path(at, router, &cut_from.to, &via_link.from)?;
        let path2 = self.path(at, router, &via_link.to, &cut_to.from)?;

        let mut links = Vec::with_capacity(
            before_cut.len() + path1.len() + 1 + path2.len() + after_cut.len(),
        );
        links.extend_from_slice(before_cut);
        links.extend(path1);
        links.push(via.clone());
        links.extend(path2);
        links.extend_from_slice(after_cut);

        debug!(
            route = %at,
            from_stop,
            via = %via,
            links = links.len(),
            "rebuilt segment"
        );
        Ok(links)
    }

    /// Regenerate the link sequence of `route` from its stops.
    ///
    /// Every pair of consecutive stops is routed from the end of one
    /// governing link to the start of the next, so two stops on the same
    /// link make the route loop back over it.
    pub fn refresh(&self, at: &RouteRef, route: &TransitRoute) -> Result<Vec<LinkId>, EditError> {
        let Some((first, rest)) = route.stops.split_first() else {
            return Ok(Vec::new());
        };
        let router = self.router(at, route)?;

        let mut current = self.link(self.governing_link(at, first)?)?;
        let mut links = vec![current.id.clone()];

        for stop in rest {
            let next = self.link(self.governing_link(at, stop)?)?;

            match router.least_cost_path(&current.to, &next.from) {
                Some(path) => links.extend(path.links),
                None => match self.missing_path {
                    MissingPathPolicy::Fail => {
                        return Err(EditError::RouteUnreachable {
                            route: at.clone(),
                            from: current.to.clone(),
                            to: next.from.clone(),
                        });
                    }
                    MissingPathPolicy::LinkOnly => {
                        warn!(
                            route = %at,
                            from = %current.id,
                            to = %next.id,
                            "no path between stops, link sequence has a gap"
                        );
                    }
                },
            }

            links.push(next.id.clone());
            current = next;
        }

        debug!(route = %at, links = links.len(), "refreshed route");
        Ok(links)
    }

    /// Governing link of a stop's facility.
    fn governing_link(
        &self,
        at: &RouteRef,
        stop: &TransitRouteStop,
    ) -> Result<&'a LinkId, EditError> {
        let facility = self
            .facilities
            .get(&stop.facility)
            .ok_or_else(|| NotFound::Facility(stop.facility.clone()))?;
        facility.link().ok_or_else(|| EditError::UnboundStop {
            route: at.clone(),
            stop: stop.facility.clone(),
        })
    }

    fn link(&self, id: &LinkId) -> Result<&'a Link, EditError> {
        self.network
            .link(id)
            .ok_or_else(|| NotFound::Link(id.clone()).into())
    }

    fn router(&self, at: &RouteRef, route: &TransitRoute) -> Result<&'a dyn PathFinder, EditError> {
        self.routers.get(&route.transport_mode).ok_or_else(|| {
            debug!(route = %at, mode = %route.transport_mode, "no router assigned");
            NotFound::Router(route.transport_mode.clone()).into()
        })
    }

    fn path(
        &self,
        at: &RouteRef,
        router: &dyn PathFinder,
        from: &NodeId,
        to: &NodeId,
    ) -> Result<Vec<LinkId>, EditError> {
        match router.least_cost_path(from, to) {
            Some(path) => Ok(path.links),
            None => {
                debug!(route = %at, from = %from, to = %to, "router found no path");
                Err(EditError::RouteUnreachable {
                    route: at.clone(),
                    from: from.clone(),
                    to: to.clone(),
                })
            }
        }
    }

    /// Position in the link sequence of each of the first `count` stops.
    fn stop_positions(
        &self,
        at: &RouteRef,
        route: &TransitRoute,
        count: usize,
    ) -> Result<Vec<usize>, EditError> {
        let mut positions = self.match_stops(at, route)?;
        if positions.len() < count {
            let stop = &route.stops[positions.len()];
            let link = self.governing_link(at, stop)?;
            return Err(EditError::invalid(
                at,
                format!(
                    "link sequence does not pass link {link} of stop {} in order",
                    stop.facility
                ),
            ));
        }
        positions.truncate(count);
        Ok(positions)
    }

    /// Positions of the leading stops that the link sequence passes in order.
    ///
    /// Stops are matched greedily in travel order. A stop on the same link as
    /// its predecessor takes the next traversal of that link if the route
    /// loops back over it, and otherwise shares its predecessor's position.
    fn match_stops(&self, at: &RouteRef, route: &TransitRoute) -> Result<Vec<usize>, EditError> {
        let find = |link: &LinkId, from: usize| {
            route.links[from..]
                .iter()
                .position(|l| l == link)
                .map(|p| p + from)
        };

        let mut positions = Vec::with_capacity(route.stops.len());
        let mut cursor = 0;
        let mut previous: Option<&LinkId> = None;
        for stop in &route.stops {
            let link = self.governing_link(at, stop)?;
            let pos = if previous == Some(link) {
                find(link, cursor + 1).or(Some(cursor))
            } else {
                find(link, cursor)
            };
            let Some(pos) = pos else {
                break;
            };
            positions.push(pos);
            cursor = pos;
            previous = Some(link);
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransitSchedule;
    use crate::fixtures::*;
    use crate::routing::NetworkRouter;

    fn network_router(network: &Network) -> RouterAssignment {
        bus_routers(NetworkRouter::new(network, [bus()].into()))
    }

    fn r1(schedule: &TransitSchedule) -> (RouteRef, TransitRoute) {
        let at = route_ref("L1", "r1");
        let route = schedule.route(&at).unwrap().clone();
        (at, route)
    }

    #[test]
    fn rebuild_segment_splices_paths() {
        let (schedule, network) = corridor().build();
        let routers = bus_routers(
            FixedPaths::new()
                .path("n1", "n6", &["p1"])
                .path("n7", "n2", &["p2"]),
        );
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let new_links = rewriter.rebuild_segment(&at, &route, 0, &link_id("X")).unwrap();
        assert_eq!(new_links, links(&["A", "p1", "X", "p2", "B", "m2", "C"]));
        assert!(network.is_contiguous(&new_links));
    }

    #[test]
    fn rebuild_last_stop_is_out_of_range() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let err = rewriter.rebuild_segment(&at, &route, 2, &link_id("X")).unwrap_err();
        assert_eq!(err, EditError::OutOfRange { route: at.clone(), index: 2 });

        let err = rewriter.rebuild_segment(&at, &route, 7, &link_id("X")).unwrap_err();
        assert!(matches!(err, EditError::OutOfRange { index: 7, .. }));
    }

    #[test]
    fn rebuild_unknown_via_link() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let err = rewriter.rebuild_segment(&at, &route, 0, &link_id("nope")).unwrap_err();
        assert_eq!(err, EditError::NotFound(NotFound::Link(link_id("nope"))));
    }

    #[test]
    fn rebuild_unreachable_via_link() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let err = rewriter.rebuild_segment(&at, &route, 0, &link_id("Z")).unwrap_err();
        assert_eq!(
            err,
            EditError::RouteUnreachable {
                route: at,
                from: node_id("n1"),
                to: node_id("n9"),
            }
        );
    }

    #[test]
    fn rebuild_second_path_unreachable() {
        let (schedule, network) = corridor().build();
        let routers = bus_routers(FixedPaths::new().path("n1", "n6", &["p1"]));
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let err = rewriter.rebuild_segment(&at, &route, 0, &link_id("X")).unwrap_err();
        assert!(matches!(err, EditError::RouteUnreachable { ref to, .. } if to == &node_id("n2")));
    }

    #[test]
    fn rebuild_requires_route_to_serve_stops() {
        let (schedule, network) = corridor()
            .route("L1", "broken", &["s1.link:A", "s2.link:B"], &["A", "p1", "X"])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "broken");
        let route = schedule.route(&at).unwrap();

        let err = rewriter.rebuild_segment(&at, route, 0, &link_id("X")).unwrap_err();
        assert!(matches!(err, EditError::InvalidOperation { .. }));
    }

    #[test]
    fn reroute_via_link_rebuilds_segment_containing_old_link() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let rewrite = rewriter
            .reroute_via_link(&at, &route, &link_id("m1"), &link_id("X"))
            .unwrap();
        assert_eq!(
            rewrite,
            Rewrite::Rerouted(links(&["A", "p1", "X", "p2", "B", "m2", "C"]))
        );
    }

    #[test]
    fn reroute_via_link_in_later_segment() {
        // Route the second segment through a detour n3 -D1-> n8 -D2-> n4
        let (schedule, network) = corridor()
            .link("D1", "n3", "n8")
            .link("D2", "n8", "n4")
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let rewrite = rewriter
            .reroute_via_link(&at, &route, &link_id("m2"), &link_id("D1"))
            .unwrap();
        assert_eq!(
            rewrite,
            Rewrite::Rerouted(links(&["A", "m1", "B", "D1", "D2", "C"]))
        );
    }

    #[test]
    fn reroute_rejects_reference_link() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        for reference in ["A", "B", "C"] {
            let err = rewriter
                .reroute_via_link(&at, &route, &link_id(reference), &link_id("X"))
                .unwrap_err();
            assert!(matches!(err, EditError::InvalidOperation { .. }));
        }
    }

    #[test]
    fn reroute_absent_link_is_noop() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, mut route) = r1(&schedule);
        let before = route.links.clone();

        let rewrite = rewriter
            .reroute_via_link(&at, &route, &link_id("p1"), &link_id("X"))
            .unwrap();
        assert_eq!(rewrite, Rewrite::Unchanged);
        assert!(!rewrite.apply_to(&mut route));
        assert_eq!(route.links, before);
    }

    #[test]
    fn reroute_link_before_first_stop() {
        let (schedule, network) = corridor()
            .link("pre", "nx", "n0")
            .route("L1", "r2", &["s1.link:A", "s2.link:B"], &["pre", "A", "m1", "B"])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");
        let route = schedule.route(&at).unwrap();

        let err = rewriter
            .reroute_via_link(&at, route, &link_id("pre"), &link_id("X"))
            .unwrap_err();
        assert!(matches!(err, EditError::InvalidOperation { .. }));
    }

    #[test]
    fn reroute_after_last_stop_is_out_of_range() {
        let (schedule, network) = corridor()
            .link("post", "n5", "n11")
            .route("L1", "r2", &["s1.link:A", "s3.link:C"], &["A", "m1", "B", "m2", "C", "post"])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");
        let route = schedule.route(&at).unwrap();

        let err = rewriter
            .reroute_via_link(&at, route, &link_id("post"), &link_id("X"))
            .unwrap_err();
        assert!(matches!(err, EditError::OutOfRange { index: 1, .. }));
    }

    #[test]
    fn refresh_rebuilds_from_stops() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, mut route) = r1(&schedule);
        route.links.clear();

        let links_after = rewriter.refresh(&at, &route).unwrap();
        assert_eq!(links_after, links(&["A", "m1", "B", "m2", "C"]));
    }

    #[test]
    fn refresh_follows_changed_facility() {
        let (schedule, network) = corridor().build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, mut route) = r1(&schedule);
        route.stops[1].facility = facility_id("s2.link:B2");

        let links_after = rewriter.refresh(&at, &route).unwrap();
        assert_eq!(links_after, links(&["A", "m1", "B2", "m2", "C"]));
    }

    #[test]
    fn refresh_loops_back_between_stops_on_same_link() {
        let (schedule, network) = corridor()
            .link("back", "n3", "n2")
            .facility("s2b", Some("B"))
            .route("L1", "r2", &["s1.link:A", "s2.link:B", "s2b", "s3.link:C"], &[])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");

        let links_after = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap();
        assert_eq!(links_after, links(&["A", "m1", "B", "back", "B", "m2", "C"]));
        assert!(network.is_contiguous(&links_after));
    }

    #[test]
    fn rebuild_after_loop_keeps_the_loop() {
        let (schedule, network) = corridor()
            .link("back", "n3", "n2")
            .facility("s2b", Some("B"))
            .route(
                "L1",
                "r2",
                &["s1.link:A", "s2.link:B", "s2b", "s3.link:C"],
                &["A", "m1", "B", "back", "B", "m2", "C"],
            )
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");
        let route = schedule.route(&at).unwrap();

        let new_links = rewriter.rebuild_segment(&at, route, 2, &link_id("m2")).unwrap();
        assert_eq!(new_links, route.links);
    }

    #[test]
    fn reroute_loop_between_stops_on_same_link() {
        let (schedule, network) = corridor()
            .link("back", "n3", "n2")
            .link("D1", "n3", "n8")
            .link("D2", "n8", "n2")
            .facility("s2b", Some("B"))
            .route(
                "L1",
                "r2",
                &["s1.link:A", "s2.link:B", "s2b", "s3.link:C"],
                &["A", "m1", "B", "back", "B", "m2", "C"],
            )
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");
        let route = schedule.route(&at).unwrap();

        let rewrite = rewriter
            .reroute_via_link(&at, route, &link_id("back"), &link_id("D1"))
            .unwrap();
        assert_eq!(
            rewrite,
            Rewrite::Rerouted(links(&["A", "m1", "B", "D1", "D2", "B", "m2", "C"]))
        );
    }

    #[test]
    fn refresh_stops_on_same_link_without_loop() {
        let (schedule, network) = corridor()
            .facility("s2b", Some("B"))
            .route("L1", "r2", &["s1.link:A", "s2.link:B", "s2b", "s3.link:C"], &[])
            .build();
        let routers = network_router(&network);
        let at = route_ref("L1", "r2");

        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let err = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap_err();
        assert_eq!(
            err,
            EditError::RouteUnreachable {
                route: at.clone(),
                from: node_id("n3"),
                to: node_id("n2"),
            }
        );

        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::LinkOnly);
        let links_after = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap();
        assert_eq!(links_after, links(&["A", "m1", "B", "B", "m2", "C"]));
    }

    #[test]
    fn refresh_unbound_stop() {
        let (schedule, network) = corridor()
            .facility("floating", None)
            .route("L1", "r2", &["s1.link:A", "floating"], &[])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");

        let err = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap_err();
        assert_eq!(
            err,
            EditError::UnboundStop {
                route: at,
                stop: facility_id("floating"),
            }
        );
    }

    #[test]
    fn refresh_missing_path_fails_by_default() {
        let (schedule, network) = corridor()
            .child("s9", "Z")
            .route("L1", "r2", &["s1.link:A", "s9.link:Z"], &[])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");

        let err = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap_err();
        assert!(matches!(err, EditError::RouteUnreachable { .. }));
    }

    #[test]
    fn refresh_missing_path_link_only() {
        let (schedule, network) = corridor()
            .child("s9", "Z")
            .route("L1", "r2", &["s1.link:A", "s9.link:Z"], &[])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::LinkOnly);
        let at = route_ref("L1", "r2");

        let links_after = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap();
        assert_eq!(links_after, links(&["A", "Z"]));
    }

    #[test]
    fn refresh_without_router() {
        let (schedule, network) = corridor().build();
        let routers = RouterAssignment::new();
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let (at, route) = r1(&schedule);

        let err = rewriter.refresh(&at, &route).unwrap_err();
        assert_eq!(err, EditError::NotFound(NotFound::Router(bus())));
    }

    #[test]
    fn refresh_unknown_facility() {
        let (schedule, network) = corridor()
            .route("L1", "r2", &["s1.link:A", "ghost"], &[])
            .build();
        let routers = network_router(&network);
        let rewriter = RouteRewriter::new(&network, &routers, schedule.facilities(), MissingPathPolicy::Fail);
        let at = route_ref("L1", "r2");

        let err = rewriter.refresh(&at, schedule.route(&at).unwrap()).unwrap_err();
        assert_eq!(err, EditError::NotFound(NotFound::Facility(facility_id("ghost"))));
    }
}
