//! Command-driven schedule editing.
//!
//! The [`ScheduleEditor`] owns a schedule together with the network and
//! routers it is edited against. Every edit either commits a consistent
//! result or fails and leaves the schedule untouched; edits that touch
//! several routes compute all of them before committing any.

mod command;


use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::domain::{LinkId, Network, ParentId, RouteRef, StopFacilityId, TransitRoute, TransitSchedule};
use crate::error::{EditError, NotFound};
use crate::registry::StopFacilityRegistry;
use crate::rewrite::RouteRewriter;
use crate::routing::RouterAssignment;

pub use command::{
    ALL_TRANSIT_ROUTES_ON_LINK, CHANGE_REF_LINK, COMMENT_START, Command, CommandParseError,
    REROUTE_VIA_LINK,
};

/// Routes changed by a successful edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub changed: Vec<RouteRef>,
}

impl EditOutcome {
    /// Returns true if the edit did not change any route.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// A record of a batch that could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailure {
    /// 1-based record number in the batch input.
    pub record_number: usize,
    pub record: String,
    pub error: EditError,
}

/// Result of applying a batch of command records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Commands that succeeded.
    pub applied: usize,
    /// Blank records and comments.
    pub skipped: usize,
    pub failures: Vec<CommandFailure>,
}

impl BatchReport {
    /// Returns true if no command failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Allow each route's transport mode on every link the route uses.
///
/// Edits can move a route onto links that do not yet allow its mode; this
/// brings the network's link modes back in line with the schedule. Returns
/// the number of links that gained a mode.
pub fn assign_schedule_modes_to_links(schedule: &TransitSchedule, network: &mut Network) -> usize {
    let mut updated = 0;
    for (at, route) in schedule.routes() {
        for link_id in &route.links {
            let Some(link) = network.link_mut(link_id) else {
                debug!(route = %at, link = %link_id, "route uses unknown link");
                continue;
            };
            if link.allowed_modes.insert(route.transport_mode.clone()) {
                debug!(link = %link_id, mode = %route.transport_mode, "allowed mode on link");
                updated += 1;
            }
        }
    }
    info!(links = updated, "assigned schedule modes to links");
    updated
}

/// Applies edit commands to a transit schedule.
pub struct ScheduleEditor {
    schedule: TransitSchedule,
    network: Network,
    routers: RouterAssignment,
    config: EditorConfig,
}

impl ScheduleEditor {
    /// Create an editor with an explicit router per transport mode.
    pub fn new(
        schedule: TransitSchedule,
        network: Network,
        routers: RouterAssignment,
        config: EditorConfig,
    ) -> Self {
        Self {
            schedule,
            network,
            routers,
            config,
        }
    }

    /// Create an editor with routers inferred from the schedule's modes.
    pub fn with_inferred_routers(
        schedule: TransitSchedule,
        network: Network,
        config: EditorConfig,
    ) -> Self {
        let routers = RouterAssignment::infer(&schedule, &network);
        Self::new(schedule, network, routers, config)
    }

    pub fn schedule(&self) -> &TransitSchedule {
        &self.schedule
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Hand the edited schedule back.
    pub fn into_schedule(self) -> TransitSchedule {
        self.schedule
    }

    /// Hand the edited schedule and the network back.
    pub fn into_parts(self) -> (TransitSchedule, Network) {
        (self.schedule, self.network)
    }

    /// Apply every record of `input`, one per line.
    ///
    /// A failing record is reported and does not stop later records.
    pub fn apply_batch(&mut self, input: &str) -> BatchReport {
        let mut report = BatchReport::default();

        for (idx, record) in input.lines().enumerate() {
            match self.apply_record(record) {
                Ok(None) => report.skipped += 1,
                Ok(Some(_)) => report.applied += 1,
                Err(error) => {
                    warn!(record = idx + 1, error = %error, "command failed");
                    report.failures.push(CommandFailure {
                        record_number: idx + 1,
                        record: record.to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failures.len(),
            "command batch complete"
        );
        report
    }

    /// Parse and apply one record. Returns `Ok(None)` for comments.
    pub fn apply_record(&mut self, record: &str) -> Result<Option<EditOutcome>, EditError> {
        match Command::parse(record, self.config.delimiter)? {
            Some(command) => self.apply_command(&command).map(Some),
            None => Ok(None),
        }
    }

    /// Apply one command.
    pub fn apply_command(&mut self, command: &Command) -> Result<EditOutcome, EditError> {
        debug!(command = %command, "applying command");
        match command {
            Command::RerouteViaLink {
                route,
                old_link,
                new_link,
            } => self.reroute_via_link(route, old_link, new_link),
            Command::ChangeRefLink { stop, new_link } => self.change_ref_link(stop, new_link),
            Command::ChangeRefLinkInRoute {
                route,
                parent,
                new_link,
            } => self.change_ref_link_in_route(route, parent, new_link),
            Command::ChangeRefLinkOnLink {
                link,
                parent,
                new_link,
            } => self.change_ref_link_on_link(link, parent, new_link),
        }
    }

    /// Reroute the segment of a route that passes `old_link` via `new_link`.
    ///
    /// A route that does not pass `old_link` is left as it is.
    pub fn reroute_via_link(
        &mut self,
        at: &RouteRef,
        old_link: &LinkId,
        new_link: &LinkId,
    ) -> Result<EditOutcome, EditError> {
        let rewrite = self
            .rewriter()
            .reroute_via_link(at, self.route(at)?, old_link, new_link)?;

        let route = self.route_mut(at)?;
        if rewrite.apply_to(route) {
            info!(route = %at, old = %old_link, via = %new_link, "rerouted via link");
            Ok(EditOutcome {
                changed: vec![at.clone()],
            })
        } else {
            Ok(EditOutcome::default())
        }
    }

    /// Replace `stop` with its sibling on `new_link` in every route.
    ///
    /// The sibling `parent.link:new_link` must already exist.
    pub fn change_ref_link(
        &mut self,
        stop: &StopFacilityId,
        new_link: &LinkId,
    ) -> Result<EditOutcome, EditError> {
        let facilities = self.schedule.facilities();
        if !facilities.contains(stop) {
            return Err(NotFound::Facility(stop.clone()).into());
        }
        let replace_with = facilities
            .get_or_create_child(stop.parent(), new_link)?
            .id()
            .clone();
        self.replace_stop_facility_everywhere(stop, &replace_with)
    }

    /// Replace the route's facility of `parent` with the child on `new_link`.
    pub fn change_ref_link_in_route(
        &mut self,
        at: &RouteRef,
        parent: &ParentId,
        new_link: &LinkId,
    ) -> Result<EditOutcome, EditError> {
        let route = self.route(at)?;
        let to_replace = StopFacilityRegistry::find_child_in_route(route, parent)
            .ok_or_else(|| NotFound::StopInRoute {
                route: at.clone(),
                parent: parent.clone(),
            })?
            .clone();
        let replace_with = self
            .schedule
            .facilities()
            .get_or_create_child(parent, new_link)?
            .id()
            .clone();
        self.replace_stop_facility_in_route(at, &to_replace, &replace_with)
    }

    /// Apply [`Self::change_ref_link_in_route`] to every route passing `link`
    /// that stops at `parent`.
    pub fn change_ref_link_on_link(
        &mut self,
        link: &LinkId,
        parent: &ParentId,
        new_link: &LinkId,
    ) -> Result<EditOutcome, EditError> {
        let replace_with = self
            .schedule
            .facilities()
            .get_or_create_child(parent, new_link)?
            .id()
            .clone();

        let mut staged = Vec::new();
        for at in self.transit_routes_on_link(link) {
            let route = self.route(&at)?;
            let Some(to_replace) = StopFacilityRegistry::find_child_in_route(route, parent) else {
                continue;
            };
            if let Some(candidate) = self.stage_substitution(&at, route, to_replace, &replace_with)? {
                staged.push((at, candidate));
            }
        }

        if staged.is_empty() {
            return Err(NotFound::RoutesOnLink(link.clone()).into());
        }
        Ok(self.commit(staged))
    }

    /// Replace `to_replace` with `replace_with` in one route and refresh it.
    pub fn replace_stop_facility_in_route(
        &mut self,
        at: &RouteRef,
        to_replace: &StopFacilityId,
        replace_with: &StopFacilityId,
    ) -> Result<EditOutcome, EditError> {
        self.require_facilities(to_replace, replace_with)?;
        let route = self.route(at)?;
        let candidate = self
            .stage_substitution(at, route, to_replace, replace_with)?
            .ok_or_else(|| NotFound::FacilityInRoute {
                route: at.clone(),
                facility: to_replace.clone(),
            })?;
        Ok(self.commit(vec![(at.clone(), candidate)]))
    }

    /// Replace `to_replace` with `replace_with` in every route that stops at
    /// it, refreshing each affected route.
    pub fn replace_stop_facility_everywhere(
        &mut self,
        to_replace: &StopFacilityId,
        replace_with: &StopFacilityId,
    ) -> Result<EditOutcome, EditError> {
        self.require_facilities(to_replace, replace_with)?;

        let mut staged = Vec::new();
        for (at, route) in self.schedule.routes() {
            if let Some(candidate) = self.stage_substitution(&at, route, to_replace, replace_with)? {
                staged.push((at, candidate));
            }
        }

        if staged.is_empty() {
            warn!(facility = %to_replace, "stop facility is not used by any transit route");
        }
        Ok(self.commit(staged))
    }

    /// Regenerate a route's link sequence from its stops.
    pub fn refresh_route(&mut self, at: &RouteRef) -> Result<EditOutcome, EditError> {
        let links = self.rewriter().refresh(at, self.route(at)?)?;
        self.route_mut(at)?.links = links;
        info!(route = %at, "refreshed route");
        Ok(EditOutcome {
            changed: vec![at.clone()],
        })
    }

    /// Refresh every route. Nothing is changed if any route fails.
    pub fn refresh_schedule(&mut self) -> Result<EditOutcome, EditError> {
        let rewriter = self.rewriter();
        let mut staged = Vec::new();
        for (at, route) in self.schedule.routes() {
            let mut candidate = route.clone();
            candidate.links = rewriter.refresh(&at, route)?;
            staged.push((at, candidate));
        }
        Ok(self.commit(staged))
    }

    /// Every route whose link sequence passes `link`.
    pub fn transit_routes_on_link(&self, link: &LinkId) -> Vec<RouteRef> {
        self.schedule
            .routes()
            .filter(|(_, route)| route.contains_link(link))
            .map(|(at, _)| at)
            .collect()
    }

    fn rewriter(&self) -> RouteRewriter<'_> {
        RouteRewriter::new(
            &self.network,
            &self.routers,
            self.schedule.facilities(),
            self.config.missing_path,
        )
    }

    fn route(&self, at: &RouteRef) -> Result<&TransitRoute, EditError> {
        let line = self
            .schedule
            .line(&at.line)
            .ok_or_else(|| NotFound::Line(at.line.clone()))?;
        line.route(&at.route).ok_or_else(|| {
            NotFound::Route {
                line: at.line.clone(),
                route: at.route.clone(),
            }
            .into()
        })
    }

    fn route_mut(&mut self, at: &RouteRef) -> Result<&mut TransitRoute, EditError> {
        let line = self
            .schedule
            .line_mut(&at.line)
            .ok_or_else(|| NotFound::Line(at.line.clone()))?;
        line.route_mut(&at.route).ok_or_else(|| {
            NotFound::Route {
                line: at.line.clone(),
                route: at.route.clone(),
            }
            .into()
        })
    }

    fn require_facilities(
        &self,
        to_replace: &StopFacilityId,
        replace_with: &StopFacilityId,
    ) -> Result<(), EditError> {
        for id in [to_replace, replace_with] {
            if !self.schedule.facilities().contains(id) {
                return Err(NotFound::Facility(id.clone()).into());
            }
        }
        Ok(())
    }

    /// The route with every stop at `to_replace` moved to `replace_with` and
    /// its links refreshed, or `None` if the route does not stop there.
    fn stage_substitution(
        &self,
        at: &RouteRef,
        route: &TransitRoute,
        to_replace: &StopFacilityId,
        replace_with: &StopFacilityId,
    ) -> Result<Option<TransitRoute>, EditError> {
        if !route.serves(to_replace) {
            return Ok(None);
        }

        let mut candidate = route.clone();
        for stop in candidate.stops.iter_mut().filter(|s| &s.facility == to_replace) {
            stop.facility = replace_with.clone();
        }
        candidate.links = self.rewriter().refresh(at, &candidate)?;

        debug!(
            route = %at,
            from = %to_replace,
            to = %replace_with,
            "staged stop facility substitution"
        );
        Ok(Some(candidate))
    }

    /// Replace staged routes in the schedule.
    fn commit(&mut self, staged: Vec<(RouteRef, TransitRoute)>) -> EditOutcome {
        let mut changed = Vec::with_capacity(staged.len());
        for (at, candidate) in staged {
            let slot = self
                .schedule
                .line_mut(&at.line)
                .and_then(|l| l.route_mut(&at.route));
            if let Some(slot) = slot {
                *slot = candidate;
                info!(route = %at, "updated transit route");
                changed.push(at);
            }
        }
        EditOutcome { changed }
    }
}
