//! Transit schedule: lines, routes and the stops they serve.
//!
//! Routes reference stop facilities by id only. Facilities live in the
//! schedule-wide [`StopFacilityRegistry`] and are resolved at use time, so a
//! facility replaced across the schedule never leaves a stale reference
//! behind.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::facility::{StopFacility, StopFacilityId};
use super::ids::{DuplicateId, LineId, LinkId, RouteId, TransportMode};
use crate::registry::StopFacilityRegistry;

/// One stop of a route in travel order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitRouteStop {
    pub facility: StopFacilityId,
    /// Seconds after route departure, if scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_offset: Option<u32>,
    /// Seconds after route departure, if scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_offset: Option<u32>,
}

impl TransitRouteStop {
    /// Create an unscheduled stop at `facility`.
    pub fn new(facility: StopFacilityId) -> Self {
        Self {
            facility,
            arrival_offset: None,
            departure_offset: None,
        }
    }
}

/// A stop pattern and the network path that serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitRoute {
    pub id: RouteId,
    pub transport_mode: TransportMode,
    pub stops: Vec<TransitRouteStop>,
    /// Link sequence through the network, in travel order.
    #[serde(default)]
    pub links: Vec<LinkId>,
}

impl TransitRoute {
    pub fn new(id: RouteId, transport_mode: TransportMode) -> Self {
        Self {
            id,
            transport_mode,
            stops: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Returns true if the link sequence passes `link`.
    pub fn contains_link(&self, link: &LinkId) -> bool {
        self.links.contains(link)
    }

    /// Index of the first stop served by `facility`.
    pub fn stop_index(&self, facility: &StopFacilityId) -> Option<usize> {
        self.stops.iter().position(|s| &s.facility == facility)
    }

    /// Returns true if any stop is served by `facility`.
    pub fn serves(&self, facility: &StopFacilityId) -> bool {
        self.stop_index(facility).is_some()
    }
}

/// A named collection of routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LineRecord", into = "LineRecord")]
pub struct TransitLine {
    pub id: LineId,
    routes: BTreeMap<RouteId, TransitRoute>,
}

impl TransitLine {
    pub fn new(id: LineId) -> Self {
        Self {
            id,
            routes: BTreeMap::new(),
        }
    }

    /// Add a route; route ids are unique within a line.
    pub fn add_route(&mut self, route: TransitRoute) -> Result<(), DuplicateId> {
        if self.routes.contains_key(&route.id) {
            return Err(DuplicateId {
                kind: "transit route",
                id: route.id.to_string(),
            });
        }
        self.routes.insert(route.id.clone(), route);
        Ok(())
    }

    pub fn route(&self, id: &RouteId) -> Option<&TransitRoute> {
        self.routes.get(id)
    }

    pub fn route_mut(&mut self, id: &RouteId) -> Option<&mut TransitRoute> {
        self.routes.get_mut(id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &TransitRoute> {
        self.routes.values()
    }
}

/// Address of a route within a schedule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteRef {
    pub line: LineId,
    pub route: RouteId,
}

impl RouteRef {
    pub fn new(line: LineId, route: RouteId) -> Self {
        Self { line, route }
    }
}

impl fmt::Display for RouteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.line, self.route)
    }
}

/// All transit lines plus the stop facility table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord", into = "ScheduleRecord")]
pub struct TransitSchedule {
    lines: BTreeMap<LineId, TransitLine>,
    facilities: StopFacilityRegistry,
}

impl TransitSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line; line ids are unique.
    pub fn add_line(&mut self, line: TransitLine) -> Result<(), DuplicateId> {
        if self.lines.contains_key(&line.id) {
            return Err(DuplicateId {
                kind: "transit line",
                id: line.id.to_string(),
            });
        }
        self.lines.insert(line.id.clone(), line);
        Ok(())
    }

    /// Add a stop facility to the facility table.
    pub fn add_facility(&mut self, facility: StopFacility) -> Result<(), DuplicateId> {
        self.facilities.insert(facility)
    }

    pub fn line(&self, id: &LineId) -> Option<&TransitLine> {
        self.lines.get(id)
    }

    pub fn line_mut(&mut self, id: &LineId) -> Option<&mut TransitLine> {
        self.lines.get_mut(id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &TransitLine> {
        self.lines.values()
    }

    pub fn route(&self, r: &RouteRef) -> Option<&TransitRoute> {
        self.lines.get(&r.line).and_then(|l| l.route(&r.route))
    }

    /// Every route with its address, in line then route id order.
    pub fn routes(&self) -> impl Iterator<Item = (RouteRef, &TransitRoute)> {
        self.lines.values().flat_map(|line| {
            line.routes()
                .map(move |route| (RouteRef::new(line.id.clone(), route.id.clone()), route))
        })
    }

    pub fn facilities(&self) -> &StopFacilityRegistry {
        &self.facilities
    }

    pub fn facilities_mut(&mut self) -> &mut StopFacilityRegistry {
        &mut self.facilities
    }
}

#[derive(Serialize, Deserialize)]
struct LineRecord {
    id: LineId,
    routes: Vec<TransitRoute>,
}

impl TryFrom<LineRecord> for TransitLine {
    type Error = DuplicateId;

    fn try_from(r: LineRecord) -> Result<Self, Self::Error> {
        let mut line = TransitLine::new(r.id);
        for route in r.routes {
            line.add_route(route)?;
        }
        Ok(line)
    }
}

impl From<TransitLine> for LineRecord {
    fn from(line: TransitLine) -> Self {
        LineRecord {
            id: line.id,
            routes: line.routes.into_values().collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ScheduleRecord {
    #[serde(default)]
    facilities: Vec<StopFacility>,
    #[serde(default)]
    lines: Vec<TransitLine>,
}

impl TryFrom<ScheduleRecord> for TransitSchedule {
    type Error = DuplicateId;

    fn try_from(r: ScheduleRecord) -> Result<Self, Self::Error> {
        let mut schedule = TransitSchedule::new();
        for facility in r.facilities {
            schedule.add_facility(facility)?;
        }
        for line in r.lines {
            schedule.add_line(line)?;
        }
        Ok(schedule)
    }
}

impl From<TransitSchedule> for ScheduleRecord {
    fn from(s: TransitSchedule) -> Self {
        ScheduleRecord {
            facilities: s.facilities.into_iter().collect(),
            lines: s.lines.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coord, ParentId};

    fn route(id: &str) -> TransitRoute {
        TransitRoute::new(RouteId::parse(id).unwrap(), TransportMode::parse("bus").unwrap())
    }

    fn line(id: &str) -> TransitLine {
        TransitLine::new(LineId::parse(id).unwrap())
    }

    #[test]
    fn duplicate_route_rejected() {
        let mut l = line("L1");
        l.add_route(route("r1")).unwrap();
        let err = l.add_route(route("r1")).unwrap_err();
        assert_eq!(err.to_string(), "duplicate transit route id: r1");
    }

    #[test]
    fn duplicate_line_rejected() {
        let mut s = TransitSchedule::new();
        s.add_line(line("L1")).unwrap();
        assert!(s.add_line(line("L1")).is_err());
        assert!(s.add_line(line("L2")).is_ok());
    }

    #[test]
    fn routes_iterate_in_id_order() {
        let mut s = TransitSchedule::new();
        let mut l2 = line("L2");
        l2.add_route(route("b")).unwrap();
        l2.add_route(route("a")).unwrap();
        let mut l1 = line("L1");
        l1.add_route(route("z")).unwrap();
        s.add_line(l2).unwrap();
        s.add_line(l1).unwrap();

        let order: Vec<String> = s.routes().map(|(r, _)| r.to_string()).collect();
        assert_eq!(order, vec!["L1/z", "L2/a", "L2/b"]);
    }

    #[test]
    fn route_lookup() {
        let mut s = TransitSchedule::new();
        let mut l = line("L1");
        l.add_route(route("r1")).unwrap();
        s.add_line(l).unwrap();

        let found = RouteRef::new(LineId::parse("L1").unwrap(), RouteId::parse("r1").unwrap());
        let missing = RouteRef::new(LineId::parse("L1").unwrap(), RouteId::parse("r2").unwrap());
        assert!(s.route(&found).is_some());
        assert!(s.route(&missing).is_none());
    }

    #[test]
    fn serves_and_stop_index() {
        let a = StopFacilityId::parse("a").unwrap();
        let b = StopFacilityId::parse("b").unwrap();
        let mut r = route("r");
        r.stops = vec![TransitRouteStop::new(a.clone()), TransitRouteStop::new(a.clone())];
        assert_eq!(r.stop_index(&a), Some(0));
        assert!(!r.serves(&b));
    }

    #[test]
    fn serde_roundtrip() {
        let mut s = TransitSchedule::new();
        let facility = StopFacility::child(
            ParentId::parse("s1").unwrap(),
            LinkId::parse("A").unwrap(),
            "First".into(),
            Coord::new(0.0, 0.0),
        );
        let mut r = route("r1");
        r.stops = vec![TransitRouteStop::new(facility.id().clone())];
        r.links = vec![LinkId::parse("A").unwrap()];
        s.add_facility(facility).unwrap();
        let mut l = line("L1");
        l.add_route(r).unwrap();
        s.add_line(l).unwrap();

        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"s1.link:A\""));
        let back: TransitSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn add_child_through_schedule() {
        let mut s = TransitSchedule::new();
        let parent = ParentId::parse("s1").unwrap();
        let link = LinkId::parse("B").unwrap();
        s.facilities_mut()
            .add_child(&parent, &link, "First".into(), Coord::new(0.0, 0.0))
            .unwrap();

        let child = s.facilities().get_or_create_child(&parent, &link).unwrap();
        assert_eq!(child.id().to_string(), "s1.link:B");
        assert_eq!(s.facilities().len(), 1);
    }

    #[test]
    fn deserialize_rejects_duplicate_routes() {
        let json = r#"{"lines":[{"id":"L","routes":[
            {"id":"r","transport_mode":"bus","stops":[]},
            {"id":"r","transport_mode":"bus","stops":[]}]}]}"#;
        assert!(serde_json::from_str::<TransitSchedule>(json).is_err());
    }
}
