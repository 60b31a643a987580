//! Domain types for the schedule editor.
//!
//! Identifiers are validated at construction time. Routes refer to stop
//! facilities by id; the network is never mutated by the editor.

mod facility;
mod ids;
mod network;
mod schedule;

pub use facility::{CHILD_SEPARATOR, FacilityLinkMismatch, ParentId, StopFacility, StopFacilityId};
pub use ids::{DuplicateId, InvalidId, LineId, LinkId, NodeId, RouteId, TransportMode};
pub use network::{Coord, InvalidNetwork, Link, Network, Node, UnknownNode};
pub use schedule::{RouteRef, TransitLine, TransitRoute, TransitRouteStop, TransitSchedule};
