//! Edit error types.
//!
//! Every error is scoped to one command: a failed command leaves the schedule
//! as it was and later commands still run.

use crate::domain::{LineId, LinkId, NodeId, ParentId, RouteId, RouteRef, StopFacilityId, TransportMode};
use crate::editor::CommandParseError;
use crate::registry::MissingFacility;

/// An entity an edit refers to that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("transit line {0}")]
    Line(LineId),

    #[error("transit route {route} on line {line}")]
    Route { line: LineId, route: RouteId },

    #[error("stop facility {0}")]
    Facility(StopFacilityId),

    /// The route does not stop at the facility
    #[error("stop facility {facility} in transit route {route}")]
    FacilityInRoute {
        route: RouteRef,
        facility: StopFacilityId,
    },

    /// No stop of the route belongs to the given parent stop
    #[error("child facility of {parent} in transit route {route}")]
    StopInRoute { route: RouteRef, parent: ParentId },

    #[error("link {0}")]
    Link(LinkId),

    #[error("router for transport mode {0}")]
    Router(TransportMode),

    /// No route passing the link was affected by the edit
    #[error("transit routes on link {0}")]
    RoutesOnLink(LinkId),
}

/// Errors from applying an edit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// Unknown line, route, facility, link or node
    #[error("not found: {0}")]
    NotFound(#[from] NotFound),

    /// The operation cannot be applied as requested
    #[error("invalid operation on {route}: {reason}")]
    InvalidOperation { route: RouteRef, reason: String },

    /// The router found no path for a required segment
    #[error("no path for {route} from node {from} to node {to}")]
    RouteUnreachable {
        route: RouteRef,
        from: NodeId,
        to: NodeId,
    },

    /// A stop has no governing link
    #[error("stop facility {stop} in {route} is not referenced to a link")]
    UnboundStop {
        route: RouteRef,
        stop: StopFacilityId,
    },

    /// The stop has no successor in the route
    #[error("stop {index} of {route} has no following stop")]
    OutOfRange { route: RouteRef, index: usize },

    /// The command record could not be parsed
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] CommandParseError),
}

impl From<MissingFacility> for EditError {
    fn from(err: MissingFacility) -> Self {
        EditError::NotFound(NotFound::Facility(err.0))
    }
}

impl EditError {
    pub(crate) fn invalid(route: &RouteRef, reason: impl Into<String>) -> Self {
        EditError::InvalidOperation {
            route: route.clone(),
            reason: reason.into(),
        }
    }
}
