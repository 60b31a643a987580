//! Edit command records.
//!
//! One command per record, fields separated by a configurable delimiter:
//!
//! ```text
//! rerouteViaLink;lineId;routeId;oldLinkId;newLinkId
//! changeRefLink;stopFacilityId;newLinkId
//! changeRefLink;lineId;routeId;parentStopId;newLinkId
//! changeRefLink;allTransitRoutesOnLink;linkId;parentStopId;newLinkId
//! // comment
//! ```

use std::fmt;

use crate::domain::{InvalidId, LineId, LinkId, ParentId, RouteId, RouteRef, StopFacilityId};
use crate::registry::StopFacilityRegistry;

pub const REROUTE_VIA_LINK: &str = "rerouteViaLink";
pub const CHANGE_REF_LINK: &str = "changeRefLink";
pub const ALL_TRANSIT_ROUTES_ON_LINK: &str = "allTransitRoutesOnLink";
pub const COMMENT_START: &str = "//";

/// Error returned when a record is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("{command} expects {expected} fields, found {found}")]
    FieldCount {
        command: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("field {index}: {source}")]
    InvalidField { index: usize, source: InvalidId },
}

/// A parsed edit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reroute the segment of a route that passes `old_link` via `new_link`.
    RerouteViaLink {
        route: RouteRef,
        old_link: LinkId,
        new_link: LinkId,
    },

    /// Replace a facility with its sibling on `new_link` in every route.
    ChangeRefLink { stop: StopFacilityId, new_link: LinkId },

    /// Replace the route's facility of `parent` with the one on `new_link`.
    ChangeRefLinkInRoute {
        route: RouteRef,
        parent: ParentId,
        new_link: LinkId,
    },

    /// As [`Command::ChangeRefLinkInRoute`], for every route passing `link`.
    ChangeRefLinkOnLink {
        link: LinkId,
        parent: ParentId,
        new_link: LinkId,
    },
}

impl Command {
    /// Parse one record.
    ///
    /// Returns `Ok(None)` for blank records and comments. Fields are trimmed
    /// and trailing empty fields are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_editor::editor::Command;
    ///
    /// let cmd = Command::parse("changeRefLink;stop7;link42", ';').unwrap();
    /// assert!(matches!(cmd, Some(Command::ChangeRefLink { .. })));
    ///
    /// assert_eq!(Command::parse("// reroute bus 12", ';').unwrap(), None);
    /// assert!(Command::parse("replaceEverything;x", ';').is_err());
    /// ```
    pub fn parse(record: &str, delimiter: char) -> Result<Option<Self>, CommandParseError> {
        let record = record.trim();
        if record.is_empty() || record.starts_with(COMMENT_START) {
            return Ok(None);
        }

        let mut fields: Vec<&str> = record.split(delimiter).map(str::trim).collect();
        while fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }

        let command = match fields[0] {
            REROUTE_VIA_LINK => {
                expect_fields(REROUTE_VIA_LINK, "5", &fields, &[5])?;
                Command::RerouteViaLink {
                    route: route_ref(&fields, 1)?,
                    old_link: field(&fields, 3, LinkId::parse)?,
                    new_link: field(&fields, 4, LinkId::parse)?,
                }
            }
            CHANGE_REF_LINK => {
                expect_fields(CHANGE_REF_LINK, "3 or 5", &fields, &[3, 5])?;
                if fields.len() == 3 {
                    Command::ChangeRefLink {
                        stop: field(&fields, 1, StopFacilityId::parse)?,
                        new_link: field(&fields, 2, LinkId::parse)?,
                    }
                } else if fields[1] == ALL_TRANSIT_ROUTES_ON_LINK {
                    Command::ChangeRefLinkOnLink {
                        link: field(&fields, 2, LinkId::parse)?,
                        parent: field(&fields, 3, StopFacilityRegistry::parent_id_of)?,
                        new_link: field(&fields, 4, LinkId::parse)?,
                    }
                } else {
                    Command::ChangeRefLinkInRoute {
                        route: route_ref(&fields, 1)?,
                        parent: field(&fields, 3, StopFacilityRegistry::parent_id_of)?,
                        new_link: field(&fields, 4, LinkId::parse)?,
                    }
                }
            }
            other => return Err(CommandParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }

    /// The command keyword.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RerouteViaLink { .. } => REROUTE_VIA_LINK,
            _ => CHANGE_REF_LINK,
        }
    }
}

impl fmt::Display for Command {
    /// Formats the command as a `;`-delimited record.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::RerouteViaLink {
                route,
                old_link,
                new_link,
            } => write!(
                f,
                "{REROUTE_VIA_LINK};{};{};{old_link};{new_link}",
                route.line, route.route
            ),
            Command::ChangeRefLink { stop, new_link } => {
                write!(f, "{CHANGE_REF_LINK};{stop};{new_link}")
            }
            Command::ChangeRefLinkInRoute {
                route,
                parent,
                new_link,
            } => write!(
                f,
                "{CHANGE_REF_LINK};{};{};{parent};{new_link}",
                route.line, route.route
            ),
            Command::ChangeRefLinkOnLink {
                link,
                parent,
                new_link,
            } => write!(
                f,
                "{CHANGE_REF_LINK};{ALL_TRANSIT_ROUTES_ON_LINK};{link};{parent};{new_link}"
            ),
        }
    }
}

fn expect_fields(
    command: &'static str,
    expected: &'static str,
    fields: &[&str],
    allowed: &[usize],
) -> Result<(), CommandParseError> {
    if allowed.contains(&fields.len()) {
        Ok(())
    } else {
        Err(CommandParseError::FieldCount {
            command,
            expected,
            found: fields.len(),
        })
    }
}

fn field<T>(
    fields: &[&str],
    index: usize,
    parse: impl FnOnce(&str) -> Result<T, InvalidId>,
) -> Result<T, CommandParseError> {
    parse(fields[index]).map_err(|source| CommandParseError::InvalidField { index, source })
}

fn route_ref(fields: &[&str], index: usize) -> Result<RouteRef, CommandParseError> {
    Ok(RouteRef::new(
        field(fields, index, LineId::parse)?,
        field(fields, index + 1, RouteId::parse)?,
    ))
}
