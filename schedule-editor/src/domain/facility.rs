//! Stop facility identity and records.
//!
//! A logical stop is identified by its [`ParentId`]. The same stop can exist
//! as several facilities, one per network link it is served from; those
//! children are addressed by the parent plus the link they are bound to.
//! The textual form of a child id is `parent.link:linkId`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{InvalidId, LinkId};
use super::network::Coord;

/// Separator between the parent id and the bound link in textual child ids.
pub const CHILD_SEPARATOR: &str = ".link:";

/// Identifier of a logical stop.
///
/// Parent ids are non-empty and never contain [`CHILD_SEPARATOR`], so the
/// textual form of a child id can always be split back unambiguously.
///
/// # Examples
///
/// ```
/// use schedule_editor::domain::ParentId;
///
/// let stop = ParentId::parse("stop7").unwrap();
/// assert_eq!(stop.as_str(), "stop7");
///
/// assert!(ParentId::parse("").is_err());
/// assert!(ParentId::parse("stop7.link:42").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParentId(String);

impl ParentId {
    /// Create a parent id, rejecting empty strings and strings containing the
    /// child separator.
    pub fn new(s: String) -> Result<Self, InvalidId> {
        if s.is_empty() {
            return Err(InvalidId {
                kind: "parent stop",
                reason: "must not be empty",
            });
        }
        if s.contains(CHILD_SEPARATOR) {
            return Err(InvalidId {
                kind: "parent stop",
                reason: "must not contain the child separator \".link:\"",
            });
        }
        Ok(ParentId(s))
    }

    /// Create a parent id from a string slice.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        Self::new(s.to_string())
    }

    /// Returns the parent id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParentId({})", self.0)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ParentId {
    type Error = InvalidId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ParentId> for String {
    fn from(id: ParentId) -> Self {
        id.0
    }
}

/// Identifier of a stop facility.
///
/// Either a parent facility (`bound_link` is `None`) or a child facility
/// bound to a specific link. Equality, hashing and parent extraction are
/// structural.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopFacilityId {
    parent: ParentId,
    bound_link: Option<LinkId>,
}

impl StopFacilityId {
    /// Id of the parent facility itself.
    pub fn parent_only(parent: ParentId) -> Self {
        Self {
            parent,
            bound_link: None,
        }
    }

    /// Id of the child of `parent` bound to `link`.
    pub fn child(parent: ParentId, link: LinkId) -> Self {
        Self {
            parent,
            bound_link: Some(link),
        }
    }

    /// Parse the textual form `parent` or `parent.link:linkId`.
    ///
    /// The string is split at the first separator.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_editor::domain::StopFacilityId;
    ///
    /// let id = StopFacilityId::parse("stop7.link:42").unwrap();
    /// assert_eq!(id.parent().as_str(), "stop7");
    /// assert_eq!(id.bound_link().map(|l| l.as_str()), Some("42"));
    ///
    /// let parent = StopFacilityId::parse("stop7").unwrap();
    /// assert!(!parent.is_child());
    /// ```
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        match s.split_once(CHILD_SEPARATOR) {
            Some((parent, link)) => Ok(Self::child(
                ParentId::parse(parent)?,
                LinkId::parse(link)?,
            )),
            None => Ok(Self::parent_only(ParentId::parse(s)?)),
        }
    }

    /// The logical stop this facility belongs to.
    pub fn parent(&self) -> &ParentId {
        &self.parent
    }

    /// The link encoded in a child id.
    pub fn bound_link(&self) -> Option<&LinkId> {
        self.bound_link.as_ref()
    }

    /// Returns true if this is a child facility id.
    pub fn is_child(&self) -> bool {
        self.bound_link.is_some()
    }
}

impl fmt::Debug for StopFacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopFacilityId({})", self)
    }
}

impl fmt::Display for StopFacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound_link {
            Some(link) => write!(f, "{}{}{}", self.parent, CHILD_SEPARATOR, link),
            None => f.write_str(self.parent.as_str()),
        }
    }
}

impl TryFrom<String> for StopFacilityId {
    type Error = InvalidId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<StopFacilityId> for String {
    fn from(id: StopFacilityId) -> Self {
        id.to_string()
    }
}

/// Error returned when a child facility references a link other than the one
/// encoded in its id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stop facility {id} must reference its bound link, found {found:?}")]
pub struct FacilityLinkMismatch {
    id: StopFacilityId,
    found: Option<LinkId>,
}

/// A place where passengers board and alight.
///
/// The governing link is the network link the facility is served from. For
/// child facilities it always equals the link encoded in the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FacilityRecord")]
pub struct StopFacility {
    id: StopFacilityId,
    name: String,
    coord: Coord,
    link: Option<LinkId>,
}

impl StopFacility {
    /// Create a facility, checking the child link invariant.
    pub fn new(
        id: StopFacilityId,
        name: String,
        coord: Coord,
        link: Option<LinkId>,
    ) -> Result<Self, FacilityLinkMismatch> {
        if let Some(bound) = id.bound_link() {
            if link.as_ref() != Some(bound) {
                return Err(FacilityLinkMismatch { id, found: link });
            }
        }
        Ok(Self {
            id,
            name,
            coord,
            link,
        })
    }

    /// Create the child facility of `parent` bound to `link`.
    pub fn child(parent: ParentId, link: LinkId, name: String, coord: Coord) -> Self {
        Self {
            id: StopFacilityId::child(parent, link.clone()),
            name,
            coord,
            link: Some(link),
        }
    }

    pub fn id(&self) -> &StopFacilityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    /// The governing link, if the facility has been placed on the network.
    pub fn link(&self) -> Option<&LinkId> {
        self.link.as_ref()
    }
}

#[derive(Deserialize)]
struct FacilityRecord {
    id: StopFacilityId,
    name: String,
    coord: Coord,
    #[serde(default)]
    link: Option<LinkId>,
}

impl TryFrom<FacilityRecord> for StopFacility {
    type Error = FacilityLinkMismatch;

    fn try_from(r: FacilityRecord) -> Result<Self, Self::Error> {
        StopFacility::new(r.id, r.name, r.coord, r.link)
    }
}
