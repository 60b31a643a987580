//! Stop facility table and the parent/child lookup scheme.
//!
//! Child facilities are looked up, never fabricated: creating one needs a
//! name and coordinate that only the caller can supply (see
//! [`StopFacilityRegistry::add_child`]).

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{
    Coord, DuplicateId, InvalidId, LinkId, ParentId, StopFacility, StopFacilityId, TransitRoute,
};

/// Error returned when a required child facility does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stop facility {0} not found in schedule")]
pub struct MissingFacility(pub StopFacilityId);

/// All stop facilities of a schedule, addressed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopFacilityRegistry {
    facilities: BTreeMap<StopFacilityId, StopFacility>,
}

impl StopFacilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parent id of a textual facility id, stripping any child suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_editor::registry::StopFacilityRegistry;
    ///
    /// let parent = StopFacilityRegistry::parent_id_of("stop7.link:42").unwrap();
    /// assert_eq!(parent.as_str(), "stop7");
    /// ```
    pub fn parent_id_of(facility_id: &str) -> Result<ParentId, InvalidId> {
        StopFacilityId::parse(facility_id).map(|id| id.parent().clone())
    }

    /// Id of the child of `parent` bound to `link`.
    pub fn child_id(parent: &ParentId, link: &LinkId) -> StopFacilityId {
        StopFacilityId::child(parent.clone(), link.clone())
    }

    /// First facility in `route`'s stop sequence that belongs to `parent`.
    pub fn find_child_in_route<'r>(
        route: &'r TransitRoute,
        parent: &ParentId,
    ) -> Option<&'r StopFacilityId> {
        let found = route
            .stops
            .iter()
            .map(|stop| &stop.facility)
            .find(|facility| facility.parent() == parent);
        if found.is_none() {
            debug!(route = %route.id, parent = %parent, "no child facility in route");
        }
        found
    }

    /// Add a facility; ids are unique.
    pub fn insert(&mut self, facility: StopFacility) -> Result<(), DuplicateId> {
        if self.facilities.contains_key(facility.id()) {
            return Err(DuplicateId {
                kind: "stop facility",
                id: facility.id().to_string(),
            });
        }
        self.facilities.insert(facility.id().clone(), facility);
        Ok(())
    }

    /// Create the child of `parent` bound to `link` from caller-supplied data.
    pub fn add_child(
        &mut self,
        parent: &ParentId,
        link: &LinkId,
        name: String,
        coord: Coord,
    ) -> Result<&StopFacility, DuplicateId> {
        let facility = StopFacility::child(parent.clone(), link.clone(), name, coord);
        let id = facility.id().clone();
        self.insert(facility)?;
        debug!(facility = %id, "created child facility");
        Ok(&self.facilities[&id])
    }

    /// Look up the child of `parent` bound to `link`.
    ///
    /// A missing child is reported, not created.
    pub fn get_or_create_child(
        &self,
        parent: &ParentId,
        link: &LinkId,
    ) -> Result<&StopFacility, MissingFacility> {
        let id = Self::child_id(parent, link);
        match self.facilities.get(&id) {
            Some(facility) => Ok(facility),
            None => {
                warn!(facility = %id, "child stop facility not found in schedule");
                Err(MissingFacility(id))
            }
        }
    }

    pub fn get(&self, id: &StopFacilityId) -> Option<&StopFacility> {
        self.facilities.get(id)
    }

    pub fn contains(&self, id: &StopFacilityId) -> bool {
        self.facilities.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StopFacility> {
        self.facilities.values()
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

impl IntoIterator for StopFacilityRegistry {
    type Item = StopFacility;
    type IntoIter = std::collections::btree_map::IntoValues<StopFacilityId, StopFacility>;

    fn into_iter(self) -> Self::IntoIter {
        self.facilities.into_values()
    }
}
