//! Magazine adapter: automated dispensers ("stackers") bound to one resource
//! type each.
//!
//! The bank tracks how many holders each magazine still holds. Dispensing
//! never fabricates supply: callers check [`MagazineBank::has_stock`] first,
//! and an empty magazine only comes back through an explicit
//! [`MagazineBank::refill`].

use crate::deck::{Retrieved, Workcell};
use crate::disposal::DisposalRouter;
use crate::error::TrackerError;
use crate::id::{HolderId, MagazineId, ResourceType};
use std::collections::BTreeMap;

/// Bookkeeping for one bound magazine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagazineState {
    pub magazine: MagazineId,
    pub remaining: u32,
    pub capacity: u32,
    /// Whether stored holders carry a cover that is discarded on dispense.
    pub cover: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MagazineBank {
    bound: BTreeMap<ResourceType, MagazineState>,
}

impl MagazineBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `magazine` to `resource` and store `count` holders in it.
    pub fn load<W: Workcell>(
        &mut self,
        workcell: &mut W,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        capacity: u32,
        cover: bool,
    ) -> Result<(), TrackerError> {
        if count > capacity {
            return Err(TrackerError::MagazineOverCapacity {
                resource: resource.clone(),
                capacity,
                requested: count,
            });
        }
        workcell.store_in_magazine(magazine, resource, count, cover)?;
        self.bound.insert(
            resource.clone(),
            MagazineState {
                magazine,
                remaining: count,
                capacity,
                cover,
            },
        );
        tracing::info!(
            target: "magazine",
            resource = %resource,
            count,
            capacity,
            cover,
            "magazine_loaded"
        );
        Ok(())
    }

    pub fn state(&self, resource: &ResourceType) -> Option<&MagazineState> {
        self.bound.get(resource)
    }

    pub fn remaining(&self, resource: &ResourceType) -> u32 {
        self.bound.get(resource).map_or(0, |s| s.remaining)
    }

    pub fn has_stock(&self, resource: &ResourceType) -> bool {
        self.remaining(resource) > 0
    }

    pub fn is_bound(&self, resource: &ResourceType) -> bool {
        self.bound.contains_key(resource)
    }

    /// Retrieve one holder. Its cover, if any, is discarded before returning.
    /// The holder is staged off-slot; the caller places it.
    pub fn dispense_one<W: Workcell>(
        &mut self,
        workcell: &mut W,
        resource: &ResourceType,
        disposal: &DisposalRouter,
    ) -> Result<HolderId, TrackerError> {
        let state = self
            .bound
            .get_mut(resource)
            .ok_or_else(|| TrackerError::NoMagazine(resource.clone()))?;
        if state.remaining == 0 {
            return Err(TrackerError::MagazineEmpty(resource.clone()));
        }
        let Retrieved { holder, cover } = workcell.retrieve_from_magazine(state.magazine)?;
        state.remaining -= 1;
        let remaining = state.remaining;
        if cover {
            disposal.discard_cover(workcell, holder)?;
        }
        tracing::info!(
            target: "magazine",
            resource = %resource,
            remaining,
            cover,
            "magazine_dispensed"
        );
        Ok(holder)
    }

    /// Operator refill: the magazine is full again. Returns the new count.
    pub fn refill<W: Workcell>(
        &mut self,
        workcell: &mut W,
        resource: &ResourceType,
    ) -> Result<u32, TrackerError> {
        let state = self
            .bound
            .get_mut(resource)
            .ok_or_else(|| TrackerError::NoMagazine(resource.clone()))?;
        workcell.refill_magazine(state.magazine, state.capacity)?;
        state.remaining = state.capacity;
        tracing::info!(
            target: "magazine",
            resource = %resource,
            remaining = state.remaining,
            "magazine_refilled"
        );
        Ok(state.remaining)
    }

    /// Move `magazine` to serve `resource`, restocked with `count` holders
    /// and sized to `capacity`. Whatever type it served before loses its
    /// magazine. A type already served by another magazine is rejected.
    pub fn rebind<W: Workcell>(
        &mut self,
        workcell: &mut W,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        capacity: u32,
        cover: bool,
    ) -> Result<(), TrackerError> {
        let old_resource = self
            .bound
            .iter()
            .find(|(_, s)| s.magazine == magazine)
            .map(|(r, _)| r.clone())
            .ok_or(TrackerError::UnknownMagazine(magazine))?;
        if let Some(current) = self.bound.get(resource) {
            if current.magazine != magazine {
                return Err(TrackerError::MagazineAlreadyBound(resource.clone()));
            }
        }
        if count > capacity {
            return Err(TrackerError::MagazineOverCapacity {
                resource: resource.clone(),
                capacity,
                requested: count,
            });
        }
        self.bound.remove(&old_resource);
        tracing::info!(
            target: "magazine",
            from = %old_resource,
            to = %resource,
            "magazine_rebound"
        );
        self.load(workcell, magazine, resource, count, capacity, cover)
    }
}
