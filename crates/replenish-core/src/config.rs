//! Tracker configuration.
//!
//! Everything here is fixed at construction except the buffer slot, which
//! rotates as carousel exchanges run. Hosts usually build this from a data
//! file through `replenish-data`.

use crate::error::TrackerError;
use crate::id::ResourceType;
use crate::slot::{ReserveSlot, Slot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The waste destination installed on the workcell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteKind {
    /// Accepts whole holders through the gripper.
    Chute,
    /// Only accepts loose units.
    #[default]
    Bin,
}

/// A magazine binding. Capacity is required; there is no default size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagazineConfig {
    pub resource: ResourceType,
    pub capacity: u32,
    /// Holders stored at start. Defaults to a full magazine.
    #[serde(default)]
    pub initial: Option<u32>,
    #[serde(default)]
    pub cover: bool,
}

impl MagazineConfig {
    pub fn initial_count(&self) -> u32 {
        self.initial.unwrap_or(self.capacity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub reserve_slots: Vec<ReserveSlot>,
    /// The slot kept empty for carousel exchanges.
    #[serde(default)]
    pub buffer_slot: Option<Slot>,
    #[serde(default)]
    pub assignments: BTreeMap<ResourceType, Vec<Slot>>,
    #[serde(default)]
    pub magazines: Vec<MagazineConfig>,
    #[serde(default)]
    pub waste: WasteKind,
    #[serde(default)]
    pub use_gripper: bool,
    /// Mirror individual moves into the run log.
    #[serde(default)]
    pub verbose: bool,
    /// Whether a manual refill also restocks reserve slots vacated by swaps.
    #[serde(default)]
    pub restore_reserve_on_manual_refill: bool,
}

impl TrackerConfig {
    /// Whether emptied holders can be destroyed without an operator.
    pub fn automated_disposal(&self) -> bool {
        self.waste == WasteKind::Chute && self.use_gripper
    }

    pub fn magazine(&self, resource: &ResourceType) -> Option<&MagazineConfig> {
        self.magazines.iter().find(|m| &m.resource == resource)
    }

    /// Reject configurations that can never run safely.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if let Some(buffer) = self.buffer_slot {
            if let Some((resource, _)) = self
                .assignments
                .iter()
                .find(|(_, slots)| slots.contains(&buffer))
            {
                return Err(TrackerError::BufferSlotAssigned {
                    slot: buffer,
                    resource: resource.clone(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for magazine in &self.magazines {
            if !seen.insert(&magazine.resource) {
                return Err(TrackerError::DuplicateMagazine(magazine.resource.clone()));
            }
            if magazine.initial_count() > magazine.capacity {
                return Err(TrackerError::MagazineOverCapacity {
                    resource: magazine.resource.clone(),
                    capacity: magazine.capacity,
                    requested: magazine.initial_count(),
                });
            }
        }
        Ok(())
    }
}
