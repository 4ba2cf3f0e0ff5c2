//! The workcell collaborator seam.
//!
//! Everything physical happens behind [`Workcell`]: picking up units,
//! moving holders, pausing for the operator and scanning slot occupancy.
//! The tracker never assumes a move happened unless it issued it through
//! this trait, and it re-derives its ledger from [`Workcell::scan_slots`]
//! whenever a move may have happened out of band.

use crate::id::{ConsumerId, HolderId, MagazineId, ResourceType};
use crate::slot::Slot;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Deck snapshot
// ---------------------------------------------------------------------------

/// A holder as reported by a slot scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderInfo {
    pub id: HolderId,
    pub resource: ResourceType,
    /// Whether any unconsumed unit remains in the holder.
    pub has_units: bool,
}

/// What occupies a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    /// A holder sitting directly on the slot.
    Holder(HolderInfo),
    /// A pass-through adapter, possibly carrying a holder.
    Adapter { child: Option<HolderInfo> },
    /// A module or labware that is not a holder.
    Fixture { name: String },
}

/// Immutable snapshot of slot occupancy. Slots absent from the map are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckScan {
    slots: BTreeMap<Slot, Occupant>,
}

impl DeckScan {
    pub fn new(slots: BTreeMap<Slot, Occupant>) -> Self {
        Self { slots }
    }

    pub fn occupant(&self, slot: Slot) -> Option<&Occupant> {
        self.slots.get(&slot)
    }

    pub fn is_empty(&self, slot: Slot) -> bool {
        !self.slots.contains_key(&slot)
    }

    /// The holder on a slot, unwrapping an adapter if one is present.
    pub fn holder_at(&self, slot: Slot) -> Option<&HolderInfo> {
        match self.slots.get(&slot)? {
            Occupant::Holder(info) => Some(info),
            Occupant::Adapter { child } => child.as_ref(),
            Occupant::Fixture { .. } => None,
        }
    }

    /// Every holder on the deck with its slot, in slot order.
    pub fn holders(&self) -> impl Iterator<Item = (Slot, &HolderInfo)> {
        self.slots
            .keys()
            .filter_map(|&slot| self.holder_at(slot).map(|info| (slot, info)))
    }

    /// Find the slot currently occupied by a holder.
    pub fn locate(&self, holder: HolderId) -> Option<Slot> {
        self.holders()
            .find(|(_, info)| info.id == holder)
            .map(|(slot, _)| slot)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.len()
    }
}

// ---------------------------------------------------------------------------
// Transfer vocabulary
// ---------------------------------------------------------------------------

/// An object the workcell can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movable {
    Holder(HolderId),
    /// The lid sitting on a holder freshly retrieved from a magazine.
    Cover(HolderId),
}

/// Where a transfer ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Slot(Slot),
    /// The automated waste sink (chute or bin).
    Waste,
    /// Removed from the deck entirely.
    OffDeck,
}

/// Where a consumer should take its next unit from, overriding the bound list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locus {
    Holder(HolderId),
    Position { holder: HolderId, index: u16 },
}

/// A holder handed out by a magazine. It is staged off-slot until transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrieved {
    pub holder: HolderId,
    /// Whether the holder arrived with a cover that must be discarded.
    pub cover: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by the workcell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuationError {
    /// The bound holder list has no remaining unit.
    #[error("resource exhausted for {consumer}")]
    ResourceExhausted { consumer: ConsumerId },
    #[error("slot {0} is already occupied")]
    SlotOccupied(Slot),
    #[error("unknown object {0:?}")]
    UnknownObject(Movable),
    #[error("magazine {0:?} could not retrieve a holder")]
    MagazineJammed(MagazineId),
    #[error("workcell fault: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Workcell trait
// ---------------------------------------------------------------------------

/// The physical actuation layer.
///
/// Calls execute one at a time; `pause_for_operator` blocks until the
/// operator resumes the run.
pub trait Workcell {
    /// Pick up from the first holder in `holders` that still has a unit, or
    /// from `locus` when given. Returns the number of units taken.
    fn consume(
        &mut self,
        consumer: ConsumerId,
        holders: &[HolderId],
        locus: Option<Locus>,
    ) -> Result<u32, ActuationError>;

    /// Drop the consumer's unit, or return it to its holder.
    fn release(
        &mut self,
        consumer: ConsumerId,
        locus: Option<Locus>,
        return_to_holder: bool,
    ) -> Result<(), ActuationError>;

    fn transfer(
        &mut self,
        object: Movable,
        destination: Destination,
        use_gripper: bool,
    ) -> Result<(), ActuationError>;

    /// Declare a freshly placed holder of `resource` on `slot`.
    fn load_holder(
        &mut self,
        resource: &ResourceType,
        slot: Slot,
    ) -> Result<HolderId, ActuationError>;

    fn pause_for_operator(&mut self, message: &str);

    fn home(&mut self);

    /// Append a line to the run log shown to the operator.
    fn comment(&mut self, message: &str) {
        let _ = message;
    }

    fn scan_slots(&self) -> DeckScan;

    // -- Magazines --

    fn store_in_magazine(
        &mut self,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        cover: bool,
    ) -> Result<(), ActuationError>;

    fn retrieve_from_magazine(&mut self, magazine: MagazineId)
    -> Result<Retrieved, ActuationError>;

    fn refill_magazine(&mut self, magazine: MagazineId, count: u32)
    -> Result<(), ActuationError>;
}
