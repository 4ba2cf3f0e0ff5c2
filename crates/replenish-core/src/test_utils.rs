//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. The centerpiece
//! is [`SimulatedWorkcell`], an in-memory deck that records every call the
//! tracker makes so tests can assert on moves, pauses and log lines.

use crate::config::{MagazineConfig, TrackerConfig, WasteKind};
use crate::deck::{
    ActuationError, DeckScan, Destination, HolderInfo, Locus, Movable, Occupant, Retrieved,
    Workcell,
};
use crate::id::{ConsumerId, HolderId, MagazineId, ResourceType};
use crate::slot::{ReserveSlot, Slot};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ===========================================================================
// Fixtures
// ===========================================================================

pub fn slot(name: &str) -> Slot {
    name.parse().unwrap()
}

pub fn slots(names: &[&str]) -> Vec<Slot> {
    names.iter().map(|n| slot(n)).collect()
}

pub fn tips() -> ResourceType {
    ResourceType::new("tiprack_200ul")
}

pub fn plates() -> ResourceType {
    ResourceType::new("plate_96")
}

/// Chute plus gripper: holders are swapped without the operator.
pub fn automated_config() -> TrackerConfig {
    TrackerConfig {
        reserve_slots: vec![ReserveSlot::A4, ReserveSlot::B4],
        waste: WasteKind::Chute,
        use_gripper: true,
        ..TrackerConfig::default()
    }
}

/// Bin waste with a buffer slot: swaps go through the carousel.
pub fn carousel_config(buffer: &str) -> TrackerConfig {
    TrackerConfig {
        reserve_slots: vec![ReserveSlot::A4, ReserveSlot::B4],
        buffer_slot: Some(slot(buffer)),
        waste: WasteKind::Bin,
        use_gripper: true,
        ..TrackerConfig::default()
    }
}

pub fn magazine_config(resource: ResourceType, capacity: u32) -> MagazineConfig {
    MagazineConfig {
        resource,
        capacity,
        initial: None,
        cover: false,
    }
}

// ===========================================================================
// Simulated workcell
// ===========================================================================

/// One recorded `transfer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub object: Movable,
    pub destination: Destination,
    pub use_gripper: bool,
}

#[derive(Debug, Clone)]
struct SimHolder {
    resource: ResourceType,
    units_left: u32,
    cover: bool,
}

#[derive(Debug, Clone)]
enum SimOccupant {
    Holder(HolderId),
    Adapter(Option<HolderId>),
    Fixture(String),
}

#[derive(Debug, Clone, Default)]
struct SimMagazine {
    resource: Option<ResourceType>,
    stock: u32,
    cover: bool,
}

#[derive(Debug, Clone)]
pub struct SimulatedWorkcell {
    units_per_holder: u32,
    holders: SlotMap<HolderId, SimHolder>,
    deck: BTreeMap<Slot, SimOccupant>,
    magazines: SlotMap<MagazineId, SimMagazine>,
    transfers: Vec<TransferRecord>,
    pauses: Vec<String>,
    comments: Vec<String>,
    homes: u32,
    consumed: Vec<(ConsumerId, HolderId)>,
    releases: u32,
}

impl SimulatedWorkcell {
    /// Every holder the workcell creates starts with `units_per_holder`.
    pub fn new(units_per_holder: u32) -> Self {
        Self {
            units_per_holder,
            holders: SlotMap::with_key(),
            deck: BTreeMap::new(),
            magazines: SlotMap::with_key(),
            transfers: Vec::new(),
            pauses: Vec::new(),
            comments: Vec::new(),
            homes: 0,
            consumed: Vec::new(),
            releases: 0,
        }
    }

    // -- Out-of-band setup --

    pub fn place_holder(&mut self, resource: &ResourceType, slot: Slot) -> HolderId {
        assert!(!self.deck.contains_key(&slot), "slot {slot} already occupied");
        let id = self.new_holder(resource, false);
        self.deck.insert(slot, SimOccupant::Holder(id));
        id
    }

    /// Place an adapter, optionally carrying a holder of `resource`.
    pub fn place_adapter(
        &mut self,
        slot: Slot,
        resource: Option<&ResourceType>,
    ) -> Option<HolderId> {
        assert!(!self.deck.contains_key(&slot), "slot {slot} already occupied");
        let child = resource.map(|r| self.new_holder(r, false));
        self.deck.insert(slot, SimOccupant::Adapter(child));
        child
    }

    pub fn place_fixture(&mut self, slot: Slot, name: &str) {
        self.deck.insert(slot, SimOccupant::Fixture(name.to_string()));
    }

    /// Clear a slot as if someone lifted its occupant off the deck.
    pub fn remove(&mut self, slot: Slot) {
        self.deck.remove(&slot);
    }

    pub fn set_units(&mut self, holder: HolderId, units: u32) {
        if let Some(h) = self.holders.get_mut(holder) {
            h.units_left = units;
        }
    }

    pub fn deplete(&mut self, holder: HolderId) {
        self.set_units(holder, 0);
    }

    pub fn add_magazine(&mut self) -> MagazineId {
        self.magazines.insert(SimMagazine::default())
    }

    // -- Inspection --

    pub fn units_left(&self, holder: HolderId) -> Option<u32> {
        self.holders.get(holder).map(|h| h.units_left)
    }

    pub fn has_cover(&self, holder: HolderId) -> bool {
        self.holders.get(holder).is_some_and(|h| h.cover)
    }

    pub fn holder_at(&self, slot: Slot) -> Option<HolderId> {
        match self.deck.get(&slot)? {
            SimOccupant::Holder(id) => Some(*id),
            SimOccupant::Adapter(child) => *child,
            SimOccupant::Fixture(_) => None,
        }
    }

    pub fn slot_of(&self, holder: HolderId) -> Option<Slot> {
        self.deck
            .keys()
            .copied()
            .find(|&slot| self.holder_at(slot) == Some(holder))
    }

    pub fn resource_at(&self, slot: Slot) -> Option<&ResourceType> {
        self.holder_at(slot)
            .and_then(|id| self.holders.get(id))
            .map(|h| &h.resource)
    }

    pub fn magazine_count(&self, magazine: MagazineId) -> u32 {
        self.magazines.get(magazine).map_or(0, |m| m.stock)
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    pub fn pauses(&self) -> &[String] {
        &self.pauses
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn homes(&self) -> u32 {
        self.homes
    }

    pub fn consumed(&self) -> &[(ConsumerId, HolderId)] {
        &self.consumed
    }

    pub fn releases(&self) -> u32 {
        self.releases
    }

    pub fn clear_log(&mut self) {
        self.transfers.clear();
        self.pauses.clear();
        self.comments.clear();
        self.homes = 0;
    }

    // -- Internals --

    fn new_holder(&mut self, resource: &ResourceType, cover: bool) -> HolderId {
        self.holders.insert(SimHolder {
            resource: resource.clone(),
            units_left: self.units_per_holder,
            cover,
        })
    }

    fn take_from(&mut self, consumer: ConsumerId, holder: HolderId) -> Result<u32, ActuationError> {
        match self.holders.get_mut(holder) {
            Some(h) if h.units_left > 0 => {
                h.units_left -= 1;
                self.consumed.push((consumer, holder));
                Ok(1)
            }
            _ => Err(ActuationError::ResourceExhausted { consumer }),
        }
    }

    fn lift(&mut self, holder: HolderId) {
        let Some(slot) = self.slot_of(holder) else {
            return;
        };
        match self.deck.get_mut(&slot) {
            Some(SimOccupant::Adapter(child)) => *child = None,
            _ => {
                self.deck.remove(&slot);
            }
        }
    }
}

impl Workcell for SimulatedWorkcell {
    fn consume(
        &mut self,
        consumer: ConsumerId,
        holders: &[HolderId],
        locus: Option<Locus>,
    ) -> Result<u32, ActuationError> {
        if let Some(locus) = locus {
            let holder = match locus {
                Locus::Holder(h) => h,
                Locus::Position { holder, .. } => holder,
            };
            return self.take_from(consumer, holder);
        }
        let next = holders
            .iter()
            .copied()
            .find(|&h| self.units_left(h).is_some_and(|u| u > 0));
        match next {
            Some(holder) => self.take_from(consumer, holder),
            None => Err(ActuationError::ResourceExhausted { consumer }),
        }
    }

    fn release(
        &mut self,
        _consumer: ConsumerId,
        _locus: Option<Locus>,
        _return_to_holder: bool,
    ) -> Result<(), ActuationError> {
        self.releases += 1;
        Ok(())
    }

    fn transfer(
        &mut self,
        object: Movable,
        destination: Destination,
        use_gripper: bool,
    ) -> Result<(), ActuationError> {
        match object {
            Movable::Holder(id) => {
                if !self.holders.contains_key(id) {
                    return Err(ActuationError::UnknownObject(object));
                }
                if let Destination::Slot(slot) = destination {
                    if self.deck.contains_key(&slot) {
                        return Err(ActuationError::SlotOccupied(slot));
                    }
                }
                self.lift(id);
                match destination {
                    Destination::Slot(slot) => {
                        self.deck.insert(slot, SimOccupant::Holder(id));
                    }
                    Destination::Waste => {
                        self.holders.remove(id);
                    }
                    Destination::OffDeck => {}
                }
            }
            Movable::Cover(id) => match self.holders.get_mut(id) {
                Some(h) => h.cover = false,
                None => return Err(ActuationError::UnknownObject(object)),
            },
        }
        self.transfers.push(TransferRecord {
            object,
            destination,
            use_gripper,
        });
        Ok(())
    }

    fn load_holder(
        &mut self,
        resource: &ResourceType,
        slot: Slot,
    ) -> Result<HolderId, ActuationError> {
        if self.deck.contains_key(&slot) {
            return Err(ActuationError::SlotOccupied(slot));
        }
        let id = self.new_holder(resource, false);
        self.deck.insert(slot, SimOccupant::Holder(id));
        Ok(id)
    }

    fn pause_for_operator(&mut self, message: &str) {
        self.pauses.push(message.to_string());
    }

    fn home(&mut self) {
        self.homes += 1;
    }

    fn comment(&mut self, message: &str) {
        self.comments.push(message.to_string());
    }

    fn scan_slots(&self) -> DeckScan {
        let info = |id: HolderId| {
            self.holders.get(id).map(|h| HolderInfo {
                id,
                resource: h.resource.clone(),
                has_units: h.units_left > 0,
            })
        };
        let slots = self
            .deck
            .iter()
            .filter_map(|(&slot, occupant)| {
                let occupant = match occupant {
                    SimOccupant::Holder(id) => Occupant::Holder(info(*id)?),
                    SimOccupant::Adapter(child) => Occupant::Adapter {
                        child: child.and_then(info),
                    },
                    SimOccupant::Fixture(name) => Occupant::Fixture { name: name.clone() },
                };
                Some((slot, occupant))
            })
            .collect();
        DeckScan::new(slots)
    }

    fn store_in_magazine(
        &mut self,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        cover: bool,
    ) -> Result<(), ActuationError> {
        let mag = self
            .magazines
            .get_mut(magazine)
            .ok_or_else(|| ActuationError::Other(format!("no magazine {magazine:?}")))?;
        mag.resource = Some(resource.clone());
        mag.stock = count;
        mag.cover = cover;
        Ok(())
    }

    fn retrieve_from_magazine(
        &mut self,
        magazine: MagazineId,
    ) -> Result<Retrieved, ActuationError> {
        let (resource, cover) = match self.magazines.get_mut(magazine) {
            Some(SimMagazine {
                resource: Some(resource),
                stock,
                cover,
            }) if *stock > 0 => {
                *stock -= 1;
                (resource.clone(), *cover)
            }
            _ => return Err(ActuationError::MagazineJammed(magazine)),
        };
        let holder = self.new_holder(&resource, cover);
        Ok(Retrieved { holder, cover })
    }

    fn refill_magazine(&mut self, magazine: MagazineId, count: u32) -> Result<(), ActuationError> {
        let mag = self
            .magazines
            .get_mut(magazine)
            .ok_or(ActuationError::MagazineJammed(magazine))?;
        mag.stock = count;
        Ok(())
    }
}
