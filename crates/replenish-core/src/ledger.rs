//! The slot ledger: which holders of each resource type sit on primary and
//! reserve slots.
//!
//! The ledger is a cache over the physical deck. Every holder it knows was
//! either registered through the tracker or discovered by [`Ledger::rescan`],
//! which rebuilds a type's lists from a [`DeckScan`]. After any move not
//! issued through the tracker the affected types must be rescanned.

use crate::deck::DeckScan;
use crate::error::TrackerError;
use crate::id::{HolderId, ResourceType};
use crate::slot::{ReserveSlot, Slot};
use std::collections::{BTreeMap, BTreeSet};

/// Which part of the deck a holder occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Primary,
    Reserve,
}

/// A holder and the slot the ledger last saw it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderRecord {
    pub id: HolderId,
    pub slot: Slot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Entry {
    primary: Vec<HolderRecord>,
    reserve: Vec<HolderRecord>,
}

impl Entry {
    fn tier(&self, tier: Tier) -> &Vec<HolderRecord> {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Reserve => &self.reserve,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut Vec<HolderRecord> {
        match tier {
            Tier::Primary => &mut self.primary,
            Tier::Reserve => &mut self.reserve,
        }
    }
}

/// Result of rebuilding one type from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanSummary {
    pub primary: usize,
    pub reserve: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    reserve_slots: BTreeSet<Slot>,
    entries: BTreeMap<ResourceType, Entry>,
    /// Every non-reserve slot a type's holders have been seen on.
    homes: BTreeMap<ResourceType, BTreeSet<Slot>>,
    /// Holders ever introduced per type, including magazine stock.
    loaded: BTreeMap<ResourceType, u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Reserve slots
    // -----------------------------------------------------------------------

    /// Add reserve slots. Duplicates are ignored.
    pub fn add_reserve_slots(&mut self, slots: impl IntoIterator<Item = ReserveSlot>) {
        self.reserve_slots
            .extend(slots.into_iter().map(ReserveSlot::slot));
    }

    pub fn reserve_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.reserve_slots.iter().copied()
    }

    pub fn has_reserve_slots(&self) -> bool {
        !self.reserve_slots.is_empty()
    }

    pub fn is_reserve(&self, slot: Slot) -> bool {
        self.reserve_slots.contains(&slot)
    }

    pub fn tier_of(&self, slot: Slot) -> Tier {
        if self.is_reserve(slot) {
            Tier::Reserve
        } else {
            Tier::Primary
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Make a type known without registering any holder.
    pub fn introduce(&mut self, resource: &ResourceType) {
        self.entries.entry(resource.clone()).or_default();
    }

    pub fn contains(&self, resource: &ResourceType) -> bool {
        self.entries.contains_key(resource)
    }

    pub fn types(&self) -> impl Iterator<Item = &ResourceType> {
        self.entries.keys()
    }

    /// Record a holder placed on `slot`. Returns the tier it was filed under.
    pub fn register(&mut self, resource: &ResourceType, holder: HolderId, slot: Slot) -> Tier {
        let tier = self.tier_of(slot);
        self.entries
            .entry(resource.clone())
            .or_default()
            .tier_mut(tier)
            .push(HolderRecord { id: holder, slot });
        if tier == Tier::Primary {
            self.remember_home(resource, slot);
        }
        self.count_loaded(resource, 1);
        tier
    }

    fn remember_home(&mut self, resource: &ResourceType, slot: Slot) {
        self.homes.entry(resource.clone()).or_default().insert(slot);
    }

    /// Count holders introduced without a slot (magazine stock).
    pub fn count_loaded(&mut self, resource: &ResourceType, count: u32) {
        *self.loaded.entry(resource.clone()).or_insert(0) += count;
    }

    pub fn loaded_count(&self, resource: &ResourceType) -> u32 {
        self.loaded.get(resource).copied().unwrap_or(0)
    }

    /// Remove a holder from whichever tier holds it.
    pub fn remove(
        &mut self,
        resource: &ResourceType,
        holder: HolderId,
    ) -> Option<(Tier, HolderRecord)> {
        let entry = self.entries.get_mut(resource)?;
        for tier in [Tier::Primary, Tier::Reserve] {
            let list = entry.tier_mut(tier);
            if let Some(pos) = list.iter().position(|r| r.id == holder) {
                return Some((tier, list.remove(pos)));
            }
        }
        None
    }

    /// Forget every holder of a type on both tiers. The type stays known.
    pub fn clear(&mut self, resource: &ResourceType) -> Vec<HolderRecord> {
        match self.entries.get_mut(resource) {
            Some(entry) => {
                let mut removed = std::mem::take(&mut entry.primary);
                removed.append(&mut entry.reserve);
                removed
            }
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn holders_of(
        &self,
        resource: &ResourceType,
        tier: Tier,
    ) -> Result<&[HolderRecord], TrackerError> {
        self.entries
            .get(resource)
            .map(|entry| entry.tier(tier).as_slice())
            .ok_or_else(|| TrackerError::UnknownResourceType(resource.clone()))
    }

    pub fn holder_ids(
        &self,
        resource: &ResourceType,
        tier: Tier,
    ) -> Result<Vec<HolderId>, TrackerError> {
        Ok(self
            .holders_of(resource, tier)?
            .iter()
            .map(|r| r.id)
            .collect())
    }

    /// Slots the type's primary holders have occupied at any point, whether
    /// or not they still do.
    pub fn seen_home_slots(&self, resource: &ResourceType) -> Vec<Slot> {
        self.homes
            .get(resource)
            .map(|slots| slots.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Primary holders of a type that report no remaining unit in `scan`.
    /// Holders missing from the scan are skipped.
    pub fn depleted_primary(&self, resource: &ResourceType, scan: &DeckScan) -> Vec<HolderRecord> {
        let Some(entry) = self.entries.get(resource) else {
            return Vec::new();
        };
        entry
            .primary
            .iter()
            .filter(|record| {
                scan.holder_at(record.slot)
                    .is_some_and(|info| info.id == record.id && !info.has_units)
            })
            .copied()
            .collect()
    }

    /// Rebuild a type's tiers from live slot occupancy.
    ///
    /// Fixtures are skipped and adapters are unwrapped to find the holder's
    /// real type. A slot counts as reserve when it is a configured reserve slot.
    /// Spent holders parked on reserve slots are not supply and are left out.
    pub fn rescan(&mut self, resource: &ResourceType, scan: &DeckScan) -> RescanSummary {
        let mut rebuilt = Entry::default();
        for (slot, info) in scan.holders() {
            if &info.resource != resource {
                continue;
            }
            let tier = self.tier_of(slot);
            if tier == Tier::Reserve && !info.has_units {
                continue;
            }
            rebuilt
                .tier_mut(tier)
                .push(HolderRecord { id: info.id, slot });
        }
        for record in &rebuilt.primary {
            self.homes
                .entry(resource.clone())
                .or_default()
                .insert(record.slot);
        }
        let summary = RescanSummary {
            primary: rebuilt.primary.len(),
            reserve: rebuilt.reserve.len(),
        };
        self.entries.insert(resource.clone(), rebuilt);
        tracing::debug!(
            target: "ledger",
            resource = %resource,
            primary = summary.primary,
            reserve = summary.reserve,
            "ledger_rescanned"
        );
        summary
    }

    /// Rebuild every known type.
    pub fn rescan_all(&mut self, scan: &DeckScan) {
        let known: Vec<ResourceType> = self.entries.keys().cloned().collect();
        for resource in &known {
            self.rescan(resource, scan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{HolderInfo, Occupant};
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<HolderId> {
        let mut sm = SlotMap::<HolderId, ()>::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn slot(s: &str) -> Slot {
        s.parse().unwrap()
    }

    fn rack(name: &str) -> ResourceType {
        ResourceType::new(name)
    }

    fn holder(id: HolderId, name: &str, has_units: bool) -> Occupant {
        Occupant::Holder(HolderInfo {
            id,
            resource: rack(name),
            has_units,
        })
    }

    #[test]
    fn register_classifies_by_reserve_set() {
        let h = ids(2);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::A4]);

        assert_eq!(ledger.register(&rack("r"), h[0], slot("A1")), Tier::Primary);
        assert_eq!(ledger.register(&rack("r"), h[1], slot("A4")), Tier::Reserve);

        assert_eq!(ledger.holders_of(&rack("r"), Tier::Primary).unwrap().len(), 1);
        assert_eq!(ledger.holders_of(&rack("r"), Tier::Reserve).unwrap()[0].slot, slot("A4"));
        assert_eq!(ledger.loaded_count(&rack("r")), 2);
    }

    #[test]
    fn expansion_slot_is_primary_unless_configured() {
        let ledger = Ledger::new();
        assert_eq!(ledger.tier_of(slot("B4")), Tier::Primary);
        assert!(!ledger.has_reserve_slots());
    }

    #[test]
    fn add_reserve_slots_deduplicates() {
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::A4, ReserveSlot::B4]);
        ledger.add_reserve_slots([ReserveSlot::B4]);
        assert_eq!(ledger.reserve_slots().count(), 2);
    }

    #[test]
    fn unknown_type_query_fails() {
        let ledger = Ledger::new();
        let result = ledger.holders_of(&rack("ghost"), Tier::Primary);
        assert_eq!(result, Err(TrackerError::UnknownResourceType(rack("ghost"))));
    }

    #[test]
    fn introduce_makes_type_known_and_empty() {
        let mut ledger = Ledger::new();
        ledger.introduce(&rack("r"));
        assert!(ledger.contains(&rack("r")));
        assert!(ledger.holders_of(&rack("r"), Tier::Primary).unwrap().is_empty());
    }

    #[test]
    fn remove_finds_either_tier() {
        let h = ids(2);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::D4]);
        ledger.register(&rack("r"), h[0], slot("A1"));
        ledger.register(&rack("r"), h[1], slot("D4"));

        let (tier, record) = ledger.remove(&rack("r"), h[1]).unwrap();
        assert_eq!(tier, Tier::Reserve);
        assert_eq!(record.slot, slot("D4"));
        assert!(ledger.remove(&rack("r"), h[1]).is_none());
        assert!(ledger.remove(&rack("other"), h[0]).is_none());
    }

    #[test]
    fn clear_empties_both_tiers_but_keeps_type() {
        let h = ids(2);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::D4]);
        ledger.register(&rack("r"), h[0], slot("A1"));
        ledger.register(&rack("r"), h[1], slot("D4"));
        let removed = ledger.clear(&rack("r"));
        assert_eq!(removed.len(), 2);
        assert!(ledger.contains(&rack("r")));
        assert!(ledger.holder_ids(&rack("r"), Tier::Reserve).unwrap().is_empty());
    }

    #[test]
    fn rescan_rebuilds_from_occupancy() {
        let h = ids(4);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::C4]);
        // Stale record that no longer matches the deck.
        ledger.register(&rack("r"), h[3], slot("B2"));

        let mut slots = BTreeMap::new();
        slots.insert(slot("A1"), holder(h[0], "r", true));
        slots.insert(slot("C4"), holder(h[1], "r", true));
        slots.insert(slot("A2"), holder(h[2], "other", true));
        slots.insert(slot("A3"), Occupant::Fixture { name: "thermocycler".into() });
        let scan = DeckScan::new(slots);

        let summary = ledger.rescan(&rack("r"), &scan);
        assert_eq!(summary, RescanSummary { primary: 1, reserve: 1 });
        assert_eq!(ledger.holder_ids(&rack("r"), Tier::Primary).unwrap(), vec![h[0]]);
        assert_eq!(ledger.holder_ids(&rack("r"), Tier::Reserve).unwrap(), vec![h[1]]);
        assert!(!ledger.contains(&rack("other")));
    }

    #[test]
    fn rescan_unwraps_adapter_to_true_type() {
        let h = ids(1);
        let mut ledger = Ledger::new();
        let mut slots = BTreeMap::new();
        slots.insert(
            slot("B1"),
            Occupant::Adapter {
                child: Some(HolderInfo {
                    id: h[0],
                    resource: rack("r"),
                    has_units: true,
                }),
            },
        );
        let scan = DeckScan::new(slots);
        ledger.rescan(&rack("r"), &scan);
        assert_eq!(ledger.holders_of(&rack("r"), Tier::Primary).unwrap()[0].slot, slot("B1"));
    }

    #[test]
    fn depleted_primary_uses_live_unit_state() {
        let h = ids(3);
        let mut ledger = Ledger::new();
        ledger.register(&rack("r"), h[0], slot("A1"));
        ledger.register(&rack("r"), h[1], slot("A2"));
        ledger.register(&rack("r"), h[2], slot("A3"));

        let mut slots = BTreeMap::new();
        slots.insert(slot("A1"), holder(h[0], "r", false));
        slots.insert(slot("A2"), holder(h[1], "r", true));
        // h[2] was removed out of band.
        let scan = DeckScan::new(slots);

        let depleted = ledger.depleted_primary(&rack("r"), &scan);
        assert_eq!(depleted.len(), 1);
        assert_eq!(depleted[0].id, h[0]);
        assert!(ledger.depleted_primary(&rack("ghost"), &scan).is_empty());
    }

    #[test]
    fn rescan_skips_spent_holders_on_reserve_slots() {
        let h = ids(2);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::A4]);
        let mut slots = BTreeMap::new();
        slots.insert(slot("A4"), holder(h[0], "r", false));
        slots.insert(slot("A1"), holder(h[1], "r", false));
        let summary = ledger.rescan(&rack("r"), &DeckScan::new(slots));
        assert_eq!(summary, RescanSummary { primary: 1, reserve: 0 });
    }

    #[test]
    fn seen_home_slots_outlive_their_holders() {
        let h = ids(3);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots([ReserveSlot::A4]);
        ledger.register(&rack("r"), h[0], slot("A1"));
        ledger.register(&rack("r"), h[1], slot("A4"));
        let mut slots = BTreeMap::new();
        slots.insert(slot("B2"), holder(h[2], "r", true));
        ledger.rescan(&rack("r"), &DeckScan::new(slots));

        assert_eq!(ledger.holders_of(&rack("r"), Tier::Primary).unwrap()[0].slot, slot("B2"));
        assert_eq!(ledger.seen_home_slots(&rack("r")), vec![slot("A1"), slot("B2")]);
        assert!(ledger.seen_home_slots(&rack("ghost")).is_empty());
    }

    #[test]
    fn rescan_all_touches_only_known_types() {
        let h = ids(2);
        let mut ledger = Ledger::new();
        ledger.introduce(&rack("a"));
        let mut slots = BTreeMap::new();
        slots.insert(slot("A1"), holder(h[0], "a", true));
        slots.insert(slot("A2"), holder(h[1], "b", true));
        ledger.rescan_all(&DeckScan::new(slots));
        assert_eq!(ledger.holder_ids(&rack("a"), Tier::Primary).unwrap(), vec![h[0]]);
        assert!(!ledger.contains(&rack("b")));
    }
}
