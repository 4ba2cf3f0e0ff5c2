//! Property-based tests for the replenish core.
//!
//! Uses proptest to generate random decks, then verify that the ledger
//! rebuild classifies every holder and that slot names parse consistently.

use proptest::prelude::*;
use replenish_core::deck::{DeckScan, HolderInfo, Occupant};
use replenish_core::id::{HolderId, ResourceType};
use replenish_core::ledger::{Ledger, Tier};
use replenish_core::slot::{ReserveSlot, Slot};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ===========================================================================
// Generators
// ===========================================================================

/// What a generated slot holds: nothing, a fixture, or a holder of one of
/// two types with or without units, optionally on an adapter.
#[derive(Debug, Clone)]
enum Cell {
    Empty,
    Fixture,
    Holder { type_a: bool, has_units: bool, on_adapter: bool },
}

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        2 => Just(Cell::Empty),
        1 => Just(Cell::Fixture),
        4 => (any::<bool>(), any::<bool>(), prop::bool::weighted(0.2)).prop_map(
            |(type_a, has_units, on_adapter)| Cell::Holder { type_a, has_units, on_adapter }
        ),
    ]
}

fn type_a() -> ResourceType {
    ResourceType::new("tiprack_200ul")
}

fn type_b() -> ResourceType {
    ResourceType::new("tiprack_1000ul")
}

/// Build a scan from one generated cell per deck slot.
fn build_scan(cells: &[Cell]) -> (DeckScan, Vec<(Slot, HolderId, bool, bool)>) {
    let mut ids: SlotMap<HolderId, ()> = SlotMap::with_key();
    let mut slots = BTreeMap::new();
    let mut placed = Vec::new();
    for (slot, cell) in Slot::all().zip(cells) {
        match *cell {
            Cell::Empty => {}
            Cell::Fixture => {
                slots.insert(slot, Occupant::Fixture { name: "magnetic_module".into() });
            }
            Cell::Holder { type_a: is_a, has_units, on_adapter } => {
                let id = ids.insert(());
                let info = HolderInfo {
                    id,
                    resource: if is_a { type_a() } else { type_b() },
                    has_units,
                };
                let occupant = if on_adapter {
                    Occupant::Adapter { child: Some(info) }
                } else {
                    Occupant::Holder(info)
                };
                slots.insert(slot, occupant);
                placed.push((slot, id, is_a, has_units));
            }
        }
    }
    (DeckScan::new(slots), placed)
}

// ===========================================================================
// Ledger rescan
// ===========================================================================

proptest! {
    #[test]
    fn rescan_classifies_every_holder(
        cells in proptest::collection::vec(arb_cell(), 16),
        reserve in proptest::sample::subsequence(ReserveSlot::ALL.to_vec(), 0..=4),
    ) {
        let (scan, placed) = build_scan(&cells);
        let mut ledger = Ledger::new();
        ledger.add_reserve_slots(reserve.iter().copied());

        let summary = ledger.rescan(&type_a(), &scan);

        let primary = ledger.holders_of(&type_a(), Tier::Primary).unwrap();
        let reserve_tier = ledger.holders_of(&type_a(), Tier::Reserve).unwrap();
        prop_assert_eq!(summary.primary, primary.len());
        prop_assert_eq!(summary.reserve, reserve_tier.len());

        for (slot, id, is_a, has_units) in placed {
            let in_primary = primary.iter().any(|r| r.id == id && r.slot == slot);
            let in_reserve = reserve_tier.iter().any(|r| r.id == id && r.slot == slot);
            if !is_a {
                prop_assert!(!in_primary && !in_reserve);
            } else if ledger.is_reserve(slot) {
                // Spent holders on reserve slots are not supply.
                prop_assert_eq!(in_reserve, has_units);
                prop_assert!(!in_primary);
            } else {
                prop_assert!(in_primary && !in_reserve);
            }
        }
    }

    #[test]
    fn depleted_primary_reports_only_spent_holders(
        cells in proptest::collection::vec(arb_cell(), 16),
    ) {
        let (scan, _) = build_scan(&cells);
        let mut ledger = Ledger::new();
        ledger.rescan(&type_a(), &scan);

        for record in ledger.depleted_primary(&type_a(), &scan) {
            let info = scan.holder_at(record.slot).unwrap();
            prop_assert_eq!(info.id, record.id);
            prop_assert!(!info.has_units);
        }
    }
}

// ===========================================================================
// Slot names
// ===========================================================================

proptest! {
    #[test]
    fn slot_parse_accepts_exactly_the_grid(row in any::<char>(), column in 0u8..10) {
        let name = format!("{row}{column}");
        let on_grid = matches!(row.to_ascii_uppercase(), 'A'..='D') && (1..=4).contains(&column);
        prop_assert_eq!(name.parse::<Slot>().is_ok(), on_grid);
        prop_assert_eq!(
            name.parse::<ReserveSlot>().is_ok(),
            on_grid && column == 4
        );
    }
}
