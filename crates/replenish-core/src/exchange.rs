//! Reserve exchanger: brings reserve holders onto primary slots.
//!
//! Two strategies, fixed when the tracker is built:
//!
//! - **Direct**: the disposal router has already removed the emptied holder,
//!   so the reserve holder moves straight into the freed slot.
//! - **Carousel**: nothing can leave the deck, so every exchange takes
//!   exactly two moves through the buffer slot. The emptied holder goes to
//!   the buffer, the reserve holder takes its place, and the slot the
//!   reserve holder left becomes the new buffer.
//!
//! The exchanger only moves holders. The caller rebuilds the ledger from a
//! fresh scan afterwards.

use crate::deck::{DeckScan, Destination, Movable, Workcell};
use crate::disposal::DisposalRouter;
use crate::error::TrackerError;
use crate::id::{HolderId, ResourceType};
use crate::ledger::HolderRecord;
use crate::slot::Slot;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStrategy {
    Direct,
    Carousel,
}

impl ExchangeStrategy {
    pub fn for_router(router: &DisposalRouter) -> Self {
        if router.is_automated() {
            ExchangeStrategy::Direct
        } else {
            ExchangeStrategy::Carousel
        }
    }
}

/// One physical move issued by the exchanger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderMove {
    pub holder: HolderId,
    pub from: Slot,
    pub to: Slot,
}

#[derive(Debug, Clone)]
pub struct Exchanger {
    strategy: ExchangeStrategy,
    buffer: Option<Slot>,
    original_buffer: Option<Slot>,
    gripper: bool,
    verbose: bool,
    /// Reserve slots emptied by swaps, per type.
    vacated: BTreeMap<ResourceType, BTreeSet<Slot>>,
}

impl Exchanger {
    pub fn new(
        strategy: ExchangeStrategy,
        buffer: Option<Slot>,
        gripper: bool,
        verbose: bool,
    ) -> Self {
        Self {
            strategy,
            buffer,
            original_buffer: buffer,
            gripper,
            verbose,
            vacated: BTreeMap::new(),
        }
    }

    pub fn strategy(&self) -> ExchangeStrategy {
        self.strategy
    }

    /// The slot currently kept empty for carousel moves.
    pub fn buffer(&self) -> Option<Slot> {
        self.buffer
    }

    pub fn original_buffer(&self) -> Option<Slot> {
        self.original_buffer
    }

    /// Move reserve holders onto `targets`, pairwise in order. Surplus
    /// holders or targets are left alone.
    pub fn direct<W: Workcell>(
        &mut self,
        workcell: &mut W,
        resource: &ResourceType,
        reserve: &[HolderRecord],
        targets: &[Slot],
    ) -> Result<Vec<HolderMove>, TrackerError> {
        let mut moves = Vec::new();
        for (holder, &target) in reserve.iter().zip(targets) {
            self.move_holder(workcell, resource, *holder, target, &mut moves)?;
            self.vacated
                .entry(resource.clone())
                .or_default()
                .insert(holder.slot);
        }
        Ok(moves)
    }

    /// Two-move exchange of each `away` holder with the matching `into`
    /// holder. Fails before moving anything when no buffer is configured.
    pub fn carousel<W: Workcell>(
        &mut self,
        workcell: &mut W,
        resource: &ResourceType,
        away: &[HolderRecord],
        into: &[HolderRecord],
    ) -> Result<Vec<HolderMove>, TrackerError> {
        if self.buffer.is_none() {
            return Err(TrackerError::NoBufferSlot);
        }
        let mut moves = Vec::new();
        for (old, new) in away.iter().zip(into) {
            let buffer = self.buffer.ok_or(TrackerError::NoBufferSlot)?;
            self.move_holder(workcell, resource, *old, buffer, &mut moves)?;
            self.move_holder(workcell, resource, *new, old.slot, &mut moves)?;
            self.buffer = Some(new.slot);
            self.vacated
                .entry(resource.clone())
                .or_default()
                .insert(new.slot);
            tracing::debug!(
                target: "exchange",
                resource = %resource,
                buffer = %new.slot,
                "buffer_rotated"
            );
        }
        Ok(moves)
    }

    /// Put the buffer back on its configured slot if that slot is empty.
    pub fn restore_buffer(&mut self, scan: &DeckScan) -> bool {
        match self.original_buffer {
            Some(original) if self.buffer != Some(original) && scan.is_empty(original) => {
                self.buffer = Some(original);
                tracing::debug!(target: "exchange", buffer = %original, "buffer_restored");
                true
            }
            _ => false,
        }
    }

    /// Reserve slots this type has emptied, in slot order.
    pub fn vacated(&self, resource: &ResourceType) -> Vec<Slot> {
        self.vacated
            .get(resource)
            .map(|slots| slots.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn forget_vacated(&mut self, resource: &ResourceType, slots: &[Slot]) {
        if let Some(known) = self.vacated.get_mut(resource) {
            for slot in slots {
                known.remove(slot);
            }
        }
    }

    fn move_holder<W: Workcell>(
        &self,
        workcell: &mut W,
        resource: &ResourceType,
        holder: HolderRecord,
        to: Slot,
        moves: &mut Vec<HolderMove>,
    ) -> Result<(), TrackerError> {
        workcell.transfer(Movable::Holder(holder.id), Destination::Slot(to), self.gripper)?;
        if self.verbose {
            workcell.comment(&format!("Moving {resource} from {} to {to}", holder.slot));
        }
        moves.push(HolderMove {
            holder: holder.id,
            from: holder.slot,
            to,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WasteKind;
    use crate::test_utils::{SimulatedWorkcell, slot, tips};

    fn record(cell: &mut SimulatedWorkcell, at: &str) -> HolderRecord {
        let id = cell.place_holder(&tips(), slot(at));
        HolderRecord { id, slot: slot(at) }
    }

    #[test]
    fn strategy_follows_disposal_capability() {
        let automated = DisposalRouter::new(WasteKind::Chute, true);
        let manual = DisposalRouter::new(WasteKind::Bin, true);
        assert_eq!(ExchangeStrategy::for_router(&automated), ExchangeStrategy::Direct);
        assert_eq!(ExchangeStrategy::for_router(&manual), ExchangeStrategy::Carousel);
    }

    #[test]
    fn direct_moves_reserve_into_freed_slot() {
        let mut cell = SimulatedWorkcell::new(4);
        let reserve = record(&mut cell, "A4");
        let mut exchanger = Exchanger::new(ExchangeStrategy::Direct, None, true, false);

        let moves = exchanger
            .direct(&mut cell, &tips(), &[reserve], &[slot("B1")])
            .unwrap();
        assert_eq!(
            moves,
            vec![HolderMove {
                holder: reserve.id,
                from: slot("A4"),
                to: slot("B1")
            }]
        );
        assert_eq!(cell.slot_of(reserve.id), Some(slot("B1")));
        assert_eq!(exchanger.vacated(&tips()), vec![slot("A4")]);
    }

    #[test]
    fn carousel_uses_exactly_two_moves_and_rotates_buffer() {
        let mut cell = SimulatedWorkcell::new(4);
        let old = record(&mut cell, "B1");
        let new = record(&mut cell, "A4");
        let mut exchanger =
            Exchanger::new(ExchangeStrategy::Carousel, Some(slot("C3")), true, true);

        let moves = exchanger.carousel(&mut cell, &tips(), &[old], &[new]).unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].to, slot("C3"));
        assert_eq!(moves[1].to, slot("B1"));
        assert_eq!(cell.slot_of(old.id), Some(slot("C3")));
        assert_eq!(cell.slot_of(new.id), Some(slot("B1")));
        assert_eq!(exchanger.buffer(), Some(slot("A4")));
        assert_eq!(exchanger.original_buffer(), Some(slot("C3")));
        assert_eq!(cell.comments().len(), 2);
    }

    #[test]
    fn carousel_without_buffer_fails_before_moving() {
        let mut cell = SimulatedWorkcell::new(4);
        let old = record(&mut cell, "B1");
        let new = record(&mut cell, "A4");
        let mut exchanger = Exchanger::new(ExchangeStrategy::Carousel, None, false, false);
        let result = exchanger.carousel(&mut cell, &tips(), &[old], &[new]);
        assert_eq!(result, Err(TrackerError::NoBufferSlot));
        assert!(cell.transfers().is_empty());
    }

    #[test]
    fn consecutive_carousels_never_reuse_a_vacated_slot() {
        let mut cell = SimulatedWorkcell::new(4);
        let first_old = record(&mut cell, "B1");
        let first_new = record(&mut cell, "A4");
        let second_new = record(&mut cell, "B4");
        let mut exchanger =
            Exchanger::new(ExchangeStrategy::Carousel, Some(slot("C3")), true, false);

        exchanger
            .carousel(&mut cell, &tips(), &[first_old], &[first_new])
            .unwrap();
        let second_old = HolderRecord {
            id: first_new.id,
            slot: slot("B1"),
        };
        exchanger
            .carousel(&mut cell, &tips(), &[second_old], &[second_new])
            .unwrap();

        assert_eq!(cell.slot_of(first_new.id), Some(slot("A4")));
        assert_eq!(cell.slot_of(second_new.id), Some(slot("B1")));
        assert_eq!(exchanger.buffer(), Some(slot("B4")));
        assert_eq!(exchanger.vacated(&tips()), vec![slot("A4"), slot("B4")]);
    }

    #[test]
    fn buffer_restores_only_onto_an_empty_slot() {
        let mut cell = SimulatedWorkcell::new(4);
        let old = record(&mut cell, "B1");
        let new = record(&mut cell, "A4");
        let mut exchanger =
            Exchanger::new(ExchangeStrategy::Carousel, Some(slot("C3")), true, false);
        exchanger.carousel(&mut cell, &tips(), &[old], &[new]).unwrap();

        assert!(!exchanger.restore_buffer(&cell.scan_slots()));
        assert_eq!(exchanger.buffer(), Some(slot("A4")));

        cell.remove(slot("C3"));
        assert!(exchanger.restore_buffer(&cell.scan_slots()));
        assert_eq!(exchanger.buffer(), Some(slot("C3")));
    }

    #[test]
    fn forget_vacated_drops_only_named_slots() {
        let mut cell = SimulatedWorkcell::new(4);
        let a = record(&mut cell, "A4");
        let b = record(&mut cell, "B4");
        let mut exchanger = Exchanger::new(ExchangeStrategy::Direct, None, true, false);
        exchanger
            .direct(&mut cell, &tips(), &[a, b], &[slot("A1"), slot("A2")])
            .unwrap();
        exchanger.forget_vacated(&tips(), &[slot("A4")]);
        assert_eq!(exchanger.vacated(&tips()), vec![slot("B4")]);
    }
}
