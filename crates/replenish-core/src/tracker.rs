//! The tracker: owns every component and exposes the commands scripts call.
//!
//! # Consume pipeline
//!
//! [`Tracker::consume`] asks the workcell for a unit. On
//! `ResourceExhausted` it runs one recovery:
//!
//! 1. Optional bulk sweep of other types' depleted holders (`refill_all`).
//! 2. [`select_action`] over reserve and magazine availability.
//! 3. Execute the branch: reserve exchange, magazine dispense or an
//!    operator refill.
//! 4. Rebuild the ledger for the type from a fresh scan and rebind every
//!    consumer bound to it.
//! 5. Retry once. A second exhaustion is [`TrackerError::ReplenishmentRetryFailed`].

use crate::assignment::AssignmentTable;
use crate::config::TrackerConfig;
use crate::consumer::{ConsumerBinding, ConsumerRef, resolve};
use crate::deck::{ActuationError, DeckScan, Destination, Locus, Movable, Occupant, Workcell};
use crate::disposal::{DisposalPath, DisposalReceipt, DisposalRouter};
use crate::error::TrackerError;
use crate::event::{EventLog, TrackerEvent};
use crate::exchange::{ExchangeStrategy, Exchanger, HolderMove};
use crate::id::{ConsumerId, HolderId, MagazineId, ResourceType};
use crate::ledger::{HolderRecord, Ledger, RescanSummary, Tier};
use crate::magazine::MagazineBank;
use crate::orchestrator::{ConsumeOutcome, RecoveryAction, TrackerState, select_action};
use crate::slot::{ReserveSlot, Slot, format_slots};
use std::collections::{BTreeMap, BTreeSet};

/// Most resource types a single load call may place.
pub const MAX_LOAD_BATCH: usize = 3;

pub struct Tracker<W: Workcell> {
    config: TrackerConfig,
    workcell: W,
    ledger: Ledger,
    assignments: AssignmentTable,
    consumers: ConsumerBinding,
    magazines: MagazineBank,
    exchanger: Exchanger,
    router: DisposalRouter,
    events: EventLog,
    state: TrackerState,
    consumed: BTreeMap<ResourceType, u64>,
}

impl<W: Workcell> Tracker<W> {
    pub fn new(config: TrackerConfig, workcell: W) -> Result<Self, TrackerError> {
        config.validate()?;
        let router = DisposalRouter::new(config.waste, config.use_gripper);
        let exchanger = Exchanger::new(
            ExchangeStrategy::for_router(&router),
            config.buffer_slot,
            config.use_gripper,
            config.verbose,
        );

        let mut ledger = Ledger::new();
        ledger.add_reserve_slots(config.reserve_slots.iter().copied());
        let mut assignments = AssignmentTable::new();
        for (resource, slots) in &config.assignments {
            assignments.assign(resource, slots.iter().copied());
            ledger.introduce(resource);
        }

        tracing::info!(
            target: "tracker",
            strategy = ?exchanger.strategy(),
            reserve_slots = config.reserve_slots.len(),
            buffer = ?config.buffer_slot,
            "tracker_created"
        );

        Ok(Self {
            config,
            workcell,
            ledger,
            assignments,
            consumers: ConsumerBinding::new(),
            magazines: MagazineBank::new(),
            exchanger,
            router,
            events: EventLog::new(),
            state: TrackerState::default(),
            consumed: BTreeMap::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn workcell(&self) -> &W {
        &self.workcell
    }

    /// Direct access to the workcell. Moves made through it are invisible
    /// to the ledger until [`rescan`](Self::rescan).
    pub fn workcell_mut(&mut self) -> &mut W {
        &mut self.workcell
    }

    pub fn into_workcell(self) -> W {
        self.workcell
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn assignments(&self) -> &AssignmentTable {
        &self.assignments
    }

    pub fn consumers(&self) -> &ConsumerBinding {
        &self.consumers
    }

    pub fn magazines(&self) -> &MagazineBank {
        &self.magazines
    }

    pub fn exchanger(&self) -> &Exchanger {
        &self.exchanger
    }

    pub fn router(&self) -> &DisposalRouter {
        &self.router
    }

    /// Events recorded since the last [`drain_events`](Self::drain_events).
    /// The log is unbounded, so a long-running host should drain it after
    /// each command.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every recorded event, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<TrackerEvent> {
        self.events.drain()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    // -----------------------------------------------------------------------
    // Usage accounting
    // -----------------------------------------------------------------------

    pub fn units_consumed(&self, resource: &ResourceType) -> u64 {
        self.consumed.get(resource).copied().unwrap_or(0)
    }

    /// Holders ever introduced for a type, magazine stock included.
    pub fn holders_loaded(&self, resource: &ResourceType) -> u32 {
        self.ledger.loaded_count(resource)
    }

    pub fn pickups(&self, consumer: impl Into<ConsumerRef>) -> Result<u64, TrackerError> {
        Ok(self.consumers.pickups(resolve(consumer)?))
    }

    pub fn drops(&self, consumer: impl Into<ConsumerRef>) -> Result<u64, TrackerError> {
        Ok(self.consumers.drops(resolve(consumer)?))
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Add reserve slots by name. Nothing is added unless every name parses.
    pub fn add_reserve_slots<S: AsRef<str>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<(), TrackerError> {
        let parsed = names
            .into_iter()
            .map(|name| name.as_ref().parse::<ReserveSlot>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(TrackerError::InvalidReserveSlot)?;
        self.ledger.add_reserve_slots(parsed);
        let scan = self.workcell.scan_slots();
        self.ledger.rescan_all(&scan);
        Ok(())
    }

    pub fn assign_slots(&mut self, resource: &ResourceType, slots: impl IntoIterator<Item = Slot>) {
        self.assignments.assign(resource, slots);
        self.ledger.introduce(resource);
    }

    /// Place fresh holders for up to [`MAX_LOAD_BATCH`] types. Every target
    /// slot is checked before anything is loaded.
    pub fn load_holders(
        &mut self,
        batch: &[(ResourceType, Vec<Slot>)],
    ) -> Result<Vec<HolderId>, TrackerError> {
        if batch.len() > MAX_LOAD_BATCH {
            return Err(TrackerError::LoadBatchTooLarge {
                max: MAX_LOAD_BATCH,
                got: batch.len(),
            });
        }

        let scan = self.workcell.scan_slots();
        let mut claimed = BTreeSet::new();
        for (resource, slots) in batch {
            for &slot in slots {
                check_free(&scan, resource, slot)?;
                if !claimed.insert(slot) {
                    return Err(TrackerError::SlotUnavailable {
                        resource: resource.clone(),
                        slot,
                    });
                }
            }
        }

        let mut loaded = Vec::new();
        for (resource, slots) in batch {
            self.ledger.introduce(resource);
            for &slot in slots {
                loaded.push(self.load_one(resource, slot)?);
            }
            tracing::info!(
                target: "tracker",
                resource = %resource,
                slots = %format_slots(slots),
                "holders_loaded"
            );
        }
        Ok(loaded)
    }

    /// Load holders and make their primary slots the type's home.
    pub fn add_starting_holders(
        &mut self,
        resource: &ResourceType,
        slots: &[Slot],
    ) -> Result<Vec<HolderId>, TrackerError> {
        let loaded = self.load_holders(&[(resource.clone(), slots.to_vec())])?;
        let primary: Vec<Slot> = slots
            .iter()
            .copied()
            .filter(|&s| !self.ledger.is_reserve(s))
            .collect();
        self.assignments.assign(resource, primary);
        Ok(loaded)
    }

    /// Rebuild a type's ledger entry from the deck and rebind its consumers.
    pub fn rescan(&mut self, resource: &ResourceType) -> Result<RescanSummary, TrackerError> {
        if !self.ledger.contains(resource) {
            return Err(TrackerError::UnknownResourceType(resource.clone()));
        }
        self.rebuild(resource)
    }

    pub fn bind(
        &mut self,
        consumer: impl Into<ConsumerRef>,
        resource: &ResourceType,
    ) -> Result<(), TrackerError> {
        let consumer = resolve(consumer)?;
        self.consumers.bind(consumer, resource, &self.ledger)?;
        self.events.push(TrackerEvent::ConsumerBound {
            consumer,
            resource: resource.clone(),
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Consumption
    // -----------------------------------------------------------------------

    /// Take one unit for `consumer`, recovering once from exhaustion.
    pub fn consume(
        &mut self,
        consumer: impl Into<ConsumerRef>,
        locus: Option<Locus>,
        refill_all: bool,
    ) -> Result<ConsumeOutcome, TrackerError> {
        let consumer = resolve(consumer)?;
        let resource = self
            .consumers
            .bound_type(consumer)
            .cloned()
            .ok_or(TrackerError::ConsumerUnbound(consumer))?;

        self.state = TrackerState::Serving;
        match self.try_consume(consumer, &resource, locus) {
            Ok(()) => return Ok(ConsumeOutcome::Clean),
            Err(ActuationError::ResourceExhausted { .. }) => {}
            Err(other) => return Err(other.into()),
        }

        self.state = TrackerState::Depleting;
        tracing::info!(
            target: "tracker",
            consumer = %consumer,
            resource = %resource,
            "resource_exhausted"
        );
        self.events.push(TrackerEvent::Exhausted {
            consumer,
            resource: resource.clone(),
        });

        if refill_all {
            self.refill_other_types(&resource)?;
        }

        let reserve_available = !self.ledger.holders_of(&resource, Tier::Reserve)?.is_empty();
        let action = select_action(reserve_available, self.magazines.has_stock(&resource));
        tracing::info!(
            target: "tracker",
            resource = %resource,
            action = ?action,
            "recovery_selected"
        );
        self.events.push(TrackerEvent::RecoverySelected {
            resource: resource.clone(),
            action,
        });

        self.state = action.into();
        match action {
            RecoveryAction::ReserveSwap => self.swap_from_reserve(&resource)?,
            RecoveryAction::MagazineSwap => self.swap_from_magazine(&resource)?,
            RecoveryAction::ManualRefill => self.manual_refill(&resource)?,
        }
        self.rebuild(&resource)?;

        let outcome = ConsumeOutcome::after(action, self.exchanger.strategy());
        match self.try_consume(consumer, &resource, None) {
            Ok(()) => {
                self.state = TrackerState::Served;
                self.events.push(TrackerEvent::Retried { consumer, outcome });
                tracing::info!(
                    target: "tracker",
                    consumer = %consumer,
                    outcome = %outcome,
                    "consume_recovered"
                );
                Ok(outcome)
            }
            Err(ActuationError::ResourceExhausted { .. }) => {
                tracing::error!(
                    target: "tracker",
                    consumer = %consumer,
                    resource = %resource,
                    "replenishment_retry_failed"
                );
                Err(TrackerError::ReplenishmentRetryFailed { resource, consumer })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Drop the consumer's unit, or put it back into its holder.
    pub fn release(
        &mut self,
        consumer: impl Into<ConsumerRef>,
        locus: Option<Locus>,
        return_to_holder: bool,
    ) -> Result<(), TrackerError> {
        let consumer = resolve(consumer)?;
        self.workcell.release(consumer, locus, return_to_holder)?;
        self.consumers.record_drop(consumer);
        Ok(())
    }

    fn try_consume(
        &mut self,
        consumer: ConsumerId,
        resource: &ResourceType,
        locus: Option<Locus>,
    ) -> Result<(), ActuationError> {
        let units = self
            .workcell
            .consume(consumer, self.consumers.holders(consumer), locus)?;
        self.consumers.record_pickup(consumer);
        *self.consumed.entry(resource.clone()).or_insert(0) += u64::from(units);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Recovery branches
    // -----------------------------------------------------------------------

    fn swap_from_reserve(&mut self, resource: &ResourceType) -> Result<(), TrackerError> {
        let scan = self.workcell.scan_slots();
        let reserve = self.ledger.holders_of(resource, Tier::Reserve)?.to_vec();
        let depleted = self.depleted_home(resource, &scan);

        let moves = match self.exchanger.strategy() {
            ExchangeStrategy::Direct => {
                let receipt =
                    self.router
                        .dispose(&mut self.workcell, &mut self.ledger, resource, &depleted)?;
                self.record_disposal(&receipt);
                let scan = self.workcell.scan_slots();
                let mut targets = receipt.slots.clone();
                targets.extend(self.empty_home_slots(resource, &scan, &targets));
                self.exchanger
                    .direct(&mut self.workcell, resource, &reserve, &targets)?
            }
            ExchangeStrategy::Carousel => {
                let paired = depleted.len().min(reserve.len());
                let mut moves = if paired > 0 {
                    self.exchanger.carousel(
                        &mut self.workcell,
                        resource,
                        &depleted[..paired],
                        &reserve[..paired],
                    )?
                } else {
                    Vec::new()
                };
                // Leftover reserve holders go straight onto free home slots.
                // Nothing needs the buffer for that, so it does not rotate.
                let leftover = &reserve[paired..];
                if !leftover.is_empty() {
                    let scan = self.workcell.scan_slots();
                    let targets = self.empty_home_slots(resource, &scan, &[]);
                    moves.extend(self.exchanger.direct(
                        &mut self.workcell,
                        resource,
                        leftover,
                        &targets,
                    )?);
                }
                moves
            }
        };
        self.record_moves(resource, &moves);
        Ok(())
    }

    fn swap_from_magazine(&mut self, resource: &ResourceType) -> Result<(), TrackerError> {
        let scan = self.workcell.scan_slots();
        let target = match self.empty_home_slots(resource, &scan, &[]).first() {
            Some(&slot) => slot,
            None => {
                let depleted = self.depleted_home(resource, &scan);
                let Some(&spent) = depleted.first() else {
                    return Err(TrackerError::NoPlacementSlot(resource.clone()));
                };
                let receipt =
                    self.router
                        .dispose(&mut self.workcell, &mut self.ledger, resource, &[spent])?;
                self.record_disposal(&receipt);
                if let Some(instruction) = receipt.operator_instruction() {
                    self.pause(Some(resource), receipt.slots.clone(), instruction);
                }
                spent.slot
            }
        };

        let holder = self
            .magazines
            .dispense_one(&mut self.workcell, resource, &self.router)?;
        self.workcell.transfer(
            Movable::Holder(holder),
            Destination::Slot(target),
            self.config.use_gripper,
        )?;
        if self.config.verbose {
            self.workcell
                .comment(&format!("Placing {resource} from magazine onto {target}"));
        }
        self.events.push(TrackerEvent::MagazineDispensed {
            resource: resource.clone(),
            holder,
            slot: target,
            remaining: self.magazines.remaining(resource),
        });
        Ok(())
    }

    fn manual_refill(&mut self, resource: &ResourceType) -> Result<(), TrackerError> {
        let home = self.home_slots(resource)?;
        let receipt = self.clear_holders(resource, None, false)?;

        let scan = self.workcell.scan_slots();
        self.exchanger.restore_buffer(&scan);
        let restored: Vec<Slot> = if self.config.restore_reserve_on_manual_refill {
            self.exchanger
                .vacated(resource)
                .into_iter()
                .filter(|s| !home.contains(s) && self.exchanger.buffer() != Some(*s))
                .collect()
        } else {
            Vec::new()
        };
        let mut place = home;
        place.extend(restored.iter().copied());

        let refill_magazine =
            self.magazines.is_bound(resource) && !self.magazines.has_stock(resource);
        let mut message = placement_message(resource, receipt.operator_instruction(), &place);
        if refill_magazine {
            message.push_str(&format!(" and refill the {resource} magazine"));
        }
        self.pause(Some(resource), place.clone(), message);
        self.workcell.home();

        self.restock(resource, &place)?;
        if !restored.is_empty() {
            self.exchanger.forget_vacated(resource, &restored);
        }
        if refill_magazine {
            self.refill_magazine(resource)?;
        }
        Ok(())
    }

    /// Dispose other types' depleted primary holders and restock their
    /// freed and empty home slots.
    fn refill_other_types(&mut self, exhausted: &ResourceType) -> Result<(), TrackerError> {
        let scan = self.workcell.scan_slots();
        let others: Vec<ResourceType> = self
            .ledger
            .types()
            .filter(|r| *r != exhausted)
            .cloned()
            .collect();

        for other in &others {
            let depleted = self.depleted_home(other, &scan);
            if depleted.is_empty() && self.empty_home_slots(other, &scan, &[]).is_empty() {
                continue;
            }
            let receipt =
                self.router
                    .dispose(&mut self.workcell, &mut self.ledger, other, &depleted)?;
            self.record_disposal(&receipt);

            let now = self.workcell.scan_slots();
            let mut targets = receipt.slots.clone();
            targets.extend(self.empty_home_slots(other, &now, &targets));

            let message = placement_message(other, receipt.operator_instruction(), &targets);
            self.pause(Some(other), targets.clone(), message);
            self.restock(other, &targets)?;
            self.rebuild(other)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Holder maintenance
    // -----------------------------------------------------------------------

    /// Take a type's holders off the deck. Without `slots`, every holder of
    /// the type is removed. Keeping units forces the operator path.
    pub fn clear_old(
        &mut self,
        resource: &ResourceType,
        slots: Option<&[Slot]>,
        keep_units: bool,
    ) -> Result<DisposalReceipt, TrackerError> {
        let receipt = self.clear_holders(resource, slots, keep_units)?;
        if let Some(instruction) = receipt.operator_instruction() {
            self.pause(Some(resource), receipt.slots.clone(), instruction);
        }
        self.rebuild(resource)?;
        Ok(receipt)
    }

    /// Clear a type and ask for fresh holders on `slots`, or on its home
    /// slots when none are given.
    pub fn refill(
        &mut self,
        resource: &ResourceType,
        slots: Option<&[Slot]>,
    ) -> Result<Vec<HolderId>, TrackerError> {
        let targets = match slots {
            Some(slots) => slots.to_vec(),
            None => self.home_slots(resource)?,
        };
        let receipt = self.clear_holders(resource, None, false)?;
        let message = placement_message(resource, receipt.operator_instruction(), &targets);
        self.pause(Some(resource), targets.clone(), message);
        let loaded = self.restock(resource, &targets)?;
        self.rebuild(resource)?;
        Ok(loaded)
    }

    /// Hand `count` of `old`'s home slots (all when `None`) over to `new`
    /// and load fresh `new` holders there.
    pub fn replace_holders(
        &mut self,
        old: &ResourceType,
        new: &ResourceType,
        count: Option<usize>,
        manually_remove: bool,
    ) -> Result<Vec<HolderId>, TrackerError> {
        let home = self.assignments.slots_for(old)?.to_vec();
        let n = count.unwrap_or(home.len()).min(home.len());
        let (taken, kept) = home.split_at(n);

        let receipt = self.clear_holders(old, Some(taken), manually_remove)?;
        self.assignments.assign(old, kept.iter().copied());
        let mut new_home = self
            .assignments
            .slots_for(new)
            .map(<[Slot]>::to_vec)
            .unwrap_or_default();
        new_home.extend_from_slice(taken);
        self.assign_slots(new, new_home);

        let message = placement_message(new, receipt.operator_instruction(), taken);
        self.pause(Some(new), taken.to_vec(), message);
        let loaded = self.restock(new, taken)?;
        self.rebuild(old)?;
        self.rebuild(new)?;
        tracing::info!(
            target: "tracker",
            old = %old,
            new = %new,
            count = n,
            "holders_replaced"
        );
        Ok(loaded)
    }

    /// Dispose whatever holders sit on `slots`, grouped by type.
    pub fn waste_holders(&mut self, slots: &[Slot]) -> Result<Vec<DisposalReceipt>, TrackerError> {
        let scan = self.workcell.scan_slots();
        let mut grouped: BTreeMap<ResourceType, Vec<HolderRecord>> = BTreeMap::new();
        for &slot in slots {
            match scan.holder_at(slot) {
                Some(info) => grouped
                    .entry(info.resource.clone())
                    .or_default()
                    .push(HolderRecord { id: info.id, slot }),
                None => tracing::warn!(target: "tracker", slot = %slot, "waste_slot_empty"),
            }
        }

        let mut receipts = Vec::with_capacity(grouped.len());
        for (resource, records) in grouped {
            let receipt =
                self.router
                    .dispose(&mut self.workcell, &mut self.ledger, &resource, &records)?;
            self.record_disposal(&receipt);
            if let Some(instruction) = receipt.operator_instruction() {
                self.pause(Some(&resource), receipt.slots.clone(), instruction);
            }
            self.rebuild(&resource)?;
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    /// Two-move exchange of the holders on `away` with those on `into`,
    /// pairwise. Each pair takes the type of its `away` holder.
    pub fn carousel(
        &mut self,
        away: &[Slot],
        into: &[Slot],
    ) -> Result<Vec<HolderMove>, TrackerError> {
        let scan = self.workcell.scan_slots();
        let lookup = |slot: Slot| {
            scan.holder_at(slot)
                .map(|info| (info.resource.clone(), HolderRecord { id: info.id, slot }))
                .ok_or(TrackerError::EmptySlot(slot))
        };

        let mut moves = Vec::new();
        let mut touched = BTreeSet::new();
        for (&from, &to) in away.iter().zip(into) {
            let (resource, old) = lookup(from)?;
            let (other, new) = lookup(to)?;
            let pair = self
                .exchanger
                .carousel(&mut self.workcell, &resource, &[old], &[new])?;
            self.record_moves(&resource, &pair);
            moves.extend(pair);
            touched.insert(resource);
            touched.insert(other);
        }
        for resource in &touched {
            self.rebuild(resource)?;
        }
        Ok(moves)
    }

    // -----------------------------------------------------------------------
    // Magazines
    // -----------------------------------------------------------------------

    /// Bind a magazine using the type's configured capacity, initial count
    /// and cover.
    pub fn install_magazine(
        &mut self,
        magazine: MagazineId,
        resource: &ResourceType,
    ) -> Result<(), TrackerError> {
        let configured = self
            .config
            .magazine(resource)
            .cloned()
            .ok_or_else(|| TrackerError::MagazineCapacityUnset(resource.clone()))?;
        self.load_magazine(magazine, resource, configured.initial_count(), configured.cover)
    }

    pub fn load_magazine(
        &mut self,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        cover: bool,
    ) -> Result<(), TrackerError> {
        let capacity = self.configured_capacity(resource)?;
        self.magazines
            .load(&mut self.workcell, magazine, resource, count, capacity, cover)?;
        self.ledger.introduce(resource);
        self.ledger.count_loaded(resource, count);
        Ok(())
    }

    /// Operator refill back to capacity. Returns the new remaining count.
    pub fn refill_magazine(&mut self, resource: &ResourceType) -> Result<u32, TrackerError> {
        let before = self.magazines.remaining(resource);
        let after = self.magazines.refill(&mut self.workcell, resource)?;
        self.ledger
            .count_loaded(resource, after.saturating_sub(before));
        Ok(after)
    }

    /// Move a bound magazine over to `resource`, sized to that type's
    /// configured capacity.
    pub fn rebind_magazine(
        &mut self,
        magazine: MagazineId,
        resource: &ResourceType,
        count: u32,
        cover: bool,
    ) -> Result<(), TrackerError> {
        let capacity = self.configured_capacity(resource)?;
        self.magazines
            .rebind(&mut self.workcell, magazine, resource, count, capacity, cover)?;
        self.ledger.introduce(resource);
        self.ledger.count_loaded(resource, count);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn configured_capacity(&self, resource: &ResourceType) -> Result<u32, TrackerError> {
        self.config
            .magazine(resource)
            .map(|m| m.capacity)
            .ok_or_else(|| TrackerError::MagazineCapacityUnset(resource.clone()))
    }

    fn home_slots(&self, resource: &ResourceType) -> Result<Vec<Slot>, TrackerError> {
        if let Ok(slots) = self.assignments.slots_for(resource) {
            return Ok(slots.to_vec());
        }
        Ok(self
            .ledger
            .holders_of(resource, Tier::Primary)?
            .iter()
            .map(|r| r.slot)
            .collect())
    }

    /// Depleted primary holders on the type's home slots. Without an
    /// assignment every depleted primary counts. Spent holders parked on a
    /// buffer slot never do.
    fn depleted_home(&self, resource: &ResourceType, scan: &DeckScan) -> Vec<HolderRecord> {
        let home = self.assignments.slots_for(resource).ok();
        let buffers = [self.exchanger.buffer(), self.exchanger.original_buffer()];
        self.ledger
            .depleted_primary(resource, scan)
            .into_iter()
            .filter(|r| home.is_none_or(|slots| slots.contains(&r.slot)))
            .filter(|r| !buffers.contains(&Some(r.slot)))
            .collect()
    }

    /// Home slots of a type that are empty in `scan` and not in `exclude`.
    /// Without an assignment, home is every slot the type's primary holders
    /// have been seen on. Reserve and buffer slots never count.
    fn empty_home_slots(
        &self,
        resource: &ResourceType,
        scan: &DeckScan,
        exclude: &[Slot],
    ) -> Vec<Slot> {
        let home = match self.assignments.slots_for(resource) {
            Ok(slots) => slots.to_vec(),
            Err(_) => self.ledger.seen_home_slots(resource),
        };
        let buffers = [self.exchanger.buffer(), self.exchanger.original_buffer()];
        home.into_iter()
            .filter(|s| scan.is_empty(*s) && !exclude.contains(s))
            .filter(|s| !self.ledger.is_reserve(*s) && !buffers.contains(&Some(*s)))
            .collect()
    }

    fn clear_holders(
        &mut self,
        resource: &ResourceType,
        slots: Option<&[Slot]>,
        keep_units: bool,
    ) -> Result<DisposalReceipt, TrackerError> {
        if !self.ledger.contains(resource) && !self.assignments.contains(resource) {
            return Err(TrackerError::UnknownResourceType(resource.clone()));
        }
        let scan = self.workcell.scan_slots();
        let records: Vec<HolderRecord> = scan
            .holders()
            .filter(|(slot, info)| {
                &info.resource == resource && slots.is_none_or(|wanted| wanted.contains(slot))
            })
            .map(|(slot, info)| HolderRecord { id: info.id, slot })
            .collect();
        let path = if keep_units {
            DisposalPath::Manual
        } else {
            self.router.path()
        };
        let receipt =
            self.router
                .dispose_via(path, &mut self.workcell, &mut self.ledger, resource, &records)?;
        self.record_disposal(&receipt);
        Ok(receipt)
    }

    /// Declare fresh holders on every empty slot in `slots`.
    fn restock(
        &mut self,
        resource: &ResourceType,
        slots: &[Slot],
    ) -> Result<Vec<HolderId>, TrackerError> {
        let scan = self.workcell.scan_slots();
        let mut loaded = Vec::with_capacity(slots.len());
        for &slot in slots {
            match check_free(&scan, resource, slot) {
                Ok(()) => loaded.push(self.load_one(resource, slot)?),
                Err(TrackerError::SlotUnavailable { .. }) => {
                    tracing::warn!(
                        target: "tracker",
                        resource = %resource,
                        slot = %slot,
                        "restock_slot_occupied"
                    );
                }
                Err(other) => return Err(other),
            }
        }
        Ok(loaded)
    }

    fn load_one(&mut self, resource: &ResourceType, slot: Slot) -> Result<HolderId, TrackerError> {
        let holder = self.workcell.load_holder(resource, slot)?;
        self.ledger.register(resource, holder, slot);
        self.events.push(TrackerEvent::HolderLoaded {
            resource: resource.clone(),
            holder,
            slot,
        });
        Ok(holder)
    }

    fn rebuild(&mut self, resource: &ResourceType) -> Result<RescanSummary, TrackerError> {
        let scan = self.workcell.scan_slots();
        let summary = self.ledger.rescan(resource, &scan);
        self.events.push(TrackerEvent::LedgerRebuilt {
            resource: resource.clone(),
            primary: summary.primary,
            reserve: summary.reserve,
        });
        let bound: Vec<ConsumerId> = self.consumers.bound_to(resource).collect();
        for consumer in bound {
            self.consumers.bind(consumer, resource, &self.ledger)?;
            self.events.push(TrackerEvent::ConsumerBound {
                consumer,
                resource: resource.clone(),
            });
        }
        Ok(summary)
    }

    fn pause(&mut self, resource: Option<&ResourceType>, slots: Vec<Slot>, message: String) {
        tracing::info!(target: "tracker", message = %message, "operator_pause");
        self.workcell.pause_for_operator(&message);
        self.events.push(TrackerEvent::OperatorPause {
            resource: resource.cloned(),
            slots,
            message,
        });
    }

    fn record_disposal(&mut self, receipt: &DisposalReceipt) {
        for &slot in &receipt.slots {
            self.events.push(TrackerEvent::HolderDisposed {
                resource: receipt.resource.clone(),
                slot,
                path: receipt.path,
            });
        }
    }

    fn record_moves(&mut self, resource: &ResourceType, moves: &[HolderMove]) {
        for m in moves {
            self.events.push(TrackerEvent::HolderMoved {
                resource: resource.clone(),
                holder: m.holder,
                from: m.from,
                to: m.to,
            });
        }
    }
}

/// Whether `slot` can take a fresh holder.
fn check_free(scan: &DeckScan, resource: &ResourceType, slot: Slot) -> Result<(), TrackerError> {
    match scan.occupant(slot) {
        None => Ok(()),
        Some(Occupant::Adapter { .. }) => Err(TrackerError::UnsupportedAdapterMount {
            resource: resource.clone(),
            slot,
        }),
        Some(_) => Err(TrackerError::SlotUnavailable {
            resource: resource.clone(),
            slot,
        }),
    }
}

fn placement_message(resource: &ResourceType, removal: Option<String>, place: &[Slot]) -> String {
    match removal {
        Some(removal) => format!(
            "{removal}, then place {resource} onto slots {}",
            format_slots(place)
        ),
        None => format!("Please place {resource} onto slots {}", format_slots(place)),
    }
}
