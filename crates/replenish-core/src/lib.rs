//! Replenish Core -- consumable-holder tracking and automatic replenishment
//! for a two-consumer liquid-handling workcell.
//!
//! Consumers draw units (tips) from holders (racks) on a 4x4 deck. When a
//! consumer runs dry the tracker restores supply from the cheapest source
//! available and retries the pickup exactly once.
//!
//! # Recovery Pipeline
//!
//! Each call to [`tracker::Tracker::consume`] that hits exhaustion runs:
//!
//! 1. **Sweep** -- Optionally dispose and restock other types' depleted holders.
//! 2. **Select** -- [`orchestrator::select_action`]: reserve, then magazine,
//!    then the operator.
//! 3. **Execute** -- Exchange a reserve holder, dispense from a magazine or
//!    pause for a manual refill.
//! 4. **Rebuild** -- Re-derive the type's ledger entry from a deck scan and
//!    rebind its consumers.
//! 5. **Retry** -- One more pickup; a second exhaustion is fatal.
//!
//! # Key Types
//!
//! - [`tracker::Tracker`] -- Owns every component; the command surface.
//! - [`deck::Workcell`] -- The physical collaborator (moves, pauses, scans).
//! - [`ledger::Ledger`] -- Cached holder locations per resource type.
//! - [`exchange::Exchanger`] -- Direct and carousel reserve exchanges.
//! - [`disposal::DisposalRouter`] -- Chute disposal or operator removal.
//! - [`magazine::MagazineBank`] -- Automated holder dispensers.
//! - [`event::EventLog`] -- Ordered record of what each command did.

pub mod assignment;
pub mod config;
pub mod consumer;
pub mod deck;
pub mod disposal;
pub mod error;
pub mod event;
pub mod exchange;
pub mod id;
pub mod ledger;
pub mod magazine;
pub mod orchestrator;
pub mod slot;
pub mod tracker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
