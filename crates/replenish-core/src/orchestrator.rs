//! Recovery state machine vocabulary.
//!
//! `Serving -> Depleting -> {ManualRefill | ReserveSwap | MagazineSwap} -> Served`
//!
//! The choice of branch is the pure function [`select_action`]. Executing a
//! branch, rebuilding the ledger, rebinding and the single retry live in
//! [`Tracker::consume`](crate::tracker::Tracker::consume).

use crate::exchange::ExchangeStrategy;
use std::fmt;

/// The recovery branch chosen after an exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryAction {
    ReserveSwap,
    MagazineSwap,
    ManualRefill,
}

/// Pick the recovery branch. Reserve beats magazine, magazine beats the
/// operator.
pub fn select_action(reserve_available: bool, magazine_available: bool) -> RecoveryAction {
    if reserve_available {
        RecoveryAction::ReserveSwap
    } else if magazine_available {
        RecoveryAction::MagazineSwap
    } else {
        RecoveryAction::ManualRefill
    }
}

/// Result of a consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumeOutcome {
    Clean,
    CarouselSwap,
    ReserveSwap,
    MagazineSwap,
    ManualRefill,
}

impl ConsumeOutcome {
    /// The outcome reported after `action` succeeded under `strategy`.
    pub fn after(action: RecoveryAction, strategy: ExchangeStrategy) -> Self {
        match (action, strategy) {
            (RecoveryAction::ReserveSwap, ExchangeStrategy::Carousel) => {
                ConsumeOutcome::CarouselSwap
            }
            (RecoveryAction::ReserveSwap, ExchangeStrategy::Direct) => ConsumeOutcome::ReserveSwap,
            (RecoveryAction::MagazineSwap, _) => ConsumeOutcome::MagazineSwap,
            (RecoveryAction::ManualRefill, _) => ConsumeOutcome::ManualRefill,
        }
    }

    /// Numeric result code for scripts.
    pub fn code(self) -> u8 {
        match self {
            ConsumeOutcome::Clean => 0,
            ConsumeOutcome::CarouselSwap => 1,
            ConsumeOutcome::ReserveSwap => 2,
            ConsumeOutcome::MagazineSwap => 3,
            ConsumeOutcome::ManualRefill => 4,
        }
    }

    pub fn recovered(self) -> bool {
        self != ConsumeOutcome::Clean
    }
}

impl fmt::Display for ConsumeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumeOutcome::Clean => "clean",
            ConsumeOutcome::CarouselSwap => "carousel swap",
            ConsumeOutcome::ReserveSwap => "reserve swap",
            ConsumeOutcome::MagazineSwap => "magazine swap",
            ConsumeOutcome::ManualRefill => "manual refill",
        };
        write!(f, "{name} ({})", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Serving,
    Depleting,
    ReserveSwap,
    MagazineSwap,
    ManualRefill,
    Served,
}

impl From<RecoveryAction> for TrackerState {
    fn from(action: RecoveryAction) -> Self {
        match action {
            RecoveryAction::ReserveSwap => TrackerState::ReserveSwap,
            RecoveryAction::MagazineSwap => TrackerState::MagazineSwap,
            RecoveryAction::ManualRefill => TrackerState::ManualRefill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_priority() {
        assert_eq!(select_action(true, true), RecoveryAction::ReserveSwap);
        assert_eq!(select_action(true, false), RecoveryAction::ReserveSwap);
        assert_eq!(select_action(false, true), RecoveryAction::MagazineSwap);
        assert_eq!(select_action(false, false), RecoveryAction::ManualRefill);
    }

    #[test]
    fn outcome_codes() {
        use ExchangeStrategy::*;
        assert_eq!(ConsumeOutcome::Clean.code(), 0);
        assert_eq!(ConsumeOutcome::after(RecoveryAction::ReserveSwap, Carousel).code(), 1);
        assert_eq!(ConsumeOutcome::after(RecoveryAction::ReserveSwap, Direct).code(), 2);
        assert_eq!(ConsumeOutcome::after(RecoveryAction::MagazineSwap, Carousel).code(), 3);
        assert_eq!(ConsumeOutcome::after(RecoveryAction::ManualRefill, Direct).code(), 4);
        assert!(!ConsumeOutcome::Clean.recovered());
        assert_eq!(ConsumeOutcome::MagazineSwap.to_string(), "magazine swap (3)");
    }

    #[test]
    fn action_maps_to_branch_state() {
        assert_eq!(TrackerState::default(), TrackerState::Serving);
        assert_eq!(TrackerState::from(RecoveryAction::ManualRefill), TrackerState::ManualRefill);
    }
}
