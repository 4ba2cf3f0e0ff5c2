//! Typed tracker events.
//!
//! Every state transition and physical side effect of a recovery is
//! recorded here in order. The log is append-only until the host drains
//! it, so tests and hosts can inspect exactly what one command did.

use crate::disposal::DisposalPath;
use crate::id::{ConsumerId, HolderId, ResourceType};
use crate::orchestrator::{ConsumeOutcome, RecoveryAction};
use crate::slot::Slot;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    // -- Recovery --
    Exhausted {
        consumer: ConsumerId,
        resource: ResourceType,
    },
    RecoverySelected {
        resource: ResourceType,
        action: RecoveryAction,
    },
    Retried {
        consumer: ConsumerId,
        outcome: ConsumeOutcome,
    },

    // -- Physical --
    HolderDisposed {
        resource: ResourceType,
        slot: Slot,
        path: DisposalPath,
    },
    HolderMoved {
        resource: ResourceType,
        holder: HolderId,
        from: Slot,
        to: Slot,
    },
    HolderLoaded {
        resource: ResourceType,
        holder: HolderId,
        slot: Slot,
    },
    MagazineDispensed {
        resource: ResourceType,
        holder: HolderId,
        slot: Slot,
        remaining: u32,
    },
    OperatorPause {
        resource: Option<ResourceType>,
        slots: Vec<Slot>,
        message: String,
    },

    // -- Bookkeeping --
    LedgerRebuilt {
        resource: ResourceType,
        primary: usize,
        reserve: usize,
    },
    ConsumerBound {
        consumer: ConsumerId,
        resource: ResourceType,
    },
}

/// Discriminant tag for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Exhausted,
    RecoverySelected,
    Retried,
    HolderDisposed,
    HolderMoved,
    HolderLoaded,
    MagazineDispensed,
    OperatorPause,
    LedgerRebuilt,
    ConsumerBound,
}

impl TrackerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TrackerEvent::Exhausted { .. } => EventKind::Exhausted,
            TrackerEvent::RecoverySelected { .. } => EventKind::RecoverySelected,
            TrackerEvent::Retried { .. } => EventKind::Retried,
            TrackerEvent::HolderDisposed { .. } => EventKind::HolderDisposed,
            TrackerEvent::HolderMoved { .. } => EventKind::HolderMoved,
            TrackerEvent::HolderLoaded { .. } => EventKind::HolderLoaded,
            TrackerEvent::MagazineDispensed { .. } => EventKind::MagazineDispensed,
            TrackerEvent::OperatorPause { .. } => EventKind::OperatorPause,
            TrackerEvent::LedgerRebuilt { .. } => EventKind::LedgerRebuilt,
            TrackerEvent::ConsumerBound { .. } => EventKind::ConsumerBound,
        }
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Append-only record of tracker events. Nothing is evicted: the log holds
/// every event until [`drain`](Self::drain) takes them.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<TrackerEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TrackerEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TrackerEvent] {
        &self.events
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &TrackerEvent> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Take every recorded event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<TrackerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
