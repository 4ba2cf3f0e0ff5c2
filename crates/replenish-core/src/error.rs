use crate::deck::ActuationError;
use crate::id::{ConsumerId, MagazineId, ResourceType};
use crate::slot::{Slot, SlotParseError};

/// How an error should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A caller bug. Raised immediately, never retried.
    Configuration,
    /// Supply ran out and no safe recovery exists.
    Resource,
    /// The workcell reported a fault unrelated to supply.
    Actuation,
}

/// Errors raised by the tracker and its components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid consumer '{0}', expected 1, one, One, 2, two or Two")]
    InvalidConsumer(String),

    #[error("{0} has no resource type bound")]
    ConsumerUnbound(ConsumerId),

    #[error("unknown resource type '{0}'")]
    UnknownResourceType(ResourceType),

    #[error("invalid reserve slot: {0}")]
    InvalidReserveSlot(SlotParseError),

    #[error("{resource} on {slot} sits on an adapter, which is not supported")]
    UnsupportedAdapterMount { resource: ResourceType, slot: Slot },

    #[error("slot {slot} is occupied, cannot load {resource}")]
    SlotUnavailable { resource: ResourceType, slot: Slot },

    #[error("at most {max} resource types can be loaded at once, got {got}")]
    LoadBatchTooLarge { max: usize, got: usize },

    #[error("magazine for {resource} holds at most {capacity}, asked to store {requested}")]
    MagazineOverCapacity {
        resource: ResourceType,
        capacity: u32,
        requested: u32,
    },

    #[error("no magazine is bound to {0}")]
    NoMagazine(ResourceType),

    #[error("magazine {0:?} is not bound to any resource type")]
    UnknownMagazine(MagazineId),

    #[error("{0} is already served by another magazine")]
    MagazineAlreadyBound(ResourceType),

    #[error("no magazine capacity configured for {0}")]
    MagazineCapacityUnset(ResourceType),

    #[error("more than one magazine configured for {0}")]
    DuplicateMagazine(ResourceType),

    #[error("buffer slot {slot} is assigned to {resource}; it must stay empty")]
    BufferSlotAssigned { slot: Slot, resource: ResourceType },

    #[error("slot {0} holds no holder")]
    EmptySlot(Slot),

    #[error("no free slot to place a fresh {0}")]
    NoPlacementSlot(ResourceType),

    #[error("carousel exchange needs a buffer slot but none is configured")]
    NoBufferSlot,

    #[error("magazine for {0} is empty")]
    MagazineEmpty(ResourceType),

    #[error("{resource} still exhausted for {consumer} after one recovery attempt")]
    ReplenishmentRetryFailed {
        resource: ResourceType,
        consumer: ConsumerId,
    },

    #[error(transparent)]
    Actuation(#[from] ActuationError),
}

impl TrackerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TrackerError::InvalidConsumer(_)
            | TrackerError::ConsumerUnbound(_)
            | TrackerError::UnknownResourceType(_)
            | TrackerError::InvalidReserveSlot(_)
            | TrackerError::UnsupportedAdapterMount { .. }
            | TrackerError::SlotUnavailable { .. }
            | TrackerError::LoadBatchTooLarge { .. }
            | TrackerError::MagazineOverCapacity { .. }
            | TrackerError::NoMagazine(_)
            | TrackerError::UnknownMagazine(_)
            | TrackerError::MagazineAlreadyBound(_)
            | TrackerError::MagazineCapacityUnset(_)
            | TrackerError::DuplicateMagazine(_)
            | TrackerError::BufferSlotAssigned { .. }
            | TrackerError::EmptySlot(_) => ErrorClass::Configuration,
            TrackerError::NoBufferSlot
            | TrackerError::NoPlacementSlot(_)
            | TrackerError::MagazineEmpty(_)
            | TrackerError::ReplenishmentRetryFailed { .. } => ErrorClass::Resource,
            TrackerError::Actuation(ActuationError::ResourceExhausted { .. }) => {
                ErrorClass::Resource
            }
            TrackerError::Actuation(_) => ErrorClass::Actuation,
        }
    }

    /// Whether the error ends the run rather than being recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.class(), ErrorClass::Configuration)
            && !matches!(self, TrackerError::MagazineEmpty(_))
    }
}
