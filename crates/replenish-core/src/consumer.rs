//! Consumer binding: which resource type each of the two consumers draws
//! from, plus monotonic pick-up and drop counters.

use crate::error::TrackerError;
use crate::id::{ConsumerId, HolderId, ResourceType};
use crate::ledger::{Ledger, Tier};

/// Any of the accepted ways to name a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerRef {
    Index(i32),
    Name(String),
    Handle(ConsumerId),
}

impl From<i32> for ConsumerRef {
    fn from(index: i32) -> Self {
        ConsumerRef::Index(index)
    }
}

impl From<&str> for ConsumerRef {
    fn from(name: &str) -> Self {
        ConsumerRef::Name(name.to_string())
    }
}

impl From<String> for ConsumerRef {
    fn from(name: String) -> Self {
        ConsumerRef::Name(name)
    }
}

impl From<ConsumerId> for ConsumerRef {
    fn from(id: ConsumerId) -> Self {
        ConsumerRef::Handle(id)
    }
}

/// Map an identifier onto a consumer. Total over
/// `{1, "1", "one", "One", handle}` and `{2, "2", "two", "Two", handle}`.
pub fn resolve(identifier: impl Into<ConsumerRef>) -> Result<ConsumerId, TrackerError> {
    match identifier.into() {
        ConsumerRef::Handle(id) => Ok(id),
        ConsumerRef::Index(1) => Ok(ConsumerId::One),
        ConsumerRef::Index(2) => Ok(ConsumerId::Two),
        ConsumerRef::Index(other) => Err(TrackerError::InvalidConsumer(other.to_string())),
        ConsumerRef::Name(name) => match name.as_str() {
            "1" | "one" | "One" => Ok(ConsumerId::One),
            "2" | "two" | "Two" => Ok(ConsumerId::Two),
            _ => Err(TrackerError::InvalidConsumer(name)),
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConsumerSlot {
    resource: Option<ResourceType>,
    holders: Vec<HolderId>,
    pickups: u64,
    drops: u64,
}

/// Per-consumer working state. Counters only ever increase.
#[derive(Debug, Clone, Default)]
pub struct ConsumerBinding {
    consumers: [ConsumerSlot; 2],
}

impl ConsumerBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a consumer's working list at the primary holders of `resource`.
    pub fn bind(
        &mut self,
        consumer: ConsumerId,
        resource: &ResourceType,
        ledger: &Ledger,
    ) -> Result<(), TrackerError> {
        let holders = ledger.holder_ids(resource, Tier::Primary)?;
        let slot = &mut self.consumers[consumer.index()];
        slot.resource = Some(resource.clone());
        slot.holders = holders;
        tracing::debug!(
            target: "consumer",
            consumer = %consumer,
            resource = %resource,
            holders = slot.holders.len(),
            "consumer_bound"
        );
        Ok(())
    }

    pub fn bound_type(&self, consumer: ConsumerId) -> Option<&ResourceType> {
        self.consumers[consumer.index()].resource.as_ref()
    }

    pub fn holders(&self, consumer: ConsumerId) -> &[HolderId] {
        &self.consumers[consumer.index()].holders
    }

    /// Consumers currently bound to `resource`.
    pub fn bound_to<'a>(
        &'a self,
        resource: &'a ResourceType,
    ) -> impl Iterator<Item = ConsumerId> + 'a {
        ConsumerId::ALL
            .into_iter()
            .filter(move |&c| self.bound_type(c) == Some(resource))
    }

    pub fn record_pickup(&mut self, consumer: ConsumerId) {
        self.consumers[consumer.index()].pickups += 1;
    }

    pub fn record_drop(&mut self, consumer: ConsumerId) {
        self.consumers[consumer.index()].drops += 1;
    }

    pub fn pickups(&self, consumer: ConsumerId) -> u64 {
        self.consumers[consumer.index()].pickups
    }

    pub fn drops(&self, consumer: ConsumerId) -> u64 {
        self.consumers[consumer.index()].drops
    }
}
