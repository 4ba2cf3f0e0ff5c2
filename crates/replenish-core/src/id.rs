use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Identifies one physical holder (rack) instance. Minted by the workcell.
    pub struct HolderId;

    /// Identifies an automated dispenser (stacker) on the workcell.
    pub struct MagazineId;
}

/// Names one interchangeable holder kind, e.g. a tip-rack load name.
/// Immutable once introduced. Cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// One of the two addressable consumers (pipettes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsumerId {
    One,
    Two,
}

impl ConsumerId {
    pub const ALL: [ConsumerId; 2] = [ConsumerId::One, ConsumerId::Two];

    /// Array index used by per-consumer storage.
    pub(crate) fn index(self) -> usize {
        match self {
            ConsumerId::One => 0,
            ConsumerId::Two => 1,
        }
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerId::One => f.write_str("consumer 1"),
            ConsumerId::Two => f.write_str("consumer 2"),
        }
    }
}
