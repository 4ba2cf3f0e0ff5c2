use crate::error::TrackerError;
use crate::id::ResourceType;
use crate::slot::Slot;
use std::collections::BTreeMap;

/// Home slots per resource type: where it starts and where replenishment goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentTable {
    slots: BTreeMap<ResourceType, Vec<Slot>>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the home slots of a type. Duplicate slots collapse, order kept.
    pub fn assign(&mut self, resource: &ResourceType, slots: impl IntoIterator<Item = Slot>) {
        let mut ordered: Vec<Slot> = Vec::new();
        for slot in slots {
            if !ordered.contains(&slot) {
                ordered.push(slot);
            }
        }
        self.slots.insert(resource.clone(), ordered);
    }

    pub fn slots_for(&self, resource: &ResourceType) -> Result<&[Slot], TrackerError> {
        self.slots
            .get(resource)
            .map(Vec::as_slice)
            .ok_or_else(|| TrackerError::UnknownResourceType(resource.clone()))
    }

    pub fn contains(&self, resource: &ResourceType) -> bool {
        self.slots.contains_key(resource)
    }

    /// The type whose home includes `slot`, if any.
    pub fn owner_of(&self, slot: Slot) -> Option<&ResourceType> {
        self.slots
            .iter()
            .find(|(_, slots)| slots.contains(&slot))
            .map(|(resource, _)| resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceType, &[Slot])> {
        self.slots.iter().map(|(r, s)| (r, s.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(names: &[&str]) -> Vec<Slot> {
        names.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn assign_and_lookup() {
        let mut table = AssignmentTable::new();
        let rack = ResourceType::new("rack_50");
        table.assign(&rack, slots(&["A1", "A2"]));
        assert_eq!(table.slots_for(&rack).unwrap(), slots(&["A1", "A2"]).as_slice());
        assert!(table.contains(&rack));
    }

    #[test]
    fn assign_is_an_idempotent_overwrite() {
        let mut table = AssignmentTable::new();
        let rack = ResourceType::new("rack_50");
        table.assign(&rack, slots(&["A1", "A2"]));
        table.assign(&rack, slots(&["B1"]));
        table.assign(&rack, slots(&["B1"]));
        assert_eq!(table.slots_for(&rack).unwrap(), slots(&["B1"]).as_slice());
    }

    #[test]
    fn duplicate_slots_collapse_in_order() {
        let mut table = AssignmentTable::new();
        let rack = ResourceType::new("rack_50");
        table.assign(&rack, slots(&["C1", "A1", "C1"]));
        assert_eq!(table.slots_for(&rack).unwrap(), slots(&["C1", "A1"]).as_slice());
    }

    #[test]
    fn unknown_type_fails() {
        let table = AssignmentTable::new();
        let rack = ResourceType::new("ghost");
        assert_eq!(
            table.slots_for(&rack),
            Err(TrackerError::UnknownResourceType(rack.clone()))
        );
    }

    #[test]
    fn owner_of_finds_home_type() {
        let mut table = AssignmentTable::new();
        let a = ResourceType::new("a");
        let b = ResourceType::new("b");
        table.assign(&a, slots(&["A1"]));
        table.assign(&b, slots(&["B1", "B2"]));
        assert_eq!(table.owner_of("B2".parse().unwrap()), Some(&b));
        assert_eq!(table.owner_of("D3".parse().unwrap()), None);
        assert_eq!(table.iter().count(), 2);
    }
}
