//! Deck coordinates.
//!
//! The deck is a 4x4 grid addressed as `"A1"` through `"D4"`. Columns 1-3
//! hold primary slots. Column 4 is the expansion area: its four slots form
//! the fixed [`ReserveSlot`] enumeration that may be configured as reserve
//! capacity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ROWS: [char; 4] = ['A', 'B', 'C', 'D'];
const COLUMNS: u8 = 4;

/// A deck location. At most one holder, adapter or fixture occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot {
    row: u8,
    column: u8,
}

impl Slot {
    /// Build a slot from a row letter and a 1-based column.
    pub fn new(row: char, column: u8) -> Result<Self, SlotParseError> {
        let row_index = ROWS
            .iter()
            .position(|&r| r == row.to_ascii_uppercase())
            .ok_or_else(|| SlotParseError::Row(row))?;
        if column == 0 || column > COLUMNS {
            return Err(SlotParseError::Column(column));
        }
        Ok(Self {
            row: row_index as u8,
            column,
        })
    }

    pub fn row(self) -> char {
        ROWS[self.row as usize]
    }

    pub fn column(self) -> u8 {
        self.column
    }

    /// Whether this slot sits in the expansion column.
    pub fn is_expansion(self) -> bool {
        self.column == COLUMNS
    }

    /// Every slot on the deck, row-major.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..ROWS.len() as u8)
            .flat_map(|row| (1..=COLUMNS).map(move |column| Slot { row, column }))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row(), self.column)
    }
}

impl FromStr for Slot {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let row = chars
            .next()
            .ok_or_else(|| SlotParseError::Malformed(s.to_string()))?;
        let rest: String = chars.collect();
        let column: u8 = rest
            .parse()
            .map_err(|_| SlotParseError::Malformed(s.to_string()))?;
        Slot::new(row, column)
    }
}

impl TryFrom<String> for Slot {
    type Error = SlotParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.to_string()
    }
}

impl From<ReserveSlot> for Slot {
    fn from(reserve: ReserveSlot) -> Self {
        let row = match reserve {
            ReserveSlot::A4 => 0,
            ReserveSlot::B4 => 1,
            ReserveSlot::C4 => 2,
            ReserveSlot::D4 => 3,
        };
        Slot {
            row,
            column: COLUMNS,
        }
    }
}

/// The fixed set of slots that may be configured as reserve capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReserveSlot {
    A4,
    B4,
    C4,
    D4,
}

impl ReserveSlot {
    pub const ALL: [ReserveSlot; 4] = [
        ReserveSlot::A4,
        ReserveSlot::B4,
        ReserveSlot::C4,
        ReserveSlot::D4,
    ];

    pub fn slot(self) -> Slot {
        self.into()
    }
}

impl TryFrom<Slot> for ReserveSlot {
    type Error = SlotParseError;

    fn try_from(slot: Slot) -> Result<Self, Self::Error> {
        ReserveSlot::ALL
            .into_iter()
            .find(|r| r.slot() == slot)
            .ok_or_else(|| SlotParseError::NotReserve(slot.to_string()))
    }
}

impl FromStr for ReserveSlot {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slot: Slot = s
            .parse()
            .map_err(|_| SlotParseError::NotReserve(s.to_string()))?;
        ReserveSlot::try_from(slot)
    }
}

impl fmt::Display for ReserveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot().fmt(f)
    }
}

/// Errors produced while parsing deck coordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotParseError {
    #[error("malformed slot '{0}'")]
    Malformed(String),
    #[error("row '{0}' is not on the deck (expected A-D)")]
    Row(char),
    #[error("column {0} is not on the deck (expected 1-4)")]
    Column(u8),
    #[error("'{0}' is not a reserve slot (expected A4, B4, C4 or D4)")]
    NotReserve(String),
}

/// Format a list of slots the way operator prompts show them: `[A1, B2]`.
pub fn format_slots(slots: &[Slot]) -> String {
    let names: Vec<String> = slots.iter().map(Slot::to_string).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let slot: Slot = "B2".parse().unwrap();
        assert_eq!(slot.row(), 'B');
        assert_eq!(slot.column(), 2);
        assert_eq!(slot.to_string(), "B2");
    }

    #[test]
    fn parse_is_case_insensitive_on_row() {
        let slot: Slot = "c3".parse().unwrap();
        assert_eq!(slot.to_string(), "C3");
    }

    #[test]
    fn parse_rejects_off_deck_coordinates() {
        assert_eq!("E1".parse::<Slot>(), Err(SlotParseError::Row('E')));
        assert_eq!("A5".parse::<Slot>(), Err(SlotParseError::Column(5)));
        assert_eq!("A0".parse::<Slot>(), Err(SlotParseError::Column(0)));
        assert!(matches!(
            "".parse::<Slot>(),
            Err(SlotParseError::Malformed(_))
        ));
        assert!(matches!(
            "AB".parse::<Slot>(),
            Err(SlotParseError::Malformed(_))
        ));
    }

    #[test]
    fn all_enumerates_sixteen_slots() {
        let all: Vec<Slot> = Slot::all().collect();
        assert_eq!(all.len(), 16);
        assert_eq!(all[0].to_string(), "A1");
        assert_eq!(all[15].to_string(), "D4");
        assert_eq!(all.iter().filter(|s| s.is_expansion()).count(), 4);
    }

    #[test]
    fn reserve_slots_are_the_expansion_column() {
        for reserve in ReserveSlot::ALL {
            assert!(reserve.slot().is_expansion());
        }
        assert_eq!("C4".parse::<ReserveSlot>(), Ok(ReserveSlot::C4));
        assert!(matches!(
            "C3".parse::<ReserveSlot>(),
            Err(SlotParseError::NotReserve(_))
        ));
        assert!(matches!(
            "Z9".parse::<ReserveSlot>(),
            Err(SlotParseError::NotReserve(_))
        ));
    }

    #[test]
    fn string_conversion_uses_display_form() {
        let slot: Slot = "D1".parse().unwrap();
        assert_eq!(String::from(slot), "D1");
        assert_eq!(Slot::try_from("D1".to_string()), Ok(slot));
        assert!(Slot::try_from("Q1".to_string()).is_err());
    }

    #[test]
    fn format_slots_lists_in_order() {
        let slots = vec!["A1".parse().unwrap(), "B2".parse().unwrap()];
        assert_eq!(format_slots(&slots), "[A1, B2]");
        assert_eq!(format_slots(&[]), "[]");
    }
}
