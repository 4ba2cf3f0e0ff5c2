//! Serde structs for deck configuration files.
//!
//! Names stay as strings here. The loader resolves them into core types and
//! reports anything it cannot resolve together with the file path.

use serde::Deserialize;

/// A whole deck configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeckFileData {
    #[serde(default)]
    pub reserve_slots: Vec<String>,
    #[serde(default)]
    pub buffer_slot: Option<String>,
    #[serde(default)]
    pub assignments: Vec<AssignmentData>,
    #[serde(default)]
    pub magazines: Vec<MagazineData>,
    /// `"chute"` or `"bin"`. Defaults to `"bin"`.
    #[serde(default)]
    pub waste: Option<String>,
    #[serde(default)]
    pub gripper: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub restore_reserve_on_manual_refill: bool,
}

/// Home slots of one resource type.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentData {
    pub resource: String,
    pub slots: Vec<String>,
}

/// A magazine bound to one resource type.
#[derive(Debug, Clone, Deserialize)]
pub struct MagazineData {
    pub resource: String,
    pub capacity: u32,
    #[serde(default)]
    pub initial: Option<u32>,
    #[serde(default)]
    pub cover: bool,
}
