//! Resolution pipeline: reads a deck file, resolves names, builds a
//! [`TrackerConfig`].
//!
//! Provides format detection (RON/JSON/TOML), file discovery and the
//! deserialization helper used by [`load_tracker_config`].

use crate::schema::DeckFileData;
use replenish_core::config::{MagazineConfig, TrackerConfig, WasteKind};
use replenish_core::error::TrackerError;
use replenish_core::id::ResourceType;
use replenish_core::slot::{ReserveSlot, Slot};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Base name of the deck file looked up by [`load_tracker_config_from_dir`].
pub const DECK_FILE: &str = "deck";

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("invalid slot '{value}' in {file}: {detail}")]
    InvalidSlot {
        file: PathBuf,
        value: String,
        detail: String,
    },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error("invalid configuration in {file}: {source}")]
    Invalid {
        file: PathBuf,
        #[source]
        source: TrackerError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Find `{base_name}.ron|toml|json` in `dir`. More than one match is an error.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn parse_slot(value: &str, file: &Path) -> Result<Slot, DataLoadError> {
    value.parse().map_err(|e: replenish_core::slot::SlotParseError| DataLoadError::InvalidSlot {
        file: file.to_path_buf(),
        value: value.to_string(),
        detail: e.to_string(),
    })
}

fn parse_reserve_slot(value: &str, file: &Path) -> Result<ReserveSlot, DataLoadError> {
    value.parse().map_err(|e: replenish_core::slot::SlotParseError| DataLoadError::InvalidSlot {
        file: file.to_path_buf(),
        value: value.to_string(),
        detail: e.to_string(),
    })
}

fn parse_waste(value: Option<&str>, file: &Path) -> Result<WasteKind, DataLoadError> {
    match value {
        None | Some("bin") => Ok(WasteKind::Bin),
        Some("chute") => Ok(WasteKind::Chute),
        Some(other) => Err(DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: other.to_string(),
            expected_kind: "waste kind",
        }),
    }
}

/// Resolve a parsed deck file into a validated [`TrackerConfig`].
pub fn resolve_deck(data: DeckFileData, file: &Path) -> Result<TrackerConfig, DataLoadError> {
    let reserve_slots = data
        .reserve_slots
        .iter()
        .map(|s| parse_reserve_slot(s, file))
        .collect::<Result<Vec<_>, _>>()?;

    let buffer_slot = data
        .buffer_slot
        .as_deref()
        .map(|s| parse_slot(s, file))
        .transpose()?;

    let mut assignments: BTreeMap<ResourceType, Vec<Slot>> = BTreeMap::new();
    for entry in &data.assignments {
        let resource = ResourceType::new(entry.resource.as_str());
        if assignments.contains_key(&resource) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: entry.resource.clone(),
            });
        }
        let slots = entry
            .slots
            .iter()
            .map(|s| parse_slot(s, file))
            .collect::<Result<Vec<_>, _>>()?;
        assignments.insert(resource, slots);
    }

    let mut magazines: Vec<MagazineConfig> = Vec::with_capacity(data.magazines.len());
    for entry in &data.magazines {
        let resource = ResourceType::new(entry.resource.as_str());
        if !assignments.contains_key(&resource) {
            return Err(DataLoadError::UnresolvedRef {
                file: file.to_path_buf(),
                name: entry.resource.clone(),
                expected_kind: "assigned resource type",
            });
        }
        if magazines.iter().any(|m| m.resource == resource) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: entry.resource.clone(),
            });
        }
        magazines.push(MagazineConfig {
            resource,
            capacity: entry.capacity,
            initial: entry.initial,
            cover: entry.cover,
        });
    }

    let config = TrackerConfig {
        reserve_slots,
        buffer_slot,
        assignments,
        magazines,
        waste: parse_waste(data.waste.as_deref(), file)?,
        use_gripper: data.gripper,
        verbose: data.verbose,
        restore_reserve_on_manual_refill: data.restore_reserve_on_manual_refill,
    };
    config.validate().map_err(|source| DataLoadError::Invalid {
        file: file.to_path_buf(),
        source,
    })?;
    Ok(config)
}

/// Load and resolve a deck file.
pub fn load_tracker_config(path: &Path) -> Result<TrackerConfig, DataLoadError> {
    let data: DeckFileData = deserialize_file(path)?;
    let config = resolve_deck(data, path)?;
    tracing::info!(
        target: "data",
        file = %path.display(),
        types = config.assignments.len(),
        magazines = config.magazines.len(),
        "deck_config_loaded"
    );
    Ok(config)
}

/// Load `deck.{ron,toml,json}` from `dir`.
pub fn load_tracker_config_from_dir(dir: &Path) -> Result<TrackerConfig, DataLoadError> {
    let path = find_data_file(dir, DECK_FILE)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: DECK_FILE.to_string(),
        dir: dir.to_path_buf(),
    })?;
    load_tracker_config(&path)
}

// ===========================================================================
// Tests
// ===========================================================================
