//! Integration test: a deck file loaded through replenish-data drives a
//! tracker through a magazine swap and then a manual refill.

use replenish_core::error::TrackerError;
use replenish_core::id::ResourceType;
use replenish_core::orchestrator::ConsumeOutcome;
use replenish_core::test_utils::*;
use replenish_core::tracker::Tracker;
use replenish_data::{DataLoadError, load_tracker_config_from_dir};
use std::fs;
use std::path::{Path, PathBuf};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "replenish_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

const DECK_TOML: &str = r#"
reserve_slots = ["A4"]
waste = "chute"
gripper = true

[[assignments]]
resource = "tiprack_200ul"
slots = ["A1"]

[[magazines]]
resource = "tiprack_200ul"
capacity = 3
initial = 1
"#;

#[test]
fn toml_deck_runs_magazine_then_manual_refill() {
    let dir = make_test_dir("toml_deck");
    fs::write(dir.join("deck.toml"), DECK_TOML).unwrap();
    let config = load_tracker_config_from_dir(&dir).unwrap();
    cleanup(&dir);

    let mut t = Tracker::new(config, SimulatedWorkcell::new(1)).unwrap();
    assert!(t.router().is_automated());
    assert!(t.ledger().contains(&tips()));

    t.load_holders(&[(tips(), slots(&["A1"]))]).unwrap();
    let magazine = t.workcell_mut().add_magazine();
    t.install_magazine(magazine, &tips()).unwrap();
    assert_eq!(t.magazines().remaining(&tips()), 1);
    t.bind(1, &tips()).unwrap();

    let first = t.workcell().holder_at(slot("A1")).unwrap();
    t.workcell_mut().deplete(first);
    assert_eq!(t.consume(1, None, false).unwrap(), ConsumeOutcome::MagazineSwap);
    assert_eq!(t.magazines().remaining(&tips()), 0);

    let second = t.workcell().holder_at(slot("A1")).unwrap();
    t.workcell_mut().deplete(second);
    assert_eq!(t.consume(1, None, false).unwrap(), ConsumeOutcome::ManualRefill);
    assert_eq!(
        t.workcell().pauses(),
        &["Please place tiprack_200ul onto slots [A1] and refill the tiprack_200ul magazine"
            .to_string()]
    );
    assert_eq!(t.magazines().remaining(&tips()), 3);
    assert_eq!(t.units_consumed(&tips()), 2);
}

#[test]
fn deck_with_buffer_on_home_slot_is_rejected() {
    let dir = make_test_dir("buffer_conflict");
    fs::write(
        dir.join("deck.ron"),
        r#"(
            reserve_slots: ["A4"],
            buffer_slot: Some("B1"),
            assignments: [(resource: "plate_96", slots: ["B1", "B2"])],
        )"#,
    )
    .unwrap();

    let err = load_tracker_config_from_dir(&dir).unwrap_err();
    cleanup(&dir);
    match err {
        DataLoadError::Invalid { source, .. } => assert_eq!(
            source,
            TrackerError::BufferSlotAssigned {
                slot: slot("B1"),
                resource: ResourceType::new("plate_96"),
            }
        ),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn magazine_capacity_must_come_from_the_deck_file() {
    let dir = make_test_dir("no_magazine");
    fs::write(
        dir.join("deck.json"),
        r#"{ "assignments": [{ "resource": "tiprack_200ul", "slots": ["A1"] }] }"#,
    )
    .unwrap();
    let config = load_tracker_config_from_dir(&dir).unwrap();
    cleanup(&dir);

    let mut t = Tracker::new(config, SimulatedWorkcell::new(1)).unwrap();
    let magazine = t.workcell_mut().add_magazine();
    assert_eq!(
        t.install_magazine(magazine, &tips()),
        Err(TrackerError::MagazineCapacityUnset(tips()))
    );
}
