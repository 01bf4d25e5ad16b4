//! Ticking files in a `.dme` on disk.

use std::fs;

use dmlc_manifest::{
    ManifestError, detect_environment_file, sort_less, tick_status, toggle_on_disk,
};
use dmlc_types::{TickRequest, TickState};

const ENVIRONMENT: &str = "// DM Environment file for game.dme.\r\n\
// All manual changes should be made outside the BEGIN_ and END_ blocks.\r\n\
\r\n\
// BEGIN_INTERNALS\r\n\
// END_INTERNALS\r\n\
\r\n\
// BEGIN_FILE_DIR\r\n\
#define FILE_DIR .\r\n\
// END_FILE_DIR\r\n\
\r\n\
// BEGIN_INCLUDE\r\n\
#include \"code\\_globals.dm\"\r\n\
#include \"code\\game\\world.dm\"\r\n\
#include \"maps\\station.dmm\"\r\n\
// END_INCLUDE\r\n";

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("game.dme"), ENVIRONMENT).unwrap();
    for file in ["code/_globals.dm", "code/game/world.dm", "code/mob.dm", "maps/station.dmm"] {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    dir
}

fn includes(text: &str) -> Vec<&str> {
    text.lines()
        .filter_map(|line| line.strip_prefix("#include \""))
        .filter_map(|line| line.strip_suffix('"'))
        .collect()
}

#[test]
fn ticking_keeps_dreammaker_order_and_line_endings() {
    let dir = project();
    let root = dir.path();
    let environment = detect_environment_file(root).unwrap();
    assert_eq!(environment, "game.dme");

    let outcome =
        toggle_on_disk(root, &environment, &root.join("code/mob.dm"), TickRequest::Tick).unwrap();
    assert_eq!(outcome.state, TickState::Ticked);
    assert_eq!(outcome.include, "code\\mob.dm");

    let text = fs::read_to_string(root.join("game.dme")).unwrap();
    assert_eq!(
        includes(&text),
        vec![
            "code\\_globals.dm",
            "code\\mob.dm",
            "code\\game\\world.dm",
            "maps\\station.dmm",
        ]
    );
    assert!(text.contains("#include \"code\\mob.dm\"\r\n"));
    assert_eq!(text.matches('\n').count(), text.matches("\r\n").count());

    let listed = includes(&text);
    assert!(listed.windows(2).all(|pair| sort_less(pair[0], pair[1])));
}

#[test]
fn untick_then_status() {
    let dir = project();
    let root = dir.path();
    let world = root.join("code/game/world.dm");

    assert_eq!(
        tick_status(root, "game.dme", &world).unwrap(),
        Some(TickState::Ticked)
    );
    toggle_on_disk(root, "game.dme", &world, TickRequest::Untick).unwrap();
    assert_eq!(
        tick_status(root, "game.dme", &world).unwrap(),
        Some(TickState::Unticked)
    );

    let again = toggle_on_disk(root, "game.dme", &world, TickRequest::Untick).unwrap();
    assert!(!again.edit.is_change());
}

#[test]
fn toggle_twice_restores_the_file() {
    let dir = project();
    let root = dir.path();
    let map = root.join("maps/station.dmm");

    toggle_on_disk(root, "game.dme", &map, TickRequest::Toggle).unwrap();
    toggle_on_disk(root, "game.dme", &map, TickRequest::Toggle).unwrap();

    assert_eq!(fs::read_to_string(root.join("game.dme")).unwrap(), ENVIRONMENT);
}

#[test]
fn wrong_environment_name_reports_missing_dme() {
    let dir = project();
    let root = dir.path();
    let err = toggle_on_disk(root, "other.dme", &root.join("code/mob.dm"), TickRequest::Tick)
        .unwrap_err();
    assert!(matches!(err, ManifestError::Missing { .. }));
    assert_eq!(err.to_string(), "There does not appear to be a .dme file.");
}
