use ert_state::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn save_and_load_round_trip() {
    let dir = temp_dir("ert_state_round_trip");
    let path = dir.join("state_map.json");

    let mut map = StateMap::new();
    map.set(0, RealizationState::Initialized).unwrap();
    map.set(0, RealizationState::HasData).unwrap();
    map.set(3, RealizationState::Initialized).unwrap();
    map.set(3, RealizationState::LoadFailure).unwrap();
    map.save(&path).unwrap();

    let loaded = StateMap::load(&path).unwrap();
    assert_eq!(loaded, map);
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.get(1).unwrap(), RealizationState::Undefined);
    assert!(!loaded.is_read_only());
}

#[test]
fn read_only_flag_is_persisted() {
    let dir = temp_dir("ert_state_read_only_flag");
    let path = dir.join("state_map.json");

    let mut map: StateMap = [RealizationState::Initialized].into_iter().collect();
    map.mark_read_only();
    map.save(&path).unwrap();

    let mut loaded = StateMap::load(&path).unwrap();
    assert!(loaded.is_read_only());
    let err = loaded.set(0, RealizationState::HasData).unwrap_err();
    assert!(err.is_warning());
    assert_eq!(loaded.get(0).unwrap(), RealizationState::Initialized);
}

#[test]
fn load_read_only_forces_flag() {
    let dir = temp_dir("ert_state_force_read_only");
    let path = dir.join("state_map.json");

    let map: StateMap = [RealizationState::Initialized].into_iter().collect();
    map.save(&path).unwrap();

    let loaded = StateMap::load_read_only(&path).unwrap();
    assert!(loaded.is_read_only());
    assert_eq!(loaded, map);
}

#[test]
fn missing_file_is_io_error() {
    let dir = temp_dir("ert_state_missing");
    let err = StateMap::load(&dir.join("nope.json")).unwrap_err();
    assert!(matches!(err, StateError::Io { .. }));
    assert!(!err.is_warning());
}

#[test]
fn malformed_file_is_json_error() {
    let dir = temp_dir("ert_state_malformed");
    let path = dir.join("state_map.json");
    std::fs::write(&path, r#"{"states": ["UNDEFINED", "SOMETHING_ELSE"]}"#).unwrap();

    let err = StateMap::load(&path).unwrap_err();
    assert!(matches!(err, StateError::Json { .. }));
}
