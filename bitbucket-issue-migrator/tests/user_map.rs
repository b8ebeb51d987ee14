use std::path::PathBuf;

use bitbucket_issue_migrator::{load_user_map, ConfigError, Resolution, UserMapper};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/users.toml")
}

#[test]
fn load_user_map_from_fixture() {
    let overrides = load_user_map(&fixture_path()).unwrap();
    assert_eq!(overrides.len(), 3);

    let mapper = UserMapper::new(overrides, false);
    assert_eq!(
        mapper.resolve("jsmith"),
        Resolution::Destination("john-smith".to_string())
    );
    assert_eq!(
        mapper.resolve("adeveloper"),
        Resolution::Destination("a-developer".to_string())
    );
    assert_eq!(mapper.resolve("migrationbot"), Resolution::Suppressed);
    assert_eq!(mapper.resolve("unlisted"), Resolution::Unknown);
}

#[test]
fn load_user_map_missing_file_is_an_io_error() {
    let result = load_user_map(&fixture_path().with_file_name("absent.toml"));
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

#[test]
fn same_name_assumption_applies_on_top_of_the_fixture() {
    let overrides = load_user_map(&fixture_path()).unwrap();
    let mapper = UserMapper::new(overrides, true);

    assert_eq!(
        mapper.resolve("unlisted"),
        Resolution::Destination("unlisted".to_string())
    );
    // Explicit suppression still wins over the assumption.
    assert_eq!(mapper.resolve("migrationbot"), Resolution::Suppressed);
}
