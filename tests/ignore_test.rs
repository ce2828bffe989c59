use kiln::error::Error;
use kiln::ignore::{parse_ignore_file, IGNORE_FILE};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_parse_ignore_file() {
    let temp_dir = TempDir::new().unwrap();

    // Without .kilnignore only the defaults apply
    let glob_set = parse_ignore_file(temp_dir.path()).unwrap();
    assert!(glob_set.is_match(".git"));
    assert!(glob_set.is_match("nested/.DS_Store"));
    assert!(!glob_set.is_match("file.pyc"));

    fs::write(
        temp_dir.path().join(IGNORE_FILE),
        "# build output\n*.pyc\n\n__pycache__/\n",
    )
    .unwrap();

    let glob_set = parse_ignore_file(temp_dir.path()).unwrap();
    assert!(glob_set.is_match("file.pyc"));
    assert!(glob_set.is_match("__pycache__"));
    assert!(glob_set.is_match(".git/config"));
    assert!(!glob_set.is_match("# build output"));
}

#[test]
fn test_invalid_pattern() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(IGNORE_FILE), "src/[invalid\n").unwrap();

    assert!(matches!(
        parse_ignore_file(temp_dir.path()),
        Err(Error::IgnoreError(_))
    ));
}
