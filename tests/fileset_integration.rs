use std::fs;
use std::path::PathBuf;

use uplink::fileset;

fn temp_dir(name: &str) -> PathBuf {
    let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("uplink_{}_{}", name, ts));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_single_file_keyed_by_basename() {
    let dir = temp_dir("single");
    let file = dir.join("report.txt");
    fs::write(&file, b"hello").unwrap();

    let files = fileset::list_files(&file).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files.get("report.txt"), Some(&file));
    assert_eq!(fileset::total_size(&files), 5);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_directory_walk_uses_relative_posix_keys() {
    let dir = temp_dir("walk");
    fs::create_dir_all(dir.join("assets/img")).unwrap();
    fs::write(dir.join("index.html"), b"<html>").unwrap();
    fs::write(dir.join("assets/img/logo.png"), b"png").unwrap();

    let files = fileset::list_files(&dir).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.contains_key("index.html"));
    assert!(files.contains_key("assets/img/logo.png"));
    for key in files.keys() {
        assert!(!key.contains('\\'), "non-posix key: {}", key);
        assert!(!key.starts_with('/'), "absolute key: {}", key);
    }

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_empty_directory_yields_empty_set() {
    let dir = temp_dir("empty");
    let files = fileset::list_files(&dir).unwrap();
    assert!(files.is_empty());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_missing_source_is_error() {
    let missing = std::env::temp_dir().join("uplink_definitely_missing_source");
    assert!(fileset::list_files(&missing).is_err());
}

#[cfg(unix)]
#[test]
fn test_symlink_root_is_rejected() {
    use uplink::UploadError;

    let dir = temp_dir("symlink");
    let real = dir.join("real.txt");
    fs::write(&real, b"x").unwrap();
    let link = dir.join("link.txt");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let err = fileset::check_source(&link).unwrap_err();
    assert!(matches!(err, UploadError::SymlinkSource(_)));
    assert!(fileset::check_source(&real).is_ok());

    let _ = fs::remove_dir_all(dir);
}
