use webmirror_fs::{
    AtomicWriteOptions, Error, atomic_read, atomic_write, ensure_parent, join_within,
    remove_file_if_exists, walk_files,
};
use tempfile::tempdir;

#[test]
fn test_write_under_fresh_tree() {
    let dir = tempdir().unwrap();
    let path = join_within(dir.path(), std::path::Path::new("example.com/img/logo.png")).unwrap();

    ensure_parent(&path).unwrap();
    atomic_write(&path, &[b"\x89PNG"], AtomicWriteOptions::new()).unwrap();

    assert_eq!(atomic_read(&path).unwrap(), b"\x89PNG");
    assert_eq!(walk_files(dir.path()).unwrap().len(), 1);
}

#[test]
fn test_overwrite_replaces_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("page.html");

    atomic_write(&path, &[b"first"], AtomicWriteOptions::new()).unwrap();
    assert!(remove_file_if_exists(&path).unwrap());
    atomic_write(&path, &[b"second"], AtomicWriteOptions::new()).unwrap();

    assert_eq!(atomic_read(&path).unwrap(), b"second");
}

#[test]
fn test_read_missing_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.css");
    match atomic_read(&path) {
        Err(Error::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}
