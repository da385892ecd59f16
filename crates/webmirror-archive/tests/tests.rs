use std::fs::{self, File};
use std::io::Read;

use webmirror_archive::{PackOptions, zip_dir};

fn mirror_tree() -> tempfile::TempDir {
    let temp_dir = tempfile::Builder::new()
        .prefix("webmirror-test-zip-")
        .tempdir()
        .expect("Failed to create temp dir");
    let root = temp_dir.path().join("site");
    fs::create_dir_all(root.join("example.com/css")).unwrap();
    fs::create_dir_all(root.join("example.com/empty")).unwrap();
    fs::write(root.join("example.com/index.html"), "<html></html>").unwrap();
    fs::write(root.join("example.com/css/site.css"), "body{}").unwrap();
    temp_dir
}

#[test]
fn zip_contains_every_file() {
    let temp_dir = mirror_tree();
    let root = temp_dir.path().join("site");

    let report = zip_dir(&root, PackOptions::new()).expect("archive failed");

    assert_eq!(report.entry_count, 2);
    assert!(root.exists());
    assert!(!report.source_deleted);

    let mut archive = zip::ZipArchive::new(File::open(&report.archive).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["example.com/css/site.css", "example.com/index.html"]);

    let mut css = String::new();
    archive
        .by_name("example.com/css/site.css")
        .unwrap()
        .read_to_string(&mut css)
        .unwrap();
    assert_eq!(css, "body{}");
}

#[test]
fn zip_can_delete_source() {
    let temp_dir = mirror_tree();
    let root = temp_dir.path().join("site");

    let report = zip_dir(&root, PackOptions::new().delete_source(true)).unwrap();

    assert!(report.source_deleted);
    assert!(!root.exists());
    assert!(report.archive.exists());
}
