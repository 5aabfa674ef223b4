use dupfind::duplicates::{find_by_filename, FilenameMatcher, GroupKey, ScanOptions};
use dupfind::events::{CollectingSink, ScanEvent};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_versioned_reports_share_a_key() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("report_v1.txt"), b"first draft").unwrap();
    fs::write(dir.path().join("report_v2.txt"), b"second draft, longer").unwrap();
    fs::write(dir.path().join("notes.txt"), b"unrelated").unwrap();

    let matcher = FilenameMatcher::new(r"^(.*)_v\d+\.txt$", "$1").unwrap();
    let sink = CollectingSink::new();
    let (groups, stats) = find_by_filename(
        &[dir.path().to_path_buf()],
        &matcher,
        &ScanOptions::default(),
        &sink,
    )
    .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, GroupKey::Name("report".to_string()));
    assert_eq!(groups[0].len(), 2);
    assert_eq!(stats.files_matched, 2);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ScanEvent::NameUnmatched { path } if path.ends_with("notes.txt")));
    assert_eq!(sink.error_count(), 0);
}

#[test]
fn test_keys_group_across_directories() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("2023")).unwrap();
    fs::create_dir_all(dir.path().join("2024")).unwrap();
    fs::write(dir.path().join("2023/IMG_0001.JPG"), b"a").unwrap();
    fs::write(dir.path().join("2024/img_0001.jpeg"), b"b").unwrap();
    fs::write(dir.path().join("2024/img_0002.jpeg"), b"c").unwrap();

    let matcher = FilenameMatcher::new(r"(?i)^img_(\d+)\.jpe?g$", "photo-$1").unwrap();
    let (groups, _) = find_by_filename(
        &[dir.path().to_path_buf()],
        &matcher,
        &ScanOptions::default(),
        &CollectingSink::new(),
    )
    .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.label(), "photo-0001");
}

#[test]
fn test_no_matches_gives_no_groups() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let matcher = FilenameMatcher::new(r"^never$", "$0").unwrap();
    let sink = CollectingSink::new();
    let (groups, stats) = find_by_filename(
        &[dir.path().to_path_buf()],
        &matcher,
        &ScanOptions::default(),
        &sink,
    )
    .unwrap();

    assert!(groups.is_empty());
    assert_eq!(stats.files_matched, 0);
    assert_eq!(sink.len(), 2);
}
