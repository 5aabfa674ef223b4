use dupfind::duplicates::{find_exact, ExactConfig, GroupKey, ScanOptions};
use dupfind::events::{CollectingSink, ScanEvent};
use dupfind::scanner::{HashAlgorithm, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let sink = CollectingSink::new();

    let (groups, stats) =
        find_exact(&[dir.path().to_path_buf()], &ExactConfig::default(), &sink).unwrap();

    assert!(groups.is_empty());
    assert_eq!(stats.files_seen, 0);
    assert!(sink.is_empty());
}

#[test]
fn test_one_flipped_byte_breaks_the_group() {
    let dir = tempdir().unwrap();
    let zeros = vec![0u8; 1024];
    let mut flipped = zeros.clone();
    flipped[512] = 1;
    write(&dir.path().join("a.bin"), &zeros);
    write(&dir.path().join("b.bin"), &zeros);
    write(&dir.path().join("c.bin"), &flipped);

    let sink = CollectingSink::new();
    let (groups, stats) =
        find_exact(&[dir.path().to_path_buf()], &ExactConfig::default(), &sink).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0].paths()), vec!["a.bin", "b.bin"]);
    assert!(matches!(groups[0].key, GroupKey::Content { size: Some(1024), .. }));
    assert_eq!(stats.files_hashed, 3);
    assert_eq!(stats.wasted_space, 1024);
}

#[test]
fn test_duplicates_across_roots() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(&first.path().join("song.mp3"), b"same bytes in both trees");
    write(&second.path().join("nested/copy.mp3"), b"same bytes in both trees");
    write(&second.path().join("other.mp3"), b"different bytes entirely!");

    let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
    let (groups, _) = find_exact(&roots, &ExactConfig::default(), &CollectingSink::new()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0].paths()).len(), 2);
    assert!(groups[0].paths().iter().any(|p| p.starts_with(first.path())));
    assert!(groups[0].paths().iter().any(|p| p.starts_with(second.path())));
}

#[test]
fn test_git_directories_are_pruned() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"tracked content");
    write(&dir.path().join("b.txt"), b"tracked content");
    write(&dir.path().join(".git/objects/c.txt"), b"tracked content");

    let sink = CollectingSink::new();
    let (groups, stats) =
        find_exact(&[dir.path().to_path_buf()], &ExactConfig::default(), &sink).unwrap();

    assert_eq!(stats.files_seen, 2);
    assert_eq!(names(&groups[0].paths()), vec!["a.txt", "b.txt"]);
    let events = sink.take();
    assert!(matches!(
        &events[..],
        [ScanEvent::DirectoryPruned { path }] if path.ends_with(".git")
    ));
}

#[test]
fn test_custom_ignore_dirnames() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"x");
    write(&dir.path().join("node_modules/b.txt"), b"x");
    write(&dir.path().join(".git/c.txt"), b"x");

    let walker = WalkerConfig::default().with_ignore_dirnames(vec!["node_modules".into()]);
    let config =
        ExactConfig::default().with_scan_options(ScanOptions::default().with_walker_config(walker));
    let (groups, _) =
        find_exact(&[dir.path().to_path_buf()], &config, &CollectingSink::new()).unwrap();

    // .git is no longer ignored once the list is replaced
    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0].paths()), vec!["c.txt", "a.txt"]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempdir().unwrap();
    for (name, content) in [
        ("z.dat", "alpha"),
        ("y.dat", "alpha"),
        ("m/x.dat", "alpha"),
        ("k.dat", "bravo"),
        ("j.dat", "bravo"),
        ("solo.dat", "charlie!"),
    ] {
        write(&dir.path().join(name), content.as_bytes());
    }

    let roots = vec![dir.path().to_path_buf()];
    let config = ExactConfig::default().with_algorithm(HashAlgorithm::Sha256);
    let (first, _) = find_exact(&roots, &config, &CollectingSink::new()).unwrap();
    let (second, _) = find_exact(&roots, &config, &CollectingSink::new()).unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn test_size_bucketing_does_not_change_groups() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"12345");
    write(&dir.path().join("b"), b"12345");
    write(&dir.path().join("c"), b"123456");
    write(&dir.path().join("d"), b"abcde");

    let roots = vec![dir.path().to_path_buf()];
    let (bucketed, _) = find_exact(&roots, &ExactConfig::default(), &CollectingSink::new()).unwrap();
    let (flat, stats) = find_exact(
        &roots,
        &ExactConfig::default().with_size_bucketing(false),
        &CollectingSink::new(),
    )
    .unwrap();

    assert_eq!(stats.files_hashed, 4);
    assert!(stats.grouping.is_none());
    assert_eq!(bucketed.len(), 1);
    assert_eq!(flat.len(), 1);
    assert_eq!(bucketed[0].paths(), flat[0].paths());
    assert!(matches!(flat[0].key, GroupKey::Content { size: None, .. }));
}

#[test]
fn test_id3_tags_are_ignored() {
    let dir = tempdir().unwrap();
    let audio = b"\xFF\xFBframe data that is identical";

    let mut tagged = Vec::new();
    // ID3v2.4 header, 4-byte syncsafe body length of 10
    tagged.extend_from_slice(b"ID3\x04\x00\x00\x00\x00\x00\x0A");
    tagged.extend_from_slice(b"TIT2tagged");
    tagged.extend_from_slice(audio);
    write(&dir.path().join("tagged.mp3"), &tagged);
    write(&dir.path().join("plain.mp3"), audio);

    let roots = vec![dir.path().to_path_buf()];
    let (plain_groups, _) =
        find_exact(&roots, &ExactConfig::default(), &CollectingSink::new()).unwrap();
    assert!(plain_groups.is_empty());

    let config = ExactConfig::default()
        .with_algorithm(HashAlgorithm::Id3Stripped)
        .with_size_bucketing(false);
    let (groups, _) = find_exact(&roots, &config, &CollectingSink::new()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0].paths()), vec!["plain.mp3", "tagged.mp3"]);
}
