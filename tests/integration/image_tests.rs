use dupfind::duplicates::similar::find_similar_in_files;
use dupfind::duplicates::{find_exact, find_similar_images, ExactConfig, GroupKey, SimilarConfig};
use dupfind::events::{CollectingSink, ScanEvent};
use dupfind::scanner::{FileEntry, PerceptualAlgorithm};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn save_photo(path: &Path) {
    let img = RgbImage::from_fn(64, 48, |x, y| {
        let v = ((x * 4) % 256) as u8;
        Rgb([v, (y * 5) as u8, 255 - v])
    });
    img.save(path).unwrap();
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_renamed_copy_matches_in_both_modes() {
    let dir = tempdir().unwrap();
    save_photo(&dir.path().join("x.jpg"));
    fs::copy(dir.path().join("x.jpg"), dir.path().join("y.jpg")).unwrap();
    let roots = vec![dir.path().to_path_buf()];

    let (exact, _) = find_exact(&roots, &ExactConfig::default(), &CollectingSink::new()).unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(file_names(&exact[0].paths()), vec!["x.jpg", "y.jpg"]);

    let (similar, stats) =
        find_similar_images(&roots, &SimilarConfig::default(), &CollectingSink::new()).unwrap();
    assert_eq!(stats.images_indexed, 2);
    assert_eq!(stats.distinct_vectors, 1);
    assert_eq!(similar.len(), 1);
    assert_eq!(
        similar[0].key,
        GroupKey::Similar {
            distance: 0,
            cluster: 0
        }
    );
    assert_eq!(file_names(&similar[0].paths()), vec!["x.jpg", "y.jpg"]);
}

#[test]
fn test_corrupt_image_is_reported_and_excluded() {
    let dir = tempdir().unwrap();
    save_photo(&dir.path().join("x.jpg"));
    fs::copy(dir.path().join("x.jpg"), dir.path().join("y.jpg")).unwrap();
    // JPEG start-of-image marker followed by garbage
    fs::write(dir.path().join("z.jpg"), [0xFF, 0xD8, 0xFF, 0x00, 0x13]).unwrap();

    let sink = CollectingSink::new();
    let (groups, stats) = find_similar_images(
        &[dir.path().to_path_buf()],
        &SimilarConfig::default(),
        &sink,
    )
    .unwrap();

    assert_eq!(stats.candidate_images, 3);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(groups.len(), 1);
    assert!(groups
        .iter()
        .all(|g| g.paths().iter().all(|p| !p.ends_with("z.jpg"))));

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ScanEvent::DecodeFailed(e) if e.path().ends_with("z.jpg")));
}

#[test]
fn test_non_image_files_are_ignored() {
    let dir = tempdir().unwrap();
    save_photo(&dir.path().join("a.png"));
    fs::copy(dir.path().join("a.png"), dir.path().join("b.png")).unwrap();
    fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

    let sink = CollectingSink::new();
    let (groups, stats) = find_similar_images(
        &[dir.path().to_path_buf()],
        &SimilarConfig::default(),
        &sink,
    )
    .unwrap();

    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.candidate_images, 2);
    assert_eq!(groups.len(), 1);
    assert!(sink.is_empty());
}

#[test]
fn test_extension_filter() {
    let dir = tempdir().unwrap();
    save_photo(&dir.path().join("a.png"));
    fs::copy(dir.path().join("a.png"), dir.path().join("b.png")).unwrap();

    let config = SimilarConfig::default().with_extensions(vec!["jpg".into()]);
    let (groups, stats) =
        find_similar_images(&[dir.path().to_path_buf()], &config, &CollectingSink::new()).unwrap();

    assert_eq!(stats.candidate_images, 0);
    assert!(groups.is_empty());
}

#[test]
fn test_max_distance_zero_reports_only_exact_fingerprints() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    save_photo(&a);
    fs::copy(&a, &b).unwrap();

    let files = vec![
        FileEntry::new(a, fs::metadata(dir.path().join("a.png")).unwrap().len()),
        FileEntry::new(b, fs::metadata(dir.path().join("b.png")).unwrap().len()),
    ];
    let config = SimilarConfig::default()
        .with_algorithm(PerceptualAlgorithm::Dhash)
        .with_max_distance(0);
    let (groups, _) = find_similar_in_files(files, &config, &CollectingSink::new()).unwrap();

    assert_eq!(groups.len(), 1);
    assert!(groups.iter().all(|g| matches!(g.key, GroupKey::Similar { distance: 0, .. })));
}
