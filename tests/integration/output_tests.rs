use dupfind::duplicates::{find_by_filename, find_exact, ExactConfig, FilenameMatcher, ScanOptions};
use dupfind::events::CollectingSink;
use dupfind::output::{write_groups, CsvLayout, CsvOutput, OutputError, OutputFormat, XmlOutput};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_exact_csv_rows() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [0u8; 16]).unwrap();
    fs::write(dir.path().join("b.bin"), [0u8; 16]).unwrap();

    let (groups, _) = find_exact(
        &[dir.path().to_path_buf()],
        &ExactConfig::default(),
        &CollectingSink::new(),
    )
    .unwrap();
    let csv = CsvOutput::new(&groups).to_string().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    let hash = groups[0].key.label();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "size,hash,path");
    assert_eq!(
        lines[1],
        format!("16,{},{}", hash, dir.path().join("a.bin").display())
    );
    assert_eq!(
        lines[2],
        format!("16,{},{}", hash, dir.path().join("b.bin").display())
    );
}

#[test]
fn test_empty_report_keeps_header() {
    let csv = CsvOutput::new(&[])
        .with_layout(CsvLayout::SizeHashPath)
        .to_string()
        .unwrap();
    assert_eq!(csv, "size,hash,path\n");

    let mut out = Vec::new();
    write_groups(OutputFormat::Csv, &[], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "key,path,size\n");
}

#[test]
fn test_filename_groups_as_xml() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a&b_v1.txt"), b"1").unwrap();
    fs::write(dir.path().join("a&b_v2.txt"), b"22").unwrap();
    fs::write(dir.path().join("a&b_v3.txt"), b"333").unwrap();

    let matcher = FilenameMatcher::new(r"^(.*)_v\d+\.txt$", "$1").unwrap();
    let (groups, _) = find_by_filename(
        &[dir.path().to_path_buf()],
        &matcher,
        &ScanOptions::default(),
        &CollectingSink::new(),
    )
    .unwrap();

    let xml = XmlOutput::new(&groups).to_string().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert_eq!(xml.matches("<group>").count(), 1);
    assert_eq!(xml.matches("<file ").count(), 3);
    assert_eq!(xml.matches("<match ").count(), 3);
    assert!(xml.contains(r#"<match first="0" second="2" percentage="100"/>"#));
    assert!(xml.contains("a&amp;b_v1.txt"));
    assert!(!xml.contains("a&b"));
}

#[test]
fn test_xml_refuses_image_clusters() {
    use dupfind::duplicates::{DuplicateGroup, GroupKey};
    use dupfind::scanner::FileEntry;
    use std::path::PathBuf;

    let groups = vec![DuplicateGroup::new(
        GroupKey::Similar {
            distance: 3,
            cluster: 0,
        },
        vec![
            FileEntry::new(PathBuf::from("/p/a.jpg"), 10),
            FileEntry::new(PathBuf::from("/p/b.jpg"), 10),
        ],
    )];

    let mut out = Vec::new();
    let err = write_groups(OutputFormat::Xml, &groups, &mut out).unwrap_err();
    assert!(matches!(err, OutputError::UnsupportedFormat { .. }));
    assert!(out.is_empty());

    let csv = CsvOutput::new(&groups).to_string().unwrap();
    assert!(csv.starts_with("key,path,size\n3:0,/p/a.jpg,10\n"));
}
