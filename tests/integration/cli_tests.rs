use clap::Parser;
use dupfind::cli::{Cli, PlanError, RunPlan};
use dupfind::config::Config;
use dupfind::error::ExitCode;
use dupfind::run_app;
use std::fs;
use tempfile::tempdir;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("dupfind").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_run_writes_csv_report() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), b"duplicate").unwrap();
    fs::write(root.join("b.txt"), b"duplicate").unwrap();
    fs::write(root.join("c.txt"), b"unique").unwrap();
    let report = dir.path().join("report.csv");

    let code = run_app(cli(&[
        root.to_str().unwrap(),
        "-o",
        report.to_str().unwrap(),
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let csv = fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "size,hash,path");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with("a.txt"));
    assert!(lines[2].ends_with("b.txt"));
}

#[test]
fn test_run_id3_hash_matches_files_of_different_sizes() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("music");
    fs::create_dir(&root).unwrap();
    let audio = b"frames frames frames";
    let mut tagged = b"ID3\x04\x00\x00\x00\x00\x0ATIT2tagged".to_vec();
    tagged.extend_from_slice(audio);
    fs::write(root.join("plain.mp3"), audio).unwrap();
    fs::write(root.join("tagged.mp3"), &tagged).unwrap();
    let report = dir.path().join("report.csv");

    let code = run_app(cli(&[
        root.to_str().unwrap(),
        "--hash",
        "id3-stripped",
        "-o",
        report.to_str().unwrap(),
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let csv = fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "key,path,size");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("plain.mp3"));
    assert!(lines[2].contains("tagged.mp3"));
}

#[test]
fn test_run_without_duplicates() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), b"one").unwrap();
    fs::write(root.join("b.txt"), b"two!").unwrap();
    let report = dir.path().join("report.csv");

    let code = run_app(cli(&[
        root.to_str().unwrap(),
        "-o",
        report.to_str().unwrap(),
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(fs::read_to_string(&report).unwrap(), "size,hash,path\n");
}

#[test]
fn test_run_filename_mode_xml() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("docs");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("report_v1.txt"), b"1").unwrap();
    fs::write(root.join("report_v2.txt"), b"2").unwrap();
    fs::write(root.join("notes.txt"), b"3").unwrap();
    let report = dir.path().join("results.xml");

    let code = run_app(cli(&[
        root.to_str().unwrap(),
        "--mode",
        "filename",
        "--pattern",
        r"^(.*)_v\d+\.txt$",
        "--format",
        "xml",
        "-o",
        report.to_str().unwrap(),
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let xml = fs::read_to_string(&report).unwrap();
    assert_eq!(xml.matches("<file ").count(), 2);
    assert!(!xml.contains("notes.txt"));
}

#[test]
fn test_run_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = run_app(cli(&[missing.to_str().unwrap(), "--no-progress", "-q"])).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_xml_image_combination_is_rejected_before_scanning() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("out.xml");

    let plan = RunPlan::from_cli(
        &cli(&[
            dir.path().to_str().unwrap(),
            "-m",
            "image",
            "-f",
            "xml",
            "-o",
            report.to_str().unwrap(),
        ]),
        &Config::default(),
    );

    assert!(matches!(plan, Err(PlanError::UnsupportedFormat { .. })));
    assert!(!report.exists());
}

#[test]
fn test_run_with_explicit_missing_config() {
    let dir = tempdir().unwrap();
    let err = run_app(cli(&[
        dir.path().to_str().unwrap(),
        "--config",
        dir.path().join("absent.toml").to_str().unwrap(),
        "--no-progress",
        "-q",
    ]))
    .unwrap_err();

    assert!(format!("{:#}", err).contains("Config file not found"));
}
