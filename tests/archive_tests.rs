// tests/archive_tests.rs
use accesslog::{
    CancellationToken, ConfigError, Parser, ParserConfig, PatternSet, ProcessingError,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn status_parser() -> Parser {
    let patterns = PatternSet::from_patterns(&[r"(?P<status>\d{3}) (?P<size>\d+)"]).unwrap();
    Parser::from_patterns(patterns, ParserConfig::default()).unwrap()
}

fn tar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

fn write_archive(suffix: &str, bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn three_entries() -> Vec<u8> {
    tar_bytes(&[
        ("A.log", "200 1\n200 2\n200 3\n200 4\n200 5\n"),
        ("B.log", "200 1\n200 2\nbroken\n200 4\n200 5\n"),
        ("C.log", "x1\nx2\nx3\nx4\nx5\n"),
    ])
}

#[test]
fn test_archive_results_are_merged() {
    let archive = write_archive(".tar", &three_entries());
    let mut output = Vec::new();
    let result = status_parser()
        .parse_archive(archive.path(), None, &mut output)
        .unwrap();

    assert_eq!(result.total, 15);
    assert_eq!(result.matched, 9);
    assert_eq!(result.unmatched, 6);
    assert_eq!(result.archive_entries, vec!["A.log", "B.log", "C.log"]);
    assert_eq!(result.source, archive.path().display().to_string());

    assert_eq!(result.errors.len(), 6);
    assert_eq!(result.errors[0].entry.as_deref(), Some("B.log"));
    assert_eq!(result.errors[0].line_number, 3);
    for error in &result.errors[1..] {
        assert_eq!(error.entry.as_deref(), Some("C.log"));
    }
    assert_eq!(result.errors[5].line_number, 5);
    assert_eq!(String::from_utf8(output).unwrap().lines().count(), 9);
}

#[test]
fn test_glob_selects_entries() {
    let bytes = tar_bytes(&[
        ("logs/a.log", "200 1\n"),
        ("logs/readme.txt", "not a log\n"),
        ("logs/b.log", "200 2\n"),
    ]);
    let archive = write_archive(".tar", &bytes);
    let result = status_parser()
        .parse_archive(archive.path(), Some("logs/*.log"), &mut Vec::new())
        .unwrap();

    assert_eq!(result.archive_entries, vec!["logs/a.log", "logs/b.log"]);
    assert_eq!(result.total, 2);
    assert_eq!(result.unmatched, 0);
}

#[test]
fn test_invalid_glob_fails_before_reading() {
    let result = status_parser().parse_archive(
        std::path::Path::new("/nonexistent/archive.tar"),
        Some("[abc"),
        &mut Vec::new(),
    );
    assert!(matches!(
        result,
        Err(ProcessingError::Config(ConfigError::InvalidGlob { .. }))
    ));
}

#[test]
fn test_gzip_compressed_tarball() {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&three_entries()).unwrap();
    let archive = write_archive(".tar.gz", &encoder.finish().unwrap());

    let result = status_parser()
        .parse_archive(archive.path(), Some("[AB].log"), &mut Vec::new())
        .unwrap();
    assert_eq!(result.archive_entries, vec!["A.log", "B.log"]);
    assert_eq!(result.matched, 9);
    assert_eq!(result.unmatched, 1);
}

#[test]
fn test_cancelled_archive_opens_no_entries() {
    let archive = write_archive(".tar", &three_entries());
    let token = CancellationToken::new();
    token.cancel();

    let mut output = Vec::new();
    let err = status_parser()
        .parse_archive_cancelable(archive.path(), None, &mut output, &token)
        .unwrap_err();
    assert!(matches!(err, ProcessingError::Cancelled { lines: 0 }));
    assert!(output.is_empty());
}
