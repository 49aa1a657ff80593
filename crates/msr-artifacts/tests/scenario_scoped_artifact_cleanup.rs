//! Scenario: a scoped artifact never outlives its stream.
//!
//! However the consumer stops (full read, partial read, failed parse, explicit
//! close) the backing file is gone afterwards.

use std::fs;
use std::io::{BufRead, Read, Seek, SeekFrom};

use msr_artifacts::{export_model, ModelExport, ScopedArtifact, EXPORT_SCHEMA_VERSION};
use serde_json::json;

#[test]
fn full_read_then_close_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"hello world").unwrap();
    let path = a.path().to_path_buf();
    assert!(path.exists());

    let mut s = String::new();
    a.read_to_string(&mut s).unwrap();
    assert_eq!(s, "hello world");

    a.close();
    assert!(!path.exists());
}

#[test]
fn partial_read_then_drop_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"0123456789").unwrap();
        let mut buf = [0u8; 3];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"012");
        a.path().to_path_buf()
    };
    assert!(!path.exists());
}

#[test]
fn failed_consumer_still_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = ScopedArtifact::create_in(dir.path(), "payload", b"{ not json").unwrap();
    let path = a.path().to_path_buf();

    let parsed: Result<serde_json::Value, _> = serde_json::from_reader(a);

    assert!(parsed.is_err());
    assert!(!path.exists());
}

#[test]
fn failed_create_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();

    // prefix points into a directory that does not exist
    let err = ScopedArtifact::create_in(dir.path(), "missing/payload", b"data").unwrap_err();

    assert!(format!("{err:#}").contains("create artifact failed"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn created_artifact_reads_from_the_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"abc").unwrap();

    let mut s = String::new();
    a.read_to_string(&mut s).unwrap();
    assert_eq!(s, "abc");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn mark_reset_and_skip() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"abcdefghij").unwrap();

    assert_eq!(a.skip(2).unwrap(), 2);
    a.mark().unwrap();
    let mut buf = [0u8; 3];
    a.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"cde");

    a.reset().unwrap();
    a.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"cde");

    // skipping past the end stops at the end
    assert_eq!(a.skip(100).unwrap(), 5);
    assert_eq!(a.read(&mut buf).unwrap(), 0);
}

#[test]
fn reset_without_mark_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"abc").unwrap();

    let err = a.reset().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn seek_and_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ScopedArtifact::create_in(dir.path(), "payload", b"one\ntwo\nthree\n").unwrap();

    a.seek(SeekFrom::Start(4)).unwrap();
    let lines: Vec<String> = a.by_ref().lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines, vec!["two", "three"]);
}

#[test]
fn renamed_file_survives_the_drop() {
    let dir = tempfile::tempdir().unwrap();
    let kept = dir.path().join("kept.bin");
    {
        let a = ScopedArtifact::create_in(dir.path(), "payload", b"keep me").unwrap();
        fs::rename(a.path(), &kept).unwrap();
    }
    assert_eq!(fs::read(&kept).unwrap(), b"keep me");
}

#[test]
fn model_export_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let model = json!({ "server": { "default": { "queue": { "q1": { "durable": true } } } } });

    let mut a = export_model(dir.path(), "abc123", model.clone()).unwrap();
    let path = a.path().to_path_buf();
    let export: ModelExport = serde_json::from_reader(&mut a).unwrap();
    drop(a);

    assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
    assert_eq!(export.config_hash, "abc123");
    assert_eq!(export.model, model);
    assert!(!path.exists());
}
