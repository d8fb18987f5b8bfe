//! CLI replay tests: a synthetic KISS capture in, files and logs out.

use assert_cmd::Command;
use predicates::prelude::*;

use skycast_wire::{encode_frame, frame, AnnouncementRecord, BlockRecord, SERVICE_FILE};

fn announcement() -> AnnouncementRecord {
    AnnouncementRecord {
        carousel_id: 2,
        file_id: 17,
        total_blocks: 2,
        block_size: 64,
        file_len: 100,
        name: "news/today.txt".to_owned(),
        signature: vec![0xC3; 4],
        sys_blocks: 2,
        n1: 0,
        seed: 0,
    }
}

/// A capture carrying one complete two-block file.
fn capture_bytes() -> (Vec<u8>, Vec<u8>) {
    let block0 = vec![b'a'; 64];
    let block1 = vec![b'b'; 36];
    let mut contents = block0.clone();
    contents.extend_from_slice(&block1);

    let mut capture = Vec::new();
    capture.extend(frame(&encode_frame(SERVICE_FILE, &announcement().encode())));
    capture.extend(frame(&encode_frame(
        SERVICE_FILE,
        &BlockRecord::encode(2, 17, 0, &block0),
    )));
    capture.extend(frame(&encode_frame(
        SERVICE_FILE,
        &BlockRecord::encode(2, 17, 1, &block1),
    )));
    (capture, contents)
}

#[test]
fn replay_reconstructs_file_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("broadcast.kiss");
    let output_dir = dir.path().join("out");
    let (capture, contents) = capture_bytes();
    std::fs::write(&capture_path, capture).unwrap();

    Command::cargo_bin("skycast")
        .unwrap()
        .arg(&capture_path)
        .arg("--output")
        .arg(&output_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("new file announced"))
        .stdout(predicate::str::contains("file reconstructed"));

    let written = std::fs::read(output_dir.join("news/today.txt")).unwrap();
    assert_eq!(written, contents);
}

#[test]
fn missing_capture_fails() {
    Command::cargo_bin("skycast")
        .unwrap()
        .arg("/nonexistent/capture.kiss")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open capture"));
}

#[test]
fn help_mentions_flags() {
    Command::cargo_bin("skycast")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--listen"));
}
