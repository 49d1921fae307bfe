//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;

use r_kit_common::config::LoggerSettings;
use r_kit_logging::{
    derive_transcript_path, BufferConsole, Category, LogColor, Logger, LoggerConfig, Severity,
    TranscriptLogger,
};
use tempfile::tempdir;

#[test]
fn settings_drive_filter_and_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ops").join("deploy.log");
    let settings = LoggerSettings {
        min_level: "error".to_owned(),
        file: Some(path.clone()),
        auto_create: true,
        transcript: false,
    };
    let console = BufferConsole::new();
    let logger = Logger::with_console(LoggerConfig::try_from(&settings).unwrap(), console.clone());

    logger.warning("disk at 80%");
    logger.write_log("path check", Category::Critical, Severity::Critical, None);
    logger.error("disk full");
    logger.write_log("custom label", Category::from("Audit"), Severity::Info, None);

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("[Critical] [Critical] - path check"));
    assert!(lines[1].ends_with("[Error] [Error] - disk full"));
    assert!(lines[2].ends_with("[Info] [Audit] - custom label"));
    assert_eq!(console.entries()[1].1, LogColor::Red);
}

#[test]
fn transcript_sits_next_to_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.log");
    let logger = TranscriptLogger::with_console(
        LoggerConfig::new(Severity::Debug).with_log_file(&path, true),
        BufferConsole::new(),
    );
    assert_eq!(logger.transcript_path(), Some(derive_transcript_path(&path).as_path()));
    assert!(dir.path().join("run_transcript.log").exists());
    logger.record("$ ./deploy.sh --dry-run");
    drop(logger);

    let transcript = fs::read_to_string(dir.path().join("run_transcript.log")).unwrap();
    let started = transcript.find("Transcript started").unwrap();
    let command = transcript.find("$ ./deploy.sh --dry-run").unwrap();
    let ended = transcript.find("Transcript ended").unwrap();
    assert!(started < command && command < ended);
}
