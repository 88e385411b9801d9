use fauna_domain::config::LoggingConfig;
use fauna_logger::Logger;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
#[serial]
fn file_logging_creates_json_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let config = LoggingConfig {
        directory: Some(log_dir.clone()),
        json: true,
        ..LoggingConfig::default()
    };

    let logger = Logger::builder().name("fauna-file-logging").config(&config).init()?;
    assert!(logger.writes_files());

    tracing::info!(branch = "b-1", "replenished");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let first = contents.lines().next().expect("at least one line");
    let json: serde_json::Value = serde_json::from_str(first)?;
    assert_eq!(json["fields"]["message"], "replenished");

    Ok(())
}
