//! Tests that write through a real logger into files.

use std::fs;
use std::path::Path;
use std::thread;

use hft_log::{Error, LogLevel, LogOutput, Logger, LoggerConfig, fatal};
use tempfile::TempDir;

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg_attr(miri, ignore)]
#[test]
fn writes_filtered_formatted_lines_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.log");

    let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Info).file(&path)).unwrap();
    assert_eq!(logger.output(), &LogOutput::File(path.clone()));

    thread::scope(|scope| {
        thread::Builder::new()
            .name("strategy-1".to_string())
            .spawn_scoped(scope, || {
                logger.in_scope(|| {
                    tracing::debug!("not written");
                    tracing::info!(order_id = 17, "order accepted");
                    tracing::warn!("spread is wide");
                    fatal!("engine halted");
                });
            })
            .unwrap();
    });

    // Dropping the logger flushes the writer thread.
    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 3, "unexpected log contents: {lines:#?}");

    assert!(lines[0].contains(" [INFO] [strategy-1] order accepted order_id=17 ("));
    assert!(lines[1].contains(" [WARN] [strategy-1] spread is wide ("));
    assert!(lines[2].contains(" [FATAL] [strategy-1] engine halted ("));

    for line in &lines {
        assert!(line.contains("logger.rs:"), "missing location: {line}");
        assert!(line.ends_with(')'), "missing location: {line}");
    }
}

#[cfg_attr(miri, ignore)]
#[test]
fn min_level_can_change_while_logging() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("levels.log");

    let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Warn).file(&path)).unwrap();

    logger.in_scope(|| {
        tracing::info!("before change");

        logger.set_min_level(LogLevel::Debug);
        assert!(logger.is_enabled(LogLevel::Debug));

        tracing::debug!("after change");
    });

    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("after change"));
}

#[cfg_attr(miri, ignore)]
#[test]
fn fatal_threshold_hides_ordinary_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fatal.log");

    let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Fatal).file(&path)).unwrap();

    logger.in_scope(|| {
        tracing::error!("ordinary error");
        fatal!("fatal error");
    });

    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[FATAL]"));
}

#[cfg_attr(miri, ignore)]
#[test]
fn appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("append.log");
    fs::write(&path, "existing line\n").unwrap();

    let logger = Logger::new(&LoggerConfig::new().file(&path)).unwrap();
    logger.in_scope(|| tracing::info!("new line"));
    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "existing line");
}

#[cfg_attr(miri, ignore)]
#[test]
fn thread_default_applies_until_guard_dropped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scoped.log");

    let logger = Logger::new(&LoggerConfig::new().file(&path)).unwrap();

    {
        let _guard = logger.set_default();
        tracing::info!("while installed");
    }

    tracing::info!("after guard dropped");
    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("while installed"));
}

#[cfg_attr(miri, ignore)]
#[test]
fn unopenable_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing_dir").join("x.log");

    let result = Logger::new(&LoggerConfig::new().file(&path));

    assert!(matches!(result, Err(Error::Io { .. })));
}
