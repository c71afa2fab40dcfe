//! Installing a process-wide logger. Kept in its own test binary because the global
//! subscriber can only be set once per process.

use hft_log::{Error, Logger, LoggerConfig};
use tempfile::TempDir;

#[cfg_attr(miri, ignore)]
#[test]
fn global_logger_can_only_be_installed_once() {
    let dir = TempDir::new().unwrap();

    let first = Logger::new(&LoggerConfig::new().file(dir.path().join("first.log"))).unwrap();
    let second = Logger::new(&LoggerConfig::new().file(dir.path().join("second.log"))).unwrap();

    first.install_global().unwrap();
    tracing::info!("through the global logger");

    assert!(matches!(
        second.install_global(),
        Err(Error::GlobalAlreadyInstalled)
    ));

    drop(second);
    drop(first);

    let text = std::fs::read_to_string(dir.path().join("first.log")).unwrap();
    assert!(text.contains("through the global logger"));
}
