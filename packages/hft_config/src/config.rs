use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{ConfigType, ConfigValue, Error, Result};

/// A thread-safe store of named configuration values.
///
/// Values are typed ([`ConfigValue`]) and read back with [`get()`][Self::get], which falls back
/// to a caller-supplied default when the key is missing or holds a different kind of value.
///
/// # File format
///
/// One `key=value` pair per line. Blank lines and lines starting with `#` are ignored, as are
/// lines without `=`. Whitespace around keys and values is trimmed. Values are typed by
/// [`ConfigValue::parse()`]: a double-quoted value is a string, otherwise `true`/`TRUE`/
/// `false`/`FALSE` are booleans, then integers, then floats, and anything else is a string.
///
/// Saving writes the keys in sorted order, with strings double-quoted, so that a saved file
/// loads back to the same values. Strings are escaped as described on [`ConfigValue`], so any
/// string survives the round trip, including one with line breaks.
///
/// # Example
///
/// ```rust
/// use hft_config::Config;
///
/// let config = Config::new();
/// config.load_from_str(
///     "# engine settings\n\
///      symbol = \"BTCUSD\"\n\
///      max_orders = 500\n\
///      tick_size = 0.5\n\
///      paper_trading = true\n",
/// );
///
/// assert_eq!(config.get("symbol", String::new()), "BTCUSD");
/// assert_eq!(config.get("max_orders", 0_i64), 500);
/// assert_eq!(config.get("tick_size", 0.0), 0.5);
/// assert!(config.get("paper_trading", false));
///
/// // Missing keys and mismatched types fall back to the default.
/// assert_eq!(config.get("missing", 7_i32), 7);
/// assert_eq!(config.get("symbol", 7_i32), 7);
/// ```
#[derive(Default)]
pub struct Config {
    values: RwLock<BTreeMap<String, ConfigValue>>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration file and merges its values into this configuration.
    ///
    /// Keys present in the file replace existing values; other existing keys are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read. The configuration is unchanged in that
    /// case.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let loaded = self.load_from_str(&text);
        debug!(path = %path.display(), loaded, "configuration file loaded");

        Ok(())
    }

    /// Parses configuration text and merges its values into this configuration.
    ///
    /// Returns the number of values that were read.
    pub fn load_from_str(&self, text: &str) -> usize {
        let parsed: Vec<_> = text
            .lines()
            .enumerate()
            .filter_map(|(index, line)| parse_line(index, line))
            .collect();

        let count = parsed.len();
        self.values.write().extend(parsed);

        count
    }

    /// Writes every value to a file in the format accepted by
    /// [`load_from_file()`][Self::load_from_file], replacing the file if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        fs::write(path, self.to_file_string()).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "configuration file saved");

        Ok(())
    }

    /// Renders every value in the file format, one `key=value` line per key in sorted order.
    #[must_use]
    pub fn to_file_string(&self) -> String {
        let values = self.values.read();
        let mut text = String::new();

        for (key, value) in values.iter() {
            writeln!(text, "{key}={value}").expect("writing to a String cannot fail");
        }

        text
    }

    /// Returns the value for `key` as `T`, or `default` if the key is missing or its value is
    /// of a different kind.
    #[must_use]
    pub fn get<T: ConfigType>(&self, key: &str, default: T) -> T {
        self.values
            .read()
            .get(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Returns a copy of the raw value for `key`, whatever its kind.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<ConfigValue> {
        self.values.read().get(key).cloned()
    }

    /// Stores a value, replacing any previous value for the key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Whether a value is stored for `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Removes the value for `key`, returning it if there was one.
    pub fn remove(&self, key: &str) -> Option<ConfigValue> {
        self.values.write().remove(key)
    }

    /// All keys, in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl fmt::Debug for Config {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("values", &*self.values.read())
            .finish()
    }
}

fn parse_line(index: usize, line: &str) -> Option<(String, ConfigValue)> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let Some((key, raw_value)) = line.split_once('=') else {
        trace!(line_number = index.saturating_add(1), "skipping configuration line without '='");
        return None;
    };

    Some((key.trim().to_string(), ConfigValue::parse(raw_value.trim())))
}
