// Property File Parser
// Parses the simple key=value files used for viewer audio/gesture settings

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Parse property file text, invoking `handler` for each key-value pair.
///
/// Keys keep their case. A `#` starts a comment anywhere on a line, blank
/// lines are skipped, and whitespace around keys and values is trimmed.
/// Lines without `=` are skipped with a warning.
///
/// # Arguments
/// * `data` - The property file content to parse
/// * `handler` - Callback invoked with `(key, value)` for each entry
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(&str, &str)) {
    const NL: u8 = b'\n';
    const HASH: u8 = b'#';
    const EQ: u8 = b'=';

    let bytes = data.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }

        if bytes[i] == HASH {
            while i < len && bytes[i] != NL {
                i += 1;
            }
            continue;
        }

        let key_start = i;
        while i < len && bytes[i] != EQ && bytes[i] != NL && bytes[i] != HASH {
            i += 1;
        }

        if i >= len || bytes[i] != EQ {
            log::warn!(
                "Ignoring property line without value: {:?}",
                data[key_start..i].trim_end()
            );
            while i < len && bytes[i] != NL {
                i += 1;
            }
            continue;
        }

        let key = data[key_start..i].trim_end();
        i += 1;

        let value_start = i;
        while i < len && bytes[i] != HASH && bytes[i] != NL {
            i += 1;
        }
        let value = data[value_start..i].trim();

        while i < len && bytes[i] != NL {
            i += 1;
        }

        handler(key, value);
    }
}

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Property file not found")]
    FileNotFound,
    #[error("I/O error reading property file: {0}")]
    Io(io::Error),
}

impl From<io::Error> for PropertyError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => PropertyError::FileNotFound,
            _ => PropertyError::Io(err),
        }
    }
}

/// Key-value settings read from a property file. Keys are case-insensitive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyFile {
    properties: HashMap<String, String>,
}

impl PropertyFile {
    /// Load a property file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PropertyError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Build from property file text
    pub fn parse(text: &str) -> Self {
        let mut properties = HashMap::new();
        parse_propfile(text, &mut |key, value| {
            if !key.is_empty() {
                properties.insert(key.to_lowercase(), value.to_string());
            }
        });
        PropertyFile { properties }
    }

    /// Get a property value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Get all keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Get the number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the property file is empty
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
