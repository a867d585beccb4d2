//! JSON-lines event stream.
//!
//! Each non-blank line is one lifecycle notification:
//!
//! ```json
//! {"key": ["builds", 20, "new"], "build": {"builder": "Builder0", ...}}
//! ```

use serde::Deserialize;
use status::{Build, LifecycleKey};

#[derive(Debug, Deserialize)]
struct EventLine {
    key: (String, u64, String),
    build: Build,
}

/// One decoded line of the event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamItem {
    /// A notification the reporter subscribes to.
    Event(LifecycleKey, Build),
    /// A well-formed notification under a key the reporter ignores.
    Ignored { resource: String, action: String },
    /// Whitespace only.
    Blank,
}

/// Decodes one line of the event stream.
pub fn parse_line(line: &str) -> Result<StreamItem, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StreamItem::Blank);
    }

    let EventLine {
        key: (resource, id, action),
        build,
    } = serde_json::from_str(line)?;

    Ok(match LifecycleKey::from_parts(&resource, id, &action) {
        Some(key) => StreamItem::Event(key, build),
        None => StreamItem::Ignored { resource, action },
    })
}
