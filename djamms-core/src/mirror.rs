use std::collections::HashMap;

/// Key under which a device records that it held mastery. Consulted on
/// reconnect to retry acquisition immediately; a hint only — the store
/// verdict stays authoritative.
pub const WAS_MASTER_KEY: &str = "was_master";

/// Explicit local cache replacing ambient browser storage.
///
/// String keyed, string valued; callers own the schema of what they
/// stash here.
pub trait LocalMirror {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
    fn clear(&mut self, key: &str);
}

/// HashMap-backed mirror for tests and native hosts.
#[derive(Debug, Default)]
pub struct InMemoryMirror {
    entries: HashMap<String, String>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalMirror for InMemoryMirror {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn clear(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
