//! Session persistence for the terminal client.
//!
//! The state file is a flat JSON object of string keys to string values, the
//! same shape the browser keeps in `localStorage`. A missing or unreadable
//! file is an empty store; a failed write is logged and the in-memory copy
//! stays authoritative for the rest of the process.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use coursehub_client::state::token_store::KeyValueStore;

pub struct FileStorage {
    path: PathBuf,
    items: RefCell<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = read_items(&path);
        Self { path, items: RefCell::new(items) }
    }

    fn flush(&self) {
        let items = self.items.borrow();
        let result = if items.is_empty() { remove_file(&self.path) } else { write_items(&self.path, &items) };
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write session state");
        }
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let changed = self.items.borrow_mut().insert(key.to_owned(), value.to_owned()).as_deref() != Some(value);
        if changed {
            self.flush();
        }
    }

    fn remove(&self, key: &str) {
        if self.items.borrow_mut().remove(key).is_some() {
            self.flush();
        }
    }
}

fn read_items(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "session state unreadable; starting signed out");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "session state malformed; starting signed out");
        BTreeMap::new()
    })
}

fn write_items(path: &Path, items: &BTreeMap<String, String>) -> io::Result<()> {
    let rendered = serde_json::to_string_pretty(items).map_err(io::Error::other)?;
    let mut file = open_private(path)?;
    file.write_all(rendered.as_bytes())?;
    file.write_all(b"\n")
}

/// The file holds bearer tokens; keep it owner-only where the platform allows.
fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
