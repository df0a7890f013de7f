//! Key/value persistence for the session snapshot.
//! Mirrors browser local storage: string keys, string values, and a missing or unreadable
//! backing store simply reads as empty.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

pub const TOKEN_KEY: &str = "access_token";
pub const USER_KEY: &str = "user";

/// Each call is applied as one unit: either every entry lands or none does.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set_all(&self, entries: &[(&str, &str)]) -> io::Result<()>;
    fn remove_all(&self, keys: &[&str]) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> { self.entries.read().get(key).cloned() }

    fn set_all(&self, entries: &[(&str, &str)]) -> io::Result<()> {
        let mut map = self.entries.write();
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> io::Result<()> {
        let mut map = self.entries.write();
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }
}

/// One JSON object per file; every write rewrites the whole map via temp file + rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serialises read-modify-write cycles from this process
    guard: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into(), guard: Mutex::new(()) } }

    fn load(&self) -> BTreeMap<String, String> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(e) => {
                debug!(target: "sims::session", "ignoring unreadable session file '{}': {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn store(&self, map: &BTreeMap<String, String>) -> io::Result<()> {
        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(map).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        // the file holds a bearer token: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut f = opts.open(&tmp)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            f.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        f.write_all(body.as_bytes())?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, &self.path)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _g = self.guard.lock();
        self.load().remove(key)
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> io::Result<()> {
        let _g = self.guard.lock();
        let mut map = self.load();
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        self.store(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> io::Result<()> {
        let _g = self.guard.lock();
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = self.load();
        for k in keys {
            map.remove(*k);
        }
        self.store(&map)
    }
}
