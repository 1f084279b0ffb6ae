// src/watch/hash.rs

//! Content fingerprints for watched files.
//!
//! Editors often emit several events per save (truncate, write, rename), and
//! some touch a file without changing it. A `blake3` hash per path lets the
//! watcher ignore events whose content is identical to what it last saw.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<blake3::Hash> {
    let mut hasher = Hasher::new();
    let mut reader = fs.open_read(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Last seen content hash per path.
#[derive(Debug)]
pub struct ContentFingerprints {
    fs: Arc<dyn FileSystem>,
    seen: HashMap<PathBuf, blake3::Hash>,
}

impl ContentFingerprints {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            seen: HashMap::new(),
        }
    }

    /// Record the current content of `path` without reporting a change.
    pub fn prime(&mut self, path: &Path) {
        if let Ok(hash) = compute_file_hash(&*self.fs, path) {
            self.seen.insert(path.to_path_buf(), hash);
        }
    }

    /// Prime every file below `dir`.
    pub fn prime_tree(&mut self, dir: &Path) {
        let Ok(entries) = self.fs.read_dir(dir) else {
            return;
        };
        for entry in entries {
            if self.fs.is_dir(&entry) {
                self.prime_tree(&entry);
            } else if self.fs.is_file(&entry) {
                self.prime(&entry);
            }
        }
    }

    /// `true` if `path` differs from the last time it was seen.
    ///
    /// A first sighting and a removal both count as changes.
    pub fn changed(&mut self, path: &Path) -> bool {
        if !self.fs.is_file(path) {
            let known = self.seen.remove(path).is_some();
            debug!(?path, known, "watched file is gone");
            return true;
        }

        match compute_file_hash(&*self.fs, path) {
            Ok(hash) => {
                let previous = self.seen.insert(path.to_path_buf(), hash);
                previous != Some(hash)
            }
            Err(err) => {
                debug!(?path, error = %err, "could not hash file; treating as changed");
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
