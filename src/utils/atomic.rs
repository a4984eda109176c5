//! Atomic file writes for the durable document store
//!
//! Documents are written to a `.tmp` sibling, synced, then renamed over the
//! final path (rename is atomic on the filesystems we care about). A crash
//! leaves either the old document or the new one, never a torn file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `content` to a `.tmp` sibling of `path` and return the temp path
///
/// The staged file is synced but not yet visible at `path`; promote it with
/// a rename, or remove it to abandon the write.
pub fn stage_write<P: AsRef<Path>>(path: P, content: &str) -> io::Result<std::path::PathBuf> {
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    Ok(temp_path)
}

/// Atomically replace the file at `path` with `content`
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
    let path = path.as_ref();
    let temp_path = stage_write(path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Remove `.tmp` leftovers from interrupted writes
///
/// Called when a store directory is opened, so a crash mid-write cannot be
/// mistaken for a document later.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
