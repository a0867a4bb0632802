//! Snapshot files on disk.

use crate::error::{AppError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use twinsync_engine::StoreSnapshot;

/// Read a snapshot file that must exist.
pub fn load(path: &Path) -> Result<StoreSnapshot> {
    let json = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    Ok(StoreSnapshot::from_json(&json)?)
}

/// Read a snapshot file, treating a missing file as no snapshot.
pub fn load_optional(path: &Path) -> Result<Option<StoreSnapshot>> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(StoreSnapshot::from_json(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::io(path, e)),
    }
}

/// Write a snapshot as pretty JSON, replacing the file.
pub fn save(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let json = snapshot.to_json_pretty()?;
    fs::write(path, json).map_err(|e| AppError::io(path, e))
}
