//! JSON save files for avatar and world data.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to read save file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write save file: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to parse save file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize save data: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid world data: {0}")]
    InvalidWorld(String),
}

/// Returns `Ok(None)` when the file does not exist yet.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistError::Read(e)),
    };
    let value = serde_json::from_str(&contents).map_err(PersistError::Parse)?;
    Ok(Some(value))
}

/// Writes through a sibling temp file so a crash never leaves half a save.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let contents = serde_json::to_string_pretty(value).map_err(PersistError::Serialize)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents).map_err(PersistError::Write)?;
    std::fs::rename(&tmp_path, path).map_err(PersistError::Write)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}
