//! Stable per-device client identifier sent with gateway requests.
//! Format: "steady-<uuid>", stored alongside the draft in the data dir.

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::storage::data_dir;

const CLIENT_ID_FILE: &str = "client_id.txt";
const CLIENT_ID_PREFIX: &str = "steady-";

#[derive(Debug, thiserror::Error)]
pub enum ClientIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid client ID format: {0}")]
    InvalidFormat(String),

    #[error("{0}")]
    DataDir(String),
}

/// Get or create the client ID at a specific directory.
pub fn get_or_create_client_id_at(dir: &Path) -> Result<String, ClientIdError> {
    let path = dir.join(CLIENT_ID_FILE);

    if path.exists() {
        let content = fs::read_to_string(&path)?;
        let client_id = content.trim().to_string();
        if client_id.starts_with(CLIENT_ID_PREFIX) {
            return Ok(client_id);
        }
        return Err(ClientIdError::InvalidFormat(client_id));
    }

    let client_id = format!("{}{}", CLIENT_ID_PREFIX, Uuid::new_v4());
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let mut file = fs::File::create(&path)?;
    writeln!(file, "{client_id}")?;
    Ok(client_id)
}

/// Get or create the client ID in the default data directory.
pub fn get_or_create_client_id() -> Result<String, ClientIdError> {
    let dir = data_dir().map_err(|e| ClientIdError::DataDir(e.to_string()))?;
    get_or_create_client_id_at(&dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_then_reuses_the_same_id() {
        let dir = TempDir::new().unwrap();
        let first = get_or_create_client_id_at(dir.path()).unwrap();
        assert!(first.starts_with(CLIENT_ID_PREFIX));
        let second = get_or_create_client_id_at(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_foreign_file_contents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CLIENT_ID_FILE), "something-else\n").unwrap();
        let err = get_or_create_client_id_at(dir.path()).unwrap_err();
        assert!(matches!(err, ClientIdError::InvalidFormat(_)));
    }
}
