mod config;
pub mod database;
pub mod draft;

pub use config::{Config, GatewayConfig};
pub use database::{Database, SessionRecord, Stats};
pub use draft::DraftStore;

use std::path::PathBuf;

/// Returns `~/.config/steady[-dev]/` based on STEADY_ENV.
///
/// Set STEADY_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STEADY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("steady-dev")
    } else {
        base_dir.join("steady")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
