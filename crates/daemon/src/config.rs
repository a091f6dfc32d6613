// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: resolves the single config directory the process
//! reads from (default `$HOME/.kandev`) into concrete file paths.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved paths the daemon reads from and writes to. All paths live under
/// one config directory so a single `$KANDEV_HOME` override (or `$HOME`
/// default) is the only environment input the core daemon needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
    pub key_path: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
    pub bind_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = config_dir()?;
        std::fs::create_dir_all(&config_dir)?;

        Ok(Self {
            db_path: config_dir.join("kandev.db"),
            key_path: config_dir.join("master.key"),
            log_path: config_dir.join("kandevd.log"),
            lock_path: config_dir.join("kandevd.pid"),
            bind_addr: bind_addr(),
            config_dir,
        })
    }

    /// Writes the 32-byte master encryption key with `0600` permissions if
    /// one does not already exist. The key's consumer (the secret-store
    /// collaborator) lives outside this crate; this just guarantees the
    /// file is present with the right shape before anything reads it.
    #[cfg(unix)]
    pub fn ensure_master_key(&self) -> Result<(), ConfigError> {
        use std::fs::OpenOptions;
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        if self.key_path.exists() {
            return Ok(());
        }
        let key = random_key();
        let mut file = OpenOptions::new().write(true).create_new(true).mode(0o600).open(&self.key_path)?;
        file.write_all(&key)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn ensure_master_key(&self) -> Result<(), ConfigError> {
        if self.key_path.exists() {
            return Ok(());
        }
        std::fs::write(&self.key_path, random_key())?;
        Ok(())
    }
}

fn random_key() -> [u8; 32] {
    let raw = nanoid::nanoid!(32);
    let mut key = [0u8; 32];
    key.copy_from_slice(&raw.as_bytes()[..32]);
    key
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("KANDEV_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".kandev"))
}

fn bind_addr() -> String {
    std::env::var("KANDEV_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:4190".to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
