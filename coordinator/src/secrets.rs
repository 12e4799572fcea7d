//! Best-effort persistence for per-hand secrets.
//!
//! Secrets are client convenience state, not source of truth: losing one
//! only means the player cannot auto-reveal and must wait for the next
//! hand. Every I/O failure here is therefore swallowed and reported as
//! "absent" rather than raised.

use crate::commitment::Secret;
use directories::ProjectDirs;
use fairdeal_types::TableId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Serialize, Deserialize)]
struct StoredSecret {
    secret: String,
}

/// On-disk store of one secret per (table, player, hand) key.
///
/// Player identities are lowercased before keying so casing differences
/// cannot produce duplicate entries.
#[derive(Clone, Debug)]
pub struct SecretStore {
    root: PathBuf,
}

impl SecretStore {
    /// Open the store in the platform config directory.
    ///
    /// Falls back to a temp-dir location when no config directory is
    /// available; construction itself never fails.
    pub fn open() -> Self {
        let root = ProjectDirs::from("dev", "fairdeal", "coordinator")
            .map(|dirs| dirs.config_dir().join("secrets"))
            .unwrap_or_else(|| std::env::temp_dir().join("fairdeal-secrets"));
        Self { root }
    }

    /// Open the store rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, table: TableId, player: &str, hand: u64) -> PathBuf {
        let player = player.to_ascii_lowercase();
        self.root.join(format!("{table}-{player}-{hand}.json"))
    }

    /// Load the secret for a key, if one was persisted.
    pub fn load(&self, table: TableId, player: &str, hand: u64) -> Option<Secret> {
        let path = self.entry_path(table, player, hand);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                debug!(?path, %err, "no stored secret");
                return None;
            }
        };
        let stored: StoredSecret = match serde_json::from_slice(&data) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(?path, %err, "stored secret unreadable");
                return None;
            }
        };
        if stored.secret.is_empty() {
            return None;
        }
        Some(Secret::from_text(stored.secret))
    }

    /// Persist a secret, overwriting any previous value for the key.
    ///
    /// An empty secret removes the entry.
    pub fn save(&self, table: TableId, player: &str, hand: u64, secret: &Secret) {
        if secret.is_empty() {
            self.clear(table, player, hand);
            return;
        }
        let path = self.entry_path(table, player, hand);
        if let Some(dir) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(dir) {
                warn!(?dir, %err, "failed to create secret directory");
                return;
            }
        }
        let stored = StoredSecret {
            secret: secret.as_text().to_string(),
        };
        let data = match serde_json::to_vec_pretty(&stored) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "failed to encode secret");
                return;
            }
        };
        if let Err(err) = std::fs::write(&path, data) {
            warn!(?path, %err, "failed to persist secret");
        }
    }

    /// Remove the entry for a key, if present.
    pub fn clear(&self, table: TableId, player: &str, hand: u64) {
        let path = self.entry_path(table, player, hand);
        if let Err(err) = std::fs::remove_file(&path) {
            debug!(?path, %err, "no secret to clear");
        }
    }
}
