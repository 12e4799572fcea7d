//! Commit-reveal codec for provably fair card distribution.
//!
//! ## Commit-Reveal Flow
//!
//! 1. **Generate** - When cards are requested, generate a per-hand secret
//! 2. **Commit** - Publish the commitment (hash of the secret) during the commit phase
//! 3. **Reveal** - Disclose the secret itself during the reveal phase
//! 4. **Verify** - The ledger checks `hash(reveal) == commit`
//!
//! ## Encoding
//!
//! The commitment hashes the UTF-8 bytes of the secret's textual form, and
//! the reveal payload is those same bytes. The ledger recomputes the hash
//! over the revealed bytes, so both sides must agree on this encoding
//! exactly; a mismatch breaks the fairness guarantee without any local
//! error signal.

use commonware_cryptography::sha256::Sha256;
use commonware_cryptography::Hasher;
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of a commitment in bytes.
pub const COMMITMENT_LEN: usize = 32;

/// Entropy behind a freshly generated secret, in bytes.
pub const SECRET_LEN: usize = 32;

/// A per-hand secret, held in its textual form.
///
/// Generated once per (table, player, hand) and stable until a new
/// card request regenerates it for the same key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Generate a fresh secret from OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a previously persisted textual secret.
    pub fn from_text(text: String) -> Self {
        Self(text)
    }

    pub fn as_text(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute the commitment for a secret.
///
/// SHA-256 over the UTF-8 bytes of the secret's textual form.
pub fn commit(secret: &Secret) -> [u8; COMMITMENT_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_text().as_bytes());
    hasher.finalize().0
}

/// Produce the reveal payload for a secret.
///
/// The raw UTF-8 bytes of the textual form; the ledger hashes these to
/// check equality against the stored commitment.
pub fn reveal(secret: &Secret) -> Vec<u8> {
    secret.as_text().as_bytes().to_vec()
}

/// Verify that a commitment matches a reveal payload.
///
/// Local mirror of the ledger-side check: `commit == hash(payload)`.
pub fn verify(commitment: &[u8; COMMITMENT_LEN], payload: &[u8]) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    commitment == &hasher.finalize().0
}
