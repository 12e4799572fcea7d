//! JSON wire shapes for the table gateway API.

use serde::{Deserialize, Serialize};

/// Body of `POST /table/{id}/commit`.
///
/// The commitment is the hex encoding of the 32-byte digest; the gateway
/// stores it verbatim for the later reveal check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub commitment: String,
}

/// Body of `POST /table/{id}/reveal`.
///
/// The payload is the hex encoding of the exact bytes the ledger hashes to
/// check equality against the stored commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub payload: String,
}

/// Response of `GET /table/{id}/commits`.
///
/// Index-aligned with the hand-participant roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub committed: Vec<bool>,
}

/// Response of `GET /table/{id}/reveals`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealStatus {
    pub revealed: Vec<bool>,
}

/// Response of `GET /table/{id}/participants`.
///
/// Seat indices of the players dealt into the current hand, in
/// hand-participant order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    pub seats: Vec<u8>,
}
