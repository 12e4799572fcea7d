//! Client-side coordinator for commit-reveal card distribution.
//!
//! The ledger deals cards fairly by requiring every hand participant to
//! commit to a secret before dealing and to reveal it afterwards. This
//! crate keeps one player's side of that protocol honest across reloads:
//!
//! 1. **Request** - Generate a per-hand secret, persist it locally, submit
//!    its commitment
//! 2. **Track** - Poll peers' commit/reveal progress while the dealing
//!    window is open
//! 3. **Reveal** - Once the ledger enters the reveal phase, disclose the
//!    stored secret autonomously, exactly once per hand
//!
//! The ledger owns all phase transitions and verifies
//! `hash(reveal) == commitment`; this crate only reacts, and no failure
//! here is fatal. The worst case is a "wait for the next hand" advisory
//! when the local secret is gone.

pub mod commitment;
pub mod config;
pub mod lifecycle;
pub mod secrets;
pub mod tracker;

pub use commitment::Secret;
pub use config::CoordinatorConfig;
pub use lifecycle::{
    format_remaining, ActionError, ActionKind, Advisory, HandContext, HandCoordinator,
    HandProgress, StatusLine,
};
pub use secrets::SecretStore;
pub use tracker::{PeerSnapshot, PeerStatusTracker};
