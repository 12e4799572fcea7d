pub mod api;
pub mod table;

pub use table::{ActionOn, GameState, Phase, Seat};

/// Identifier of a table on the ledger.
pub type TableId = u64;
