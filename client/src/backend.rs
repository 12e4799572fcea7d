//! The narrow surface through which the coordinator talks to the ledger.
//!
//! The ledger is authoritative for phase transitions, seat occupancy, and
//! the commit/reveal equality check; this layer only queries and submits.

use fairdeal_types::{GameState, TableId};
use std::future::Future;

/// Read-only views of a table's dealing progress.
///
/// The three status queries are index-aligned: entry *i* of the commit and
/// reveal vectors describes hand-participant *i*, whose seat index is entry
/// *i* of the participant roster.
pub trait TableQueries: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the current table state.
    fn game_state(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<GameState, Self::Error>> + Send;

    /// Which hand participants have submitted a commitment.
    fn commit_status(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<Vec<bool>, Self::Error>> + Send;

    /// Which hand participants have revealed their secret.
    fn reveal_status(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<Vec<bool>, Self::Error>> + Send;

    /// Seat indices dealt into the current hand, in hand-participant order.
    fn players_in_hand(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send;
}

/// Player-initiated table mutations.
///
/// Each operation is fallible and asynchronous; the ledger reports failures
/// with a descriptive message that callers surface verbatim.
pub trait TableActions: TableQueries {
    /// Start the next hand.
    fn start_hand(&self, table: TableId)
        -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Submit the caller's card commitment for the current hand.
    fn submit_commit(
        &self,
        table: TableId,
        commitment: [u8; 32],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Disclose the pre-image of the caller's commitment.
    fn reveal_secret(
        &self,
        table: TableId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Leave the table immediately.
    fn leave_table(&self, table: TableId)
        -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Mark the caller's seat to be vacated once the current hand resolves.
    fn leave_after_hand(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Clear a pending leave-after-hand mark.
    fn cancel_leave_after_hand(
        &self,
        table: TableId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Sit out of upcoming hands without vacating the seat.
    fn sit_out(&self, table: TableId)
        -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Rejoin upcoming hands.
    fn sit_in(&self, table: TableId)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}
