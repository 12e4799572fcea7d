//! Polling view of peers' commit/reveal progress.

use fairdeal_client::TableQueries;
use fairdeal_types::TableId;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One atomically-replaced view of the table's dealing progress.
///
/// `committed` and `revealed` are indexed by hand-participant index; entry
/// *i* belongs to the player at seat `participants[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub committed: Vec<bool>,
    pub revealed: Vec<bool>,
    pub participants: Vec<u8>,
}

impl PeerSnapshot {
    /// Hand-participant index of a seat, if the seat is in the hand.
    pub fn hand_index_of(&self, seat: u8) -> Option<usize> {
        self.participants.iter().position(|&s| s == seat)
    }

    pub fn is_committed(&self, seat: u8) -> bool {
        self.hand_index_of(seat)
            .and_then(|index| self.committed.get(index).copied())
            .unwrap_or(false)
    }

    pub fn is_revealed(&self, seat: u8) -> bool {
        self.hand_index_of(seat)
            .and_then(|index| self.revealed.get(index).copied())
            .unwrap_or(false)
    }

    pub fn committed_count(&self) -> usize {
        self.committed.iter().filter(|&&done| done).count()
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&done| done).count()
    }
}

/// Caches the latest successful status poll for one table.
///
/// A refresh fetches the three status views concurrently and replaces the
/// snapshot wholesale; a failed sub-fetch discards the entire cycle so the
/// bit vectors can never be misaligned against a stale participant list.
#[derive(Clone)]
pub struct PeerStatusTracker<Q: TableQueries> {
    queries: Q,
    table: TableId,
    snapshot: Arc<Mutex<Option<PeerSnapshot>>>,
}

impl<Q: TableQueries> PeerStatusTracker<Q> {
    pub fn new(queries: Q, table: TableId) -> Self {
        Self {
            queries,
            table,
            snapshot: Arc::new(Mutex::new(None)),
        }
    }

    /// The last successful snapshot, if any poll has completed.
    pub fn snapshot(&self) -> Option<PeerSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    /// Poll the three status views once.
    ///
    /// Returns whether the snapshot was replaced. On failure the previous
    /// snapshot is retained and the error is only logged.
    pub async fn refresh(&self) -> bool {
        let result = tokio::try_join!(
            self.queries.commit_status(self.table),
            self.queries.reveal_status(self.table),
            self.queries.players_in_hand(self.table),
        );
        match result {
            Ok((committed, revealed, participants)) => {
                let next = PeerSnapshot {
                    committed,
                    revealed,
                    participants,
                };
                debug!(table = self.table, "status snapshot replaced");
                *self.snapshot.lock().unwrap() = Some(next);
                true
            }
            Err(err) => {
                warn!(table = self.table, error = %err, "status poll failed; keeping previous snapshot");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdeal_types::GameState;
    use std::io;

    #[derive(Default)]
    struct ScriptState {
        committed: Vec<bool>,
        revealed: Vec<bool>,
        participants: Vec<u8>,
        fail_reveals: bool,
    }

    #[derive(Clone, Default)]
    struct ScriptedQueries {
        state: Arc<Mutex<ScriptState>>,
    }

    impl TableQueries for ScriptedQueries {
        type Error = io::Error;

        async fn game_state(&self, _table: TableId) -> Result<GameState, Self::Error> {
            Ok(GameState::default())
        }

        async fn commit_status(&self, _table: TableId) -> Result<Vec<bool>, Self::Error> {
            Ok(self.state.lock().unwrap().committed.clone())
        }

        async fn reveal_status(&self, _table: TableId) -> Result<Vec<bool>, Self::Error> {
            let state = self.state.lock().unwrap();
            if state.fail_reveals {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "reveal query down"));
            }
            Ok(state.revealed.clone())
        }

        async fn players_in_hand(&self, _table: TableId) -> Result<Vec<u8>, Self::Error> {
            Ok(self.state.lock().unwrap().participants.clone())
        }
    }

    fn scripted(committed: Vec<bool>, revealed: Vec<bool>, participants: Vec<u8>) -> ScriptedQueries {
        ScriptedQueries {
            state: Arc::new(Mutex::new(ScriptState {
                committed,
                revealed,
                participants,
                fail_reveals: false,
            })),
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let queries = scripted(vec![true, false], vec![false, false], vec![0, 2]);
        let tracker = PeerStatusTracker::new(queries.clone(), 7);

        assert!(tracker.snapshot().is_none());
        assert!(tracker.refresh().await);

        let snapshot = tracker.snapshot().unwrap();
        assert_eq!(snapshot.committed, vec![true, false]);
        assert_eq!(snapshot.participants, vec![0, 2]);

        queries.state.lock().unwrap().committed = vec![true, true];
        assert!(tracker.refresh().await);
        assert_eq!(tracker.snapshot().unwrap().committed, vec![true, true]);
    }

    #[tokio::test]
    async fn test_failed_subfetch_retains_previous_snapshot() {
        let queries = scripted(vec![true], vec![false], vec![3]);
        let tracker = PeerStatusTracker::new(queries.clone(), 7);
        assert!(tracker.refresh().await);

        // One failing sub-fetch discards the whole cycle.
        {
            let mut state = queries.state.lock().unwrap();
            state.fail_reveals = true;
            state.committed = vec![true, true];
        }
        assert!(!tracker.refresh().await);

        let snapshot = tracker.snapshot().unwrap();
        assert_eq!(snapshot.committed, vec![true]);
        assert_eq!(snapshot.participants, vec![3]);
    }

    #[test]
    fn test_seat_lookups() {
        let snapshot = PeerSnapshot {
            committed: vec![true, false, true],
            revealed: vec![true, false, false],
            participants: vec![1, 4, 6],
        };

        assert_eq!(snapshot.hand_index_of(4), Some(1));
        assert_eq!(snapshot.hand_index_of(2), None);
        assert!(snapshot.is_committed(1));
        assert!(!snapshot.is_committed(4));
        assert!(!snapshot.is_committed(9));
        assert!(snapshot.is_revealed(1));
        assert!(!snapshot.is_revealed(6));
        assert_eq!(snapshot.committed_count(), 2);
        assert_eq!(snapshot.revealed_count(), 1);
    }
}
