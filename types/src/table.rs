use serde::{Deserialize, Serialize};

/// Game phases as observed from the ledger feed.
///
/// The ordering is meaningful: every phase below [`Phase::Preflop`] means the
/// hole cards have not been dealt yet. The coordinator only drives the
/// dealing window ([`Phase::Commit`] and [`Phase::Reveal`]); the betting
/// streets are opaque to it.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting = 0,
    Commit = 1,
    Reveal = 2,
    Preflop = 3,
    Flop = 4,
    Turn = 5,
    River = 6,
    Showdown = 7,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Commit => "commit",
            Phase::Reveal => "reveal",
            Phase::Preflop => "preflop",
            Phase::Flop => "flop",
            Phase::Turn => "turn",
            Phase::River => "river",
            Phase::Showdown => "showdown",
        }
    }

    /// Whether hole cards have been dealt in this phase.
    pub fn cards_dealt(&self) -> bool {
        *self >= Phase::Preflop
    }

    /// Whether this phase is part of the card-distribution window.
    pub fn dealing(&self) -> bool {
        matches!(self, Phase::Commit | Phase::Reveal)
    }

    /// Whether a hand is currently running.
    pub fn hand_active(&self) -> bool {
        *self != Phase::Waiting
    }
}

impl TryFrom<u8> for Phase {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Waiting),
            1 => Ok(Phase::Commit),
            2 => Ok(Phase::Reveal),
            3 => Ok(Phase::Preflop),
            4 => Ok(Phase::Flop),
            5 => Ok(Phase::Turn),
            6 => Ok(Phase::River),
            7 => Ok(Phase::Showdown),
            _ => Err(()),
        }
    }
}

/// A seat at the table as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub index: u8,
    /// Ledger identity of the occupant.
    pub player: String,
    pub sitting_out: bool,
    pub leave_after_hand: bool,
}

/// The seat currently expected to act, with an optional deadline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOn {
    pub seat: u8,
    pub player: String,
    /// Unix timestamp in milliseconds; 0 means no deadline.
    #[serde(default)]
    pub deadline_at_ms: u64,
}

/// Snapshot of table state from the ledger feed.
///
/// The ledger owns phase transitions; consumers only react to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    pub hand_number: u64,
    #[serde(default)]
    pub paused: bool,
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub action_on: Option<ActionOn>,
}

impl GameState {
    /// Look up a seat by player identity, case-insensitively.
    pub fn seat_of(&self, player: &str) -> Option<&Seat> {
        self.seats
            .iter()
            .find(|seat| seat.player.eq_ignore_ascii_case(player))
    }

    /// Number of seats not sitting out.
    pub fn active_seats(&self) -> usize {
        self.seats.iter().filter(|seat| !seat.sitting_out).count()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: Phase::Waiting,
            hand_number: 0,
            paused: false,
            seats: Vec::new(),
            action_on: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(index: u8, player: &str, sitting_out: bool) -> Seat {
        Seat {
            index,
            player: player.to_string(),
            sitting_out,
            leave_after_hand: false,
        }
    }

    #[test]
    fn test_phase_roundtrip() {
        for value in 0u8..=7 {
            let phase = Phase::try_from(value).unwrap();
            assert_eq!(phase as u8, value);
        }
        assert!(Phase::try_from(8).is_err());
    }

    #[test]
    fn test_phase_thresholds() {
        assert!(!Phase::Waiting.cards_dealt());
        assert!(!Phase::Commit.cards_dealt());
        assert!(!Phase::Reveal.cards_dealt());
        assert!(Phase::Preflop.cards_dealt());
        assert!(Phase::Showdown.cards_dealt());

        assert!(Phase::Commit.dealing());
        assert!(Phase::Reveal.dealing());
        assert!(!Phase::Waiting.dealing());
        assert!(!Phase::Flop.dealing());

        assert!(!Phase::Waiting.hand_active());
        assert!(Phase::Commit.hand_active());
    }

    #[test]
    fn test_phase_serde_snake_case() {
        let json = serde_json::to_string(&Phase::Preflop).unwrap();
        assert_eq!(json, "\"preflop\"");
        let phase: Phase = serde_json::from_str("\"reveal\"").unwrap();
        assert_eq!(phase, Phase::Reveal);
    }

    #[test]
    fn test_seat_lookup_is_case_insensitive() {
        let state = GameState {
            phase: Phase::Waiting,
            hand_number: 1,
            paused: false,
            seats: vec![seat(0, "0xAbCd", false), seat(2, "0xFeed", true)],
            action_on: None,
        };
        assert_eq!(state.seat_of("0xabcd").unwrap().index, 0);
        assert_eq!(state.seat_of("0XABCD").unwrap().index, 0);
        assert!(state.seat_of("0xbeef").is_none());
    }

    #[test]
    fn test_active_seats_excludes_sitting_out() {
        let state = GameState {
            phase: Phase::Waiting,
            hand_number: 1,
            paused: false,
            seats: vec![
                seat(0, "a", false),
                seat(1, "b", true),
                seat(2, "c", false),
            ],
            action_on: None,
        };
        assert_eq!(state.active_seats(), 2);
    }

    #[test]
    fn test_game_state_json_shape() {
        let raw = r#"{
            "phase": "commit",
            "hand_number": 7,
            "seats": [
                {"index": 0, "player": "0xaa", "sitting_out": false, "leave_after_hand": false}
            ],
            "action_on": {"seat": 0, "player": "0xaa", "deadline_at_ms": 1000}
        }"#;
        let state: GameState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.phase, Phase::Commit);
        assert_eq!(state.hand_number, 7);
        assert!(!state.paused);
        assert_eq!(state.action_on.unwrap().deadline_at_ms, 1000);
    }
}
