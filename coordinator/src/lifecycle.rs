//! The hand lifecycle coordinator.
//!
//! Reacts to phase changes from the ledger feed, gates player actions on
//! eligibility, serializes them through a single in-flight slot, and drives
//! the autonomous reveal once the dealing window reaches the reveal phase.
//! It never owns phase transitions; the ledger does.

use crate::commitment::{self, Secret};
use crate::config::CoordinatorConfig;
use crate::secrets::SecretStore;
use crate::tracker::{PeerSnapshot, PeerStatusTracker};
use fairdeal_client::TableActions;
use fairdeal_types::{GameState, Phase, TableId};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Player-initiated operations; at most one is in flight at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    StartHand,
    RequestCards,
    Reveal,
    LeaveNow,
    LeaveAfterHand,
    CancelLeaveAfterHand,
    SitOut,
    SitIn,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::StartHand => "start-hand",
            ActionKind::RequestCards => "request-cards",
            ActionKind::Reveal => "reveal",
            ActionKind::LeaveNow => "leave",
            ActionKind::LeaveAfterHand => "leave-after-hand",
            ActionKind::CancelLeaveAfterHand => "cancel-leave-after-hand",
            ActionKind::SitOut => "sit-out",
            ActionKind::SitIn => "sit-in",
        }
    }
}

/// Rejections raised before the collaborator is ever invoked.
///
/// Collaborator failures are not errors here; they surface as a failed
/// [`StatusLine`] instead.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ActionError {
    #[error("another action is already in flight")]
    Busy,
    #[error("action not available: {0}")]
    Ineligible(&'static str),
}

/// Dismissible outcome of the most recent action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub failed: bool,
}

/// Persistent per-hand advisory that no action can resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// The reveal phase was reached with no stored secret; the commitment
    /// cannot be redeemed and the player must wait for the next hand.
    MissingSecret,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::MissingSecret => {
                "no secret stored for this hand; wait for the next hand to be dealt"
            }
        }
    }
}

/// Commit/reveal progress of the current hand, for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandProgress {
    pub committed: usize,
    pub revealed: usize,
    pub total: usize,
}

impl HandProgress {
    pub fn summary(&self) -> String {
        format!("{}/{} players ready", self.committed, self.total)
    }
}

/// Namespace of the current hand: where secrets are keyed and status rows
/// are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandContext {
    pub table: TableId,
    pub hand_number: u64,
    pub seat: Option<u8>,
    pub player: Option<String>,
}

#[derive(Default)]
struct HandState {
    game: GameState,
    in_flight: Option<ActionKind>,
    status: Option<StatusLine>,
    /// Last hand number for which the auto-reveal actually fired.
    auto_revealed_hand: Option<u64>,
}

#[derive(Default)]
struct Tasks {
    poll: Option<JoinHandle<()>>,
    reveal: Option<JoinHandle<()>>,
}

struct Inner<B: TableActions> {
    backend: B,
    store: SecretStore,
    tracker: PeerStatusTracker<B>,
    config: CoordinatorConfig,
    table: TableId,
    /// Ledger identity of the local player; `None` for spectators.
    player: Option<String>,
    admin: bool,
    state: Mutex<HandState>,
    tasks: Mutex<Tasks>,
}

/// Releases the in-flight slot when dropped, so it cannot leak on any exit
/// path of an action.
struct SlotGuard<'a> {
    state: &'a Mutex<HandState>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().unwrap().in_flight = None;
    }
}

/// Coordinates one player's participation in the dealing protocol of one
/// table view.
///
/// Must live inside a tokio runtime: feeding game state spawns and cancels
/// the polling and reveal-debounce tasks. Dropping the coordinator aborts
/// both.
pub struct HandCoordinator<B: TableActions> {
    inner: Arc<Inner<B>>,
}

impl<B: TableActions> HandCoordinator<B> {
    pub fn new(
        backend: B,
        store: SecretStore,
        config: CoordinatorConfig,
        table: TableId,
        player: Option<String>,
        admin: bool,
    ) -> Self {
        let tracker = PeerStatusTracker::new(backend.clone(), table);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                tracker,
                config,
                table,
                player,
                admin,
                state: Mutex::new(HandState::default()),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    /// Apply a state snapshot from the ledger feed.
    ///
    /// Starts status polling when the dealing window opens, stops it when
    /// the window closes, and re-evaluates the autonomous reveal.
    pub fn on_game_state(&self, game: GameState) {
        Inner::apply_game_state(&self.inner, game);
    }

    /// Re-fetch peer status and table state from the ledger.
    pub async fn refresh(&self) {
        Inner::refresh_all(&self.inner).await;
    }

    // ---------- affordances ----------

    pub fn can_start_hand(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.in_flight.is_none() && self.inner.start_eligible(&state)
    }

    pub fn can_request_cards(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.in_flight.is_none() && self.inner.request_cards_eligible(&state)
    }

    pub fn can_leave_now(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.in_flight.is_none() && self.inner.leave_now_eligible(&state)
    }

    pub fn can_toggle_leave_after_hand(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.in_flight.is_none() && self.inner.leave_toggle_eligible(&state)
    }

    pub fn can_toggle_sit(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.in_flight.is_none() && self.inner.seated(&state).is_some()
    }

    /// Actions the view layer may currently offer.
    pub fn available_actions(&self) -> Vec<ActionKind> {
        let state = self.inner.state.lock().unwrap();
        if state.in_flight.is_some() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.inner.start_eligible(&state) {
            actions.push(ActionKind::StartHand);
        }
        if self.inner.request_cards_eligible(&state) {
            actions.push(ActionKind::RequestCards);
        }
        if self.inner.leave_now_eligible(&state) {
            actions.push(ActionKind::LeaveNow);
        }
        if let Some(seat) = self.inner.seated(&state) {
            if self.inner.leave_toggle_eligible(&state) {
                actions.push(if seat.leave_after_hand {
                    ActionKind::CancelLeaveAfterHand
                } else {
                    ActionKind::LeaveAfterHand
                });
            }
            actions.push(if seat.sitting_out {
                ActionKind::SitIn
            } else {
                ActionKind::SitOut
            });
        }
        actions
    }

    // ---------- actions ----------

    /// Start the next hand.
    pub async fn start_hand(&self) -> Result<(), ActionError> {
        {
            let state = self.inner.state.lock().unwrap();
            if !self.inner.start_eligible(&state) {
                return Err(ActionError::Ineligible("start-hand is not available"));
            }
        }
        let backend = self.inner.backend.clone();
        let table = self.inner.table;
        Inner::run_action(&self.inner, ActionKind::StartHand, async move {
            backend.start_hand(table).await
        })
        .await
    }

    /// Request cards for this hand: generate a fresh secret, persist it,
    /// then submit its commitment.
    ///
    /// The secret is written to the store before the submission goes out,
    /// so a crash between the two cannot leave an unredeemable commitment
    /// on the ledger.
    pub async fn request_cards(&self) -> Result<(), ActionError> {
        let hand = {
            let state = self.inner.state.lock().unwrap();
            if !self.inner.request_cards_eligible(&state) {
                return Err(ActionError::Ineligible("request-cards is not available"));
            }
            state.game.hand_number
        };
        let player = match self.inner.player.clone() {
            Some(player) => player,
            None => return Err(ActionError::Ineligible("not seated at this table")),
        };
        let backend = self.inner.backend.clone();
        let store = self.inner.store.clone();
        let table = self.inner.table;
        Inner::run_action(&self.inner, ActionKind::RequestCards, async move {
            let secret = Secret::generate();
            store.save(table, &player, hand, &secret);
            let commitment = commitment::commit(&secret);
            backend.submit_commit(table, commitment).await
        })
        .await
    }

    /// Leave the table immediately; only available between hands.
    pub async fn leave_now(&self) -> Result<(), ActionError> {
        {
            let state = self.inner.state.lock().unwrap();
            if !self.inner.leave_now_eligible(&state) {
                return Err(ActionError::Ineligible(
                    "leaving is only available between hands",
                ));
            }
        }
        let backend = self.inner.backend.clone();
        let table = self.inner.table;
        Inner::run_action(&self.inner, ActionKind::LeaveNow, async move {
            backend.leave_table(table).await
        })
        .await
    }

    /// Toggle the leave-after-hand mark on the caller's seat.
    pub async fn toggle_leave_after_hand(&self) -> Result<(), ActionError> {
        let leaving = {
            let state = self.inner.state.lock().unwrap();
            if !self.inner.leave_toggle_eligible(&state) {
                return Err(ActionError::Ineligible(
                    "leave-after-hand is only available during a hand",
                ));
            }
            match self.inner.seated(&state) {
                Some(seat) => seat.leave_after_hand,
                None => return Err(ActionError::Ineligible("not seated at this table")),
            }
        };
        let backend = self.inner.backend.clone();
        let table = self.inner.table;
        if leaving {
            Inner::run_action(&self.inner, ActionKind::CancelLeaveAfterHand, async move {
                backend.cancel_leave_after_hand(table).await
            })
            .await
        } else {
            Inner::run_action(&self.inner, ActionKind::LeaveAfterHand, async move {
                backend.leave_after_hand(table).await
            })
            .await
        }
    }

    /// Toggle sitting out; pure passthrough to the ledger.
    pub async fn toggle_sit(&self) -> Result<(), ActionError> {
        let sitting_out = {
            let state = self.inner.state.lock().unwrap();
            match self.inner.seated(&state) {
                Some(seat) => seat.sitting_out,
                None => return Err(ActionError::Ineligible("not seated at this table")),
            }
        };
        let backend = self.inner.backend.clone();
        let table = self.inner.table;
        if sitting_out {
            Inner::run_action(&self.inner, ActionKind::SitIn, async move {
                backend.sit_in(table).await
            })
            .await
        } else {
            Inner::run_action(&self.inner, ActionKind::SitOut, async move {
                backend.sit_out(table).await
            })
            .await
        }
    }

    // ---------- views ----------

    pub fn status(&self) -> Option<StatusLine> {
        self.inner.state.lock().unwrap().status.clone()
    }

    pub fn dismiss_status(&self) {
        self.inner.state.lock().unwrap().status = None;
    }

    pub fn action_in_flight(&self) -> Option<ActionKind> {
        self.inner.state.lock().unwrap().in_flight
    }

    /// The per-hand advisory, if the hand is stuck for this player.
    pub fn advisory(&self) -> Option<Advisory> {
        let (hand, seat) = {
            let state = self.inner.state.lock().unwrap();
            if state.game.phase != Phase::Reveal {
                return None;
            }
            let seat = self.inner.seated(&state)?;
            (state.game.hand_number, seat.index)
        };
        if let Some(snapshot) = self.inner.tracker.snapshot() {
            if snapshot.is_revealed(seat) {
                return None;
            }
        }
        let player = self.inner.player.as_deref()?;
        if self.inner.store.load(self.inner.table, player, hand).is_none() {
            return Some(Advisory::MissingSecret);
        }
        None
    }

    /// Commit/reveal progress from the last status snapshot.
    ///
    /// The denominator falls back from the participant count to the commit
    /// count to 1, so a ratio is always displayable.
    pub fn progress(&self) -> HandProgress {
        match self.inner.tracker.snapshot() {
            Some(snapshot) => {
                let committed = snapshot.committed_count();
                let revealed = snapshot.revealed_count();
                let total = if !snapshot.participants.is_empty() {
                    snapshot.participants.len()
                } else if committed > 0 {
                    committed
                } else {
                    1
                };
                HandProgress {
                    committed,
                    revealed,
                    total,
                }
            }
            None => HandProgress {
                committed: 0,
                revealed: 0,
                total: 1,
            },
        }
    }

    /// Remaining action deadline, rendered for display.
    pub fn deadline_text(&self) -> Option<String> {
        let deadline_at_ms = {
            let state = self.inner.state.lock().unwrap();
            state.game.action_on.as_ref().map(|a| a.deadline_at_ms)?
        };
        format_remaining(deadline_at_ms, system_time_ms(SystemTime::now()))
    }

    pub fn hand_context(&self) -> HandContext {
        let state = self.inner.state.lock().unwrap();
        let seat = self.inner.seated(&state).map(|seat| seat.index);
        HandContext {
            table: self.inner.table,
            hand_number: state.game.hand_number,
            seat,
            player: self.inner.player.clone(),
        }
    }

    pub fn game_state(&self) -> GameState {
        self.inner.state.lock().unwrap().game.clone()
    }

    pub fn peer_snapshot(&self) -> Option<PeerSnapshot> {
        self.inner.tracker.snapshot()
    }
}

impl<B: TableActions> Drop for HandCoordinator<B> {
    fn drop(&mut self) {
        let mut tasks = self.inner.tasks.lock().unwrap();
        if let Some(handle) = tasks.poll.take() {
            handle.abort();
        }
        if let Some(handle) = tasks.reveal.take() {
            handle.abort();
        }
    }
}

impl<B: TableActions> Inner<B> {
    // ---------- eligibility (phase-gated, slot-independent) ----------

    fn seated<'a>(&self, state: &'a HandState) -> Option<&'a fairdeal_types::Seat> {
        let player = self.player.as_deref()?;
        state.game.seat_of(player)
    }

    fn acting_seat(&self, state: &HandState) -> bool {
        let Some(action_on) = state.game.action_on.as_ref() else {
            return false;
        };
        match self.player.as_deref() {
            Some(player) => action_on.player.eq_ignore_ascii_case(player),
            None => false,
        }
    }

    fn start_eligible(&self, state: &HandState) -> bool {
        let game = &state.game;
        if game.phase != Phase::Waiting || game.paused || game.active_seats() < 2 {
            return false;
        }
        if self.config.admin_only_start {
            self.admin
        } else {
            self.admin || self.acting_seat(state)
        }
    }

    fn request_cards_eligible(&self, state: &HandState) -> bool {
        if state.game.phase != Phase::Commit {
            return false;
        }
        let Some(seat) = self.seated(state) else {
            return false;
        };
        if seat.sitting_out {
            return false;
        }
        // Unknown status counts as not-yet-committed; the ledger is the
        // final arbiter either way.
        !self
            .tracker
            .snapshot()
            .map(|snapshot| snapshot.is_committed(seat.index))
            .unwrap_or(false)
    }

    fn leave_now_eligible(&self, state: &HandState) -> bool {
        state.game.phase == Phase::Waiting && self.seated(state).is_some()
    }

    fn leave_toggle_eligible(&self, state: &HandState) -> bool {
        state.game.phase.hand_active() && self.seated(state).is_some()
    }

    // ---------- feed handling ----------

    fn apply_game_state(self_: &Arc<Self>, game: GameState) {
        let phase = game.phase;
        {
            let mut state = self_.state.lock().unwrap();
            if game.hand_number != state.game.hand_number {
                debug!(
                    table = self_.table,
                    hand = game.hand_number,
                    "hand changed"
                );
            }
            state.game = game;
        }
        Self::sync_poll_task(self_, phase.dealing());
        if phase != Phase::Reveal {
            self_.cancel_reveal_timer();
        }
        Self::maybe_arm_auto_reveal(self_);
    }

    fn sync_poll_task(self_: &Arc<Self>, dealing: bool) {
        let mut tasks = self_.tasks.lock().unwrap();
        let running = tasks
            .poll
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if dealing && !running {
            let weak = Arc::downgrade(self_);
            let interval = self_.config.poll_interval;
            tasks.poll = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    inner.tracker.refresh().await;
                    Self::maybe_arm_auto_reveal(&inner);
                }
            }));
            debug!(table = self_.table, "status polling started");
        } else if !dealing {
            if let Some(handle) = tasks.poll.take() {
                handle.abort();
                debug!(table = self_.table, "status polling stopped");
            }
        }
    }

    fn cancel_reveal_timer(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(handle) = tasks.reveal.take() {
            handle.abort();
            debug!(table = self.table, "auto-reveal timer canceled");
        }
    }

    // ---------- auto-reveal ----------

    fn maybe_arm_auto_reveal(self_: &Arc<Self>) {
        let Some(player) = self_.player.clone() else {
            return;
        };
        let (hand, seat) = {
            let state = self_.state.lock().unwrap();
            if state.game.phase != Phase::Reveal || state.in_flight.is_some() {
                return;
            }
            let hand = state.game.hand_number;
            if state.auto_revealed_hand == Some(hand) {
                return;
            }
            let Some(seat) = self_.seated(&state) else {
                return;
            };
            (hand, seat.index)
        };
        if let Some(snapshot) = self_.tracker.snapshot() {
            if snapshot.is_revealed(seat) {
                return;
            }
        }
        if self_.store.load(self_.table, &player, hand).is_none() {
            // Nothing to redeem the commitment with; the advisory view
            // reports this, and the only way out is the next hand.
            return;
        }

        let mut tasks = self_.tasks.lock().unwrap();
        let armed = tasks
            .reveal
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if armed {
            return;
        }
        let weak = Arc::downgrade(self_);
        let delay = self_.config.reveal_delay;
        tasks.reveal = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            Self::fire_auto_reveal(&inner, hand, seat).await;
        }));
        debug!(table = self_.table, hand, "auto-reveal armed");
    }

    async fn fire_auto_reveal(self_: &Arc<Self>, hand: u64, seat: u8) {
        // Preconditions may have lapsed during the debounce.
        {
            let state = self_.state.lock().unwrap();
            if state.game.phase != Phase::Reveal
                || state.game.hand_number != hand
                || state.in_flight.is_some()
                || state.auto_revealed_hand == Some(hand)
            {
                return;
            }
        }
        if let Some(snapshot) = self_.tracker.snapshot() {
            if snapshot.is_revealed(seat) {
                return;
            }
        }
        let Some(player) = self_.player.clone() else {
            return;
        };
        let Some(secret) = self_.store.load(self_.table, &player, hand) else {
            return;
        };
        {
            let mut state = self_.state.lock().unwrap();
            if state.in_flight.is_some() || state.auto_revealed_hand == Some(hand) {
                return;
            }
            state.auto_revealed_hand = Some(hand);
        }

        info!(table = self_.table, hand, "auto-revealing stored secret");
        let backend = self_.backend.clone();
        let table = self_.table;
        let payload = commitment::reveal(&secret);
        let result = Self::run_action(self_, ActionKind::Reveal, async move {
            backend.reveal_secret(table, payload).await
        })
        .await;
        if result == Err(ActionError::Busy) {
            // The reveal never went out; let a later evaluation retry.
            let mut state = self_.state.lock().unwrap();
            if state.auto_revealed_hand == Some(hand) {
                state.auto_revealed_hand = None;
            }
        }
    }

    // ---------- action protocol ----------

    /// Run one collaborator action under the in-flight slot.
    ///
    /// `Err` means the action was rejected before the collaborator was
    /// invoked; a collaborator failure returns `Ok` with a failed status
    /// line. The slot is released on every path.
    async fn run_action<Fut>(
        self_: &Arc<Self>,
        kind: ActionKind,
        op: Fut,
    ) -> Result<(), ActionError>
    where
        Fut: Future<Output = Result<(), B::Error>>,
    {
        {
            let mut state = self_.state.lock().unwrap();
            if state.in_flight.is_some() {
                return Err(ActionError::Busy);
            }
            state.in_flight = Some(kind);
            state.status = None;
        }
        let guard = SlotGuard {
            state: &self_.state,
        };
        if kind != ActionKind::Reveal {
            // A user action supersedes a pending auto-reveal; the timer
            // re-arms on the next evaluation if still needed.
            self_.cancel_reveal_timer();
        }

        match op.await {
            Ok(()) => {
                info!(table = self_.table, action = kind.as_str(), "action confirmed");
                {
                    let mut state = self_.state.lock().unwrap();
                    state.status = Some(StatusLine {
                        text: format!("{} confirmed", kind.as_str()),
                        failed: false,
                    });
                }
                drop(guard);
                Self::refresh_all(self_).await;
            }
            Err(err) => {
                warn!(
                    table = self_.table,
                    action = kind.as_str(),
                    error = %err,
                    "action failed"
                );
                let mut state = self_.state.lock().unwrap();
                state.status = Some(StatusLine {
                    text: format!("{} failed: {err}", kind.as_str()),
                    failed: true,
                });
                drop(state);
                drop(guard);
            }
        }
        Ok(())
    }

    async fn refresh_all(self_: &Arc<Self>) {
        self_.tracker.refresh().await;
        match self_.backend.game_state(self_.table).await {
            Ok(game) => Self::apply_game_state(self_, game),
            Err(err) => {
                warn!(table = self_.table, error = %err, "state refresh failed")
            }
        }
    }
}

/// Render the time remaining until a deadline.
///
/// `deadline_at_ms == 0` means no deadline and renders nothing; a lapsed
/// deadline renders "Expired".
pub fn format_remaining(deadline_at_ms: u64, now_ms: u64) -> Option<String> {
    if deadline_at_ms == 0 {
        return None;
    }
    if now_ms >= deadline_at_ms {
        return Some("Expired".to_string());
    }
    let remaining = deadline_at_ms - now_ms;
    let minutes = remaining / 60_000;
    let seconds = (remaining % 60_000) / 1_000;
    Some(format!("{minutes}m {seconds}s"))
}

fn system_time_ms(now: SystemTime) -> u64 {
    match now.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_millis() as u64,
        Err(_) => 0,
    }
}
