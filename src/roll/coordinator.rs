//! Roll coordinator
//!
//! Turns typed notation into a published animation and, once the animation
//! reports completion, a log entry:
//!
//! ```text
//! submit ─► parse ─► roll ─► publish ─► (animation runs) ─► complete ─► log
//!             │
//!             └─► not recognized: nothing published, nothing logged
//! ```
//!
//! The log entry is appended by `complete()` itself, on the thread that
//! calls it, so the log is in completion order rather than submission
//! order. Completion, cancellation and timeout all settle the same per-roll
//! slot; whichever gets there first wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::log::{RollLog, RollLogEntry};
use super::payload::{AnimationPayload, CompletionSignal, Signalled};
use crate::bus::EventBus;
use crate::config::{Config, StallPolicy};
use crate::dice::{parse_notation, roll_with, NotationError, RandomSource, RollOutcome};

/// Why a submission produced no roll
#[derive(Debug, Error)]
pub enum RollError {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error("too many dice: {count} requested, at most {max} allowed")]
    TooManyDice { count: u32, max: u32 },

    #[error("a completion timeout is configured but no tokio runtime is running")]
    NoRuntime,
}

/// Where a submitted roll ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollState {
    /// Animation completed and the entry was logged
    Logged,
    /// Cancelled through its ticket before completion
    Cancelled,
    /// Every completion handle was dropped without completing
    Abandoned,
    /// Completion timed out and the roll was dropped
    TimedOut,
    /// Completion timed out and the roll was logged anyway
    ForceLogged,
}

impl RollState {
    /// Whether an entry reached the log
    pub fn is_logged(self) -> bool {
        matches!(self, RollState::Logged | RollState::ForceLogged)
    }
}

/// Everything needed to write the log entry later
struct PendingRoll {
    id: Uuid,
    actor: String,
    notation: String,
    outcome: RollOutcome,
}

impl PendingRoll {
    fn into_entry(self) -> RollLogEntry {
        RollLogEntry {
            id: self.id,
            actor: self.actor,
            notation: self.notation,
            outcome: self.outcome,
            completed_at: Utc::now(),
        }
    }
}

/// Bookkeeping for one roll, shared by its signal, ticket and timer
struct RollSlot {
    id: Uuid,
    /// Present until the roll settles
    pending: Option<PendingRoll>,
    state: Option<RollState>,
    log: RollLog,
    done_tx: Option<oneshot::Sender<RollState>>,
    timer: Option<AbortHandle>,
}

impl RollSlot {
    /// Move to a final state; false if the roll had already settled
    fn settle(&mut self, state: RollState) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        match state {
            RollState::Logged | RollState::ForceLogged => {
                let entry = pending.into_entry();
                info!(roll = %entry.id, actor = %entry.actor, "{}", entry);
                self.log.append(entry);
            }
            RollState::TimedOut => {
                warn!(roll = %self.id, notation = %pending.notation, "animation never completed, roll dropped")
            }
            RollState::Cancelled | RollState::Abandoned => {
                debug!(roll = %self.id, ?state, "roll not logged")
            }
        }

        self.state = Some(state);
        if let Some(done_tx) = self.done_tx.take() {
            let _ = done_tx.send(state);
        }
        true
    }
}

/// Handle on one in-flight roll
pub struct RollTicket {
    id: Uuid,
    outcome: RollOutcome,
    slot: Arc<Mutex<RollSlot>>,
    done_rx: oneshot::Receiver<RollState>,
}

impl std::fmt::Debug for RollTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollTicket")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl RollTicket {
    /// Id shared by the payload and the log entry
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The rolled values, available before the animation finishes
    pub fn outcome(&self) -> &RollOutcome {
        &self.outcome
    }

    /// Withdraw the pending log append
    ///
    /// Returns false once the roll has reached a final state. Dropping the
    /// ticket does not cancel.
    pub fn cancel(&self) -> bool {
        self.slot.lock().settle(RollState::Cancelled)
    }

    /// Final state, if the roll has settled
    pub fn state(&self) -> Option<RollState> {
        self.slot.lock().state
    }

    /// Wait for the final state
    pub async fn wait(self) -> RollState {
        match self.done_rx.await {
            Ok(state) => state,
            // The slot always settles before it can be dropped
            Err(_) => self.slot.lock().state.unwrap_or(RollState::Abandoned),
        }
    }
}

/// Bridges roll requests to the animation bus and the roll log
pub struct RollCoordinator {
    bus: EventBus<AnimationPayload>,
    log: RollLog,
    color: String,
    max_dice: u32,
    completion_timeout: Option<Duration>,
    stall_policy: StallPolicy,
    rng: Mutex<Box<dyn RandomSource + Send>>,
}

impl std::fmt::Debug for RollCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollCoordinator")
            .field("bus", &self.bus)
            .field("log", &self.log)
            .field("color", &self.color)
            .field("max_dice", &self.max_dice)
            .field("completion_timeout", &self.completion_timeout)
            .field("stall_policy", &self.stall_policy)
            .finish()
    }
}

impl RollCoordinator {
    /// Create a coordinator publishing on `bus`
    ///
    /// Uses a seeded generator when `config.seed` is set.
    pub fn new(bus: EventBus<AnimationPayload>, config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            bus,
            log: RollLog::new(),
            color: config.color.clone(),
            max_dice: config.max_dice,
            completion_timeout: config.completion_timeout(),
            stall_policy: config.stall_policy,
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Replace the random source
    pub fn with_random_source(mut self, source: impl RandomSource + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(source));
        self
    }

    /// The roll history
    pub fn log(&self) -> &RollLog {
        &self.log
    }

    /// The bus animations are published on
    pub fn bus(&self) -> &EventBus<AnimationPayload> {
        &self.bus
    }

    /// Submit typed notation for `actor`
    ///
    /// Unrecognized input is silently ignored and yields `None`. Runs
    /// synchronously; a tokio runtime is only needed when a completion
    /// timeout is configured.
    pub fn submit(&self, notation: &str, actor: &str) -> Option<RollTicket> {
        match self.try_submit(notation, actor) {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                debug!(actor, notation, "roll ignored: {}", e);
                None
            }
        }
    }

    /// Like [`submit`](Self::submit), but reports why nothing was rolled
    pub fn try_submit(&self, notation: &str, actor: &str) -> Result<RollTicket, RollError> {
        let parsed = parse_notation(notation)?;
        if parsed.count > self.max_dice {
            return Err(RollError::TooManyDice {
                count: parsed.count,
                max: self.max_dice,
            });
        }

        let timer = match self.completion_timeout {
            Some(limit) => {
                let runtime =
                    tokio::runtime::Handle::try_current().map_err(|_| RollError::NoRuntime)?;
                Some((runtime, limit))
            }
            None => None,
        };

        let outcome = {
            let mut rng = self.rng.lock();
            roll_with(&parsed, &mut **rng)
        };

        let id = Uuid::new_v4();
        let (done_tx, done_rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(RollSlot {
            id,
            pending: Some(PendingRoll {
                id,
                actor: actor.to_string(),
                notation: notation.to_string(),
                outcome: outcome.clone(),
            }),
            state: None,
            log: self.log.clone(),
            done_tx: Some(done_tx),
            timer: None,
        }));

        let signal_slot = slot.clone();
        let signal = CompletionSignal::new(move |signalled| {
            let state = match signalled {
                Signalled::Completed => RollState::Logged,
                Signalled::Dropped => RollState::Abandoned,
            };
            signal_slot.lock().settle(state);
        });

        if let Some((runtime, limit)) = timer {
            let timer_slot = slot.clone();
            let stalled = match self.stall_policy {
                StallPolicy::Discard => RollState::TimedOut,
                StallPolicy::ForceLog => RollState::ForceLogged,
            };
            let task = runtime.spawn(async move {
                tokio::time::sleep(limit).await;
                timer_slot.lock().settle(stalled);
            });
            slot.lock().timer = Some(task.abort_handle());
        }

        let payload = AnimationPayload::from_outcome(id, &outcome, &self.color, Some(signal));
        let report = self.bus.publish(payload);
        debug!(
            roll = %id,
            %parsed,
            delivered = report.delivered,
            failed = report.failed,
            "roll published"
        );

        Ok(RollTicket {
            id,
            outcome,
            slot,
            done_rx,
        })
    }
}
