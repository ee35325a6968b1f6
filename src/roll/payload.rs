//! Animation payloads and their completion signal

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::dice::{DieKind, RollOutcome};

/// One die to animate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimatedDie {
    pub kind: DieKind,
    /// Face the animation must land on
    pub value: i64,
    pub color: String,
}

/// How a completion signal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signalled {
    /// `complete()` was called
    Completed,
    /// Every handle was dropped without completing
    Dropped,
}

type OnSignal = Box<dyn FnOnce(Signalled) + Send>;

struct SignalInner {
    callback: Mutex<Option<OnSignal>>,
}

impl Drop for SignalInner {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.get_mut().take() {
            callback(Signalled::Dropped);
        }
    }
}

/// Single-shot "animation finished" notification
///
/// Clones share the same callback. The first `complete()` runs it on the
/// calling thread before returning; later calls, from any clone, do
/// nothing. If the last clone is dropped unfired, the callback runs with
/// [`Signalled::Dropped`].
#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl CompletionSignal {
    /// Create a signal that runs `callback` exactly once
    pub fn new(callback: impl FnOnce(Signalled) + Send + 'static) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                callback: Mutex::new(Some(Box::new(callback))),
            }),
        }
    }

    /// Create a signal and a receiver that observes how it ended
    pub fn channel() -> (Self, oneshot::Receiver<Signalled>) {
        let (tx, rx) = oneshot::channel();
        let signal = Self::new(move |signalled| {
            let _ = tx.send(signalled);
        });
        (signal, rx)
    }

    /// Report completion; returns true only for the call that fired
    pub fn complete(&self) -> bool {
        // Released before running so the callback may touch this signal
        let callback = self.inner.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(Signalled::Completed);
                true
            }
            None => false,
        }
    }

    /// Whether completion was already reported
    pub fn is_fired(&self) -> bool {
        self.inner.callback.lock().is_none()
    }
}

/// Everything the animation executor needs for one roll
#[derive(Debug, Clone)]
pub struct AnimationPayload {
    pub roll_id: Uuid,
    pub dice: Vec<AnimatedDie>,
    /// Absent means fire and forget
    pub on_complete: Option<CompletionSignal>,
}

impl AnimationPayload {
    /// Build a payload from a roll, one entry per die
    pub fn from_outcome(
        roll_id: Uuid,
        outcome: &RollOutcome,
        color: &str,
        on_complete: Option<CompletionSignal>,
    ) -> Self {
        let dice = outcome
            .dice
            .iter()
            .map(|d| AnimatedDie {
                kind: d.kind,
                value: d.adjusted,
                color: color.to_string(),
            })
            .collect();

        Self {
            roll_id,
            dice,
            on_complete,
        }
    }

    /// Report completion, if anyone is listening
    pub fn complete(&self) -> bool {
        self.on_complete
            .as_ref()
            .map(CompletionSignal::complete)
            .unwrap_or(false)
    }
}
