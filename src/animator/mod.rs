//! Timed animation executor
//!
//! Stands in for the physics overlay: it subscribes to the animation bus,
//! "shows" each payload for a fixed duration, then reports completion.
//! A new payload clears the dice currently on the table, and the roll they
//! belonged to is completed right away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::debug;

use crate::bus::{EventBus, Subscription};
use crate::roll::{AnimationPayload, CompletionSignal};

/// Completes each animation after a fixed delay
#[derive(Debug)]
pub struct TimedAnimator {
    duration: Duration,
    /// Completion for the dice currently on the table
    on_table: Mutex<Option<CompletionSignal>>,
    animated: AtomicU64,
}

impl TimedAnimator {
    /// Create an animator; a zero duration completes synchronously
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            on_table: Mutex::new(None),
            animated: AtomicU64::new(0),
        })
    }

    /// Start receiving payloads from `bus`
    pub fn attach(self: &Arc<Self>, bus: &EventBus<AnimationPayload>) -> Subscription<AnimationPayload> {
        let animator = self.clone();
        bus.subscribe(move |payload| animator.animate(payload))
    }

    /// Number of payloads animated so far
    pub fn animated(&self) -> u64 {
        self.animated.load(Ordering::Relaxed)
    }

    fn animate(&self, payload: &AnimationPayload) -> anyhow::Result<()> {
        for die in &payload.dice {
            debug!(roll = %payload.roll_id, kind = %die.kind, value = die.value, color = %die.color, "animating die");
        }
        self.animated.fetch_add(1, Ordering::Relaxed);

        let previous = self.on_table.lock().take();
        if let Some(previous) = previous {
            if previous.complete() {
                debug!(roll = %payload.roll_id, "previous animation cleared");
            }
        }

        let Some(signal) = payload.on_complete.clone() else {
            return Ok(());
        };

        if self.duration.is_zero() {
            signal.complete();
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .context("timed animation needs a tokio runtime")?;
        *self.on_table.lock() = Some(signal.clone());

        let duration = self.duration;
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            signal.complete();
        });

        Ok(())
    }
}
