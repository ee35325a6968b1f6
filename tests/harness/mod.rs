//! Integration test harness
//!
//! - `TestTable` - a bus, a coordinator and a manual animation executor
//! - `ManualExecutor` - holds payloads until the test completes them

use std::sync::Arc;

use dicetray::dice::FixedSequence;
use dicetray::{AnimationPayload, Config, EventBus, RollCoordinator, Subscription};
use parking_lot::Mutex;

/// Animation executor driven by the test
pub struct ManualExecutor {
    received: Arc<Mutex<Vec<AnimationPayload>>>,
    subscription: Subscription<AnimationPayload>,
}

impl ManualExecutor {
    pub fn attach(bus: &EventBus<AnimationPayload>) -> Self {
        let received: Arc<Mutex<Vec<AnimationPayload>>> = Default::default();
        let store = received.clone();
        let subscription = bus.subscribe(move |payload: &AnimationPayload| {
            store.lock().push(payload.clone());
            Ok(())
        });
        Self {
            received,
            subscription,
        }
    }

    /// Payloads received so far, in publish order
    pub fn received(&self) -> Vec<AnimationPayload> {
        self.received.lock().clone()
    }

    /// Finish the animation at `index`
    pub fn finish(&self, index: usize) -> bool {
        self.received.lock()[index].complete()
    }

    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

/// A coordinator wired to a manual executor
pub struct TestTable {
    pub coordinator: RollCoordinator,
    pub executor: ManualExecutor,
}

impl TestTable {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let bus = EventBus::new();
        let executor = ManualExecutor::attach(&bus);
        let coordinator = RollCoordinator::new(bus, &config);
        Self {
            coordinator,
            executor,
        }
    }

    /// Same table, with scripted unit values for the dice
    pub fn scripted(units: &[f64]) -> Self {
        let mut table = Self::new();
        table.coordinator = table
            .coordinator
            .with_random_source(FixedSequence::new(units.to_vec()));
        table
    }
}
