//! Single-slot, latest-wins snapshot exchange.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::snapshot::StateSnapshot;

/// Handoff slot between the simulation worker and any consumer.
///
/// Publishing overwrites whatever is there and never waits on a reader.
/// [`StateBus::subscribe`] takes the slot and leaves it empty, so a consumer
/// only ever sees each snapshot once and never sees a partial one.
#[derive(Debug, Default)]
pub struct StateBus {
    slot: Mutex<Option<Arc<StateSnapshot>>>,
}

impl StateBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<StateSnapshot>>> {
        // A panicking holder cannot leave the slot half-written
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the slot with `snapshot`.
    pub fn publish(&self, snapshot: StateSnapshot) {
        *self.slot() = Some(Arc::new(snapshot));
    }

    /// Take the latest snapshot, if one arrived since the last call.
    pub fn subscribe(&self) -> Option<Arc<StateSnapshot>> {
        self.slot().take()
    }

    /// Whether an unread snapshot is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::physics::Physics;
    use std::thread;

    fn snapshot(step: u64) -> StateSnapshot {
        let mut s = Physics::new(SimulationConfig::default()).unwrap().snapshot();
        s.step_count = step;
        s
    }

    #[test]
    fn empty_bus_yields_nothing() {
        let bus = StateBus::new();
        assert!(bus.subscribe().is_none());
        assert!(!bus.has_pending());
    }

    #[test]
    fn subscribe_takes_and_clears() {
        let bus = StateBus::new();
        bus.publish(snapshot(1));
        assert_eq!(bus.subscribe().map(|s| s.step_count), Some(1));
        assert!(bus.subscribe().is_none());
    }

    #[test]
    fn latest_publish_wins() {
        let bus = StateBus::new();
        for step in 1..=5 {
            bus.publish(snapshot(step));
        }
        assert_eq!(bus.subscribe().map(|s| s.step_count), Some(5));
    }

    #[test]
    fn concurrent_reader_sees_whole_snapshots() {
        let bus = Arc::new(StateBus::new());
        let producer = {
            let bus = Arc::clone(&bus);
            let base = snapshot(0);
            thread::spawn(move || {
                for step in 0..10_000 {
                    let mut s = base.clone();
                    s.step_count = step;
                    s.sim_time = step as f64;
                    bus.publish(s);
                }
            })
        };
        let mut last = None;
        while !producer.is_finished() || bus.has_pending() {
            if let Some(s) = bus.subscribe() {
                assert_eq!(s.sim_time, s.step_count as f64);
                if let Some(prev) = last {
                    assert!(s.step_count > prev);
                }
                last = Some(s.step_count);
            }
        }
        producer.join().unwrap();
    }
}
