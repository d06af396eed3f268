use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Counter, Event, Telemetry};

/// Keeps everything it is told in memory.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<Event>>,
    counters: Mutex<HashMap<(Counter, String), u64>>,
    max_in_flight: Mutex<usize>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Current value of `counter{label}`, zero if never incremented.
    pub fn count(&self, counter: Counter, label: &str) -> u64 {
        self.counters
            .lock()
            .get(&(counter, label.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of `counter` across all labels.
    pub fn total(&self, counter: Counter) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|((c, _), _)| *c == counter)
            .map(|(_, n)| n)
            .sum()
    }

    /// Highest in-flight value reported so far.
    pub fn max_in_flight(&self) -> usize {
        *self.max_in_flight.lock()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }

    fn increment(&self, counter: Counter, label: &str) {
        *self
            .counters
            .lock()
            .entry((counter, label.to_string()))
            .or_insert(0) += 1;
    }

    fn set_in_flight(&self, count: usize) {
        let mut max = self.max_in_flight.lock();
        *max = (*max).max(count);
    }
}
