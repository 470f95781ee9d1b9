use longform_tts::domain::synthesis::{EventSink, RunEvent};
use parking_lot::Mutex;

/// Keeps every event for later assertions
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&RunEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}
