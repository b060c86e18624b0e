use crate::battle::event::Event;

/// Receives drained events. Fire-and-forget.
pub trait EventSink {
    fn publish(&mut self, events: Vec<Event>);
}

/// Keeps everything it was given, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectingSink {
    events: Vec<Event>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl EventSink for CollectingSink {
    fn publish(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }
}
