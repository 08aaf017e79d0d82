//! Log capture for unit tests.
//!
//! [`capture_events`] runs a closure under a thread-local `tracing`
//! registry carrying an [`EventLog`] layer, then hands back whatever the
//! closure logged.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{
    Event,
    Level,
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    registry,
};

/// One logged event, flattened to strings.
#[derive(Debug)]
pub(crate) struct RecordedEvent {
    level: Level,
    message: Option<String>,
    fields: BTreeMap<&'static str, String>,
}

impl RecordedEvent {
    pub(crate) const fn level(&self) -> Level { self.level }

    pub(crate) fn message(&self) -> Option<&str> { self.message.as_deref() }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.fields.insert(name, value);
            }
        }
    }
}

impl Visit for RecordedEvent {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }
}

/// Layer that appends every event it sees to a shared list.
#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<RecordedEvent>>>);

impl EventLog {
    fn drain(&self) -> Vec<RecordedEvent> {
        let mut events = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        events.drain(..).collect()
    }
}

impl<S: Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorded = RecordedEvent {
            level: *event.metadata().level(),
            message: None,
            fields: BTreeMap::new(),
        };
        event.record(&mut recorded);
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recorded);
    }
}

/// Run `f` and return its result with every event it logged on this thread.
pub(crate) fn capture_events<T>(f: impl FnOnce() -> T) -> (T, Vec<RecordedEvent>) {
    let log = EventLog::default();
    let subscriber = registry().with(log.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, log.drain())
}
