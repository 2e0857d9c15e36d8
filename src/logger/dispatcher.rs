// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::Location;

use jiff::Timestamp;
use serde_json::Value;

use crate::Error;
use crate::Trap;
use crate::logger::message::Message;
use crate::record::Level;
use crate::record::LogRecord;
use crate::sink::Console;
use crate::sink::Sink;
use crate::trap::DefaultTrap;

/// The name of the sink receiving [`Dispatcher::event`] records.
pub const EVENT_SINK: &str = "event";

/// A threshold paired with the sink it guards.
#[derive(Debug)]
struct Filter {
    threshold: Level,
    sink: Box<dyn Sink>,
}

/// Routes log calls to named sinks, each guarded by a severity threshold.
///
/// A record at level `l` reaches every registered sink whose threshold is `<= l` and which
/// reports healthy. Registration takes `&mut self` while logging takes `&self`; share a
/// configured dispatcher through an `Arc`, a lock, or [`set_default_dispatcher`].
///
/// [`set_default_dispatcher`]: crate::set_default_dispatcher
///
/// # Examples
///
/// ```
/// use logroute::Dispatcher;
/// use logroute::record::Level;
/// use logroute::sink::Console;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.add_sink("stdout", Level::Info, Console::default()).unwrap();
///
/// dispatcher.debug("filtered out");
/// dispatcher.info("printed");
/// let err = dispatcher.error(format_args!("{} retries left", 0));
/// assert_eq!(err.to_string(), "0 retries left");
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    filters: HashMap<String, Filter>,
    trap: Box<dyn Trap>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher without sinks.
    pub fn new() -> Dispatcher {
        Dispatcher {
            filters: HashMap::new(),
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Create a dispatcher with a single [`Console`] sink named `stdout`.
    pub fn console(threshold: Level) -> Dispatcher {
        let mut filters = HashMap::new();
        filters.insert(
            "stdout".to_string(),
            Filter {
                threshold,
                sink: Box::new(Console::default()),
            },
        );
        Dispatcher {
            filters,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for sink failures during dispatch.
    ///
    /// Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    pub(crate) fn trap(&self) -> &dyn Trap {
        self.trap.as_ref()
    }

    /// Register `sink` under `name` at `threshold`.
    ///
    /// A sink previously registered under `name` is replaced together with its threshold and
    /// handed back unclosed.
    ///
    /// # Errors
    ///
    /// Return an error, leaving the dispatcher unchanged, if the sink reports unhealthy.
    pub fn add_sink(
        &mut self,
        name: impl Into<String>,
        threshold: Level,
        sink: impl Into<Box<dyn Sink>>,
    ) -> Result<Option<Box<dyn Sink>>, Error> {
        let name = name.into();
        let sink = sink.into();
        if !sink.healthy() {
            return Err(Error::new("refused to register unhealthy sink").with_context("name", name));
        }

        let previous = self.filters.insert(name, Filter { threshold, sink });
        Ok(previous.map(|filter| filter.sink))
    }

    /// Unregister the sink under `name`, handing it back unclosed.
    pub fn remove_sink(&mut self, name: &str) -> Option<Box<dyn Sink>> {
        self.filters.remove(name).map(|filter| filter.sink)
    }

    /// The threshold of the sink registered under `name`.
    pub fn threshold(&self, name: &str) -> Option<Level> {
        self.filters.get(name).map(|filter| filter.threshold)
    }

    /// The number of registered sinks.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no sink is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Whether a record at `level` would be admitted by at least one sink.
    pub fn enabled(&self, level: Level) -> bool {
        self.filters.values().any(|filter| level >= filter.threshold)
    }

    /// Send a record to every sink admitting `level`.
    ///
    /// Neither the record nor the message text is built if no sink admits `level`.
    pub fn log<'a>(&self, level: Level, source: &str, message: impl Into<Message<'a>>) {
        self.dispatch(None, level, || source.to_string(), message.into());
    }

    /// Send a record to the sink registered under `name` only, subject to its threshold.
    #[track_caller]
    pub fn log_to<'a>(&self, name: &str, level: Level, message: impl Into<Message<'a>>) {
        let caller = Location::caller();
        self.dispatch(Some(name), level, || caller_source(caller), message.into());
    }

    /// Log at [`Level::Finest`], with the caller location as source.
    #[track_caller]
    pub fn finest<'a>(&self, message: impl Into<Message<'a>>) {
        self.leveled(Level::Finest, Location::caller(), message.into());
    }

    /// Log at [`Level::Fine`], with the caller location as source.
    #[track_caller]
    pub fn fine<'a>(&self, message: impl Into<Message<'a>>) {
        self.leveled(Level::Fine, Location::caller(), message.into());
    }

    /// Log at [`Level::Debug`], with the caller location as source.
    #[track_caller]
    pub fn debug<'a>(&self, message: impl Into<Message<'a>>) {
        self.leveled(Level::Debug, Location::caller(), message.into());
    }

    /// Log at [`Level::Trace`], with the caller location as source.
    #[track_caller]
    pub fn trace<'a>(&self, message: impl Into<Message<'a>>) {
        self.leveled(Level::Trace, Location::caller(), message.into());
    }

    /// Log at [`Level::Info`], with the caller location as source.
    #[track_caller]
    pub fn info<'a>(&self, message: impl Into<Message<'a>>) {
        self.leveled(Level::Info, Location::caller(), message.into());
    }

    /// Log at [`Level::Warning`] and return the text as an error.
    ///
    /// The message is rendered exactly once, whether or not a sink admits it.
    #[track_caller]
    pub fn warn<'a>(&self, message: impl Into<Message<'a>>) -> Error {
        self.leveled_error(Level::Warning, Location::caller(), message.into())
    }

    /// Log at [`Level::Error`] and return the text as an error.
    #[track_caller]
    pub fn error<'a>(&self, message: impl Into<Message<'a>>) -> Error {
        self.leveled_error(Level::Error, Location::caller(), message.into())
    }

    /// Log at [`Level::Critical`] and return the text as an error.
    #[track_caller]
    pub fn critical<'a>(&self, message: impl Into<Message<'a>>) -> Error {
        self.leveled_error(Level::Critical, Location::caller(), message.into())
    }

    /// Log a JSON object of `fields` at [`Level::Info`] to the sink named [`EVENT_SINK`].
    ///
    /// The object also carries `__topic__` and `__timestamp__` (unix seconds).
    ///
    /// # Examples
    ///
    /// ```
    /// use logroute::Dispatcher;
    /// use serde_json::json;
    ///
    /// let dispatcher = Dispatcher::new();
    /// dispatcher.event("signup", [("user", json!("alice")), ("plan", json!("pro"))]);
    /// ```
    #[track_caller]
    pub fn event<K>(&self, topic: &str, fields: impl IntoIterator<Item = (K, Value)>)
    where
        K: Into<String>,
    {
        let caller = Location::caller();
        let mut object = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<serde_json::Map<_, _>>();
        object.insert("__topic__".to_string(), Value::from(topic));
        object.insert(
            "__timestamp__".to_string(),
            Value::from(Timestamp::now().as_second()),
        );

        let message = Message::lazy(move || Value::Object(object).to_string());
        self.dispatch(Some(EVENT_SINK), Level::Info, || caller_source(caller), message);
    }

    /// Flush every sink; failures are reported to the trap.
    pub fn flush(&self) {
        for (name, filter) in &self.filters {
            if let Err(err) = filter.sink.flush() {
                let err = Error::new("failed to flush sink")
                    .with_context("sink", name)
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    /// Close every sink and unregister all of them.
    pub fn close(&mut self) {
        for (_, filter) in self.filters.drain() {
            filter.sink.close();
        }
    }

    fn leveled(&self, level: Level, caller: &'static Location<'static>, message: Message<'_>) {
        self.dispatch(None, level, || caller_source(caller), message);
    }

    fn leveled_error(
        &self,
        level: Level,
        caller: &'static Location<'static>,
        message: Message<'_>,
    ) -> Error {
        let text = message.render();
        let message = Message::Text(Cow::Borrowed(text.as_str()));
        self.dispatch(None, level, || caller_source(caller), message);
        Error::new(text)
    }

    fn dispatch(
        &self,
        only: Option<&str>,
        level: Level,
        source: impl FnOnce() -> String,
        message: Message<'_>,
    ) {
        let mut admitted = self
            .filters
            .iter()
            .filter(|(name, filter)| {
                only.is_none_or(|only| only == name.as_str()) && level >= filter.threshold
            })
            .peekable();
        if admitted.peek().is_none() {
            return;
        }

        let record = LogRecord::new(level, source(), message.render());
        for (name, filter) in admitted {
            if !filter.sink.healthy() {
                continue;
            }
            if let Err(err) = filter.sink.write(&record) {
                let err = Error::new("failed to write log record")
                    .with_context("sink", name)
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn caller_source(caller: &Location<'_>) -> String {
    format!("{}:{}", caller.file(), caller.line())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        records: Mutex<Vec<LogRecord>>,
        unhealthy: AtomicBool,
        closed: AtomicBool,
    }

    #[derive(Debug, Clone, Default)]
    struct Recording(Arc<Recorder>);

    impl Recording {
        fn records(&self) -> Vec<LogRecord> {
            self.0.records.lock().unwrap().clone()
        }

        fn set_healthy(&self, healthy: bool) {
            self.0.unhealthy.store(!healthy, Ordering::SeqCst);
        }
    }

    impl Sink for Recording {
        fn write(&self, record: &LogRecord) -> Result<usize, Error> {
            self.0.records.lock().unwrap().push(record.clone());
            Ok(record.message().len())
        }

        fn healthy(&self) -> bool {
            !self.0.unhealthy.load(Ordering::SeqCst)
        }

        fn close(&self) {
            self.0.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Sink for Failing {
        fn write(&self, _: &LogRecord) -> Result<usize, Error> {
            Err(Error::new("broken pipe"))
        }

        fn healthy(&self) -> bool {
            true
        }

        fn close(&self) {}
    }

    #[derive(Debug, Default, Clone)]
    struct CountingTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CountingTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_threshold_admission() {
        for threshold in Level::ALL {
            let sink = Recording::default();
            let mut dispatcher = Dispatcher::new();
            dispatcher.add_sink("s", threshold, sink.clone()).unwrap();

            for level in Level::ALL {
                dispatcher.log(level, "src", "m");
            }

            let levels = sink.records().iter().map(|r| r.level()).collect::<Vec<_>>();
            let expected = Level::ALL
                .into_iter()
                .filter(|l| *l >= threshold)
                .collect::<Vec<_>>();
            assert_eq!(levels, expected, "threshold {threshold}");
        }
    }

    #[test]
    fn test_one_record_shared_by_all_sinks() {
        let a = Recording::default();
        let b = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink("a", Level::Debug, a.clone()).unwrap();
        dispatcher.add_sink("b", Level::Warning, b.clone()).unwrap();

        dispatcher.log(Level::Error, "src", "boom");
        assert_eq!(a.records(), b.records());
        assert_eq!(a.records()[0].source(), "src");
    }

    #[test]
    fn test_re_registration_replaces_pair() {
        let old = Recording::default();
        let new = Recording::default();
        let mut dispatcher = Dispatcher::new();
        assert!(
            dispatcher
                .add_sink("s", Level::Critical, old.clone())
                .unwrap()
                .is_none()
        );

        let displaced = dispatcher.add_sink("s", Level::Finest, new.clone()).unwrap();
        assert!(displaced.is_some());
        assert!(!old.0.closed.load(Ordering::SeqCst));
        assert_eq!(dispatcher.threshold("s"), Some(Level::Finest));
        assert_eq!(dispatcher.len(), 1);

        dispatcher.fine("fine");
        assert!(old.records().is_empty());
        assert_eq!(new.records().len(), 1);
    }

    #[test]
    fn test_remove_sink_hands_it_back_unclosed() {
        let kept = Recording::default();
        let removed = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink("kept", Level::Finest, kept.clone()).unwrap();
        dispatcher.add_sink("removed", Level::Finest, removed.clone()).unwrap();

        let sink = dispatcher.remove_sink("removed").unwrap();
        assert!(!removed.0.closed.load(Ordering::SeqCst));
        assert!(sink.healthy());
        assert!(dispatcher.remove_sink("removed").is_none());
        assert_eq!(dispatcher.threshold("removed"), None);
        assert_eq!(dispatcher.len(), 1);

        dispatcher.info("after removal");
        assert!(removed.records().is_empty());
        assert_eq!(kept.records().len(), 1);
    }

    #[test]
    fn test_unhealthy_sink_is_refused_and_skipped() {
        let sink = Recording::default();
        sink.set_healthy(false);
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.add_sink("s", Level::Finest, sink.clone()).is_err());
        assert!(dispatcher.is_empty());

        sink.set_healthy(true);
        dispatcher.add_sink("s", Level::Finest, sink.clone()).unwrap();
        sink.set_healthy(false);
        dispatcher.info("skipped");
        sink.set_healthy(true);
        dispatcher.info("delivered");

        let messages = sink.records();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message(), "delivered");
    }

    #[test]
    fn test_failing_sink_does_not_stop_delivery() {
        let trap = CountingTrap::default();
        let sink = Recording::default();
        let mut dispatcher = Dispatcher::new().with_trap(trap.clone());
        dispatcher.add_sink("failing", Level::Finest, Failing).unwrap();
        dispatcher.add_sink("ok", Level::Finest, sink.clone()).unwrap();

        dispatcher.info("m");
        assert_eq!(sink.records().len(), 1);
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("sink: failing"), "{}", trapped[0]);
    }

    #[test]
    fn test_lazy_message_needs_an_admitted_sink() {
        let calls = Cell::new(0);
        let mut dispatcher = Dispatcher::new();
        dispatcher.info(Message::lazy(|| {
            calls.set(calls.get() + 1);
            "never".to_string()
        }));
        assert_eq!(calls.get(), 0);

        dispatcher
            .add_sink("s", Level::Error, Recording::default())
            .unwrap();
        dispatcher.info(Message::lazy(|| {
            calls.set(calls.get() + 1);
            "filtered".to_string()
        }));
        assert_eq!(calls.get(), 0);

        dispatcher.error(Message::lazy(|| {
            calls.set(calls.get() + 1);
            "admitted".to_string()
        }));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_leveled_errors_carry_text() {
        let calls = Cell::new(0);
        let dispatcher = Dispatcher::new();
        let err = dispatcher.warn(Message::lazy(|| {
            calls.set(calls.get() + 1);
            "low disk".to_string()
        }));
        assert_eq!(calls.get(), 1);
        assert_eq!(err.to_string(), "low disk");
        assert_eq!(
            dispatcher.critical(format_args!("{} {}", "code", 7)).message(),
            "code 7"
        );
        assert_eq!(
            dispatcher.error(Message::values(&[&"a", &1])).to_string(),
            "a 1"
        );
    }

    #[test]
    fn test_caller_location_is_source() {
        let sink = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink("s", Level::Finest, sink.clone()).unwrap();

        let line = line!() + 1;
        dispatcher.trace("here");
        assert_eq!(
            sink.records()[0].source(),
            format!("{}:{}", file!(), line)
        );
    }

    #[test]
    fn test_log_to_named_sink() {
        let a = Recording::default();
        let b = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink("a", Level::Finest, a.clone()).unwrap();
        dispatcher.add_sink("b", Level::Error, b.clone()).unwrap();

        dispatcher.log_to("a", Level::Info, "only a");
        dispatcher.log_to("b", Level::Info, "below threshold");
        dispatcher.log_to("missing", Level::Critical, "nowhere");

        assert_eq!(a.records().len(), 1);
        assert!(b.records().is_empty());
    }

    #[test]
    fn test_event_goes_to_event_sink() {
        let event = Recording::default();
        let other = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink(EVENT_SINK, Level::Info, event.clone()).unwrap();
        dispatcher.add_sink("other", Level::Finest, other.clone()).unwrap();

        dispatcher.event("signup", [("user", Value::from("alice")), ("age", Value::from(7))]);
        assert!(other.records().is_empty());

        let records = event.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level(), Level::Info);
        let value: Value = serde_json::from_str(records[0].message()).unwrap();
        assert_eq!(value["__topic__"], "signup");
        assert_eq!(value["user"], "alice");
        assert_eq!(value["age"], 7);
        assert!(value["__timestamp__"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_close_closes_and_clears() {
        let a = Recording::default();
        let b = Recording::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_sink("a", Level::Finest, a.clone()).unwrap();
        dispatcher.add_sink("b", Level::Finest, b.clone()).unwrap();

        dispatcher.close();
        assert!(dispatcher.is_empty());
        assert!(a.0.closed.load(Ordering::SeqCst));
        assert!(b.0.closed.load(Ordering::SeqCst));

        dispatcher.info("dropped");
        assert!(a.records().is_empty());
    }

    #[test]
    fn test_console_dispatcher() {
        let dispatcher = Dispatcher::console(Level::Warning);
        assert_eq!(dispatcher.threshold("stdout"), Some(Level::Warning));
        assert!(dispatcher.enabled(Level::Error));
        assert!(!dispatcher.enabled(Level::Info));
    }
}
