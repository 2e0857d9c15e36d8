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

//! A sink rendering and writing records on a dedicated thread.
//!
//! # Example
//!
//! ```
//! use logroute::Dispatcher;
//! use logroute::record::Level;
//! use logroute::sink::AsyncBuilder;
//!
//! let sink = AsyncBuilder::new("logroute-stderr")
//!     .buffered_records_limit(128)
//!     .build(std::io::stderr())
//!     .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_sink("stderr", Level::Debug, sink).unwrap();
//! dispatcher.debug("rendered off the calling thread");
//! dispatcher.close();
//! ```

use std::io::Write;
use std::sync::Arc;

use crate::Error;
use crate::Trap;
use crate::format::FORMAT_DEFAULT;
use crate::format::FormatEngine;
use crate::record::LogRecord;
use crate::sink::Sink;
use crate::trap::DefaultTrap;

mod state;
mod worker;

use self::state::AsyncState;
use self::worker::Worker;

/// The default number of records the queue holds before [`Overflow`] applies.
pub const DEFAULT_BUFFERED_RECORDS_LIMIT: usize = 32;

/// Overflow policy for [`AsyncBuffered`].
///
/// When the queue is full, an incoming record is handled according to the specified policy.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[non_exhaustive]
pub enum Overflow {
    /// Blocks until the queue is not full.
    #[default]
    Block,
    /// Drops the incoming record.
    DropIncoming,
}

#[derive(Debug)]
enum Task {
    Log(LogRecord),
    Flush,
}

/// A builder for configuring an [`AsyncBuffered`] sink.
#[derive(Debug)]
pub struct AsyncBuilder {
    thread_name: String,
    template: String,
    engine: Arc<FormatEngine>,
    buffered_records_limit: usize,
    overflow: Overflow,
    trap: Box<dyn Trap>,
}

impl AsyncBuilder {
    /// Create a new async sink builder whose worker thread is named `thread_name`.
    #[must_use]
    pub fn new(thread_name: impl Into<String>) -> AsyncBuilder {
        AsyncBuilder {
            thread_name: thread_name.into(),
            template: FORMAT_DEFAULT.to_string(),
            engine: FormatEngine::shared(),
            buffered_records_limit: DEFAULT_BUFFERED_RECORDS_LIMIT,
            overflow: Overflow::Block,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the template records are rendered through.
    ///
    /// Default to [`FORMAT_DEFAULT`].
    pub fn format(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Set the engine rendering the template.
    pub fn engine(mut self, engine: Arc<FormatEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Set the capacity of the queue of pending records.
    ///
    /// Default to [`DEFAULT_BUFFERED_RECORDS_LIMIT`].
    #[must_use]
    pub fn buffered_records_limit(mut self, limit: usize) -> Self {
        self.buffered_records_limit = limit;
        self
    }

    /// Set the overflow policy to block when the queue is full.
    pub fn overflow_block(mut self) -> Self {
        self.overflow = Overflow::Block;
        self
    }

    /// Set the overflow policy to drop incoming records when the queue is full.
    pub fn overflow_drop_incoming(mut self) -> Self {
        self.overflow = Overflow::DropIncoming;
        self
    }

    /// Set the trap for write errors on the worker thread and for a worker that dies before
    /// draining.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the sink, spawning the worker thread that owns `writer`.
    ///
    /// # Errors
    ///
    /// Return an error if the worker thread cannot be spawned.
    pub fn build(self, writer: impl Write + Send + 'static) -> Result<AsyncBuffered, Error> {
        let Self {
            thread_name,
            template,
            engine,
            buffered_records_limit,
            overflow,
            trap,
        } = self;

        let trap: Arc<dyn Trap> = Arc::from(trap);
        let (sender, receiver) = crossbeam_channel::bounded(buffered_records_limit);
        let worker = Worker::new(receiver, Box::new(writer), template, engine, trap.clone());
        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::new("failed to spawn async sink thread").with_source(err)
            })?;

        Ok(AsyncBuffered {
            overflow,
            state: AsyncState::new(sender, handle),
            trap,
        })
    }
}

/// A sink handing records to a bounded queue drained by one worker thread.
///
/// [`Sink::write`] returns as soon as the record is queued, reporting zero bytes since nothing
/// has been emitted yet. Closing (or dropping) the sink waits until every queued record has
/// been written.
#[derive(Debug)]
pub struct AsyncBuffered {
    overflow: Overflow,
    state: AsyncState,
    trap: Arc<dyn Trap>,
}

impl Sink for AsyncBuffered {
    fn write(&self, record: &LogRecord) -> Result<usize, Error> {
        self.state
            .send_task(Task::Log(record.clone()), self.overflow)
            .map(|_| 0)
    }

    fn healthy(&self) -> bool {
        self.state.is_open()
    }

    fn close(&self) {
        if let Err(err) = self.state.close() {
            self.trap.trap(&err);
        }
    }

    fn flush(&self) -> Result<(), Error> {
        self.state.send_task(Task::Flush, self.overflow).map(|_| ())
    }
}

impl Drop for AsyncBuffered {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crossbeam_channel::Receiver;
    use crossbeam_channel::Sender;

    use super::*;
    use crate::format::FORMAT_ABBREV;
    use crate::record::Level;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A writer that announces every write and then waits for a permit.
    struct GatedWriter {
        entered: Sender<()>,
        permits: Receiver<()>,
        out: SharedBuf,
    }

    impl Write for GatedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let _ = self.entered.send(());
            self.permits
                .recv()
                .map_err(|_| io::Error::other("gate closed"))?;
            self.out.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct PanickingWriter;

    impl Write for PanickingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            panic!("writer exploded");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone)]
    struct CollectingTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CollectingTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Level::Info, "test", message)
    }

    #[test]
    fn test_close_drains_queue() {
        let out = SharedBuf::default();
        let sink = AsyncBuilder::new("drain")
            .format(FORMAT_ABBREV)
            .buffered_records_limit(8)
            .build(out.clone())
            .unwrap();

        for i in 0..100 {
            assert_eq!(sink.write(&record(&format!("m{i}"))).unwrap(), 0);
        }
        sink.close();

        let contents = out.contents();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "[INFO] m0");
        assert_eq!(lines[99], "[INFO] m99");
    }

    #[test]
    fn test_full_queue_blocks_writer() {
        let out = SharedBuf::default();
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (permits_tx, permits_rx) = crossbeam_channel::unbounded();
        let sink = Arc::new(
            AsyncBuilder::new("gated")
                .format(FORMAT_ABBREV)
                .buffered_records_limit(1)
                .build(GatedWriter {
                    entered: entered_tx,
                    permits: permits_rx,
                    out: out.clone(),
                })
                .unwrap(),
        );

        // the worker takes the first record and waits at the gate
        sink.write(&record("first")).unwrap();
        entered_rx.recv().unwrap();
        // the second record fills the queue
        sink.write(&record("second")).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let blocked = {
            let sink = sink.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                sink.write(&record("third")).unwrap();
                done.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        assert!(!done.load(Ordering::SeqCst));

        for _ in 0..3 {
            permits_tx.send(()).unwrap();
        }
        blocked.join().unwrap();
        assert!(done.load(Ordering::SeqCst));

        sink.close();
        assert_eq!(out.contents(), "[INFO] first\n[INFO] second\n[INFO] third\n");
    }

    #[test]
    fn test_drop_incoming_discards_overflow() {
        let out = SharedBuf::default();
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (permits_tx, permits_rx) = crossbeam_channel::unbounded();
        let sink = AsyncBuilder::new("dropping")
            .format(FORMAT_ABBREV)
            .buffered_records_limit(1)
            .overflow_drop_incoming()
            .build(GatedWriter {
                entered: entered_tx,
                permits: permits_rx,
                out: out.clone(),
            })
            .unwrap();

        sink.write(&record("first")).unwrap();
        entered_rx.recv().unwrap();
        sink.write(&record("second")).unwrap();
        sink.write(&record("dropped")).unwrap();

        for _ in 0..2 {
            permits_tx.send(()).unwrap();
        }
        sink.close();
        assert_eq!(out.contents(), "[INFO] first\n[INFO] second\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let sink = AsyncBuilder::new("closed")
            .build(SharedBuf::default())
            .unwrap();
        assert!(sink.healthy());

        sink.close();
        sink.close();
        assert!(!sink.healthy());
        assert!(sink.write(&record("late")).is_err());
        assert!(sink.flush().is_err());
    }

    #[test]
    fn test_worker_panic_reaches_configured_trap() {
        let trap = CollectingTrap::default();
        let sink = AsyncBuilder::new("panicking")
            .trap(trap.clone())
            .build(PanickingWriter)
            .unwrap();

        sink.write(&record("boom")).unwrap();
        sink.close();

        let trapped = trap.0.lock().unwrap();
        assert_eq!(*trapped, vec!["async sink worker thread panicked".to_string()]);
    }
}
