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

//! A bridge to forward logs from the `log` crate to the default [`Dispatcher`].
//!
//! [`Dispatcher`]: crate::Dispatcher

use crate::default_dispatcher;
use crate::record::Level;

struct LogCrateLogger(());

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        default_dispatcher().enabled(level_from_log(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let dispatcher = default_dispatcher();
        let level = level_from_log(record.level());
        if !dispatcher.enabled(level) {
            return;
        }
        dispatcher.log(level, &source_of(record), *record.args());
    }

    fn flush(&self) {
        default_dispatcher().flush();
    }
}

fn level_from_log(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warning,
        log::Level::Info => Level::Info,
        log::Level::Debug => Level::Debug,
        log::Level::Trace => Level::Fine,
    }
}

fn source_of(record: &log::Record) -> String {
    match (record.file(), record.line()) {
        (Some(file), Some(line)) => format!("{file}:{line}"),
        _ => record.target().to_string(),
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to set up a `LogCrateProxy` and
/// all logs from log crate will be forwarded to the default dispatcher.
///
/// This should be called early in the execution of a Rust program. Any log events that occur
/// before initialization will be ignored.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// if let Err(err) = logroute::bridge::try_setup_log_crate() {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// ```
pub fn try_setup_log_crate() -> Result<(), log::SetLoggerError> {
    static LOGGER: LogCrateLogger = LogCrateLogger(());
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger.
///
/// This function will panic if it is called more than once, or if another library has already
/// initialized the log crate global logger.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use logroute::Dispatcher;
/// use logroute::record::Level;
///
/// logroute::bridge::setup_log_crate();
/// let _ = logroute::set_default_dispatcher(Dispatcher::console(Level::Info));
/// log::info!("forwarded to the default dispatcher");
/// ```
pub fn setup_log_crate() {
    try_setup_log_crate().expect(
        "logroute::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}
