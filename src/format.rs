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

//! Template rendering for log records.
//!
//! A template is literal text interspersed with two-character escapes:
//!
//! | escape | expands to                          | example        |
//! |--------|-------------------------------------|----------------|
//! | `%T`   | time with zone, `HH:MM:SS ZZZ`      | `15:04:05 MST` |
//! | `%t`   | short time, `HH:MM`                 | `15:04`        |
//! | `%D`   | date, `YYYY/MM/DD`                  | `2006/01/02`   |
//! | `%d`   | short date, `MM/DD/YY`              | `01/02/06`     |
//! | `%L`   | four character level mnemonic       | `CRIT`         |
//! | `%S`   | source                              |                |
//! | `%M`   | message                             |                |
//!
//! Unknown escapes are dropped together with their `%`. Every rendered record ends with a
//! newline.
//!
//! # Examples
//!
//! ```
//! use jiff::tz::TimeZone;
//! use logroute::format::FormatEngine;
//! use logroute::record::Level;
//! use logroute::record::LogRecord;
//!
//! let engine = FormatEngine::new(TimeZone::UTC);
//! let record = LogRecord::new(Level::Critical, "main", "x");
//! assert_eq!(engine.render("%L %M", &record), "CRIT x\n");
//! assert_eq!(engine.render("a%Zb", &record), "ab\n");
//! ```

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::record::LogRecord;

/// `[%D %T] [%L] (%S) %M`
pub const FORMAT_DEFAULT: &str = "[%D %T] [%L] (%S) %M";
/// `[%t %d] [%L] %M`
pub const FORMAT_SHORT: &str = "[%t %d] [%L] %M";
/// `[%L] %M`
pub const FORMAT_ABBREV: &str = "[%L] %M";

static SHARED: LazyLock<Arc<FormatEngine>> =
    LazyLock::new(|| Arc::new(FormatEngine::new(TimeZone::system())));

/// Renders log records through templates.
///
/// The date and time substrings of the most recently rendered second are cached behind a
/// mutex, so that consecutive records created within the same second only pay for the
/// substitution. The cache is private to the engine; sinks share the process-wide engine
/// returned by [`FormatEngine::shared`] unless configured otherwise.
#[derive(Debug)]
pub struct FormatEngine {
    tz: TimeZone,
    cache: Mutex<TimeCache>,
}

impl FormatEngine {
    /// Create an engine that renders times in the given time zone.
    pub fn new(tz: TimeZone) -> Self {
        Self {
            tz,
            cache: Mutex::new(TimeCache::default()),
        }
    }

    /// The process-wide engine rendering in the system time zone.
    pub fn shared() -> Arc<FormatEngine> {
        SHARED.clone()
    }

    /// Render `record` through `template`, appending a trailing newline.
    ///
    /// An empty template renders as the empty string.
    pub fn render(&self, template: &str, record: &LogRecord) -> String {
        let mut out = String::with_capacity(template.len() + record.message().len() + 32);
        self.render_into(template, record, &mut out);
        out
    }

    /// Render `record` through `template` into `out`.
    pub fn render_into(&self, template: &str, record: &LogRecord, out: &mut String) {
        if template.is_empty() {
            return;
        }

        let mut cache = self.cache();
        cache.refresh(record.created(), &self.tz);

        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }

            match chars.next() {
                Some('T') => out.push_str(&cache.long_time),
                Some('t') => out.push_str(&cache.short_time),
                Some('D') => out.push_str(&cache.long_date),
                Some('d') => out.push_str(&cache.short_date),
                Some('L') => out.push_str(record.level().mnemonic()),
                Some('S') => out.push_str(record.source()),
                Some('M') => out.push_str(record.message()),
                // unknown escapes and a dangling '%' are dropped
                Some(_) | None => {}
            }
        }
        out.push('\n');
    }

    /// Format `ts` with a strftime-style format in this engine's time zone.
    pub(crate) fn strftime(&self, ts: Timestamp, format: &str) -> String {
        ts.to_zoned(self.tz.clone()).strftime(format).to_string()
    }

    fn cache(&self) -> MutexGuard<'_, TimeCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn cached_second(&self) -> Option<i64> {
        self.cache().second
    }
}

impl Default for FormatEngine {
    fn default() -> Self {
        Self::new(TimeZone::system())
    }
}

#[derive(Debug, Default)]
struct TimeCache {
    second: Option<i64>,
    long_time: String,
    short_time: String,
    long_date: String,
    short_date: String,
}

impl TimeCache {
    fn refresh(&mut self, created: Timestamp, tz: &TimeZone) {
        let second = created.as_second();
        if self.second == Some(second) {
            return;
        }

        let zoned = created.to_zoned(tz.clone());
        self.long_time = zoned.strftime("%H:%M:%S %Z").to_string();
        self.short_time = zoned.strftime("%H:%M").to_string();
        self.long_date = zoned.strftime("%Y/%m/%d").to_string();
        self.short_date = zoned.strftime("%m/%d/%y").to_string();
        self.second = Some(second);
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::record::Level;

    fn record_at(at: &str, level: Level, message: &str) -> LogRecord {
        LogRecord::with_created(level, at.parse().unwrap(), "main.rs:42", message)
    }

    #[test]
    fn test_render_known_escapes() {
        let engine = FormatEngine::new(TimeZone::UTC);
        let record = record_at("2024-08-10T17:12:52Z", Level::Info, "hello");

        assert_snapshot!(
            engine.render(FORMAT_DEFAULT, &record).trim_end(),
            @"[2024/08/10 17:12:52 UTC] [INFO] (main.rs:42) hello"
        );
        assert_snapshot!(
            engine.render(FORMAT_SHORT, &record).trim_end(),
            @"[17:12 08/10/24] [INFO] hello"
        );
        assert_eq!(engine.render(FORMAT_ABBREV, &record), "[INFO] hello\n");
    }

    #[test]
    fn test_render_level_and_message() {
        let engine = FormatEngine::new(TimeZone::UTC);
        let record = record_at("2024-08-10T17:12:52Z", Level::Critical, "x");
        assert_eq!(engine.render("%L %M", &record), "CRIT x\n");
    }

    #[test]
    fn test_unknown_escapes_are_dropped() {
        let engine = FormatEngine::new(TimeZone::UTC);
        let record = record_at("2024-08-10T17:12:52Z", Level::Info, "x");
        assert_eq!(engine.render("a%Zb", &record), "ab\n");
        assert_eq!(engine.render("a%%b", &record), "ab\n");
        assert_eq!(engine.render("tail%", &record), "tail\n");
        assert_eq!(engine.render("no escapes", &record), "no escapes\n");
    }

    #[test]
    fn test_empty_template() {
        let engine = FormatEngine::new(TimeZone::UTC);
        let record = record_at("2024-08-10T17:12:52Z", Level::Info, "x");
        assert_eq!(engine.render("", &record), "");
    }

    #[test]
    fn test_cache_follows_record_second() {
        let engine = FormatEngine::new(TimeZone::UTC);
        let first = record_at("2024-08-10T17:12:52Z", Level::Info, "a");
        let second = record_at("2024-08-10T17:12:53Z", Level::Info, "b");

        assert_eq!(engine.render("%T", &first), "17:12:52 UTC\n");
        assert_eq!(engine.cached_second(), Some(first.created().as_second()));
        assert_eq!(engine.render("%T", &second), "17:12:53 UTC\n");
        assert_eq!(engine.cached_second(), Some(second.created().as_second()));

        // going back in time re-derives the substrings as well
        assert_eq!(engine.render("%D %t", &first), "2024/08/10 17:12\n");
    }

    #[test]
    fn test_shared_engine_is_process_wide() {
        assert!(Arc::ptr_eq(&FormatEngine::shared(), &FormatEngine::shared()));
    }

    #[test]
    fn test_concurrent_renders_stay_correct() {
        let engine = Arc::new(FormatEngine::new(TimeZone::UTC));
        let handles = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    for j in 0..200 {
                        let at = Timestamp::from_second(1_723_309_972 + (i * 7 + j) % 5).unwrap();
                        let record = LogRecord::with_created(Level::Debug, at, "t", "m");
                        let expected = at
                            .to_zoned(TimeZone::UTC)
                            .strftime("%H:%M:%S %Z DEBG m\n")
                            .to_string();
                        assert_eq!(engine.render("%T %L %M", &record), expected);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
