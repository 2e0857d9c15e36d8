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

//! Log record and severity levels.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::Error;

/// An enum representing the available severity levels, from the most verbose to the most
/// severe.
///
/// Levels are totally ordered: `Finest < Fine < Debug < Trace < Info < Warning < Error <
/// Critical`. A sink registered at threshold `t` accepts every record whose level is `>= t`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates the most verbose tracing output.
    Finest,
    /// Designates fine-grained tracing output.
    Fine,
    /// Designates debugging information.
    Debug,
    /// Designates program flow tracing.
    Trace,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warning,
    /// Designates errors.
    Error,
    /// Designates critical errors.
    Critical,
}

impl Level {
    /// All levels, from the most verbose to the most severe.
    pub const ALL: [Level; 8] = [
        Level::Finest,
        Level::Fine,
        Level::Debug,
        Level::Trace,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Return the full upper-case name of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Finest => "FINEST",
            Level::Fine => "FINE",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Return the fixed-width four character mnemonic used by the `%L` template escape.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Level::Finest => "FNST",
            Level::Fine => "FINE",
            Level::Debug => "DEBG",
            Level::Trace => "TRAC",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "EROR",
            Level::Critical => "CRIT",
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Level {
    type Err = Error;

    /// Parse a level from its name or its mnemonic, ignoring ASCII case.
    ///
    /// `WARN` is accepted as an alias of `WARNING`.
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in Level::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) || s.eq_ignore_ascii_case(level.mnemonic())
            {
                return Ok(level);
            }
        }

        Err(Error::new(format!("malformed level: {s:?}")))
    }
}

/// One emitted log event.
///
/// A record is built once per dispatch and shared read-only by every admitted sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    level: Level,
    created: Timestamp,
    source: String,
    message: String,
}

impl LogRecord {
    /// Create a record stamped with the current time, truncated to the second.
    pub fn new(level: Level, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_created(level, Timestamp::now(), source, message)
    }

    /// Create a record stamped with the given time, truncated to the second.
    pub fn with_created(
        level: Level,
        created: Timestamp,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            created: truncate_to_second(created),
            source: source.into(),
            message: message.into(),
        }
    }

    /// The severity level.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The creation time, at second resolution.
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// The free-text origin of the record.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn truncate_to_second(ts: Timestamp) -> Timestamp {
    Timestamp::from_second(ts.as_second()).unwrap_or(ts)
}
