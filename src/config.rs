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

//! Building a [`Dispatcher`] from already-parsed filter descriptors.
//!
//! Descriptors derive [`Deserialize`], so any serde format can produce them:
//!
//! ```
//! use logroute::Dispatcher;
//! use logroute::config::FilterConfig;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let filename = dir.path().join("app.log");
//! let filters: Vec<FilterConfig> = serde_json::from_value(serde_json::json!([
//!     { "name": "stdout", "sink": "console", "level": "DEBUG" },
//!     {
//!         "name": "file",
//!         "sink": "file",
//!         "level": "FINEST",
//!         "properties": {
//!             "filename": filename,
//!             "format": "[%D %T] [%L] (%S) %M",
//!             "rotate": "true",
//!             "maxsize": "10M",
//!             "maxlines": "6K",
//!             "daily": "true"
//!         }
//!     },
//!     { "name": "donotopen", "enabled": false, "sink": "socket", "level": "FINEST" }
//! ]))
//! .unwrap();
//!
//! let dispatcher = Dispatcher::from_filters(filters);
//! assert_eq!(dispatcher.len(), 2);
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Dispatcher;
use crate::Error;
use crate::format::FORMAT_DEFAULT;
use crate::record::Level;
use crate::sink::Console;
use crate::sink::FileBuilder;
use crate::sink::Protocol;
use crate::sink::Sink;
use crate::sink::SocketBuilder;
use crate::sink::XmlFileBuilder;

/// The kind of sink a [`FilterConfig`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// [`Console`], no properties.
    Console,
    /// [`RotatingFile`](crate::sink::RotatingFile): `filename`, `format`, `rotate`, `maxsize`,
    /// `maxlines`, `daily`.
    File,
    /// [`XmlFile`](crate::sink::XmlFile): `filename`, `rotate`, `maxsize`, `maxrecords`,
    /// `daily`.
    Xml,
    /// [`SocketSink`](crate::sink::SocketSink): `endpoint`, `protocol`.
    Socket,
}

impl SinkKind {
    fn known_properties(&self) -> &'static [&'static str] {
        match self {
            SinkKind::Console => &[],
            SinkKind::File => &["filename", "format", "rotate", "maxsize", "maxlines", "daily"],
            SinkKind::Xml => &["filename", "rotate", "maxsize", "maxrecords", "daily"],
            SinkKind::Socket => &["endpoint", "protocol"],
        }
    }
}

/// One named sink registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterConfig {
    /// The name the sink is registered under.
    #[serde(alias = "tag")]
    pub name: String,
    /// Disabled descriptors are skipped. Default to `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The kind of sink.
    #[serde(alias = "type")]
    pub sink: SinkKind,
    /// The threshold of the sink.
    pub level: Level,
    /// Sink-specific settings.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl FilterConfig {
    /// Create an enabled descriptor without properties.
    pub fn new(name: impl Into<String>, sink: SinkKind, level: Level) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            sink,
            level,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Property names this descriptor carries that its sink kind does not understand.
    pub fn unknown_properties(&self) -> impl Iterator<Item = &str> {
        let known = self.sink.known_properties();
        self.properties
            .keys()
            .map(String::as_str)
            .filter(move |key| !known.contains(key))
    }

    /// Construct the described sink.
    ///
    /// # Errors
    ///
    /// Return an error if a required property is missing, a value is malformed, or the sink
    /// fails to open.
    pub fn build_sink(&self) -> Result<Box<dyn Sink>, Error> {
        let sink: Box<dyn Sink> = match self.sink {
            SinkKind::Console => Box::new(Console::default()),
            SinkKind::File => {
                let builder = FileBuilder::new(self.required("filename")?)
                    .format(self.get("format").unwrap_or(FORMAT_DEFAULT))
                    .archive(self.parse_or("rotate", parse_bool, false)?)
                    .daily(self.parse_or("daily", parse_bool, false)?)
                    .max_size(self.parse_or("maxsize", parse_size, 0)?)
                    .max_lines(self.parse_or("maxlines", parse_count, 0)?);
                Box::new(builder.build()?)
            }
            SinkKind::Xml => {
                let builder = XmlFileBuilder::new(self.required("filename")?)
                    .archive(self.parse_or("rotate", parse_bool, false)?)
                    .daily(self.parse_or("daily", parse_bool, false)?)
                    .max_size(self.parse_or("maxsize", parse_size, 0)?)
                    .max_records(self.parse_or("maxrecords", parse_count, 0)?);
                Box::new(builder.build()?)
            }
            SinkKind::Socket => {
                let endpoint = self.required("endpoint")?;
                let protocol =
                    self.parse_or("protocol", str::parse::<Protocol>, Protocol::Datagram)?;
                Box::new(SocketBuilder::new(protocol, endpoint).build()?)
            }
        };
        Ok(sink)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.trim())
    }

    fn required(&self, key: &'static str) -> Result<&str, Error> {
        self.get(key).filter(|v| !v.is_empty()).ok_or_else(|| {
            Error::new("missing required property")
                .with_context("filter", &self.name)
                .with_context("property", key)
        })
    }

    fn parse_or<T>(
        &self,
        key: &'static str,
        parse: impl FnOnce(&str) -> Result<T, Error>,
        default: T,
    ) -> Result<T, Error> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => parse(value).map_err(|err| {
                Error::new("malformed property")
                    .with_context("filter", &self.name)
                    .with_context("property", key)
                    .with_source(err)
            }),
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher and [`configure`](Dispatcher::configure) it.
    pub fn from_filters(filters: impl IntoIterator<Item = FilterConfig>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher.configure(filters);
        dispatcher
    }

    /// Build and register every enabled descriptor, returning how many were registered.
    ///
    /// A descriptor that fails to build or register is reported to the trap and skipped; the
    /// remaining ones are still processed. Unknown properties are reported and ignored.
    pub fn configure(&mut self, filters: impl IntoIterator<Item = FilterConfig>) -> usize {
        let mut registered = 0;
        for filter in filters {
            if !filter.enabled {
                continue;
            }

            for key in filter.unknown_properties() {
                let err = Error::new("ignored unknown property")
                    .with_context("filter", &filter.name)
                    .with_context("property", key);
                self.trap().trap(&err);
            }

            let result = filter
                .build_sink()
                .and_then(|sink| self.add_sink(filter.name.clone(), filter.level, sink));
            match result {
                Ok(_) => registered += 1,
                Err(err) => {
                    let err = Error::new("skipped filter")
                        .with_context("filter", &filter.name)
                        .with_source(err);
                    self.trap().trap(&err);
                }
            }
        }
        registered
    }
}

/// Parse a byte size with an optional `K`, `M` or `G` suffix in powers of 1024.
///
/// ```
/// assert_eq!(logroute::config::parse_size("10M").unwrap(), 10 * 1024 * 1024);
/// assert_eq!(logroute::config::parse_size("512").unwrap(), 512);
/// ```
pub fn parse_size(s: &str) -> Result<usize, Error> {
    parse_with_suffix(s, 1024)
}

/// Parse a count with an optional `K`, `M` or `G` suffix in powers of 1000.
///
/// ```
/// assert_eq!(logroute::config::parse_count("6K").unwrap(), 6000);
/// ```
pub fn parse_count(s: &str) -> Result<usize, Error> {
    parse_with_suffix(s, 1000)
}

fn parse_with_suffix(s: &str, base: usize) -> Result<usize, Error> {
    let s = s.trim();
    let (digits, exp) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1),
        Some((i, 'm' | 'M')) => (&s[..i], 2),
        Some((i, 'g' | 'G')) => (&s[..i], 3),
        _ => (s, 0),
    };

    let n: usize = digits
        .parse()
        .map_err(|err| Error::new(format!("malformed number: {s:?}")).with_source(err))?;
    base.checked_pow(exp)
        .and_then(|scale| n.checked_mul(scale))
        .ok_or_else(|| Error::new(format!("number out of range: {s:?}")))
}

fn parse_bool(s: &str) -> Result<bool, Error> {
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::new(format!("malformed bool: {s:?}")))
    }
}
