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

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::Trap;
use crate::format::FormatEngine;
use crate::record::LogRecord;
use crate::sink::Sink;
use crate::sink::file::writer::Framing;
use crate::sink::file::writer::RotatingWriter;
use crate::sink::file::writer::RotatingWriterBuilder;

// Markup characters in the fields are written as is.
const XML_RECORD: &str = "\t<record level=\"%L\">\n\t\t<timestamp>%D %T</timestamp>\n\t\t<source>%S</source>\n\t\t<message>%M</message>\n\t</record>";

/// A builder to configure and create an [`XmlFile`] sink.
#[derive(Debug)]
pub struct XmlFileBuilder {
    builder: RotatingWriterBuilder,
    engine: Arc<FormatEngine>,
}

impl XmlFileBuilder {
    /// Create a new XML sink builder writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            builder: RotatingWriterBuilder::new(path),
            engine: FormatEngine::shared(),
        }
    }

    /// Build the [`XmlFile`] sink, opening the target file and writing the root element.
    ///
    /// # Errors
    ///
    /// Return an error if the log directory cannot be created or the target cannot be opened.
    pub fn build(self) -> Result<XmlFile, Error> {
        let XmlFileBuilder { builder, engine } = self;
        let writer = builder
            .framing(Framing::XmlDocument(engine.clone()))
            .build()?;
        Ok(XmlFile {
            writer: Mutex::new(writer),
            engine,
        })
    }

    /// Set the engine rendering timestamps.
    ///
    /// Default to [`FormatEngine::shared`].
    pub fn engine(mut self, engine: Arc<FormatEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Keep each finished document as a numbered backup `name.NNN`.
    #[must_use]
    pub fn archive(mut self, archive: bool) -> Self {
        self.builder.policy().archive = archive;
        self
    }

    /// Rotate once `n` records have been written to the current document; `0` disables it.
    #[must_use]
    pub fn max_records(mut self, n: usize) -> Self {
        self.builder.policy().max_lines = n;
        self
    }

    /// Rotate once `n` bytes of records have been written to the current document.
    ///
    /// The root element is not counted.
    #[must_use]
    pub fn max_size(mut self, n: usize) -> Self {
        self.builder.policy().max_bytes = n;
        self
    }

    /// Rotate when the first record of a new local calendar day is written.
    #[must_use]
    pub fn daily(mut self, daily: bool) -> Self {
        self.builder.policy().daily = daily;
        self
    }

    /// Set the trap for errors that cannot be returned to a caller.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.builder = self.builder.trap(trap.into());
        self
    }
}

/// A sink that writes records as children of a `<log>` document.
///
/// ```xml
/// <log created="2024/08/10 17:12:52 UTC">
///     <record level="INFO">
///         <timestamp>2024/08/10 17:12:52 UTC</timestamp>
///         <source>main.rs:7</source>
///         <message>hello</message>
///     </record>
/// </log>
/// ```
///
/// The closing element is written on close, on rotation and on drop.
#[derive(Debug)]
pub struct XmlFile {
    writer: Mutex<RotatingWriter>,
    engine: Arc<FormatEngine>,
}

impl XmlFile {
    /// The path of the current document.
    pub fn path(&self) -> PathBuf {
        self.writer().path().to_path_buf()
    }

    /// Finish the current document and start a new one, regardless of the triggers.
    pub fn rotate(&self) -> Result<(), Error> {
        self.writer().reopen()
    }

    fn writer(&self) -> MutexGuard<'_, RotatingWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for XmlFile {
    fn write(&self, record: &LogRecord) -> Result<usize, Error> {
        let element = self.engine.render(XML_RECORD, record);
        self.writer().write_record(element.as_bytes())
    }

    fn healthy(&self) -> bool {
        self.writer().is_open()
    }

    fn close(&self) {
        self.writer().close();
    }

    fn flush(&self) -> Result<(), Error> {
        self.writer().flush()
    }
}
