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
use crate::format::FORMAT_DEFAULT;
use crate::format::FormatEngine;
use crate::record::LogRecord;
use crate::sink::Sink;
use crate::sink::file::writer::RotatingWriter;
use crate::sink::file::writer::RotatingWriterBuilder;

/// A builder to configure and create a [`RotatingFile`] sink.
#[derive(Debug)]
pub struct FileBuilder {
    builder: RotatingWriterBuilder,
    template: String,
    engine: Arc<FormatEngine>,
}

impl FileBuilder {
    /// Create a new file sink builder writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            builder: RotatingWriterBuilder::new(path),
            template: FORMAT_DEFAULT.to_string(),
            engine: FormatEngine::shared(),
        }
    }

    /// Build the [`RotatingFile`] sink, opening the target file.
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The log directory cannot be created.
    /// * The configured path has no file name.
    /// * The target file cannot be opened.
    pub fn build(self) -> Result<RotatingFile, Error> {
        let FileBuilder {
            builder,
            template,
            engine,
        } = self;
        let writer = builder.build()?;
        Ok(RotatingFile {
            writer: Mutex::new(writer),
            template,
            engine,
        })
    }

    /// Set the template each record is rendered through.
    ///
    /// Default to [`FORMAT_DEFAULT`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logroute::format::FORMAT_SHORT;
    /// use logroute::sink::FileBuilder;
    ///
    /// let builder = FileBuilder::new("logs/app.log").format(FORMAT_SHORT);
    /// ```
    pub fn format(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Set the engine rendering the template.
    ///
    /// Default to [`FormatEngine::shared`].
    pub fn engine(mut self, engine: Arc<FormatEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Keep each replaced file as a numbered backup `name.001`, `name.002`, ...
    ///
    /// When disabled, rotating reopens the same file in append mode. Default to `false`.
    #[must_use]
    pub fn archive(mut self, archive: bool) -> Self {
        self.builder.policy().archive = archive;
        self
    }

    /// Rotate once `n` records have been written to the current file; `0` disables it.
    #[must_use]
    pub fn max_lines(mut self, n: usize) -> Self {
        self.builder.policy().max_lines = n;
        self
    }

    /// Rotate once `n` bytes have been written to the current file; `0` disables it.
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
    ///
    /// Default to [`DefaultTrap`](crate::trap::DefaultTrap).
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.builder = self.builder.trap(trap.into());
        self
    }
}

/// A sink that renders records as lines of text into a rotating file.
#[derive(Debug)]
pub struct RotatingFile {
    writer: Mutex<RotatingWriter>,
    template: String,
    engine: Arc<FormatEngine>,
}

impl RotatingFile {
    /// The path of the current file.
    pub fn path(&self) -> PathBuf {
        self.writer().path().to_path_buf()
    }

    /// Archive the current file and open a new one, regardless of the triggers.
    ///
    /// On failure the sink becomes unhealthy.
    pub fn rotate(&self) -> Result<(), Error> {
        self.writer().reopen()
    }

    fn writer(&self) -> MutexGuard<'_, RotatingWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for RotatingFile {
    fn write(&self, record: &LogRecord) -> Result<usize, Error> {
        let line = self.engine.render(&self.template, record);
        self.writer().write_record(line.as_bytes())
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
