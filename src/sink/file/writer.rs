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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::format::FormatEngine;
use crate::sink::file::clock::Clock;
use crate::sink::file::rotation::Counters;
use crate::sink::file::rotation::RotationPolicy;
use crate::sink::file::rotation::next_backup_path;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// What is written around the records of every file.
#[derive(Debug)]
pub(crate) enum Framing {
    /// Records only.
    Plain,
    /// A `<log created="...">` root element opened after each open and closed before each
    /// close, so that every rotated-away file is a complete XML document.
    XmlDocument(Arc<FormatEngine>),
}

/// A builder for configuring [`RotatingWriter`].
#[derive(Debug)]
pub(crate) struct RotatingWriterBuilder {
    // required
    path: PathBuf,

    // has default
    policy: RotationPolicy,
    framing: Framing,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl RotatingWriterBuilder {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: RotationPolicy::default(),
            framing: Framing::Plain,
            clock: Clock::DefaultClock,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    pub(crate) fn policy(&mut self) -> &mut RotationPolicy {
        &mut self.policy
    }

    pub(crate) fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub(crate) fn trap(mut self, trap: Box<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    #[cfg(test)]
    pub(crate) fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Open the target file, archiving a previous one if configured.
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The path has no file name.
    /// * The parent directory cannot be created.
    /// * The file cannot be opened.
    pub(crate) fn build(self) -> Result<RotatingWriter, Error> {
        let Self {
            path,
            policy,
            framing,
            clock,
            trap,
        } = self;

        if path.file_name().is_none() {
            return Err(Error::new("log filename must not be empty")
                .with_context("path", path.display()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("path", parent.display())
                    .with_source(err)
            })?;
        }

        let counters = Counters::new(clock.today());
        let mut writer = RotatingWriter {
            path,
            policy,
            framing,
            clock,
            trap,
            file: None,
            counters,
        };
        writer.reopen()?;
        Ok(writer)
    }
}

/// A file writer that archives and reopens its target according to a [`RotationPolicy`].
///
/// The writer is either open, carrying the counters of the current file, or closed. Closed
/// writers reject writes until a successful [`RotatingWriter::reopen`].
#[derive(Debug)]
pub(crate) struct RotatingWriter {
    path: PathBuf,
    policy: RotationPolicy,
    framing: Framing,
    clock: Clock,
    trap: Box<dyn Trap>,
    file: Option<File>,
    counters: Counters,
}

impl Drop for RotatingWriter {
    fn drop(&mut self) {
        self.close();
    }
}

impl RotatingWriter {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Write one rendered record, rotating first if a trigger fires.
    pub(crate) fn write_record(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if self.is_open() && self.policy.should_rotate(&self.counters, self.clock.today()) {
            self.reopen()
                .map_err(|err| Error::new("failed to rotate log file").with_source(err))?;
        }

        let file = self.file.as_mut().ok_or_else(|| {
            Error::new("log file is not open").with_context("path", self.path.display())
        })?;
        file.write_all(buf).map_err(Error::from_io_error)?;
        self.counters.record_write(buf.len());
        Ok(buf.len())
    }

    /// Close the current file and open the target again.
    ///
    /// On failure the writer stays closed.
    pub(crate) fn reopen(&mut self) -> Result<(), Error> {
        self.close();

        let mut truncate = false;
        if self.policy.archive && fs::symlink_metadata(&self.path).is_ok() {
            match next_backup_path(&self.path) {
                Some(backup) => {
                    if let Err(err) = fs::rename(&self.path, &backup) {
                        let err = Error::new("failed to archive log file")
                            .with_context("from", self.path.display())
                            .with_context("to", backup.display())
                            .with_source(err);
                        self.trap.trap(&err);
                    }
                }
                None => {
                    // every backup number is taken; the current file is overwritten
                    truncate = true;
                }
            }
        }

        let mut file = open_log_file(&self.path, truncate).map_err(|err| {
            Error::new("failed to open log file")
                .with_context("path", self.path.display())
                .with_source(err)
        })?;

        if let Framing::XmlDocument(engine) = &self.framing {
            let created = engine.strftime(self.clock.now().timestamp(), "%Y/%m/%d %H:%M:%S %Z");
            let header = format!("<log created=\"{created}\">\n");
            file.write_all(header.as_bytes()).map_err(|err| {
                Error::new("failed to write log header")
                    .with_context("path", self.path.display())
                    .with_source(err)
            })?;
        }

        self.file = Some(file);
        self.counters = Counters::new(self.clock.today());
        Ok(())
    }

    /// Close the current file, if any. Failures are reported to the trap.
    pub(crate) fn close(&mut self) {
        let Some(mut file) = self.file.take() else {
            return;
        };

        if let Framing::XmlDocument(_) = self.framing {
            if let Err(err) = file.write_all(b"</log>\n") {
                let err = Error::new("failed to write log footer").with_source(err);
                self.trap.trap(&err);
            }
        }
        if let Err(err) = file.flush() {
            let err = Error::new("failed to flush log file on close").with_source(err);
            self.trap.trap(&err);
        }
    }

    pub(crate) fn flush(&mut self) -> Result<(), Error> {
        match self.file.as_mut() {
            Some(file) => file.flush().map_err(Error::from_io_error),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> Counters {
        self.counters
    }

    #[cfg(test)]
    pub(crate) fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

fn open_log_file(path: &Path, truncate: bool) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o660);
    }
    options.open(path)
}
