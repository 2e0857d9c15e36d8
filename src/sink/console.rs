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

use std::io::Write;
use std::sync::Arc;

use crate::Error;
use crate::format::FormatEngine;
use crate::record::LogRecord;
use crate::sink::Sink;

/// A sink that prints log records to stdout.
///
/// Output format, the source is not printed:
///
/// ```text
/// [08/10/24 17:12:52] [CRIT] Hello critical!
/// [08/10/24 17:12:52] [INFO] Hello info!
/// ```
#[derive(Debug)]
pub struct Console {
    engine: Arc<FormatEngine>,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            engine: FormatEngine::shared(),
        }
    }
}

impl Console {
    /// Render timestamps with the given engine instead of the shared one.
    pub fn with_engine(mut self, engine: Arc<FormatEngine>) -> Self {
        self.engine = engine;
        self
    }

    fn format(&self, record: &LogRecord) -> String {
        let time = self.engine.strftime(record.created(), "%m/%d/%y %H:%M:%S");
        let level = record.level().mnemonic();
        let message = record.message();
        format!("[{time}] [{level}] {message}\n")
    }
}

impl Sink for Console {
    fn write(&self, record: &LogRecord) -> Result<usize, Error> {
        let line = self.format(record);
        std::io::stdout()
            .write_all(line.as_bytes())
            .map_err(Error::from_io_error)?;
        Ok(line.len())
    }

    fn healthy(&self) -> bool {
        true
    }

    fn close(&self) {}

    fn flush(&self) -> Result<(), Error> {
        std::io::stdout().flush().map_err(Error::from_io_error)
    }
}
