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

//! Output destinations for log records.

use std::fmt;

use crate::Error;
use crate::record::LogRecord;

pub mod buffered;
mod console;
pub mod file;
pub mod socket;

pub use self::buffered::AsyncBuffered;
pub use self::buffered::AsyncBuilder;
pub use self::buffered::Overflow;
pub use self::console::Console;
pub use self::file::FileBuilder;
pub use self::file::RotatingFile;
pub use self::file::XmlFile;
pub use self::file::XmlFileBuilder;
pub use self::socket::Protocol;
pub use self::socket::SocketBuilder;
pub use self::socket::SocketSink;

/// A destination for log records.
///
/// A sink is shared between callers, so every method takes `&self`; sinks that own mutable
/// state guard it internally.
pub trait Sink: fmt::Debug + Send + Sync + 'static {
    /// Write one record, returning the number of bytes emitted.
    fn write(&self, record: &LogRecord) -> Result<usize, Error>;

    /// Whether the sink can accept a record right now.
    ///
    /// The dispatcher skips unhealthy sinks.
    fn healthy(&self) -> bool;

    /// Release the underlying resources.
    ///
    /// Closing an already closed sink is a no-op.
    fn close(&self);

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Sink> From<T> for Box<dyn Sink> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
