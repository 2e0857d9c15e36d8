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

//! Sinks writing records to rotating files.
//!
//! Both sinks share the same rotation state machine: before every write the enabled triggers
//! (record count, byte count, calendar day) are checked against the counters of the current
//! file; when one fires, the file is closed, optionally archived as `name.001`, `name.002`,
//! ... (up to `name.999`), and reopened.
//!
//! # Example
//!
//! ```
//! use logroute::Dispatcher;
//! use logroute::record::Level;
//! use logroute::sink::FileBuilder;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let file = FileBuilder::new(dir.path().join("app.log"))
//!     .archive(true)
//!     .max_size(10 * 1024 * 1024)
//!     .daily(true)
//!     .build()
//!     .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_sink("file", Level::Info, file).unwrap();
//! dispatcher.info("This log will be written to a rotating file.");
//! ```

pub use self::append::FileBuilder;
pub use self::append::RotatingFile;
pub use self::xml::XmlFile;
pub use self::xml::XmlFileBuilder;

mod append;
mod clock;
mod rotation;
mod writer;
mod xml;
