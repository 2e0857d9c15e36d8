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

//! Logroute is a level-filtered fan-out logging core.
//!
//! # Overview
//!
//! A [`Dispatcher`] owns named sinks, each guarded by a severity threshold. Every log call
//! builds one [`LogRecord`](record::LogRecord) and hands it to each sink whose threshold
//! admits its level. Sinks cover the console, rotating text files, rotating XML documents,
//! TCP / UDP sockets and a buffered writer drained on a dedicated thread.
//!
//! # Examples
//!
//! Simple setup with a console sink:
//!
//! ```
//! use logroute::Dispatcher;
//! use logroute::record::Level;
//!
//! let dispatcher = Dispatcher::console(Level::Info);
//! dispatcher.info("This is an info message.");
//! ```
//!
//! Multiple sinks with their own thresholds:
//!
//! ```
//! use logroute::Dispatcher;
//! use logroute::format::FORMAT_SHORT;
//! use logroute::record::Level;
//! use logroute::sink::Console;
//! use logroute::sink::FileBuilder;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let file = FileBuilder::new(dir.path().join("app.log"))
//!     .format(FORMAT_SHORT)
//!     .archive(true)
//!     .max_lines(10_000)
//!     .build()
//!     .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_sink("stdout", Level::Error, Console::default()).unwrap();
//! dispatcher.add_sink("file", Level::Debug, file).unwrap();
//!
//! dispatcher.error("Error message.");
//! dispatcher.debug(format_args!("{} bytes read", 42));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod format;
pub mod record;
pub mod sink;
pub mod trap;

#[cfg(feature = "bridge-log")]
pub mod bridge;

mod error;
pub use self::error::Error;

mod logger;
pub use self::logger::*;

pub use self::format::FormatEngine;
pub use self::sink::Sink;
pub use self::trap::Trap;
