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

use std::sync::LazyLock;
use std::sync::OnceLock;

use crate::Dispatcher;

static DEFAULT_DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
static NOP_DISPATCHER: LazyLock<Dispatcher> = LazyLock::new(Dispatcher::new);

/// Return the default dispatcher, or an empty one if none has been installed.
pub fn default_dispatcher() -> &'static Dispatcher {
    DEFAULT_DISPATCHER.get().unwrap_or(&NOP_DISPATCHER)
}

/// Install the process-wide default dispatcher.
///
/// This should be called early in the execution of a program, after every sink has been
/// registered. Any log events that occur before installation are ignored.
///
/// # Errors
///
/// Return the given dispatcher back if a default dispatcher has already been installed.
///
/// # Examples
///
/// ```
/// use logroute::Dispatcher;
/// use logroute::record::Level;
///
/// if logroute::set_default_dispatcher(Dispatcher::console(Level::Info)).is_err() {
///     eprintln!("default dispatcher already installed");
/// }
/// logroute::default_dispatcher().info("hello");
/// ```
pub fn set_default_dispatcher(dispatcher: Dispatcher) -> Result<(), Dispatcher> {
    DEFAULT_DISPATCHER.set(dispatcher)
}
