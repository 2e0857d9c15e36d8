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

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use jiff::civil::Date;

/// The highest numbered backup `name.999`.
pub(crate) const MAX_BACKUPS: u16 = 999;

/// Triggers deciding when the current log file is archived and reopened.
///
/// A zero limit disables the corresponding trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RotationPolicy {
    /// Rotate once this many records have been written since the file was opened.
    pub(crate) max_lines: usize,
    /// Rotate once this many bytes have been written since the file was opened.
    pub(crate) max_bytes: usize,
    /// Rotate when a record is written on another calendar day than the file was opened.
    pub(crate) daily: bool,
    /// Keep the previous file as a numbered backup `name.NNN` instead of appending to it.
    pub(crate) archive: bool,
}

impl RotationPolicy {
    pub(crate) fn should_rotate(&self, counters: &Counters, today: Date) -> bool {
        (self.max_lines > 0 && counters.lines >= self.max_lines)
            || (self.max_bytes > 0 && counters.bytes >= self.max_bytes)
            || (self.daily && today != counters.opened_on)
    }
}

/// Bookkeeping of the currently open file; reset on every (re)open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) lines: usize,
    pub(crate) bytes: usize,
    pub(crate) opened_on: Date,
}

impl Counters {
    pub(crate) fn new(opened_on: Date) -> Self {
        Self {
            lines: 0,
            bytes: 0,
            opened_on,
        }
    }

    pub(crate) fn record_write(&mut self, n: usize) {
        self.lines += 1;
        self.bytes += n;
    }
}

/// The path of the `num`-th backup of `path`, i.e. `path.NNN`.
pub(crate) fn backup_path(path: &Path, num: u16) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{num:03}"));
    PathBuf::from(name)
}

/// The first unused backup path, probing `path.001` up to `path.999`.
///
/// Returns `None` once every number is taken.
pub(crate) fn next_backup_path(path: &Path) -> Option<PathBuf> {
    (1..=MAX_BACKUPS)
        .map(|num| backup_path(path, num))
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
}
