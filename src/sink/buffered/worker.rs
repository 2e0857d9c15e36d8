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

use crossbeam_channel::Receiver;

use crate::Error;
use crate::Trap;
use crate::format::FormatEngine;
use crate::sink::buffered::Task;

pub(crate) struct Worker {
    receiver: Receiver<Task>,
    writer: Box<dyn Write + Send>,
    template: String,
    engine: Arc<FormatEngine>,
    trap: Arc<dyn Trap>,
}

impl Worker {
    pub(crate) fn new(
        receiver: Receiver<Task>,
        writer: Box<dyn Write + Send>,
        template: String,
        engine: Arc<FormatEngine>,
        trap: Arc<dyn Trap>,
    ) -> Self {
        Self {
            receiver,
            writer,
            template,
            engine,
            trap,
        }
    }

    pub(crate) fn run(self) {
        let Self {
            receiver,
            mut writer,
            template,
            engine,
            trap,
        } = self;

        let mut line = String::new();
        while let Ok(task) = receiver.recv() {
            match task {
                Task::Log(record) => {
                    line.clear();
                    engine.render_into(&template, &record, &mut line);
                    if let Err(err) = writer.write_all(line.as_bytes()) {
                        let err = Error::new("failed to write record").with_source(err);
                        trap.trap(&err);
                    }
                }
                Task::Flush => {
                    if let Err(err) = writer.flush() {
                        let err = Error::new("failed to flush").with_source(err);
                        trap.trap(&err);
                    }
                }
            }
        }

        if let Err(err) = writer.flush() {
            let err = Error::new("failed to flush on close").with_source(err);
            trap.trap(&err);
        }
    }
}
