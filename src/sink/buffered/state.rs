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

use std::sync::Mutex;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;

use crate::Error;
use crate::sink::buffered::Overflow;
use crate::sink::buffered::Task;

/// The producer half of an async sink; `None` once closed.
#[derive(Debug)]
pub(crate) struct AsyncState(Mutex<Option<State>>);

#[derive(Debug)]
struct State {
    sender: Sender<Task>,
    handle: JoinHandle<()>,
}

impl AsyncState {
    pub(crate) fn new(sender: Sender<Task>, handle: JoinHandle<()>) -> Self {
        Self(Mutex::new(Some(State { sender, handle })))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Enqueue a task, honoring the overflow policy.
    ///
    /// Returns `Ok(false)` if the task was dropped because the queue is full.
    pub(crate) fn send_task(&self, task: Task, overflow: Overflow) -> Result<bool, Error> {
        // never hold the lock across a blocking send
        let sender = match self.lock().as_ref() {
            Some(state) => state.sender.clone(),
            None => return Err(Error::new(closed_message(&task))),
        };

        match overflow {
            Overflow::Block => sender
                .send(task)
                .map(|()| true)
                .map_err(|err| Error::new(closed_message(&err.0))),
            Overflow::DropIncoming => match sender.try_send(task) {
                Ok(()) => Ok(true),
                Err(TrySendError::Full(_)) => Ok(false),
                Err(TrySendError::Disconnected(task)) => Err(Error::new(closed_message(&task))),
            },
        }
    }

    /// Stop accepting tasks, wait for the worker to drain the queue and join it.
    pub(crate) fn close(&self) -> Result<(), Error> {
        let Some(State { sender, handle }) = self.lock().take() else {
            return Ok(());
        };

        // drop our sender, the worker breaks its loop once every queued task is processed
        drop(sender);

        handle
            .join()
            .map_err(|_| Error::new("async sink worker thread panicked"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<State>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn closed_message(task: &Task) -> &'static str {
    match task {
        Task::Log(_) => "failed to send log record to closed async sink",
        Task::Flush => "failed to send flush to closed async sink",
    }
}
