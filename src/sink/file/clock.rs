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

use jiff::Zoned;
use jiff::civil::Date;

/// The source of "now" for the daily rotation trigger.
#[derive(Debug)]
pub(crate) enum Clock {
    DefaultClock,
    #[cfg(test)]
    ManualClock(ManualClock),
}

impl Clock {
    pub(crate) fn now(&self) -> Zoned {
        match self {
            Clock::DefaultClock => Zoned::now(),
            #[cfg(test)]
            Clock::ManualClock(clock) => clock.now(),
        }
    }

    /// The local calendar day of [`Clock::now`].
    pub(crate) fn today(&self) -> Date {
        self.now().date()
    }

    #[cfg(test)]
    pub(crate) fn set_now(&mut self, now: Zoned) {
        if let Clock::ManualClock(clock) = self {
            clock.set_now(now);
        }
    }
}

/// The time could be reset.
#[derive(Debug)]
#[cfg(test)]
pub(crate) struct ManualClock {
    now: Zoned,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(now: Zoned) -> ManualClock {
        ManualClock { now }
    }

    fn now(&self) -> Zoned {
        self.now.clone()
    }

    fn set_now(&mut self, now: Zoned) {
        self.now = now;
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_manual_clock_crosses_midnight() {
        let now = Zoned::from_str("2024-08-10T23:59:59+08[+08]").unwrap();
        let mut clock = Clock::ManualClock(ManualClock::new(now.clone()));
        assert_eq!(clock.now(), now);
        assert_eq!(clock.today(), "2024-08-10".parse::<Date>().unwrap());

        clock.set_now(Zoned::from_str("2024-08-11T00:00:01+08[+08]").unwrap());
        assert_eq!(clock.today(), "2024-08-11".parse::<Date>().unwrap());
    }
}
