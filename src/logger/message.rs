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

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;

/// The body of a log call, rendered only once at least one sink admits the record.
///
/// # Examples
///
/// ```
/// use logroute::Dispatcher;
/// use logroute::Message;
///
/// let dispatcher = Dispatcher::new();
/// let user = "alice";
///
/// dispatcher.info("plain text");
/// dispatcher.info(format_args!("user {user} logged in"));
/// dispatcher.info(Message::lazy(expensive_summary));
/// dispatcher.info(Message::values(&[&"retry", &3, &true]));
/// # fn expensive_summary() -> String { String::new() }
/// ```
pub enum Message<'a> {
    /// Ready text.
    Text(Cow<'a, str>),
    /// Format arguments, usually from [`format_args!`].
    Args(fmt::Arguments<'a>),
    /// A deferred computation.
    Lazy(Box<dyn FnOnce() -> String + 'a>),
    /// Displayable values, joined by a single space.
    Values(&'a [&'a dyn fmt::Display]),
}

impl<'a> Message<'a> {
    /// Defer building the text until a sink admits the record.
    pub fn lazy(f: impl FnOnce() -> String + 'a) -> Self {
        Message::Lazy(Box::new(f))
    }

    /// Space-join the display forms of `values`.
    pub fn values(values: &'a [&'a dyn fmt::Display]) -> Self {
        Message::Values(values)
    }

    /// Produce the text, running a deferred computation if any.
    pub fn render(self) -> String {
        match self {
            Message::Text(text) => text.into_owned(),
            Message::Args(args) => match args.as_str() {
                Some(s) => s.to_string(),
                None => fmt::format(args),
            },
            Message::Lazy(f) => f(),
            Message::Values(values) => {
                let mut out = String::new();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    // writing into a String never fails
                    let _ = write!(out, "{value}");
                }
                out
            }
        }
    }
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Message::Args(args) => f.debug_tuple("Args").field(args).finish(),
            Message::Lazy(_) => f.write_str("Lazy(..)"),
            Message::Values(values) => f.debug_tuple("Values").field(&values.len()).finish(),
        }
    }
}

impl<'a> From<&'a str> for Message<'a> {
    fn from(text: &'a str) -> Self {
        Message::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Message<'_> {
    fn from(text: String) -> Self {
        Message::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a String> for Message<'a> {
    fn from(text: &'a String) -> Self {
        Message::Text(Cow::Borrowed(text.as_str()))
    }
}

impl<'a> From<Cow<'a, str>> for Message<'a> {
    fn from(text: Cow<'a, str>) -> Self {
        Message::Text(text)
    }
}

impl<'a> From<fmt::Arguments<'a>> for Message<'a> {
    fn from(args: fmt::Arguments<'a>) -> Self {
        Message::Args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_variants() {
        let n = 3;
        assert_eq!(Message::from("text").render(), "text");
        assert_eq!(Message::from(String::from("owned")).render(), "owned");
        assert_eq!(Message::from(format_args!("n = {n}")).render(), "n = 3");
        assert_eq!(Message::lazy(|| "deferred".to_string()).render(), "deferred");
        assert_eq!(
            Message::values(&[&"retry", &n, &true, &1.5]).render(),
            "retry 3 true 1.5"
        );
        assert_eq!(Message::values(&[]).render(), "");
    }
}
