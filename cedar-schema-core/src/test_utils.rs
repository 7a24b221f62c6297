/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Assertion helpers for error messages and source locations, shared by the
//! unit tests of this crate and the integration tests of the facade crate.

// PANIC SAFETY: testing code
#![allow(clippy::panic, clippy::unwrap_used)]

/// The message (and optionally help text) an error is expected to have
#[derive(Debug, Clone, Copy)]
pub struct ExpectedErrorMessage<'a> {
    /// Expected contents of `Display`, or expected prefix of `Display` if `prefix` is `true`
    error: &'a str,
    /// Expected contents of `help()`, or `None` if no help, or expected prefix of `help()` if `prefix` is `true`
    help: Option<&'a str>,
    /// If `true`, `error` and `help` are expected prefixes
    prefix: bool,
}

/// Constructors for [`ExpectedErrorMessage`]
#[derive(Debug)]
pub struct ExpectedErrorMessageBuilder;

impl ExpectedErrorMessageBuilder {
    /// Expect the given exact error message and no help text.
    pub fn error(msg: &str) -> ExpectedErrorMessage<'_> {
        ExpectedErrorMessage {
            error: msg,
            help: None,
            prefix: false,
        }
    }

    /// Expect the given exact error message and help text.
    pub fn error_and_help<'a>(error: &'a str, help: &'a str) -> ExpectedErrorMessage<'a> {
        ExpectedErrorMessage {
            error,
            help: Some(help),
            prefix: false,
        }
    }

    /// Expect the error message to start with the given text, and expect no help text.
    pub fn error_starts_with(msg: &str) -> ExpectedErrorMessage<'_> {
        ExpectedErrorMessage {
            error: msg,
            help: None,
            prefix: true,
        }
    }
}

impl ExpectedErrorMessage<'_> {
    /// Does `error` match this expected message? Use [`expect_err()`] to
    /// assert it, for better failure messages.
    pub fn matches(&self, error: &impl miette::Diagnostic) -> bool {
        let e_string = error.to_string();
        let h_string = error.help().map(|h| h.to_string());
        if self.prefix {
            e_string.starts_with(self.error)
                && match (h_string.as_deref(), self.help) {
                    (Some(actual), Some(expected)) => actual.starts_with(expected),
                    (None, None) => true,
                    _ => false,
                }
        } else {
            e_string == self.error && h_string.as_deref() == self.help
        }
    }
}

/// Forms in which [`expect_err()`] accepts the original input
#[derive(Debug, Clone, Copy)]
pub enum OriginalInput<'a> {
    /// Cedar schema text
    Text(&'a str),
    /// Cedar JSON schema
    Json(&'a serde_json::Value),
}

impl<'a> From<&'a str> for OriginalInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a serde_json::Value> for OriginalInput<'a> {
    fn from(value: &'a serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl std::fmt::Display for OriginalInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Json(val) => write!(f, "{}", serde_json::to_string_pretty(val).unwrap()),
        }
    }
}

/// Expect that `err` has the message described by `msg`.
///
/// `src` is the original input, used only in assertion-failure messages.
#[track_caller]
pub fn expect_err<'a>(
    src: impl Into<OriginalInput<'a>>,
    err: &impl miette::Diagnostic,
    msg: &ExpectedErrorMessage<'_>,
) {
    let src = src.into();
    let error = err.to_string();
    let help = err.help().map(|h| h.to_string());
    if msg.prefix {
        assert!(
            error.starts_with(msg.error),
            "for the following input:\n{src}\nactual error did not start with the expected prefix\n  actual error: {error}\n  expected prefix: {}",
            msg.error,
        );
        match (help.as_deref(), msg.help) {
            (Some(actual), Some(expected)) => assert!(
                actual.starts_with(expected),
                "for the following input:\n{src}\nactual help did not start with the expected prefix\n  actual help: {actual}\n  expected help: {expected}",
            ),
            (None, None) => (),
            (Some(actual), None) => {
                panic!("for the following input:\n{src}\ndid not expect a help message, but found one: {actual}")
            }
            (None, Some(expected)) => {
                panic!("for the following input:\n{src}\ndid not find a help message, but expected one: {expected}")
            }
        }
    } else {
        assert_eq!(
            &error, msg.error,
            "for the following input:\n{src}\nactual error did not match expected",
        );
        assert_eq!(
            help.as_deref(),
            msg.help,
            "for the following input:\n{src}\nactual help did not match expected",
        );
    }
}

/// Expect that `err` has exactly one source location, covering `snippet`
/// of `src`.
#[track_caller]
// PANIC SAFETY: testing
#[allow(clippy::indexing_slicing)]
pub fn expect_source_snippet(
    src: impl AsRef<str>,
    err: &impl miette::Diagnostic,
    snippet: impl AsRef<str>,
) {
    use itertools::Itertools;
    let src = src.as_ref();
    let snippet = snippet.as_ref();
    let labels = err.labels().unwrap_or_else(|| {
        panic!("for the following input:\n{src}\ndid not find a source location, but expected one")
    });
    let label = labels.exactly_one().unwrap_or_else(|labels| {
        panic!(
            "for the following input:\n{src}\nexpected exactly one source location, but found {}",
            labels.count(),
        )
    });
    let actual_snippet = {
        let span = label.inner();
        &src[span.offset()..span.offset() + span.len()]
    };
    assert_eq!(
        actual_snippet, snippet,
        "for the following input:\n{src}\nexpected source snippet to be:\n  {snippet}\nbut it was:\n  {actual_snippet}\n",
    );
}
