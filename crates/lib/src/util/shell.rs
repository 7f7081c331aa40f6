//! Quoting for values embedded in generated `sh` scripts.

use std::borrow::Cow;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot quote {0:?} for the shell: it contains a NUL byte")]
pub struct QuoteError(pub String);

/// Quote `value` as a single `sh` word.
///
/// Values made only of shell-safe characters are returned unchanged.
pub fn quote(value: &str) -> Result<Cow<'_, str>, QuoteError> {
  shlex::try_quote(value).map_err(|_| QuoteError(value.to_string()))
}
