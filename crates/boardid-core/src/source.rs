//! Operator-supplied field values
//!
//! A `ValueSource` is asked for one value at a time: a selection from a
//! list, or a width-limited text field. Implementations must re-ask until
//! the answer passes validation, so nothing malformed reaches the codec.
//! The pure checks live here so every source shares them.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::error::{Error, Result};

/// Exact-match replacements applied to text input (e.g. `today`)
pub type Substitutions = HashMap<String, String>;

/// Reasons operator input is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is not a number
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// More than one value where one is expected
    #[error("select exactly one option")]
    MultipleSelections,

    /// Selection index outside the option list
    #[error("{value} is out of range (0..{count})")]
    OutOfRange {
        /// Selected index
        value: usize,
        /// Number of options
        count: usize,
    },

    /// There are no options to select from
    #[error("nothing to select from")]
    NoOptions,

    /// Text longer than the field allows
    #[error("{len} characters is too long (maximum {max})")]
    TooLong {
        /// Length including any prefix
        len: usize,
        /// Field width
        max: usize,
    },

    /// Text contains characters the device format cannot store
    #[error("only plain ASCII characters are allowed")]
    NotAscii,

    /// Revision is not `major[.minor]` with components 0..=15
    #[error("'{0}' is not a revision (expected major.minor, each 0-15)")]
    BadRevision(String),
}

/// Validate a selection answer against `count` options
///
/// Empty input selects `default`.
pub fn parse_selection(input: &str, count: usize, default: usize) -> std::result::Result<usize, ValidationError> {
    if count == 0 {
        return Err(ValidationError::NoOptions);
    }

    let mut words = input.split(|c: char| c.is_whitespace() || c == ',').filter(|w| !w.is_empty());
    let value = match (words.next(), words.next()) {
        (None, _) => default,
        (Some(_), Some(_)) => return Err(ValidationError::MultipleSelections),
        (Some(word), None) => word
            .parse()
            .map_err(|_| ValidationError::NotANumber(word.to_string()))?,
    };

    if value >= count {
        return Err(ValidationError::OutOfRange { value, count });
    }
    Ok(value)
}

/// Validate a text answer
///
/// Empty input keeps `default` unchanged. Otherwise the input is looked up
/// in `substitutions`, `prefix` is prepended, and the result must be ASCII
/// and at most `max_width` characters long.
pub fn check_text(
    input: &str,
    max_width: usize,
    default: &str,
    prefix: &str,
    substitutions: &Substitutions,
) -> std::result::Result<String, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default.to_string());
    }

    let value = substitutions.get(input).map(String::as_str).unwrap_or(input);
    let value = format!("{}{}", prefix, value);

    if !value.is_ascii() {
        return Err(ValidationError::NotAscii);
    }
    if value.len() > max_width {
        return Err(ValidationError::TooLong {
            len: value.len(),
            max: max_width,
        });
    }
    Ok(value)
}

/// Where field values come from
pub trait ValueSource {
    /// Pick one of `options`; must return an index below `options.len()`
    fn select_one(&mut self, options: &[String], label: &str, default: usize) -> Result<usize>;

    /// Get a text value of at most `max_width` characters
    ///
    /// `prefix` is prepended to the operator's answer and counts against
    /// `max_width`; `substitutions` replaces exact-match answers.
    fn get_text(
        &mut self,
        label: &str,
        max_width: usize,
        default: &str,
        prefix: &str,
        substitutions: &Substitutions,
    ) -> Result<String>;

    /// Tell the operator an answer was not accepted
    fn reject(&mut self, _reason: &ValidationError) {}
}

/// Line-oriented prompt loop over any reader/writer pair
///
/// Used for scripted provisioning (answers from a file or pipe) and in
/// tests. Every rejected answer is reported and the question repeated;
/// running out of input is an error.
pub struct LineSource<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineSource<R, W> {
    /// Create a source reading answers from `input` and prompting on `output`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the source, returning the prompt output
    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: BufRead, W: Write> ValueSource for LineSource<R, W> {
    fn select_one(&mut self, options: &[String], label: &str, default: usize) -> Result<usize> {
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}: {}", i, option)?;
        }
        loop {
            let answer = self.ask(&format!("{} [{}]: ", label, default))?;
            match parse_selection(&answer, options.len(), default) {
                Ok(index) => return Ok(index),
                Err(ValidationError::NoOptions) => return Err(ValidationError::NoOptions.into()),
                Err(e) => self.reject(&e),
            }
        }
    }

    fn get_text(
        &mut self,
        label: &str,
        max_width: usize,
        default: &str,
        prefix: &str,
        substitutions: &Substitutions,
    ) -> Result<String> {
        loop {
            let answer = self.ask(&format!("{} [{}]: {}", label, default, prefix))?;
            match check_text(&answer, max_width, default, prefix, substitutions) {
                Ok(value) => return Ok(value),
                Err(e) => self.reject(&e),
            }
        }
    }

    fn reject(&mut self, reason: &ValidationError) {
        // Prompt output is best-effort; a broken pipe shows up on the next read
        let _ = writeln!(self.output, "Invalid: {}", reason);
    }
}
