//! Interactive value source on the terminal
//!
//! Uses rustyline so the default is pre-filled and can be edited in place.
//! Validation is shared with the scripted source in boardid-core.

use boardid_core::source::{check_text, parse_selection};
use boardid_core::{Error, Result, Substitutions, ValidationError, ValueSource};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Prompts the operator on the controlling terminal
pub struct TerminalSource {
    editor: DefaultEditor,
}

impl TerminalSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| Error::Io(std::io::Error::other(e)))?;
        Ok(Self { editor })
    }

    fn ask(&mut self, prompt: &str, initial: &str) -> Result<String> {
        match self.editor.readline_with_initial(prompt, (initial, "")) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Err(Error::InputClosed),
            Err(ReadlineError::Io(e)) => Err(Error::Io(e)),
            Err(e) => Err(Error::Io(std::io::Error::other(e))),
        }
    }
}

/// Editable text offered for a field whose answer gets `prefix` prepended
fn initial_text<'a>(default: &'a str, prefix: &str) -> &'a str {
    default.strip_prefix(prefix).unwrap_or("")
}

impl ValueSource for TerminalSource {
    fn select_one(&mut self, options: &[String], label: &str, default: usize) -> Result<usize> {
        println!("{}:", label);
        for (i, option) in options.iter().enumerate() {
            println!("  {}: {}", i, option);
        }
        loop {
            let answer = self.ask("Select: ", &default.to_string())?;
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
        let prompt = format!("{} (max {}): {}", label, max_width, prefix);
        loop {
            let answer = self.ask(&prompt, initial_text(default, prefix))?;
            match check_text(&answer, max_width, default, prefix, substitutions) {
                Ok(value) => return Ok(value),
                Err(e) => self.reject(&e),
            }
        }
    }

    fn reject(&mut self, reason: &ValidationError) {
        eprintln!("Invalid: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_text_strips_prefix() {
        assert_eq!(initial_text("SN1234", "SN"), "1234");
        assert_eq!(initial_text("X1234", "SN"), "");
        assert_eq!(initial_text("2024-01", ""), "2024-01");
    }
}
