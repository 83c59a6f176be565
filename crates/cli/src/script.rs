//! Edit scripts replayed by `autosave simulate`
//!
//! One directive per line, offsets in milliseconds from the start of the run:
//! ```text
//! # comment
//! 0    edit hello
//! 120  edit hello world
//! 400  flush
//! 3000 wait
//! ```

use std::time::Duration;
use thiserror::Error;

/// Script parse errors, tagged with the 1-based line number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("line {line}: invalid offset '{value}' (expected milliseconds)")]
    InvalidOffset { line: usize, value: String },

    #[error("line {line}: missing action after offset")]
    MissingAction { line: usize },

    #[error("line {line}: unknown action '{action}' (expected edit, flush or wait)")]
    UnknownAction { line: usize, action: String },

    #[error("line {line}: edit needs the new text")]
    MissingText { line: usize },

    #[error("line {line}: {action} takes no arguments")]
    UnexpectedArgument { line: usize, action: String },

    #[error("line {line}: offset {offset_ms}ms is earlier than the previous directive")]
    OutOfOrder { line: usize, offset_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Report a change carrying the full new text
    Edit(String),
    /// Force the pending save
    Flush,
    /// Do nothing; only keeps the run going until this offset
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub at: Duration,
    pub action: Action,
    pub line: usize,
}

/// Parse a whole script
pub fn parse(input: &str) -> Result<Vec<Directive>, ScriptError> {
    let mut directives = Vec::new();
    let mut previous = 0;

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let (offset, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let offset_ms: u64 = offset.parse().map_err(|_| ScriptError::InvalidOffset {
            line,
            value: offset.to_string(),
        })?;
        if offset_ms < previous {
            return Err(ScriptError::OutOfOrder { line, offset_ms });
        }
        previous = offset_ms;

        let rest = rest.trim_start();
        if rest.is_empty() {
            return Err(ScriptError::MissingAction { line });
        }
        let (name, argument) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let argument = argument.trim();

        let action = match name {
            "edit" if argument.is_empty() => return Err(ScriptError::MissingText { line }),
            "edit" => Action::Edit(argument.to_string()),
            "flush" | "wait" if !argument.is_empty() => {
                return Err(ScriptError::UnexpectedArgument {
                    line,
                    action: name.to_string(),
                })
            }
            "flush" => Action::Flush,
            "wait" => Action::Wait,
            other => {
                return Err(ScriptError::UnknownAction {
                    line,
                    action: other.to_string(),
                })
            }
        };

        directives.push(Directive {
            at: Duration::from_millis(offset_ms),
            action,
            line,
        });
    }

    Ok(directives)
}
