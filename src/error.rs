//! Error types shared by the compiler, the executor and the `Machine` session.
//!
//! Compile diagnostics keep the caret style: the expression is echoed in quotes
//! and a marker points at the offending byte.

use snafu::Snafu;

use crate::registry::OperationKind;
use crate::stack::StackFlags;

pub type CompileResult<T> = Result<T, CompileError>;
pub type ExecResult<T> = Result<T, ExecError>;

/// Fieldless mirror of [`CompileError`] for cheap matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
  InputEmpty,
  UnexpectedCharacter,
  UnknownOperation,
  UnknownVariable,
  TooFewArguments,
  TooManyArguments,
  PipelineFull,
}

/// The single error reported by a failed compile. The first failure wins.
///
/// `position` is a byte offset into the source; `found` is the character at
/// that offset, or `None` at end of input.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CompileError {
  #[snafu(display("empty formula input"))]
  InputEmpty {},

  #[snafu(display("unexpected {}", describe(*found)))]
  UnexpectedCharacter { position: usize, found: Option<char> },

  #[snafu(display("unknown operation starting with {}", describe(*found)))]
  UnknownOperation { position: usize, found: Option<char> },

  #[snafu(display("unknown variable {}", describe(*found)))]
  UnknownVariable { position: usize, found: Option<char> },

  #[snafu(display("too few arguments, stopped at {}", describe(*found)))]
  TooFewArguments { position: usize, found: Option<char> },

  #[snafu(display("too many arguments, stopped at {}", describe(*found)))]
  TooManyArguments { position: usize, found: Option<char> },

  #[snafu(display("pipeline full, last visited {}", describe(*found)))]
  PipelineFull { position: usize, found: Option<char> },
}

impl CompileError {
  pub fn kind(&self) -> CompileErrorKind {
    match self {
      Self::InputEmpty {} => CompileErrorKind::InputEmpty,
      Self::UnexpectedCharacter { .. } => CompileErrorKind::UnexpectedCharacter,
      Self::UnknownOperation { .. } => CompileErrorKind::UnknownOperation,
      Self::UnknownVariable { .. } => CompileErrorKind::UnknownVariable,
      Self::TooFewArguments { .. } => CompileErrorKind::TooFewArguments,
      Self::TooManyArguments { .. } => CompileErrorKind::TooManyArguments,
      Self::PipelineFull { .. } => CompileErrorKind::PipelineFull,
    }
  }

  /// Byte offset the error is anchored at. `InputEmpty` always reports 0.
  pub fn position(&self) -> usize {
    match self {
      Self::InputEmpty {} => 0,
      Self::UnexpectedCharacter { position, .. }
      | Self::UnknownOperation { position, .. }
      | Self::UnknownVariable { position, .. }
      | Self::TooFewArguments { position, .. }
      | Self::TooManyArguments { position, .. }
      | Self::PipelineFull { position, .. } => *position,
    }
  }

  pub fn found(&self) -> Option<char> {
    match self {
      Self::InputEmpty {} => None,
      Self::UnexpectedCharacter { found, .. }
      | Self::UnknownOperation { found, .. }
      | Self::UnknownVariable { found, .. }
      | Self::TooFewArguments { found, .. }
      | Self::TooManyArguments { found, .. }
      | Self::PipelineFull { found, .. } => *found,
    }
  }

  /// Render the error against the source it came from, pointing at the
  /// offending byte with a caret.
  pub fn render(&self, source: &str) -> String {
    let expr_line = format!("'{source}'");
    let safe_loc = self.position().min(source.len());
    let prefix = source.get(..safe_loc).unwrap_or(source);
    let char_offset = prefix.chars().count() + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    format!("{expr_line}\n{marker} {self}")
  }
}

fn describe(found: Option<char>) -> String {
  match found {
    Some(c) => format!("'{c}'"),
    None => "end of input".to_string(),
  }
}

/// Faults that stop an execution run. Stack overflow and underflow are not
/// faults; they accumulate in [`StackFlags`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ExecError {
  #[snafu(display("arithmetic fault in `{operation}` at step {step}"))]
  ArithmeticFault { operation: OperationKind, step: usize },

  #[snafu(display(
    "variable index {index} at step {step} is out of range for {available} bindings"
  ))]
  IndexFault {
    index: u8,
    step: usize,
    available: usize,
  },

  #[snafu(display("pipeline failed verification: {flags}"))]
  StackFault { flags: StackFlags },

  #[snafu(display("pipeline leaves {depth} values for the final pop, expected 1"))]
  UnbalancedStack { depth: usize },

  #[snafu(display(
    "stack capacity {available} is below the {verified} the pipeline was verified against"
  ))]
  CapacityMismatch { verified: usize, available: usize },
}

/// Crate-level error returned by [`crate::Machine::evaluate`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display("compile error: {source}"))]
  Compile { source: CompileError },

  #[snafu(display("execution error: {source}"))]
  Execute { source: ExecError },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn render_points_at_offending_byte() {
    let err = CompileError::UnknownVariable {
      position: 2,
      found: Some('q'),
    };
    assert_eq!(err.render("1+q"), "'1+q'\n   ^ unknown variable 'q'");
  }

  #[test]
  fn render_clamps_position_past_end() {
    let err = CompileError::UnexpectedCharacter {
      position: 10,
      found: None,
    };
    assert_eq!(err.render("(1"), "'(1'\n   ^ unexpected end of input");
  }

  #[test]
  fn input_empty_reports_position_zero() {
    let err = CompileError::InputEmpty {};
    assert_eq!(err.kind(), CompileErrorKind::InputEmpty);
    assert_eq!(err.position(), 0);
    assert_eq!(err.found(), None);
  }
}
