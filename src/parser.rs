//! Recursive-descent compiler emitting pipeline instructions directly.
//!
//! The grammar has three precedence layers:
//!
//! ```text
//! primary    := signed-int | ident | ident '(' args ')' | '(' expression ')'
//! term       := primary (('*' | '/' | '%') primary)*
//! expression := term (('+' | '-') term)*
//! ```
//!
//! Each production emits its operands before its operator, so the pipeline
//! comes out in postfix order and no syntax tree is ever built. The first
//! failure aborts the compile and is returned as-is.

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::error::{CompileError, CompileResult};
use crate::pipeline::{Binding, Instruction, Pipeline};
use crate::registry::{self, OperationDescriptor, OperationKind};

/// Compile the expression under `cursor` into `pipeline`.
///
/// The pipeline is cleared first. Single-letter identifiers resolve against
/// `bindings` by position; the same slice layout must be handed to the
/// executor later. Input left after a complete expression is not an error and
/// stays unread in the cursor.
pub fn compile(
  pipeline: &mut Pipeline,
  cursor: &mut Cursor<'_>,
  bindings: &[Binding],
) -> CompileResult<()> {
  pipeline.clear();

  if cursor.remaining().is_empty() {
    return Err(CompileError::InputEmpty {});
  }

  let mut emitter = Emitter {
    pipeline: &mut *pipeline,
    cursor: &mut *cursor,
    bindings,
  };
  parse_expr(&mut emitter)?;

  debug!(
    instructions = pipeline.len(),
    consumed = cursor.position(),
    "compiled expression"
  );
  Ok(())
}

/// Compile a whole string, returning how many bytes the parser consumed.
pub fn compile_str(
  pipeline: &mut Pipeline,
  source: &str,
  bindings: &[Binding],
) -> CompileResult<usize> {
  let mut cursor = Cursor::new(source);
  compile(pipeline, &mut cursor, bindings)?;
  Ok(cursor.position())
}

/// Parser state threaded through every production.
struct Emitter<'a, 's> {
  pipeline: &'a mut Pipeline,
  cursor: &'a mut Cursor<'s>,
  bindings: &'a [Binding],
}

impl Emitter<'_, '_> {
  /// Position and character of the next token, whitespace skipped.
  fn here(&mut self) -> (usize, Option<char>) {
    let found = self.cursor.peek();
    (self.cursor.position(), found)
  }

  fn unexpected(&mut self) -> CompileError {
    let (position, found) = self.here();
    CompileError::UnexpectedCharacter { position, found }
  }

  fn expect(&mut self, expected: char) -> CompileResult<()> {
    if self.cursor.eat(expected) {
      Ok(())
    } else {
      Err(self.unexpected())
    }
  }

  /// Append an instruction, reporting a full pipeline as a compile error.
  fn emit(&mut self, instruction: Instruction) -> CompileResult<()> {
    self.pipeline.push(instruction);
    if self.pipeline.overflowed() {
      let (position, found) = self.here();
      return Err(CompileError::PipelineFull { position, found });
    }
    trace!(%instruction, index = self.pipeline.len() - 1, "emitted");
    Ok(())
  }
}

fn parse_expr(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  parse_add(e)
}

fn parse_add(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  parse_mul(e)?;

  loop {
    let op = match e.cursor.peek() {
      Some('+') => OperationKind::Add,
      Some('-') => OperationKind::Sub,
      _ => break,
    };

    e.cursor.consume();
    parse_mul(e)?;
    e.emit(Instruction::Operation(op))?;
  }

  Ok(())
}

fn parse_mul(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  parse_primary(e)?;

  loop {
    let op = match e.cursor.peek() {
      Some('*') => OperationKind::Mul,
      Some('/') => OperationKind::Div,
      Some('%') => OperationKind::Mod,
      _ => break,
    };

    e.cursor.consume();
    parse_primary(e)?;
    e.emit(Instruction::Operation(op))?;
  }

  Ok(())
}

fn parse_primary(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  match e.cursor.peek() {
    Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => parse_number(e),
    Some(c) if c.is_ascii_alphabetic() => parse_ident(e),
    Some('(') => {
      e.cursor.consume();
      parse_expr(e)?;
      e.expect(')')
    }
    _ => Err(e.unexpected()),
  }
}

/// Optional sign followed by adjacent decimal digits. The value wraps
/// silently on 32-bit overflow.
fn parse_number(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  let negative = match e.cursor.peek() {
    Some('-') => {
      e.cursor.consume();
      true
    }
    Some('+') => {
      e.cursor.consume();
      false
    }
    _ => false,
  };

  if !e.cursor.adjacent().is_some_and(|c| c.is_ascii_digit()) {
    return Err(CompileError::UnexpectedCharacter {
      position: e.cursor.position(),
      found: e.cursor.adjacent(),
    });
  }

  let mut value: i32 = 0;
  while let Some(digit) = e.cursor.adjacent().and_then(|c| c.to_digit(10)) {
    e.cursor.consume();
    value = value.wrapping_mul(10).wrapping_add(digit as i32);
  }
  if negative {
    value = value.wrapping_neg();
  }

  e.emit(Instruction::Constant(value))
}

/// A single letter names a variable; anything longer names an operation.
fn parse_ident(e: &mut Emitter<'_, '_>) -> CompileResult<()> {
  let source = e.cursor.source();
  let start = e.cursor.position();
  e.cursor.consume();
  while e.cursor.adjacent().is_some_and(|c| c.is_ascii_alphanumeric()) {
    e.cursor.consume();
  }

  let name = &source[start..e.cursor.position()];
  let first = name.chars().next();

  if name.len() == 1 {
    // Only the first 256 bindings are addressable by a `u8` index.
    let index = e
      .bindings
      .iter()
      .position(|binding| Some(binding.name) == first)
      .and_then(|index| u8::try_from(index).ok());
    return match index {
      Some(index) => e.emit(Instruction::VariableRef(index)),
      None => Err(CompileError::UnknownVariable {
        position: start,
        found: first,
      }),
    };
  }

  let Some(op) = registry::lookup(name) else {
    return Err(CompileError::UnknownOperation {
      position: start,
      found: first,
    });
  };
  parse_call(e, op)
}

/// `name '(' [expression (',' expression)*] ')'`, with the argument count
/// checked against the operation's operand count.
fn parse_call(e: &mut Emitter<'_, '_>, op: &'static OperationDescriptor) -> CompileResult<()> {
  e.expect('(')?;

  let mut count = 0;
  if e.cursor.peek() != Some(')') {
    parse_expr(e)?;
    count += 1;

    while e.cursor.eat(',') {
      if count >= op.operands {
        let (position, found) = e.here();
        return Err(CompileError::TooManyArguments { position, found });
      }
      parse_expr(e)?;
      count += 1;
    }
  }

  if count < op.operands {
    let (position, found) = e.here();
    return Err(CompileError::TooFewArguments { position, found });
  }

  e.expect(')')?;
  e.emit(Instruction::Operation(op.kind))
}
