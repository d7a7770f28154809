//! Compiled instruction sequence.
//!
//! A [`Pipeline`] is a bounded buffer the caller allocates once and reuses.
//! Pushing past `capacity` drops the instruction and raises a sticky overflow
//! flag; turning that flag into a diagnostic is the compiler's job.

use std::fmt;

use crate::registry::OperationKind;

/// One compiled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
  /// Push a literal.
  Constant(i32),
  /// Push the value of the binding at this position.
  VariableRef(u8),
  /// Invoke an operation on the live stack and push its result.
  Operation(OperationKind),
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Constant(value) => write!(f, "const {value}"),
      Self::VariableRef(index) => write!(f, "var #{index}"),
      Self::Operation(kind) => write!(f, "op {kind}"),
    }
  }
}

/// A named value visible to one compile/execute cycle.
///
/// Bindings are passed around as ordered slices. Compiled pipelines refer to
/// them by position, not by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
  pub name: char,
  pub value: i32,
}

impl Binding {
  pub fn new(name: char, value: i32) -> Self {
    Self { name, value }
  }
}

/// Bounded instruction buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
  instructions: Vec<Instruction>,
  capacity: usize,
  overflowed: bool,
}

impl Pipeline {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      instructions: Vec::with_capacity(capacity),
      capacity,
      overflowed: false,
    }
  }

  /// Drop every instruction and reset the overflow flag.
  pub fn clear(&mut self) {
    self.instructions.clear();
    self.overflowed = false;
  }

  pub fn push(&mut self, instruction: Instruction) {
    if self.instructions.len() >= self.capacity {
      self.overflowed = true;
      return;
    }
    self.instructions.push(instruction);
  }

  pub fn overflowed(&self) -> bool {
    self.overflowed
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.instructions.len() >= self.capacity
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Index of the most recent instruction, `None` while empty.
  pub fn last_index(&self) -> Option<usize> {
    self.instructions.len().checked_sub(1)
  }

  pub fn get(&self, index: usize) -> Option<&Instruction> {
    self.instructions.get(index)
  }

  pub fn as_slice(&self) -> &[Instruction] {
    &self.instructions
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
    self.instructions.iter()
  }
}

impl<'a> IntoIterator for &'a Pipeline {
  type Item = &'a Instruction;
  type IntoIter = std::slice::Iter<'a, Instruction>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}
