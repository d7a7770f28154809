//! Built-in operations.
//!
//! The table is process-wide and read-only. The compiler looks entries up by
//! name; diagnostics go the other way, from an [`OperationKind`] back to its
//! descriptor.

use std::fmt;

/// Closed set of operations a pipeline can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Pow2,
}

/// Name, declared arity and stack footprint of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
  pub kind: OperationKind,
  pub name: &'static str,
  /// Declared arity, as reported by reverse lookup.
  pub arity: usize,
  /// Stack values the behavior pops. A call site must supply this many
  /// arguments.
  pub operands: usize,
}

static OPERATIONS: [OperationDescriptor; 6] = [
  OperationDescriptor {
    kind: OperationKind::Add,
    name: "add",
    arity: 2,
    operands: 2,
  },
  OperationDescriptor {
    kind: OperationKind::Sub,
    name: "sub",
    arity: 2,
    operands: 2,
  },
  OperationDescriptor {
    kind: OperationKind::Mul,
    name: "mul",
    arity: 2,
    operands: 2,
  },
  OperationDescriptor {
    kind: OperationKind::Div,
    name: "div",
    arity: 2,
    operands: 2,
  },
  OperationDescriptor {
    kind: OperationKind::Mod,
    name: "mod",
    arity: 2,
    operands: 2,
  },
  // Declared nullary, but squares whatever sits on top of the stack.
  OperationDescriptor {
    kind: OperationKind::Pow2,
    name: "pow2",
    arity: 0,
    operands: 1,
  },
];

/// Find an operation by exact name.
pub fn lookup(name: &str) -> Option<&'static OperationDescriptor> {
  OPERATIONS.iter().find(|entry| entry.name == name)
}

/// Reverse lookup from a kind to its descriptor.
pub fn describe(kind: OperationKind) -> &'static OperationDescriptor {
  let index = match kind {
    OperationKind::Add => 0,
    OperationKind::Sub => 1,
    OperationKind::Mul => 2,
    OperationKind::Div => 3,
    OperationKind::Mod => 4,
    OperationKind::Pow2 => 5,
  };
  &OPERATIONS[index]
}

pub fn operations() -> impl Iterator<Item = &'static OperationDescriptor> {
  OPERATIONS.iter()
}

impl OperationKind {
  pub fn name(self) -> &'static str {
    describe(self).name
  }

  pub fn arity(self) -> usize {
    describe(self).arity
  }

  pub fn operands(self) -> usize {
    describe(self).operands
  }

  /// Run the operation, pulling operands through `pop`.
  ///
  /// The value popped first is the right-hand operand. Addition, subtraction,
  /// multiplication and squaring wrap on overflow. `None` means the operation
  /// has no defined result: a zero divisor, or `i32::MIN` divided by `-1`.
  pub fn apply(self, mut pop: impl FnMut() -> i32) -> Option<i32> {
    match self {
      Self::Add => binary(pop, |left, right| Some(left.wrapping_add(right))),
      Self::Sub => binary(pop, |left, right| Some(left.wrapping_sub(right))),
      Self::Mul => binary(pop, |left, right| Some(left.wrapping_mul(right))),
      Self::Div => binary(pop, i32::checked_div),
      Self::Mod => binary(pop, i32::checked_rem),
      Self::Pow2 => {
        let value = pop();
        Some(value.wrapping_mul(value))
      }
    }
  }
}

fn binary(
  mut pop: impl FnMut() -> i32,
  op: impl FnOnce(i32, i32) -> Option<i32>,
) -> Option<i32> {
  let right = pop();
  let left = pop();
  op(left, right)
}

impl fmt::Display for OperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
