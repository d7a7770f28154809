//! Fixed-capacity value stack with sticky error flags.
//!
//! Checked operations never fail: pushing onto a full stack drops the value
//! and raises [`StackFlags::OVERFLOW`], popping an empty one yields
//! [`MISSING_VALUE`] and raises [`StackFlags::UNDERFLOW`]. Flags stay set
//! until the next [`Stack::clear`].

use std::fmt;

/// Value produced by a pop on an empty stack, and by an empty pipeline.
pub const MISSING_VALUE: i32 = 1;

/// Two-bit error mask recorded by a [`Stack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StackFlags(u8);

impl StackFlags {
  pub const NONE: Self = Self(0);
  pub const OVERFLOW: Self = Self(0b01);
  pub const UNDERFLOW: Self = Self(0b10);

  pub fn bits(self) -> u8 {
    self.0
  }

  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn insert(&mut self, other: Self) {
    self.0 |= other.0;
  }
}

impl std::ops::BitOr for StackFlags {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

impl fmt::Display for StackFlags {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names: Vec<&str> = [(Self::OVERFLOW, "overflow"), (Self::UNDERFLOW, "underflow")]
      .into_iter()
      .filter(|(flag, _)| self.contains(*flag))
      .map(|(_, name)| name)
      .collect();
    if names.is_empty() {
      f.write_str("none")
    } else {
      f.write_str(&names.join(" | "))
    }
  }
}

/// Bounded stack of `i32` values. `capacity` is the only bound consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
  values: Vec<i32>,
  capacity: usize,
  flags: StackFlags,
}

impl Stack {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      values: Vec::with_capacity(capacity),
      capacity,
      flags: StackFlags::NONE,
    }
  }

  /// Empty the stack and reset its flags.
  pub fn clear(&mut self) {
    self.values.clear();
    self.flags = StackFlags::NONE;
  }

  pub fn push(&mut self, value: i32) {
    if self.values.len() >= self.capacity {
      self.flags.insert(StackFlags::OVERFLOW);
      return;
    }
    self.values.push(value);
  }

  pub fn pop(&mut self) -> i32 {
    match self.values.pop() {
      Some(value) => value,
      None => {
        self.flags.insert(StackFlags::UNDERFLOW);
        MISSING_VALUE
      }
    }
  }

  /// Push without consulting `capacity` or touching the flags. Only for
  /// pipelines that already passed [`crate::executor::verify`] against a stack
  /// no larger than this one.
  pub fn push_unchecked(&mut self, value: i32) {
    debug_assert!(self.values.len() < self.capacity, "unchecked push past capacity");
    self.values.push(value);
  }

  /// Pop without touching the flags. Only for verified pipelines.
  pub fn pop_unchecked(&mut self) -> i32 {
    debug_assert!(!self.values.is_empty(), "unchecked pop on empty stack");
    self.values.pop().unwrap_or(MISSING_VALUE)
  }

  pub fn top(&self) -> Option<i32> {
    self.values.last().copied()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn flags(&self) -> StackFlags {
    self.flags
  }

  /// Values bottom to top.
  pub fn as_slice(&self) -> &[i32] {
    &self.values
  }
}
