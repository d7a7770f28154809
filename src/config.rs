//! Capacities for the pipeline and the stack.
//!
//! These fields are the only place a bound is configured; [`Pipeline`] and
//! [`Stack`] copy them into their own `capacity` and never consult anything
//! else.
//!
//! [`Pipeline`]: crate::pipeline::Pipeline
//! [`Stack`]: crate::stack::Stack

/// Default bound for both buffers.
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
  pub pipeline_capacity: usize,
  pub stack_capacity: usize,
}

impl Default for MachineConfig {
  fn default() -> Self {
    Self {
      pipeline_capacity: DEFAULT_CAPACITY,
      stack_capacity: DEFAULT_CAPACITY,
    }
  }
}

impl MachineConfig {
  pub fn with_pipeline_capacity(mut self, capacity: usize) -> Self {
    self.pipeline_capacity = capacity;
    self
  }

  pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
    self.stack_capacity = capacity;
    self
  }
}
