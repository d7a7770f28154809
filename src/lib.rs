//! Crate root: wires the compiler and the stack machine together.
//!
//! - `cursor` gives the parser a peekable view over the source text.
//! - `registry` holds the built-in operations and their arities.
//! - `parser` compiles an expression straight into a bounded `Pipeline`.
//! - `executor` runs a pipeline on a bounded `Stack`.
//! - `error` holds the compile and execution error types.
//! - `config` holds the buffer capacities used by `Machine`.

pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod stack;

use snafu::ResultExt;
use tracing::debug;

pub use config::{DEFAULT_CAPACITY, MachineConfig};
pub use cursor::Cursor;
pub use error::{CompileError, CompileErrorKind, CompileResult, Error, ExecError, ExecResult};
pub use executor::{Verified, execute, execute_unchecked, verify};
pub use parser::{compile, compile_str};
pub use pipeline::{Binding, Instruction, Pipeline};
pub use registry::{OperationDescriptor, OperationKind};
pub use stack::{MISSING_VALUE, Stack, StackFlags};

/// Outcome of one compile+execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
  pub value: i32,
  /// Stack flags left by the run; a non-empty set means `value` is degraded.
  pub flags: StackFlags,
  /// Bytes of source the compiler consumed. Anything after it was ignored.
  pub consumed: usize,
}

/// A pipeline and a stack allocated once and reused across cycles.
#[derive(Debug, Clone)]
pub struct Machine {
  pipeline: Pipeline,
  stack: Stack,
}

impl Machine {
  pub fn new(config: MachineConfig) -> Self {
    Self {
      pipeline: Pipeline::with_capacity(config.pipeline_capacity),
      stack: Stack::with_capacity(config.stack_capacity),
    }
  }

  /// Compile `source` against `bindings` and run it on a cleared stack.
  pub fn evaluate(&mut self, source: &str, bindings: &[Binding]) -> Result<Evaluation, Error> {
    let consumed =
      compile_str(&mut self.pipeline, source, bindings).context(error::CompileSnafu)?;
    let value =
      execute(&self.pipeline, &mut self.stack, bindings, true).context(error::ExecuteSnafu)?;

    debug!(value, consumed, "evaluated expression");
    Ok(Evaluation {
      value,
      flags: self.stack.flags(),
      consumed,
    })
  }

  pub fn pipeline(&self) -> &Pipeline {
    &self.pipeline
  }

  pub fn stack(&self) -> &Stack {
    &self.stack
  }
}

impl Default for Machine {
  fn default() -> Self {
    Self::new(MachineConfig::default())
  }
}
