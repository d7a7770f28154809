//! Stack-machine interpreter for compiled pipelines.
//!
//! Every instruction leaves exactly one value on the stack: constants and
//! variables push, operations pop their operands and push the result. The
//! value left on top after the last instruction is the result.
//!
//! [`execute`] checks every push and pop and keeps going when the stack
//! misbehaves, so all flags are observable afterwards. [`execute_unchecked`]
//! skips that bookkeeping and is only reachable through a [`Verified`] proof
//! produced by [`verify`].

use tracing::{debug, trace};

use crate::error::{ExecError, ExecResult};
use crate::pipeline::{Binding, Instruction, Pipeline};
use crate::registry::OperationKind;
use crate::stack::{MISSING_VALUE, Stack};

/// Run `pipeline` against `stack` with checked stack access.
///
/// With `clear_on_entry` the stack starts empty; without it the run stacks on
/// top of whatever is already there. An empty pipeline returns
/// [`MISSING_VALUE`] and leaves the stack untouched. Overflow and underflow are
/// recorded in [`Stack::flags`]; only arithmetic and index faults stop the run.
pub fn execute(
  pipeline: &Pipeline,
  stack: &mut Stack,
  bindings: &[Binding],
  clear_on_entry: bool,
) -> ExecResult<i32> {
  if pipeline.is_empty() {
    return Ok(MISSING_VALUE);
  }
  if clear_on_entry {
    stack.clear();
  }

  for (step, instruction) in pipeline.iter().enumerate() {
    trace!(step, %instruction, depth = stack.len(), "execute");
    match *instruction {
      Instruction::Constant(value) => stack.push(value),
      Instruction::VariableRef(index) => stack.push(resolve(bindings, index, step)?),
      Instruction::Operation(kind) => {
        let value = kind.apply(|| stack.pop()).ok_or(ExecError::ArithmeticFault {
          operation: kind,
          step,
        })?;
        stack.push(value);
      }
    }
  }

  let result = stack.pop();
  if !stack.flags().is_empty() {
    debug!(flags = %stack.flags(), result, "stack flags raised during execution");
  }
  Ok(result)
}

/// Proof that a pipeline's stack usage fits the stack it was verified against.
///
/// Borrowing the pipeline keeps it from being recompiled while the proof is
/// alive.
#[derive(Debug, Clone, Copy)]
pub struct Verified<'p> {
  pipeline: &'p Pipeline,
  stack_capacity: usize,
}

impl<'p> Verified<'p> {
  pub fn pipeline(&self) -> &'p Pipeline {
    self.pipeline
  }

  pub fn stack_capacity(&self) -> usize {
    self.stack_capacity
  }
}

/// Arity-only dry run: every value is replaced by a placeholder, so only the
/// shape of the stack is exercised. Fails with [`ExecError::StackFault`] if
/// the run would overflow or underflow `stack`, including the final pop, and
/// with [`ExecError::UnbalancedStack`] unless exactly one value is left for
/// that pop.
///
/// The stack is left cleared.
pub fn verify<'p>(pipeline: &'p Pipeline, stack: &mut Stack) -> ExecResult<Verified<'p>> {
  stack.clear();
  for instruction in pipeline {
    match *instruction {
      Instruction::Constant(_) | Instruction::VariableRef(_) => stack.push(MISSING_VALUE),
      Instruction::Operation(kind) => {
        for _ in 0..kind.operands() {
          stack.pop();
        }
        stack.push(MISSING_VALUE);
      }
    }
  }
  let depth = stack.len();
  stack.pop();

  let flags = stack.flags();
  stack.clear();
  if !flags.is_empty() {
    return Err(ExecError::StackFault { flags });
  }
  if depth != 1 {
    return Err(ExecError::UnbalancedStack { depth });
  }

  Ok(Verified {
    pipeline,
    stack_capacity: stack.capacity(),
  })
}

/// Fast path for verified pipelines: the stack is cleared, then driven with
/// unchecked pushes and pops. Index and arithmetic faults still surface since
/// they depend on the bindings and values, not on the pipeline's shape.
///
/// `stack` must have at least the capacity the proof was made against;
/// a smaller one is rejected up front with [`ExecError::CapacityMismatch`].
pub fn execute_unchecked(
  verified: &Verified<'_>,
  stack: &mut Stack,
  bindings: &[Binding],
) -> ExecResult<i32> {
  if stack.capacity() < verified.stack_capacity {
    return Err(ExecError::CapacityMismatch {
      verified: verified.stack_capacity,
      available: stack.capacity(),
    });
  }
  stack.clear();

  for (step, instruction) in verified.pipeline.iter().enumerate() {
    match *instruction {
      Instruction::Constant(value) => stack.push_unchecked(value),
      Instruction::VariableRef(index) => stack.push_unchecked(resolve(bindings, index, step)?),
      Instruction::Operation(kind) => {
        let value = apply_unchecked(kind, stack, step)?;
        stack.push_unchecked(value);
      }
    }
  }

  Ok(stack.pop_unchecked())
}

fn apply_unchecked(kind: OperationKind, stack: &mut Stack, step: usize) -> ExecResult<i32> {
  kind
    .apply(|| stack.pop_unchecked())
    .ok_or(ExecError::ArithmeticFault {
      operation: kind,
      step,
    })
}

fn resolve(bindings: &[Binding], index: u8, step: usize) -> ExecResult<i32> {
  bindings
    .get(usize::from(index))
    .map(|binding| binding.value)
    .ok_or(ExecError::IndexFault {
      index,
      step,
      available: bindings.len(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::compile_str;
  use crate::stack::StackFlags;

  fn pipeline_of(instructions: &[Instruction]) -> Pipeline {
    let mut pipeline = Pipeline::with_capacity(instructions.len());
    for instruction in instructions {
      pipeline.push(*instruction);
    }
    pipeline
  }

  fn compiled(source: &str, bindings: &[Binding]) -> Pipeline {
    let mut pipeline = Pipeline::with_capacity(50);
    compile_str(&mut pipeline, source, bindings).expect("compiles");
    pipeline
  }

  #[test]
  fn runs_constants_and_variables() {
    let bindings = [Binding::new('x', 10), Binding::new('y', 15)];
    let pipeline = compiled("30*(y+20)", &bindings);
    let mut stack = Stack::with_capacity(50);
    assert_eq!(execute(&pipeline, &mut stack, &bindings, true), Ok(1050));
    assert!(stack.is_empty());
    assert!(stack.flags().is_empty());
  }

  #[test]
  fn empty_pipeline_leaves_stack_untouched() {
    let pipeline = Pipeline::with_capacity(4);
    let mut stack = Stack::with_capacity(4);
    stack.push(9);
    assert_eq!(execute(&pipeline, &mut stack, &[], true), Ok(MISSING_VALUE));
    assert_eq!(stack.as_slice(), &[9]);
  }

  #[test]
  fn underflow_is_flagged_not_fatal() {
    let pipeline = pipeline_of(&[Instruction::Operation(OperationKind::Add)]);
    let mut stack = Stack::with_capacity(4);
    // add pops two missing values (1 + 1), pushes 2, final pop returns it.
    assert_eq!(execute(&pipeline, &mut stack, &[], true), Ok(2));
    assert_eq!(stack.flags(), StackFlags::UNDERFLOW);
  }

  #[test]
  fn final_pop_may_underflow() {
    let pipeline = pipeline_of(&[Instruction::Constant(5)]);
    let mut stack = Stack::with_capacity(0);
    assert_eq!(execute(&pipeline, &mut stack, &[], true), Ok(MISSING_VALUE));
    assert_eq!(stack.flags(), StackFlags::OVERFLOW | StackFlags::UNDERFLOW);
  }

  #[test]
  fn cumulative_run_uses_existing_stack() {
    // A bare pow2 instruction squares whatever the caller left on the stack.
    let pipeline = pipeline_of(&[Instruction::Operation(OperationKind::Pow2)]);
    let mut stack = Stack::with_capacity(4);
    stack.push(7);
    assert_eq!(execute(&pipeline, &mut stack, &[], false), Ok(49));
    assert!(stack.flags().is_empty());
  }

  #[test]
  fn division_by_zero_is_an_arithmetic_fault() {
    let pipeline = compiled("1+4/0", &[]);
    let mut stack = Stack::with_capacity(8);
    assert_eq!(
      execute(&pipeline, &mut stack, &[], true),
      Err(ExecError::ArithmeticFault {
        operation: OperationKind::Div,
        step: 3,
      })
    );
  }

  #[test]
  fn stale_variable_index_is_an_index_fault() {
    let bindings = [Binding::new('x', 1), Binding::new('y', 2)];
    let pipeline = compiled("x+y", &bindings);
    let mut stack = Stack::with_capacity(8);
    assert_eq!(
      execute(&pipeline, &mut stack, &bindings[..1], true),
      Err(ExecError::IndexFault {
        index: 1,
        step: 1,
        available: 1,
      })
    );
  }

  #[test]
  fn repeated_fresh_runs_are_idempotent() {
    let bindings = [Binding::new('x', 3)];
    let pipeline = compiled("x*x + mod(10, 4)", &bindings);
    let mut stack = Stack::with_capacity(8);
    let first = execute(&pipeline, &mut stack, &bindings, true);
    let after_first = stack.clone();
    let second = execute(&pipeline, &mut stack, &bindings, true);
    assert_eq!(first, Ok(11));
    assert_eq!(first, second);
    assert_eq!(stack, after_first);
  }

  #[test]
  fn verify_rejects_underflowing_pipeline() {
    let pipeline = pipeline_of(&[
      Instruction::Constant(1),
      Instruction::Operation(OperationKind::Mul),
    ]);
    let mut stack = Stack::with_capacity(4);
    assert_eq!(
      verify(&pipeline, &mut stack).map(|_| ()),
      Err(ExecError::StackFault {
        flags: StackFlags::UNDERFLOW
      })
    );
    assert!(stack.flags().is_empty());
  }

  #[test]
  fn verify_rejects_pipeline_deeper_than_stack() {
    let pipeline = compiled("1+(2+(3+4))", &[]);
    let mut stack = Stack::with_capacity(3);
    let err = verify(&pipeline, &mut stack).map(|_| ()).expect_err("too deep");
    assert!(matches!(
      err,
      ExecError::StackFault { flags } if flags.contains(StackFlags::OVERFLOW)
    ));
  }

  #[test]
  fn unchecked_run_matches_checked_run() {
    let bindings = [Binding::new('a', -4), Binding::new('b', 9)];
    let pipeline = compiled("pow2(a) - b % 5 * sub(b, a)", &bindings);
    let mut stack = Stack::with_capacity(8);
    let checked = execute(&pipeline, &mut stack, &bindings, true);

    let verified = verify(&pipeline, &mut stack).expect("verifies");
    let unchecked = execute_unchecked(&verified, &mut stack, &bindings);
    assert_eq!(checked, Ok(16 - 4 * 13));
    assert_eq!(unchecked, checked);
  }

  #[test]
  fn verify_rejects_leftover_values() {
    let pipeline = pipeline_of(&[Instruction::Constant(1), Instruction::Constant(2)]);
    let mut stack = Stack::with_capacity(4);
    assert_eq!(
      verify(&pipeline, &mut stack).map(|_| ()),
      Err(ExecError::UnbalancedStack { depth: 2 })
    );
    assert!(stack.is_empty());
  }

  #[test]
  fn unchecked_run_refuses_smaller_stack() {
    let pipeline = compiled("1+(2+(3+4))", &[]);
    let mut roomy = Stack::with_capacity(8);
    let verified = verify(&pipeline, &mut roomy).expect("verifies");

    let mut cramped = Stack::with_capacity(1);
    cramped.push(5);
    assert_eq!(
      execute_unchecked(&verified, &mut cramped, &[]),
      Err(ExecError::CapacityMismatch {
        verified: 8,
        available: 1,
      })
    );
    assert_eq!(cramped.as_slice(), &[5]);
    assert!(cramped.len() <= cramped.capacity());

    assert_eq!(execute_unchecked(&verified, &mut roomy, &[]), Ok(10));
  }

  #[test]
  fn unchecked_run_still_reports_faults() {
    let bindings = [Binding::new('d', 0)];
    let pipeline = compiled("10/d", &bindings);
    let mut stack = Stack::with_capacity(4);
    let verified = verify(&pipeline, &mut stack).expect("verifies");
    assert_eq!(
      execute_unchecked(&verified, &mut stack, &bindings),
      Err(ExecError::ArithmeticFault {
        operation: OperationKind::Div,
        step: 2,
      })
    );
  }
}
