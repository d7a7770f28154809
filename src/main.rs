//! One-shot front end: compile and run a single expression.
//!
//! Usage: `pipemath [OPTIONS] <EXPR> [BINDING]...`, with bindings written as
//! `x=10`.

use std::process;

use clap::Parser;
use pipemath::{Binding, DEFAULT_CAPACITY, Error, Machine, MachineConfig};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "pipemath")]
#[command(about = "Compile an arithmetic expression into a pipeline and run it")]
struct Args {
  /// Expression to evaluate, e.g. `30*(y+20)`
  #[arg(allow_hyphen_values = true)]
  expr: String,

  /// Variable bindings in `name=value` form, e.g. `y=15`
  #[arg(value_parser = parse_binding)]
  bindings: Vec<Binding>,

  /// Maximum number of compiled instructions
  #[arg(long, default_value_t = DEFAULT_CAPACITY)]
  pipeline_capacity: usize,

  /// Maximum stack depth during execution
  #[arg(long, default_value_t = DEFAULT_CAPACITY)]
  stack_capacity: usize,
}

fn parse_binding(arg: &str) -> Result<Binding, String> {
  let (name, value) = arg
    .split_once('=')
    .ok_or_else(|| format!("expected `name=value`, got `{arg}`"))?;

  let mut chars = name.trim().chars();
  let name = match (chars.next(), chars.next()) {
    (Some(c), None) if c.is_ascii_alphabetic() => c,
    _ => return Err(format!("variable name must be a single letter, got `{name}`")),
  };
  let value = value
    .trim()
    .parse::<i32>()
    .map_err(|err| format!("invalid value for `{name}`: {err}"))?;

  Ok(Binding::new(name, value))
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  init_logging();
  let args = Args::parse();

  let config = MachineConfig::default()
    .with_pipeline_capacity(args.pipeline_capacity)
    .with_stack_capacity(args.stack_capacity);
  let mut machine = Machine::new(config);

  match machine.evaluate(&args.expr, &args.bindings) {
    Ok(evaluation) => {
      let trailing = &args.expr[evaluation.consumed..];
      if !trailing.trim().is_empty() {
        warn!(trailing, "ignored input after the expression");
      }
      if !evaluation.flags.is_empty() {
        warn!(flags = %evaluation.flags, "stack misbehaved; result may be degraded");
      }
      println!("{}", evaluation.value);
    }
    Err(Error::Compile { source }) => {
      eprintln!("{}", source.render(&args.expr));
      process::exit(1);
    }
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
