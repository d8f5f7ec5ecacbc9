//! btrc: a source-to-C transpiler for a statically-typed, object-oriented
//! language (spec.md §1). This crate is the CLI driver binary's library
//! half — `pipeline::run` is the single entry point `main.rs` calls once
//! arguments are parsed, matching SPEC_FULL.md §6.1a's
//! "`btrc::pipeline::run(&CompileConfig)`" contract.

pub mod pipeline;
mod tracing_setup;

pub use pipeline::{CompileConfig, EmitTarget, ExitCode, PipelineError};
pub use tracing_setup::init as init_tracing;
