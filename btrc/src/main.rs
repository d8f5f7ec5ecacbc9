//! btrc CLI (spec.md §6.1). A hand-rolled `match` over `std::env::args()`
//! — no argument-parsing crate, matching the reference toolchain's own
//! CLI style (SPEC_FULL.md §6.1a), since the workspace's compiler crates
//! don't depend on `clap` at all.

use std::path::PathBuf;

use btrc::pipeline::{CompileConfig, EmitTarget, ExitCode};

fn main() {
    btrc::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("btrc {}", env!("CARGO_PKG_VERSION"));
        }
        source => {
            let Some(config) = parse_compile_args(source, &args[2..]) else {
                std::process::exit(1);
            };
            std::process::exit(run_and_report(&config) as i32);
        }
    }
}

fn print_usage() {
    println!("btrc — a source-to-C transpiler");
    println!();
    println!("Usage: btrc <src.btrc> [options]");
    println!();
    println!("Options:");
    println!("  -o <out.c>            Compile and emit C to <out.c> (default: <src>.c)");
    println!("  --emit-tokens         Dump the token stream (one per line)");
    println!("  --emit-ast            Dump the canonical AST");
    println!("  --emit-ir             Dump IR after generation, before optimization");
    println!("  --emit-optimized-ir   Dump IR after optimization");
    println!("  help                  Show this help message");
    println!("  version               Show version information");
}

fn parse_compile_args(source: &str, rest: &[String]) -> Option<CompileConfig> {
    if !PathBuf::from(source).exists() {
        eprintln!("btrc: no such file: {source}");
        return None;
    }

    let mut config = CompileConfig::new(source);
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "-o" => {
                let Some(path) = rest.get(i + 1) else {
                    eprintln!("btrc: -o requires an output path");
                    return None;
                };
                config.output_path = Some(PathBuf::from(path));
                i += 2;
            }
            "--emit-tokens" => {
                config.emit = EmitTarget::Tokens;
                i += 1;
            }
            "--emit-ast" => {
                config.emit = EmitTarget::Ast;
                i += 1;
            }
            "--emit-ir" => {
                config.emit = EmitTarget::Ir;
                i += 1;
            }
            "--emit-optimized-ir" => {
                config.emit = EmitTarget::OptimizedIr;
                i += 1;
            }
            other => {
                eprintln!("btrc: unknown option: {other}");
                return None;
            }
        }
    }
    Some(config)
}

fn run_and_report(config: &CompileConfig) -> ExitCode {
    match btrc::pipeline::run(config) {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!("btrc: {err}");
            ExitCode::InternalError
        }
    }
}
