//! Offline ASDL generator CLI (spec.md §6.4).
//!
//! ```text
//! btrc_astgen <path/to/btrc.asdl>
//! ```
//!
//! Prints the Rust node definitions `ast/btrc.asdl` describes to stdout.
//! Run by hand when `ast/btrc.asdl` changes, to see what `btrc_ir::ast`
//! would need to change to stay in lockstep -- this binary never writes
//! to `btrc_ir`'s source files itself.

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: btrc_astgen <path/to/btrc.asdl>");
        std::process::exit(1);
    };

    match btrc_astgen::load(path) {
        Ok(module) => print!("{}", btrc_astgen::render_rust(&module)),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
