//! Tracing initialization (SPEC_FULL.md §1 "Ambient stack > Logging").
//!
//! Controlled by `RUST_LOG` (`tracing_subscriber::EnvFilter` syntax).
//! Defaults to `warn` when unset. Simplified from the reference
//! toolchain's own `tracing_setup.rs`: no `ORI_LOG`/`ORI_LOG_TREE`-style
//! second env var or hierarchical-tree layer, since `tracing-tree` isn't
//! part of this workspace's dependency stack (spec.md §1's ambient-stack
//! logging description names only `tracing` + `tracing-subscriber`).

use std::sync::OnceLock;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber. Safe to call multiple times — only
/// the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        Registry::default()
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
            .with(filter)
            .init();
    });
}
