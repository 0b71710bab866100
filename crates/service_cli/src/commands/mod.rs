//! CLI command implementations
//!
//! Each submodule implements a specific CLI command. Results are written to
//! stdout as pretty-printed JSON.

pub mod estimate;
pub mod frontier;
pub mod optimise;
pub mod risk;
pub mod simulate;

use serde::Serialize;
use std::io::Write;

use crate::Result;

/// Writes a value to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
