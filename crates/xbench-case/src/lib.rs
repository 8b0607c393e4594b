#![deny(missing_docs)]
//! Command file model: cases, tolerance bindings, capability flags and skip-pairs.
//!
//! A command file is line oriented. `# @case: <id>` opens a case, `# @<tag>: <value>`
//! lines configure it and every other non-comment line is a raw solver command.

mod model;
mod parser;

pub use model::{Case, CommandLine, EnginePair};
pub use parser::{parse_cases, read_command_file};
