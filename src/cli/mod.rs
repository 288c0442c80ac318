// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, ReportKind, StrategyType};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// Invalid arguments, a missing input path, or --help cause clap to
/// print a message and exit the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
