//! CLI subcommands

pub mod check;
pub mod explain;
pub mod init;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze C files for security and quality issues
    Check(check::CheckArgs),
    /// Create a default serval.toml configuration
    Init(init::InitArgs),
    /// Show details about a rule
    Explain(explain::ExplainArgs),
}
