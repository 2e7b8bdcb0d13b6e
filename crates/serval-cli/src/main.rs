//! serval CLI - command-line interface for the serval C static analyzer

mod commands;
mod output;

use clap::Parser;
use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "serval",
    author,
    version,
    about = "Static security analyzer for C source code",
    long_about = "serval analyzes C source files for security vulnerabilities:\n\
                  taint flows from untrusted input to dangerous calls, format\n\
                  string misuse, banned library functions, and more."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Init(args) => args.run(),
        Commands::Explain(args) => args.run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_check_command() {
        let cli = Cli::try_parse_from(["serval", "check", "./src"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.path.to_str().unwrap(), "./src");
            }
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn cli_parses_check_with_format() {
        let cli = Cli::try_parse_from(["serval", "check", ".", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.format, "json"),
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn cli_parses_init_with_force() {
        let cli = Cli::try_parse_from(["serval", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Init(args) => assert!(args.force),
            _ => panic!("expected init command"),
        }
    }

    #[test]
    fn cli_parses_explain_command() {
        let cli = Cli::try_parse_from(["serval", "explain", "taint-flow"]).unwrap();
        match cli.command {
            Commands::Explain(args) => assert_eq!(args.rule_id, "taint-flow"),
            _ => panic!("expected explain command"),
        }
    }

    #[test]
    fn cli_help_contains_commands() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        assert!(help.contains("check"));
        assert!(help.contains("init"));
        assert!(help.contains("explain"));
    }
}
