//! Init command - writes a default serval.toml

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serval_core::config::CONFIG_FILENAME;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = r#"# serval configuration
# https://github.com/serval-tools/serval

include = ["**/*.c", "**/*.h"]
exclude = ["build/**", "vendor/**"]

[rules]
# disabled = ["Q101"]
# quality = true
# security = true

# [rules.severity]
# S003 = "error"

[taint]
# Override the built-in taint source/sink function names. Leaving a list
# empty keeps the defaults.
sources = []
sinks = []
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create the configuration in
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(&self) -> Result<()> {
        let config_path = self.dir.join(CONFIG_FILENAME);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            );
        }

        std::fs::write(&config_path, DEFAULT_CONFIG)?;
        println!("{} {}", "created".green().bold(), config_path.display());
        Ok(())
    }
}
