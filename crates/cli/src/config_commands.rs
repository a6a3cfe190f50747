use std::path::Path;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
};

use wxmp_config::{Severity, ValidationResult, validate};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print where the config file is looked up.
    Path,
}

pub fn handle_config(action: ConfigAction, config: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config, verbose),
        ConfigAction::Path => {
            match config
                .map(Path::to_path_buf)
                .or_else(wxmp_config::find_config_file)
            {
                Some(path) => println!("{}", path.display()),
                None => {
                    eprintln!("no config file found; searched:");
                    eprintln!("  ./{{{}}}", wxmp_config::loader::CONFIG_FILENAMES.join(","));
                    if let Some(dir) = wxmp_config::config_dir() {
                        eprintln!("  {}", dir.display());
                    }
                },
            }
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate(config);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    for line in render(&result, verbose) {
        eprintln!("{line}");
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        bail!("config check failed");
    }
    Ok(())
}

fn render(result: &ValidationResult, verbose: bool) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .map(|d| {
            let color = match d.severity {
                Severity::Error => RED,
                Severity::Warning => YELLOW,
                Severity::Info => CYAN,
            };
            let label = d.severity;
            if d.path.is_empty() {
                format!("  {BOLD}{color}{label}{RESET} {}", d.message)
            } else {
                format!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message)
            }
        })
        .collect()
}
