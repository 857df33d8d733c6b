//! pstree: display running processes as a tree
//!
//! Usage:
//!   pstree            # Tree of all processes, collector order
//!   pstree -n         # Siblings sorted by PID
//!   pstree -p         # Show PIDs
//!   pstree --json     # Machine-readable JSON
//!
//! Anomalies in the snapshot (duplicate PIDs, parent cycles, exited parents)
//! are reported as warnings on stderr and never stop the tree from printing.

use clap::error::ErrorKind;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use pstree_core::render::{self, RenderOptions};
use pstree_core::{Report, SortMode, Warning};
use pstree_platform_linux::{list_processes, CollectError};
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit codes for scripting
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ERROR_GENERAL: i32 = 1;
    pub const ERROR_INVALID_INPUT: i32 = 1;
}

/// Configuration file support
mod config {
    use serde::Deserialize;
    use std::fs;
    use std::path::PathBuf;

    /// User configuration from ~/.pstree/config.toml
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Config {
        /// Default output settings
        pub output: OutputConfig,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct OutputConfig {
        /// Show PIDs by default
        pub show_pids: bool,
        /// Sort siblings by PID by default
        pub numeric_sort: bool,
        /// Use JSON output by default
        pub json: bool,
        /// Disable colored output by default
        pub no_color: bool,
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pstree").join("config.toml"))
    }

    /// Load configuration from file
    pub fn load_config() -> Config {
        let Some(path) = config_path() else {
            return Config::default();
        };

        if !path.exists() {
            return Config::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => parse_config(&content),
            Err(_) => Config::default(),
        }
    }

    /// Parse config text, falling back to defaults on any error
    pub fn parse_config(content: &str) -> Config {
        toml::from_str(content).unwrap_or_default()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_config_output_section() {
            let cfg = parse_config("[output]\nshow_pids = true\nnumeric_sort = true\n");
            assert!(cfg.output.show_pids);
            assert!(cfg.output.numeric_sort);
            assert!(!cfg.output.json);
        }

        #[test]
        fn test_parse_config_invalid_is_default() {
            let cfg = parse_config("this is = = not toml");
            assert!(!cfg.output.show_pids);
            assert!(!cfg.output.no_color);
        }
    }
}

/// Display a tree of processes
#[derive(Parser)]
#[command(name = "pstree")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  pstree               Show all processes as a tree
  pstree -n            Sort siblings by PID
  pstree -p -n         Show PIDs, sorted
  pstree --json        Output as JSON for scripting")]
struct Cli {
    /// Show PIDs after process names
    #[arg(long, short = 'p')]
    show_pids: bool,

    /// Sort sibling processes by PID
    #[arg(long, short = 'n')]
    numeric_sort: bool,

    /// Output as JSON (for scripting and automation)
    #[arg(long, short = 'j')]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log diagnostics to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Color configuration for output
struct Colors {
    connector: Style,
    name: Style,
    pid: Style,
    warning: Style,
    error: Style,
}

impl Colors {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                connector: Style::new().dimmed(),
                name: Style::new().bold(),
                pid: Style::new().cyan(),
                warning: Style::new().yellow(),
                error: Style::new().red().bold(),
            }
        } else {
            Self {
                connector: Style::new(),
                name: Style::new(),
                pid: Style::new(),
                warning: Style::new(),
                error: Style::new(),
            }
        }
    }
}

fn main() {
    let mut cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and succeed; anything else is bad input
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::SUCCESS,
                _ => exit_codes::ERROR_INVALID_INPUT,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // Apply config defaults (CLI flags override config)
    let cfg = config::load_config();
    cli.show_pids |= cfg.output.show_pids;
    cli.numeric_sort |= cfg.output.numeric_sort;
    cli.json |= cfg.output.json;
    cli.no_color |= cfg.output.no_color;

    init_logging(cli.verbose);

    let colors = Colors::new(!cli.no_color && !cli.json && supports_color());

    let snapshot = match list_processes() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(error = ?e, "snapshot collection failed");
            print_error(&colors, &collect_error_message(&e));
            std::process::exit(exit_codes::ERROR_GENERAL);
        }
    };

    let mode = if cli.numeric_sort {
        SortMode::NumericByPid
    } else {
        SortMode::Insertion
    };
    let report = Report::from_snapshot(&snapshot, mode);
    tracing::debug!(
        processes = report.process_count(),
        roots = report.forest.roots.len(),
        %mode,
        "rendering process tree"
    );

    for warning in &report.warnings {
        print_warning(&colors, &format_warning(warning));
    }

    if cli.json {
        match render::render_json_string(&report) {
            Ok(json) => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", json).ok();
            }
            Err(e) => {
                print_error(&colors, &format!("Failed to serialize JSON: {}", e));
                std::process::exit(exit_codes::ERROR_GENERAL);
            }
        }
    } else {
        print_tree(
            &report,
            &RenderOptions {
                show_pids: cli.show_pids,
            },
            &colors,
        );
    }
}

/// Install the stderr log subscriber; `RUST_LOG` takes precedence
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Print the rendered tree, styling each part of every line
fn print_tree(report: &Report, options: &RenderOptions, colors: &Colors) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in render::render_lines(&report.forest, options) {
        let pid = line
            .pid
            .map(|pid| format!("({})", pid))
            .unwrap_or_default();
        // Stop quietly when the reader goes away (e.g. `pstree | head`)
        if writeln!(
            out,
            "{}{}{}",
            format!("{}{}", line.prefix, line.connector).style(colors.connector),
            line.name.style(colors.name),
            pid.style(colors.pid)
        )
        .is_err()
        {
            return;
        }
    }
}

/// Format a warning for display
fn format_warning(warning: &Warning) -> String {
    match warning {
        Warning::NoRecords => "No processes found; nothing to show".to_string(),
        other => other.to_string(),
    }
}

/// Format a collection failure for display
fn collect_error_message(error: &CollectError) -> String {
    if error.is_access_denied() {
        format!("{} (try running with elevated privileges)", error)
    } else {
        error.to_string()
    }
}

/// Print an error message
fn print_error(colors: &Colors, message: &str) {
    eprintln!("{} {}", "error:".style(colors.error), message);
}

/// Print a warning message
fn print_warning(colors: &Colors, message: &str) {
    eprintln!("{} {}", "warning:".style(colors.warning), message);
}

/// Check if the terminal supports color
fn supports_color() -> bool {
    // Check for common NO_COLOR convention
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check for TERM
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    atty::is(atty::Stream::Stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["pstree", "-p", "-n"]).unwrap();
        assert!(cli.show_pids);
        assert!(cli.numeric_sort);
        assert!(!cli.json);

        let cli = Cli::try_parse_from(["pstree", "--show-pids", "--numeric-sort"]).unwrap();
        assert!(cli.show_pids && cli.numeric_sort);
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        let err = Cli::try_parse_from(["pstree", "--bogus"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_version_flag() {
        let err = Cli::try_parse_from(["pstree", "-V"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_collect_error_message_access_denied() {
        let denied = CollectError::ProcUnavailable {
            path: "/proc".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let message = collect_error_message(&denied);
        assert!(message.starts_with("Cannot read process directory /proc"));
        assert!(message.contains("elevated privileges"));

        let missing = CollectError::ProcUnavailable {
            path: "/proc".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(collect_error_message(&missing), missing.to_string());
        assert!(!collect_error_message(&CollectError::UnsupportedPlatform).contains("privileges"));
    }

    #[test]
    fn test_format_warning() {
        assert_eq!(
            format_warning(&Warning::CycleBroken { pid: 3, ppid: 4 }),
            "Parent cycle through PID 3 (parent 4); shown as a root"
        );
        assert!(format_warning(&Warning::NoRecords).contains("No processes"));
    }
}
