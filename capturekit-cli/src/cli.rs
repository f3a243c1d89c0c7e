//! CLI definition for the capturekit command-line interface.

use std::path::PathBuf;

use capturekit_config::SettingsOverrides;
use clap::{Args, Parser, Subcommand};

/// CaptureKit - prompt-driven journaling capture.
///
/// Asks for the fields of a category defined in the capture configuration,
/// then appends the answers to the category's CSV file and notes.
#[derive(Parser, Debug)]
#[command(name = "capturekit")]
#[command(version)]
#[command(about = "Prompt-driven journaling capture to CSV and markdown notes")]
#[command(
    long_about = "CaptureKit prompts for the fields of a configured category and writes the \
    answers as a CSV row and as a line in markdown notes.\n\n\
    Settings are read from ~/.capturekit/settings.* and <root>/.capturekit/settings.* \
    (toml, yaml or json), then CAPTUREKIT_* environment variables, then the options below.\n\n\
    Environment variables:\n  \
    CAPTUREKIT_CONFIG_PATH   Capture configuration path relative to the root\n  \
    CAPTUREKIT_DATE_FORMAT   Date stamp pattern\n  \
    CAPTUREKIT_TIME_FORMAT   Time stamp pattern\n  \
    RUST_LOG                 Log filter when neither --debug nor --verbose is set"
)]
pub struct Cli {
    /// Directory all capture paths are relative to
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Capture configuration path, relative to the root
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Date stamp pattern, e.g. YYYY-MM-DD
    #[arg(long, global = true, value_name = "PATTERN")]
    pub date_format: Option<String>,

    /// Time stamp pattern, e.g. HH:mm
    #[arg(long, global = true, value_name = "PATTERN")]
    pub time_format: Option<String>,

    /// Separator between fields in the exported writeableLine
    #[arg(long, global = true, value_name = "TEXT")]
    pub separator: Option<String>,

    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Show progress messages on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one capture session (the default)
    Capture(CaptureArgs),

    /// Write the sample capture configuration
    Init {
        /// Replace an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Back up the configuration and sort its categories
    Sort {
        /// Sort Z to A
        #[arg(long)]
        descending: bool,
    },

    /// Load the configuration and list its categories
    Check,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CaptureArgs {
    /// Host variable, overriding the configuration's variables (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// JSON array of answers to use instead of interactive prompts
    #[arg(long, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    /// Load the configuration and seed variables without prompting
    #[arg(long)]
    pub skip_capture: bool,

    /// Print all session variables as JSON afterwards
    #[arg(long)]
    pub print_vars: bool,

    /// Abort when a required yes/no question gets no answer
    #[arg(long)]
    pub strict_yes_no: bool,
}

impl Cli {
    /// Settings overrides from the global options and the command
    pub fn overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            config_path: self.config.clone(),
            date_format: self.date_format.clone(),
            time_format: self.time_format.clone(),
            exported_separator: self.separator.clone(),
            debug: self.debug.then_some(true),
            ..Default::default()
        };
        match &self.command {
            Some(Commands::Capture(args)) => {
                overrides.skip_capture = args.skip_capture.then_some(true);
                overrides.strict_yes_no = args.strict_yes_no.then_some(true);
            }
            Some(Commands::Sort { descending }) => {
                overrides.sort_ascending = descending.then_some(false);
            }
            Some(Commands::Init { .. }) | Some(Commands::Check) | None => {}
        }
        overrides
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_capture() {
        let cli = Cli::parse_from(["capturekit"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.overrides(), SettingsOverrides::default());
    }

    #[test]
    fn test_capture_options() {
        let cli = Cli::parse_from([
            "capturekit",
            "--config",
            "cfg/capture.json",
            "capture",
            "--var",
            "who=me",
            "--var",
            "empty=",
            "--skip-capture",
        ]);
        let Some(Commands::Capture(args)) = &cli.command else {
            panic!("expected capture command");
        };
        assert_eq!(
            args.vars,
            vec![
                ("who".to_string(), "me".to_string()),
                ("empty".to_string(), String::new())
            ]
        );
        let overrides = cli.overrides();
        assert_eq!(overrides.config_path.as_deref(), Some("cfg/capture.json"));
        assert_eq!(overrides.skip_capture, Some(true));
        assert_eq!(overrides.strict_yes_no, None);
    }

    #[test]
    fn test_sort_descending_override() {
        let cli = Cli::parse_from(["capturekit", "sort", "--descending", "--debug"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.sort_ascending, Some(false));
        assert_eq!(overrides.debug, Some(true));
    }

    #[test]
    fn test_invalid_var_rejected() {
        assert!(Cli::try_parse_from(["capturekit", "capture", "--var", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["capturekit", "capture", "--var", "=x"]).is_err());
    }
}
