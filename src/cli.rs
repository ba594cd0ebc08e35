//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Cohort Assistant - loan portfolio analytics with an AI data assistant
///
/// Loads the pre-computed cohort summary, shows the portfolio figures and
/// the executive insights, and answers questions about them through a
/// hosted Gemini model.
///
/// Examples:
///   cohort-assistant
///   cohort-assistant --table
///   cohort-assistant --ask "Which are the top 3 best loan portfolios?"
///   cohort-assistant --export-html dashboard.html
///   cohort-assistant --show-prompt
///   cohort-assistant --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the cohort summary CSV
    ///
    /// Defaults to "Data summary.csv" or the value in .cohort-assistant.toml.
    #[arg(short, long, value_name = "FILE", env = "COHORT_ASSISTANT_DATA")]
    pub data: Option<PathBuf>,

    /// Preferred model (substring of the model name, e.g. 1.5-flash)
    #[arg(short, long, env = "COHORT_ASSISTANT_MODEL")]
    pub model: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cohort-assistant.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the raw cohort table and exit
    #[arg(long)]
    pub table: bool,

    /// Print the executive insights and exit
    #[arg(long)]
    pub insights: bool,

    /// Print the assembled system prompt without calling the model
    #[arg(long)]
    pub show_prompt: bool,

    /// Ask a single question and exit
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Write the dashboard page as a standalone HTML file and exit
    #[arg(long, value_name = "FILE")]
    pub export_html: Option<PathBuf>,

    /// Save the chat transcript (Markdown) when the session ends
    #[arg(long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for model responses (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Most recent messages sent with each request (0 = entire session)
    #[arg(long, value_name = "COUNT")]
    pub max_history: Option<usize>,

    /// Generate a default .cohort-assistant.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let exclusive_modes = [
            self.table,
            self.insights,
            self.show_prompt,
            self.ask.is_some(),
            self.export_html.is_some(),
        ];
        if exclusive_modes.iter().filter(|m| **m).count() > 1 {
            return Err(
                "Use only one of --table, --insights, --show-prompt, --ask, --export-html"
                    .to_string(),
            );
        }

        if let Some(ref question) = self.ask {
            if question.trim().is_empty() {
                return Err("Question passed to --ask is empty".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: None,
            model: None,
            config: None,
            verbose: false,
            quiet: false,
            table: false,
            insights: false,
            show_prompt: false,
            ask: None,
            export_html: None,
            transcript: None,
            timeout: None,
            temperature: None,
            max_history: None,
            init_config: false,
        }
    }

    #[test]
    fn test_default_args_are_valid() {
        let args = make_args();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_exclusive_modes() {
        let mut args = make_args();
        args.table = true;
        args.ask = Some("Top cohorts?".to_string());
        assert!(args.validate().is_err());

        args.table = false;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_question() {
        let mut args = make_args();
        args.ask = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        args.timeout = Some(30);
        args.temperature = Some(3.0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::WARN);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::parse_from(["cohort-assistant", "--ask", "hello", "--max-history", "10"]);
        assert_eq!(args.ask.as_deref(), Some("hello"));
        assert_eq!(args.max_history, Some(10));
    }
}
