//! Command-line interface implementation for kiln.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Options;

/// Command-line arguments structure for kiln.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "kiln: render a template tree into a new project",
    long_about = None
)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project from a template
    Create {
        /// Path to the template directory, or a git repository (`git+<url>`, https, ssh)
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Directory where the project is created; must be missing or empty
        #[arg(value_name = "DESTINATION")]
        destination: PathBuf,

        /// Values document merged over the template's default values
        #[arg(long = "values", value_name = "FILE")]
        values_file: Option<PathBuf>,

        /// Render without creating the destination or running hooks
        #[arg(long)]
        dry_run: bool,

        /// Directory holding clones of remote templates
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Suffix marking files whose content is rendered
        #[arg(long, value_name = "EXT")]
        marker_ext: Option<String>,

        /// Seconds allowed for cloning a remote template
        #[arg(long, value_name = "SECS")]
        fetch_timeout: Option<u64>,
    },

    /// Show the effective configuration
    Config,
}

impl Commands {
    /// Applies command-line overrides on top of `options`.
    pub fn apply_to(&self, mut options: Options) -> Options {
        if let Commands::Create {
            dry_run,
            cache_dir,
            marker_ext,
            fetch_timeout,
            ..
        } = self
        {
            options.dry_run = *dry_run;
            if let Some(dir) = cache_dir {
                options.template_cache_dir = dir.clone();
            }
            if let Some(ext) = marker_ext {
                options = options.with_marker_ext(ext);
            }
            if let Some(secs) = fetch_timeout {
                options.fetch_timeout = Duration::from_secs(*secs);
            }
        }
        options
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument
                || e.kind() == ErrorKind::MissingSubcommand
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
