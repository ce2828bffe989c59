//! kiln's application entry point.
//! Parses the command line, builds the run options and hands a context to the
//! runner.

use kiln::{
    cli::{get_args, Commands},
    config::Options,
    context::Context,
    error::{default_error_handler, Result},
    runner::Runner,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    let level = if args.verbose {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(err) = run(args.command) {
        default_error_handler(err);
    }
}

fn run(command: Commands) -> Result<()> {
    let options = command.apply_to(Options::from_env());

    match command {
        Commands::Create {
            source,
            destination,
            values_file,
            ..
        } => {
            let mut context = Context::from_locators(&source, &destination, values_file, options)?;
            Runner::default().run(&mut context)
        }
        Commands::Config => {
            print!("{}", options.describe());
            Ok(())
        }
    }
}
