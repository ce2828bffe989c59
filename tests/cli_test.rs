use clap::Parser;
use kiln::cli::{Args, Commands};
use kiln::config::Options;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("kiln")];
    res.extend(args.iter().map(OsString::from));
    res
}

#[test]
fn test_basic_args() {
    let args = make_args(&["create", "./template", "./output"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(!parsed.verbose);
    match parsed.command {
        Commands::Create {
            source,
            destination,
            values_file,
            dry_run,
            ..
        } => {
            assert_eq!(source, "./template");
            assert_eq!(destination, PathBuf::from("./output"));
            assert!(values_file.is_none());
            assert!(!dry_run);
        }
        _ => panic!("Expected create command"),
    }
}

#[test]
fn test_all_flags() {
    let args = make_args(&[
        "-v",
        "create",
        "--values",
        "my-values.yaml",
        "--dry-run",
        "--cache-dir",
        "/tmp/kiln-cache",
        "--marker-ext",
        "j2",
        "--fetch-timeout",
        "10",
        "git+https://example.com/scaffold.git",
        "./output",
    ]);
    let parsed = Args::try_parse_from(args).unwrap();
    assert!(parsed.verbose);

    let options = parsed.command.apply_to(Options::default());
    assert!(options.dry_run);
    assert_eq!(
        options.template_cache_dir,
        PathBuf::from("/tmp/kiln-cache")
    );
    assert_eq!(options.template_marker_ext, ".j2");
    assert_eq!(options.fetch_timeout, Duration::from_secs(10));

    match parsed.command {
        Commands::Create {
            source,
            values_file,
            ..
        } => {
            assert_eq!(source, "git+https://example.com/scaffold.git");
            assert_eq!(values_file, Some(PathBuf::from("my-values.yaml")));
        }
        _ => panic!("Expected create command"),
    }
}

#[test]
fn test_config_command() {
    let parsed = Args::try_parse_from(make_args(&["config", "--verbose"])).unwrap();
    assert!(parsed.verbose);
    assert!(matches!(parsed.command, Commands::Config));

    let options = parsed.command.apply_to(Options::default());
    assert!(!options.dry_run);
}

#[test]
fn test_missing_args() {
    let args = make_args(&["create", "./template"]);
    assert!(Args::try_parse_from(args).is_err());
}

#[test]
fn test_too_many_args() {
    let args = make_args(&["create", "./template", "./output", "extra"]);
    assert!(Args::try_parse_from(args).is_err());
}
