use clap::Parser;
use proptest::prelude::*;
use reqlog_cli::{Args, Command};
use std::path::PathBuf;

// File names without leading hyphens so they are never taken for flags
fn arb_file_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,30}"
}

#[test]
fn test_fields_defaults() {
    let args = Args::try_parse_from(["reqlog", "fields"]).unwrap();
    assert_eq!(args.command, Command::Fields);
    assert_eq!(args.log_level, "warn");
    assert!(!args.json_logs);
}

#[test]
fn test_global_flags_after_subcommand() {
    let args = Args::try_parse_from([
        "reqlog",
        "scope",
        "--logs",
        "logs.json",
        "--scope",
        "scope.json",
        "--log-level",
        "debug",
        "--json-logs",
    ])
    .unwrap();

    assert_eq!(args.log_level, "debug");
    assert!(args.json_logs);
    assert_eq!(args.logging_config().level, "debug");
}

#[test]
fn test_search_requires_expression() {
    assert!(Args::try_parse_from(["reqlog", "search", "--logs", "logs.json"]).is_err());
}

#[test]
fn test_filter_options_are_optional() {
    let args = Args::try_parse_from(["reqlog", "filter", "--logs", "logs.json"]).unwrap();
    assert_eq!(
        args.command,
        Command::Filter {
            logs: PathBuf::from("logs.json"),
            scope: None,
            expr: None,
        }
    );
}

proptest! {
    /// Any plain file name is accepted for the search inputs
    #[test]
    fn prop_search_paths_parse(logs in arb_file_name(), expr in arb_file_name()) {
        let parsed = Args::try_parse_from(["reqlog", "search", "--logs", logs.as_str(), "--expr", expr.as_str()]);
        prop_assert!(parsed.is_ok(), "Failed to parse search paths: {} {}", logs, expr);

        let args = parsed.unwrap();
        prop_assert_eq!(
            args.command,
            Command::Search {
                logs: PathBuf::from(&logs),
                expr: PathBuf::from(&expr),
            }
        );
    }
}
