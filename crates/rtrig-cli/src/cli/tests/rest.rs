//! Tests for get, crumb, job-url, servers and global options.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_get() {
    match parse(&["rtrig", "get", "/job/a/api/json"]) {
        CliCommand::Get { url, server, raw } => {
            assert_eq!(url, "/job/a/api/json");
            assert!(server.is_none());
            assert!(!raw);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_raw() {
    match parse(&["rtrig", "get", "http://h/x", "--raw", "--server", "ci"]) {
        CliCommand::Get { raw, server, .. } => {
            assert!(raw);
            assert_eq!(server.as_deref(), Some("ci"));
        }
        _ => panic!("expected Get --raw"),
    }
}

#[test]
fn cli_parse_crumb() {
    match parse(&["rtrig", "crumb", "--no-cache"]) {
        CliCommand::Crumb { server, no_cache } => {
            assert!(server.is_none());
            assert!(no_cache);
        }
        _ => panic!("expected Crumb"),
    }
}

#[test]
fn cli_parse_job_url() {
    match parse(&["rtrig", "job-url", "a/b", "--server", "ci"]) {
        CliCommand::JobUrl { job, server } => {
            assert_eq!(job, "a/b");
            assert_eq!(server.as_deref(), Some("ci"));
        }
        _ => panic!("expected JobUrl"),
    }
}

#[test]
fn cli_parse_servers() {
    match parse(&["rtrig", "servers"]) {
        CliCommand::Servers => {}
        _ => panic!("expected Servers"),
    }
}

#[test]
fn cli_parse_global_config() {
    let cli = Cli::try_parse_from(["rtrig", "servers", "--config", "/etc/rtrig.toml"]).unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/etc/rtrig.toml"))
    );
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["rtrig", "status"]).is_err());
}
