//! CLI for triggering jobs on a remote build server.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rtrig_core::config;
use std::path::PathBuf;

use commands::{run_crumb, run_get, run_job_url, run_servers, run_trigger, TriggerArgs};

/// Top-level CLI for rtrig.
#[derive(Debug, Parser)]
#[command(name = "rtrig")]
#[command(about = "rtrig: trigger and query jobs on a remote build server", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/rtrig/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Trigger builds of one or more remote jobs.
    Trigger {
        /// Job names (folders separated by `/`) or absolute job URLs. Several
        /// jobs are triggered concurrently, bounded by `max_concurrent_calls`.
        #[arg(required = true, num_args = 1..)]
        jobs: Vec<String>,
        /// Configured server to use (required when several are configured).
        #[arg(long)]
        server: Option<String>,
        /// Job's remote trigger token.
        #[arg(long, default_value = "")]
        token: String,
        /// Build parameter; repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        /// File parameter uploaded from a local path; repeatable.
        #[arg(long = "file", value_name = "KEY=PATH", value_parser = parse_key_value)]
        files: Vec<(String, String)>,
        /// Use the parameterized trigger endpoint even without parameters.
        #[arg(long)]
        parameterized: bool,
        /// Retries after the first attempt (default from config).
        #[arg(long, value_name = "N")]
        retry_limit: Option<u32>,
        /// Seconds between attempts (default from config).
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,
        /// Expand `${NAME}` in job, token and parameters from the environment.
        #[arg(long)]
        expand_env: bool,
    },

    /// GET a URL (absolute, or a path on the server) and print the response.
    Get {
        url: String,
        #[arg(long)]
        server: Option<String>,
        /// Print the body as received instead of pretty JSON.
        #[arg(long)]
        raw: bool,
    },

    /// Ask the server for its CSRF crumb.
    Crumb {
        #[arg(long)]
        server: Option<String>,
        /// Bypass the crumb cache.
        #[arg(long)]
        no_cache: bool,
    },

    /// Print the URL of a job.
    JobUrl {
        job: String,
        #[arg(long)]
        server: Option<String>,
    },

    /// List configured servers.
    Servers,
}

/// `KEY=VALUE` with a non-empty key; the value may be empty or contain `=`.
fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Trigger {
                jobs,
                server,
                token,
                params,
                files,
                parameterized,
                retry_limit,
                poll_interval,
                expand_env,
            } => run_trigger(
                &cfg,
                &TriggerArgs {
                    jobs,
                    server,
                    token,
                    params,
                    files,
                    parameterized,
                    retry_limit,
                    poll_interval,
                    expand_env,
                },
            )?,
            CliCommand::Get { url, server, raw } => run_get(&cfg, &url, server.as_deref(), raw)?,
            CliCommand::Crumb { server, no_cache } => run_crumb(&cfg, server.as_deref(), no_cache)?,
            CliCommand::JobUrl { job, server } => run_job_url(&cfg, &job, server.as_deref())?,
            CliCommand::Servers => run_servers(&cfg),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
