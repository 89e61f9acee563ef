//! `rtrig job-url <job>` – print a job's URL.

use anyhow::Result;
use rtrig_core::config::RtrigConfig;
use rtrig_core::url_model::generate_job_url;

pub fn run_job_url(cfg: &RtrigConfig, job: &str, server: Option<&str>) -> Result<()> {
    let server = cfg.server(server)?.to_remote_server();
    println!("{}", generate_job_url(&server, job)?);
    Ok(())
}
