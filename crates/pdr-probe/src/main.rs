use anyhow::{Context, Result};
use clap::Command;
use log::LevelFilter;
use std::env;
use std::io;
use std::process::ExitCode;

use pdr_probe::probe::transport::{BASE_URL, BASE_URL_ENV};
use pdr_probe::{ConnectivityProbe, ProbeReport, ReqwestTransport};

fn main() -> ExitCode {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PDR_LOG", "error,pdr_probe=info"))
        .init();

    let _matches = Command::new("binance-probe")
        .version(clap::crate_version!())
        .about("Check that the Binance public REST API is reachable from this host")
        .after_help(format!(
            "Probes {} unless {} is set. Exits 0 when every check passes, 1 otherwise.",
            BASE_URL, BASE_URL_ENV
        ))
        .get_matches();

    match run() {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ProbeReport> {
    let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| BASE_URL.to_string());
    log::debug!("Probing {}", base_url);

    let transport = ReqwestTransport::new(&base_url).context("Failed to set up HTTP transport")?;
    let probe = ConnectivityProbe::new(transport);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    probe.run(&mut out).context("Failed to write probe report")
}
