//! `fslreset` -- reset a user's profile containers.
//!
//! Stops the profile agent service, deletes the user's local cache
//! folders, optionally deletes the user's containers on the configured
//! remote shares, and restarts the service. Must run elevated.
//!
//! # Environment variables
//!
//! | Variable                   | Default                          | Description                              |
//! |----------------------------|----------------------------------|------------------------------------------|
//! | `FSL_SERVICE_NAME`         | `frxsvc`                         | Agent service to stop and restart        |
//! | `FSL_CACHE_ROOT`           | `C:\ProgramData\FSLogix`         | Base directory of the local caches       |
//! | `FSL_CACHE_CATEGORIES`     | `Cache,Proxy`                    | Cache subfolders holding per-SID folders |
//! | `FSL_PROFILE_CONFIG_KEY`   | `SOFTWARE\FSLogix\Profiles`      | Profile container configuration root     |
//! | `FSL_OFFICE_CONFIG_KEY`    | `SOFTWARE\Policies\FSLogix\ODFC` | Office container configuration root      |
//! | `FSL_LOCATIONS_VALUE`      | `VHDLocations`                   | Value listing the remote share locations |
//! | `FSL_PROFILE_LOCATIONS`    | --                               | `;`-separated profile shares (skips the registry) |
//! | `FSL_OFFICE_LOCATIONS`     | --                               | `;`-separated office shares (skips the registry)  |
//! | `FSL_STOP_TIMEOUT_SECS`    | `15`                             | Bounded wait for the service to stop     |
//! | `FSL_POLL_INTERVAL_MS`     | `500`                            | Status poll interval while stopping      |
//! | `FSL_COMMAND_TIMEOUT_SECS` | `60`                             | Upper bound on any external command      |
//! | `RUST_LOG`                 | `fslreset_cli=info,fslreset_core=info` | Log filter                         |
//!
//! # Exit codes
//!
//! `0` when the procedure ran (individual steps may still have failed;
//! see the summary), `2` for usage errors, `3` when not elevated, `4` when
//! the identity cannot be resolved, `5` for invalid configuration, `6`
//! when the privilege level cannot be determined, `1` for anything else.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fslreset_cli::cli::Args;
use fslreset_cli::output::render_summary;
use fslreset_cli::system::{
    CommandRunner, LocalFileSystem, RegistryConfig, SystemIdentities, SystemPrivileges,
    SystemServices,
};
use fslreset_core::error::{EXIT_CONFIG, EXIT_IDENTITY};
use fslreset_core::{run_reset, Facilities, ResetConfig};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_json);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fslreset failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fslreset_cli=info,fslreset_core=info".into());

    let (text, json) = if json {
        (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let mut config = match ResetConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    args.apply_overrides(&mut config);

    let request = match args.request() {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Invalid identity");
            return Ok(ExitCode::from(EXIT_IDENTITY));
        }
    };

    let runner =
        CommandRunner::new(config.command_timeout).context("Failed to start command runtime")?;
    let privileges = SystemPrivileges::new(&runner);
    let services = SystemServices::new(&runner);
    let identities = SystemIdentities::new(&runner);
    let facilities = Facilities {
        privileges: &privileges,
        services: &services,
        config_source: &RegistryConfig,
        fs: &LocalFileSystem,
        identities: &identities,
    };

    let report = match run_reset(&request, &config, &facilities) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Reset aborted");
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print!("{}", render_summary(&report));
    }

    Ok(ExitCode::SUCCESS)
}
