// Copyright takubokudori.
// This source code is licensed under the MIT or Apache-2.0 license.
//! labvirt CLI
use clap::{Parser, Subcommand};
use labvirt::{
    config::LabConfig,
    libvirt::{ConnectionManager, Lifecycle},
    preflight::Preflight,
    provider::Provider,
    types::{LifecycleOutcome, VmResult},
};
use serde::Serialize;
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "labvirt")]
#[command(about = "libvirt lab provider controller", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the provider prerequisites
    Check {
        /// Provider name (libvirt, vagrant-libvirt)
        #[arg(short, long, default_value = "libvirt")]
        provider: String,
    },
    /// Show the state of the lab VMs
    Status,
    /// Start a VM
    Start { name: String },
    /// Request a graceful shutdown of a VM
    Stop { name: String },
    /// Power off a VM immediately
    Destroy { name: String },
    /// List the supported providers
    Providers,
}

#[derive(Serialize)]
struct ProviderInfo {
    name: &'static str,
    default_provisioner: &'static str,
    allowed_provisioners: Vec<&'static str>,
}

fn print_json<T: Serialize>(v: &T) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(x) => log::error!("Failed to serialize output: {}", x),
    }
}

fn lifecycle(config: LabConfig) -> VmResult<Lifecycle> {
    Ok(Lifecycle::new(ConnectionManager::system()?, config))
}

fn outcome(r: VmResult<LifecycleOutcome>, json: bool) -> bool {
    match r {
        Ok(x) => {
            if json {
                print_json(&x);
            }
            true
        }
        Err(_) => false,
    }
}

fn run(cli: Cli) -> VmResult<bool> {
    let config = match &cli.config {
        Some(path) => LabConfig::from_file(path)?,
        None => LabConfig::new(),
    };
    let json = cli.json;
    let ok = match cli.command {
        Commands::Check { provider } => match provider.parse::<Provider>()? {
            Provider::Libvirt => {
                let report =
                    Preflight::new(ConnectionManager::system().ok(), config).run();
                if json {
                    print_json(&report);
                }
                report.passed()
            }
            p => p.check(None, &config),
        },
        Commands::Status => {
            let v = lifecycle(config)?.status()?;
            if json {
                print_json(&v);
            }
            true
        }
        Commands::Start { name } => outcome(lifecycle(config)?.start(&name), json),
        Commands::Stop { name } => outcome(lifecycle(config)?.stop(&name), json),
        Commands::Destroy { name } => outcome(lifecycle(config)?.destroy(&name), json),
        Commands::Providers => {
            let v: Vec<_> = Provider::ALL
                .iter()
                .map(|p| ProviderInfo {
                    name: p.name(),
                    default_provisioner: p.default_provisioner().as_str(),
                    allowed_provisioners: p
                        .allowed_provisioners()
                        .iter()
                        .map(|x| x.as_str())
                        .collect(),
                })
                .collect();
            if json {
                print_json(&v);
            } else {
                for p in &v {
                    println!(
                        "{} (default: {}, allowed: {})",
                        p.name,
                        p.default_provisioner,
                        p.allowed_provisioners.join(", ")
                    );
                }
            }
            true
        }
    };
    Ok(ok)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(x) => {
            log::error!("{}", x);
            ExitCode::FAILURE
        }
    }
}
