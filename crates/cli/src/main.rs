use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mesh_config::ControllerSettings;
use mesh_controller::{
    AuthorizationOracle, ControllerService, ErrorCode, Metadata, NetworkConfig, RequestOutcome,
    Transport, WhitelistOracle,
};
use mesh_crypto::{Address, Identity};
use mesh_networking::{mesh_address, AddressAssigner};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Name of the controller's secret key file inside the home directory
const IDENTITY_FILE: &str = "identity.secret";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Controller home directory (defaults to MESH_HOME, ZT_HOME, then ".")
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the controller identity, creating it if missing
    Identity,
    /// Show the address a member receives on a network
    Address {
        /// Network id (16 hex digits)
        #[arg(value_parser = parse_network_id)]
        network_id: u64,
        /// Member address (10 hex digits)
        member: Address,
    },
    /// Ask the whitelist whether a member may join
    Check {
        #[arg(value_parser = parse_network_id)]
        network_id: u64,
        member: Address,
    },
    /// Run a full join request and print the reply as JSON
    Issue {
        #[arg(value_parser = parse_network_id)]
        network_id: u64,
        /// Member secret key file; a throwaway identity is used if omitted
        #[arg(long)]
        member_key: Option<PathBuf>,
        /// Request id echoed in the reply
        #[arg(long, default_value_t = 1)]
        request_id: u64,
    },
    /// Re-read the whitelist and report whether it parses
    Reload,
}

fn parse_network_id(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim_start_matches("0x");
    if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("expected up to 16 hex digits, got {:?}", s));
    }
    u64::from_str_radix(s, 16).map_err(|e| e.to_string())
}

/// Reply printed by `issue`
#[derive(Serialize)]
#[serde(tag = "reply", rename_all = "lowercase")]
enum Reply<'a> {
    Config {
        network_id: String,
        request_id: u64,
        recipient: Address,
        config: &'a NetworkConfig,
    },
    Error {
        network_id: String,
        request_id: u64,
        recipient: Address,
        code: ErrorCode,
    },
}

/// Transport that writes replies to stdout
struct StdoutTransport;

impl StdoutTransport {
    fn print(reply: &Reply<'_>) {
        match serde_json::to_string_pretty(reply) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode reply: {}", e),
        }
    }
}

impl Transport for StdoutTransport {
    fn send_config(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        config: NetworkConfig,
        _use_legacy_format: bool,
    ) {
        Self::print(&Reply::Config {
            network_id: format!("{:016x}", network_id),
            request_id,
            recipient,
            config: &config,
        });
    }

    fn send_error(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        error_code: ErrorCode,
        _payload: &[u8],
    ) {
        Self::print(&Reply::Error {
            network_id: format!("{:016x}", network_id),
            request_id,
            recipient,
            code: error_code,
        });
    }
}

fn load_settings(home: Option<PathBuf>) -> Result<ControllerSettings> {
    let mut settings = ControllerSettings::from_env().context("failed to load controller settings")?;
    if let Some(home) = home {
        settings.home_path = home;
    }
    Ok(settings)
}

fn controller_identity(settings: &ControllerSettings) -> Result<Identity> {
    let path = settings.home_path.join(IDENTITY_FILE);
    Identity::load_or_generate(&path)
        .with_context(|| format!("failed to load identity from {}", path.display()))
}

fn whitelist_oracle(settings: &ControllerSettings, identity: &Identity) -> Result<WhitelistOracle> {
    let oracle = WhitelistOracle::new(settings.whitelist_file.clone());
    oracle
        .init(identity.address().to_u64(), &settings.home_path)
        .context("failed to load whitelist")?;
    Ok(oracle)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.home)?;

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Identity => {
            let identity = controller_identity(&settings)?;
            println!("{}", identity);
        }
        Commands::Address { network_id, member } => {
            let assigner = AddressAssigner::new();
            let bytes = mesh_address(network_id, member.to_u64()).octets();
            println!("address: {}", assigner.derive_address(bytes));
            println!("route:   {}", assigner.derive_route_target(bytes));
        }
        Commands::Check { network_id, member } => {
            let identity = controller_identity(&settings)?;
            let oracle = whitelist_oracle(&settings, &identity)?;
            let decision = oracle.check(network_id, member.to_u64());
            if decision.authorized {
                let address = AddressAssigner::new().derive_address(decision.assigned_address_bytes);
                println!("authorized: {}", address);
            } else {
                println!("denied");
            }
        }
        Commands::Issue { network_id, member_key, request_id } => {
            let identity = controller_identity(&settings)?;
            let member = match member_key {
                Some(path) => Identity::load(&path)
                    .with_context(|| format!("failed to load member key {}", path.display()))?,
                None => Identity::generate(),
            };
            info!("issuing for member {}", member.address());

            let service = ControllerService::init(
                identity,
                Arc::new(StdoutTransport),
                Arc::new(WhitelistOracle::new(settings.whitelist_file.clone())),
                &settings,
            )?;
            let outcome = service.request(network_id, None, request_id, &member.public_only(), &Metadata::new());
            if outcome != RequestOutcome::Delivered {
                std::process::exit(1);
            }
        }
        Commands::Reload => {
            let identity = controller_identity(&settings)?;
            whitelist_oracle(&settings, &identity)?;
            println!("whitelist ok: {}", settings.whitelist_path().display());
        }
    }

    Ok(())
}
