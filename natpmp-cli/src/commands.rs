//! Define the natpmp commands.

use std::{net::Ipv4Addr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use natpmp::{Client, MapProtocol, PortMapResponse};

use crate::config::CliConfig;

/// Talk to a NAT-PMP gateway.
///
/// Without `--gateway` the default gateway is discovered from the routing table of this
/// host. Every request is retried until the gateway answers or the attempts are exhausted.
#[derive(Parser, Debug, Clone)]
#[clap(version)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Commands,
    /// Path to the config file. Defaults to `natpmp.config.toml` in the config directory.
    #[clap(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Number of attempts before considering that the gateway does not support NAT-PMP.
    #[clap(long, global = true)]
    pub(crate) attempts: Option<u32>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Request a mapping from a public port of the gateway to a port of this host.
    ///
    /// The gateway may grant a different public port, which is the one printed.
    /// Requesting an existing mapping again renews it.
    Map {
        /// Map a UDP port instead of a TCP one.
        #[clap(short, long)]
        udp: bool,
        /// Lifetime of the mapping in seconds.
        #[clap(short, long)]
        lifetime: Option<u32>,
        #[clap(short, long)]
        gateway: Option<Ipv4Addr>,
        public_port: u16,
        private_port: u16,
    },
    /// Print the public address of the gateway.
    Address {
        #[clap(short, long)]
        gateway: Option<Ipv4Addr>,
    },
    /// Release the mapping of a port of this host.
    ///
    /// A port of 0 releases every mapping of this host.
    Release {
        /// Release a UDP mapping instead of a TCP one.
        #[clap(short, long)]
        udp: bool,
        #[clap(short, long)]
        gateway: Option<Ipv4Addr>,
        private_port: u16,
    },
    /// Print the discovered default gateway.
    Gateway,
}

impl Cli {
    pub(crate) async fn run(self) -> Result<()> {
        let mut config = CliConfig::load(self.config.as_deref()).await?;
        if let Some(attempts) = self.attempts {
            config.attempts = attempts;
        }
        let client = Client::new(config.client_config());

        match self.command {
            Commands::Map {
                udp,
                lifetime,
                gateway,
                public_port,
                private_port,
            } => {
                let proto = protocol(udp);
                let lifetime = lifetime.unwrap_or(config.lifetime);
                let response = client
                    .map_port(
                        proto,
                        public_port,
                        private_port,
                        lifetime,
                        gateway.or(config.gateway),
                    )
                    .await?;
                println!("{}", describe_mapping(proto, &response));
            }
            Commands::Address { gateway } => {
                let public_ip = client.public_address(gateway.or(config.gateway)).await?;
                println!("{public_ip}");
            }
            Commands::Release {
                udp,
                gateway,
                private_port,
            } => {
                client
                    .release_mapping(protocol(udp), private_port, gateway.or(config.gateway))
                    .await?;
            }
            Commands::Gateway => {
                let gateway = natpmp::discover_gateway().await?;
                println!("{gateway}");
            }
        }
        Ok(())
    }
}

fn describe_mapping(proto: MapProtocol, response: &PortMapResponse) -> String {
    format!(
        "{proto} {} -> {} for {}s (gateway epoch {}s)",
        response.external_port,
        response.private_port,
        response.lifetime_seconds,
        response.header.epoch_time
    )
}

fn protocol(udp: bool) -> MapProtocol {
    if udp { MapProtocol::Udp } else { MapProtocol::Tcp }
}
