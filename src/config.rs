use std::{fs::read_to_string, net::Ipv4Addr};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use serde::Deserialize;

/// The tunnel section resolved from flags and file.
#[derive(Debug)]
pub struct Tunnel {
    /// tunnel network address
    ///
    /// the network the tunnel carries; packets destined to hosts of
    /// this network hop over registered peers.
    pub network: Ipv4Addr,

    /// tunnel netmask
    pub netmask: Ipv4Addr,

    /// local address
    ///
    /// the address assigned to the local TUN interface; traffic
    /// addressed to it is delivered to the kernel.
    pub address: Ipv4Addr,

    /// TUN device name
    pub device: String,

    /// TCP port
    ///
    /// the port the server listens on, and the port a client connects
    /// to.
    pub port: u16,

    /// server address
    ///
    /// when present the process runs in client mode and connects to
    /// this server instead of listening.
    pub connect: Option<Ipv4Addr>,
}

#[derive(Deserialize, Debug)]
pub struct Router {
    /// event batch capacity
    ///
    /// the number of readiness events drained from the kernel facility
    /// per wait.
    #[serde(default = "Router::max_concurrent")]
    pub max_concurrent: usize,

    /// readiness wait timeout, in milliseconds
    ///
    /// a wait that reports no events within this window ends the tick;
    /// the supervisory loop re-enters immediately.
    #[serde(default = "Router::wait_timeout")]
    pub wait_timeout: u64,
}

impl Router {
    fn max_concurrent() -> usize {
        32
    }

    fn wait_timeout() -> u64 {
        100
    }
}

impl Default for Router {
    fn default() -> Self {
        Self {
            max_concurrent: Self::max_concurrent(),
            wait_timeout: Self::wait_timeout(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Log {
    /// log level
    ///
    /// An enum representing the available verbosity levels of the
    /// logger.
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug)]
pub struct Config {
    pub tunnel: Tunnel,
    pub router: Router,
    pub log: Log,
}

/// The tunnel section as it appears in a configuration file; every
/// field is optional there because flags may supply it instead.
#[derive(Deserialize, Debug, Default)]
struct FileTunnel {
    network: Option<Ipv4Addr>,
    netmask: Option<Ipv4Addr>,
    address: Option<Ipv4Addr>,
    device: Option<String>,
    port: Option<u16>,
    connect: Option<Ipv4Addr>,
}

#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    #[serde(default)]
    tunnel: FileTunnel,
    #[serde(default)]
    router: Router,
    #[serde(default)]
    log: Log,
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// specify the configuration file path.
    #[arg(long)]
    config: Option<String>,

    /// tunnel network address.
    #[arg(long)]
    network: Option<Ipv4Addr>,

    /// tunnel netmask.
    #[arg(long)]
    netmask: Option<Ipv4Addr>,

    /// local address inside the tunnel network.
    #[arg(long)]
    address: Option<Ipv4Addr>,

    /// TUN device name.
    #[arg(long)]
    device: Option<String>,

    /// TCP port to listen on, or to connect to in client mode.
    #[arg(long)]
    port: Option<u16>,

    /// run as a client and connect to this server.
    #[arg(long)]
    connect: Option<Ipv4Addr>,
}

impl Config {
    /// Load command line parameters, merged over the configuration
    /// file when one is specified.  Explicit flags always win.
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();

        let file = match cli.config.as_deref() {
            Some(path) => {
                let source =
                    read_to_string(path).with_context(|| format!("read config file {}", path))?;
                serde_json5::from_str(&source).context("parse config file")?
            }
            None => FileConfig::default(),
        };

        Self::resolve(cli, file)
    }

    fn resolve(cli: Cli, file: FileConfig) -> Result<Self> {
        let config = Self {
            tunnel: Tunnel {
                network: cli
                    .network
                    .or(file.tunnel.network)
                    .context("--network is required")?,
                netmask: cli
                    .netmask
                    .or(file.tunnel.netmask)
                    .context("--netmask is required")?,
                address: cli
                    .address
                    .or(file.tunnel.address)
                    .context("--address is required")?,
                device: cli
                    .device
                    .or(file.tunnel.device)
                    .unwrap_or_else(|| "tun0".to_string()),
                port: cli.port.or(file.tunnel.port).unwrap_or(8080),
                connect: cli.connect.or(file.tunnel.connect),
            },
            router: file.router,
            log: file.log,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mask = u32::from(self.tunnel.netmask);
        ensure!(
            mask.leading_ones() == mask.count_ones(),
            "netmask {} is not contiguous",
            self.tunnel.netmask
        );

        ensure!(
            u32::from(self.tunnel.address) & mask == u32::from(self.tunnel.network) & mask,
            "address {} is outside network {}/{}",
            self.tunnel.address,
            self.tunnel.network,
            mask.count_ones()
        );

        // Client mode enumerates every host of the network into the
        // exact-match forwarding map.
        if self.tunnel.connect.is_some() {
            ensure!(
                mask.count_ones() >= 16,
                "client mode requires a prefix of at least /16, got /{}",
                mask.count_ones()
            );
        }

        ensure!(
            self.router.max_concurrent >= 1,
            "max_concurrent must be >= 1"
        );
        Ok(())
    }
}
