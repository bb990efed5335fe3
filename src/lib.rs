pub mod config;
pub mod listener;
pub mod policy;
pub mod tunnel;

use std::{net::SocketAddr, os::fd::AsRawFd, sync::Arc, time::Duration};

use anyhow::Result;
use engine::{Error, l3::L3Peer, poll::Interest, router::Router};

use crate::config::Config;

/// In order to let integration tests start the tunnel directly from
/// this crate, a function is opened to replace the main function.
pub fn server_main(config: Config) -> Result<()> {
    let router = Arc::new(Router::new(
        config.router.max_concurrent,
        Duration::from_millis(config.router.wait_timeout),
    )?);

    let device = tunnel::create(&config)?;
    let tun = device.as_raw_fd();

    let peer = Arc::new(L3Peer::new(
        tun,
        SocketAddr::from((config.tunnel.address, 0)),
    ));
    router.register(peer, Interest::READABLE)?;
    policy::install_local(router.forwarding(), config.tunnel.address, tun);

    let _listener = match config.tunnel.connect {
        Some(server) => {
            let socket = listener::connect(&router, server, config.tunnel.port)?;
            policy::install_network(
                router.forwarding(),
                config.tunnel.network,
                config.tunnel.netmask,
                config.tunnel.address,
                socket,
            );
            None
        }
        None => Some(listener::spawn(router.clone(), config.tunnel.port)?),
    };

    // One call to run is one tick; re-enter until the loop is asked to
    // stop.  Setup-class failures propagate and exit nonzero.
    loop {
        match router.run() {
            Ok(()) => continue,
            Err(Error::Interrupted) => break,
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("router interrupted, shutting down");
    Ok(())
}
