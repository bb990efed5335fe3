use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream},
    os::fd::{AsRawFd, RawFd},
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::Result;
use engine::{l3::L3Peer, poll::Interest, router::Router};

/// Accept inbound TCP peers and hand them to the router.
///
/// Accepting blocks on its own thread; each accepted socket is switched
/// to non-blocking mode and registered as a learning peer, so its first
/// datagram teaches the forwarding map where its tunnel address lives.
pub fn spawn(router: Arc<Router>, port: u16) -> Result<JoinHandle<()>> {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
    log::info!("tcp listener bound: interface={}", listener.local_addr()?);

    Ok(thread::spawn(move || {
        loop {
            let (stream, address) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::warn!("tcp accept error: {}", e);
                    continue;
                }
            };

            if let Err(e) = stream.set_nonblocking(true) {
                log::warn!("tcp socket setup failed: addr={}, error={}", address, e);
                continue;
            }

            log::info!("tcp socket accept: addr={}", address);

            let peer = Arc::new(L3Peer::owned(stream, address).learning());
            if let Err(e) = router.register(peer, Interest::READABLE) {
                log::warn!("tcp peer registration failed: addr={}, error={}", address, e);
            }
        }
    }))
}

/// Client mode: connect out to the server and register the connection
/// as a forwarding peer.
pub fn connect(router: &Router, server: Ipv4Addr, port: u16) -> Result<RawFd> {
    let stream = TcpStream::connect(SocketAddr::from((server, port)))?;
    stream.set_nonblocking(true)?;

    let address = stream.peer_addr()?;
    let socket = stream.as_raw_fd();

    router.register(Arc::new(L3Peer::owned(stream, address)), Interest::READABLE)?;
    log::info!("tcp server connected: addr={}", address);

    Ok(socket)
}
