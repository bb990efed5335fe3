use std::{
    net::SocketAddr,
    os::fd::{AsRawFd, OwnedFd, RawFd},
};

use packet::ipv4::Ipv4View;
use parking_lot::Mutex;

use super::{Error, map::ForwardingMap, peer::Peer, socket};

/// Large enough to hold the maximum IPv4 datagram.
const BUFFER_SIZE: usize = 65536;

/// IPv4 forwarding peer.
///
/// Reads one datagram per readiness event, parses the IPv4 header,
/// resolves the destination through the forwarding map and writes the
/// unmodified packet bytes to the resolved socket.  Reading at most one
/// datagram per call bounds the time a single peer monopolises the
/// dispatcher and preserves fairness across descriptors.
///
/// A learning peer additionally teaches the map its own entry from the
/// source address of each datagram it reads, so reconnecting endpoints
/// heal their routes without any control traffic.
pub struct L3Peer {
    socket: RawFd,
    address: SocketAddr,
    learning: bool,
    buffer: Mutex<Vec<u8>>,
    _owner: Option<OwnedFd>,
}

impl L3Peer {
    /// A peer over a descriptor owned elsewhere (a TUN device, a test
    /// pipe).  The creator promises the descriptor outlives the
    /// registration.
    pub fn new(socket: RawFd, address: SocketAddr) -> Self {
        Self {
            socket,
            address,
            learning: false,
            buffer: Mutex::new(vec![0u8; BUFFER_SIZE]),
            _owner: None,
        }
    }

    /// A peer that owns its descriptor; the descriptor closes when the
    /// last reference to the peer drops, after unregistration.
    pub fn owned(owner: impl Into<OwnedFd>, address: SocketAddr) -> Self {
        let owner = owner.into();
        Self {
            socket: owner.as_raw_fd(),
            address,
            learning: false,
            buffer: Mutex::new(vec![0u8; BUFFER_SIZE]),
            _owner: Some(owner),
        }
    }

    /// Turn on source learning.
    pub fn learning(mut self) -> Self {
        self.learning = true;
        self
    }
}

impl Peer for L3Peer {
    fn socket(&self) -> RawFd {
        self.socket
    }

    fn address(&self) -> SocketAddr {
        self.address
    }

    fn handle(&self, map: &ForwardingMap) -> Result<(), Error> {
        let buffer = &mut *self.buffer.lock();

        let n = match socket::read(self.socket, buffer) {
            Ok(0) | Err(_) => return Err(Error::HandlerRead),
            Ok(n) => n,
        };

        let Ok(view) = Ipv4View::new(&buffer[..n]) else {
            log::trace!("short frame dropped: socket={}, size={}", self.socket, n);
            return Ok(());
        };

        // Non-IPv4 traffic (unexpected ARP on a TAP-style device, a
        // desynchronised stream) must not tear the peer down.
        if view.version() != 4 {
            log::trace!(
                "non-ipv4 frame dropped: socket={}, version={}",
                self.socket,
                view.version()
            );
            return Ok(());
        }

        // The header's total length delimits the datagram; when the
        // read came up short the sender is trusted and the full length
        // is forwarded anyway.  Trailing octets of a coalesced stream
        // read are discarded.
        let total = view.total_length() as usize;
        let source = SocketAddr::from((view.source(), 0));
        let destination = SocketAddr::from((view.destination(), 0));

        let Some(mut table) = map.try_lock() else {
            log::trace!("forwarding map contended: socket={}", self.socket);
            return Ok(());
        };

        if self.learning {
            table.insert(source, self.socket);
        }

        let target = table.get(&destination).copied();
        drop(table);

        let Some(target) = target else {
            log::trace!(
                "no route dropped: socket={}, destination={}",
                self.socket,
                destination
            );
            return Ok(());
        };

        if let Err(e) = socket::write_all(target, &buffer[..total]) {
            log::warn!("relay write failed: target={}, error={}", target, e);
            return Err(Error::HandlerRead);
        }

        log::trace!(
            "datagram relayed: socket={}, target={}, destination={}, size={}",
            self.socket,
            target,
            destination,
            total
        );

        Ok(())
    }
}
