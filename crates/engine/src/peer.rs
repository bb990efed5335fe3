use std::{net::SocketAddr, os::fd::RawFd};

use super::{Error, map::ForwardingMap};

/// A registered participant in the router: a descriptor plus a handler.
///
/// The router holds a non-owning reference and treats all peers
/// uniformly; variants differ only in [`handle`].  A peer owns whatever
/// auxiliary state its handler needs (read buffer, the descriptor
/// itself) for the duration of its registration, and the creator owns
/// unregistration.  While a peer is registered its socket handle must
/// stay valid.
///
/// [`handle`]: Peer::handle
pub trait Peer: Send + Sync {
    /// The socket handle the router subscribes for read-readiness.
    fn socket(&self) -> RawFd;

    /// The peer's local address; zero when irrelevant.
    fn address(&self) -> SocketAddr;

    /// Invoked by the router when the socket is readable.
    ///
    /// A handler converts all read and write failures against its
    /// source socket into [`Error::HandlerRead`], which the router
    /// answers with unregistration.  [`Error::Interrupted`] propagates
    /// out of the tick; no other kind may escape a handler.
    fn handle(&self, map: &ForwardingMap) -> Result<(), Error>;
}
