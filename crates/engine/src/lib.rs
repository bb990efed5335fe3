//! ## Tunnel forwarding engine
//!
//! The engine turns heterogeneous file descriptors into a uniform peer
//! abstraction over which IPv4 packets hop.  A [`Router`] owns a
//! level-triggered kernel readiness facility (epoll) and a table of
//! registered [`Peer`]s; when a descriptor becomes readable the owning
//! peer's handler runs to completion.  An [`L3Peer`] handler reads one
//! datagram, resolves the destination address through the shared
//! [`ForwardingMap`] and relays the unmodified bytes to the resolved
//! socket.
//!
//! The loop is cooperative and single-threaded per router; multiple
//! routers may coexist in separate threads.  Registration may happen
//! from any thread.
//!
//! [`Router`]: crate::router::Router
//! [`Peer`]: crate::peer::Peer
//! [`L3Peer`]: crate::l3::L3Peer
//! [`ForwardingMap`]: crate::map::ForwardingMap

pub mod l3;
pub mod map;
pub mod peer;
pub mod poll;
pub mod router;
pub mod socket;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The event loop was asked to stop.  Fatal to the current tick,
    /// not to the process.
    Interrupted,
    /// A handler could not complete a read or write against its source
    /// socket.  The router responds by unregistering the offending
    /// peer; it never surfaces to the caller of `run`.
    HandlerRead,
    /// The readiness facility could not be created or a descriptor
    /// could not be subscribed.  The failed operation is a no-op.
    Resources,
    /// Dispatch saw a descriptor with no peer entry.  The peer table
    /// and the readiness facility have diverged; treated as a defect.
    NoHandler,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
