use std::{io, os::fd::RawFd, sync::Arc, time::Duration};

use ahash::AHashMap;
use parking_lot::Mutex;

use super::{
    Error,
    map::ForwardingMap,
    peer::Peer,
    poll::{Events, Interest, Poll},
};

/// Readiness-multiplexing router.
///
/// Owns the readiness facility and the peer table, and drives the event
/// loop: wait for readable descriptors, look the owning peer up and run
/// its handler to completion.  The set of descriptors subscribed in the
/// facility always equals the key set of the peer table; both are
/// mutated together under the peer-table lock.
///
/// Registration and unregistration may happen from any thread; the loop
/// itself is single-threaded and cooperative, suspending only inside
/// the wait call.
pub struct Router {
    poll: Poll,
    peers: Mutex<AHashMap<RawFd, Arc<dyn Peer>>>,
    map: ForwardingMap,
    max_concurrent: usize,
    wait_timeout: Duration,
}

impl Router {
    /// Create a router.
    ///
    /// `max_concurrent` sizes the event batch handed to the readiness
    /// facility on each wait.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tunnel_router_engine::router::Router;
    ///
    /// let router = Router::new(32, Duration::from_millis(100)).unwrap();
    /// assert_eq!(router.len(), 0);
    /// assert!(router.is_empty());
    /// ```
    pub fn new(max_concurrent: usize, wait_timeout: Duration) -> Result<Self, Error> {
        assert!(max_concurrent >= 1, "event batch capacity must be >= 1");

        Ok(Self {
            poll: Poll::new().map_err(|_| Error::Resources)?,
            peers: Mutex::new(AHashMap::new()),
            map: ForwardingMap::default(),
            max_concurrent,
            wait_timeout,
        })
    }

    /// The forwarding map shared by every peer of this router.
    pub fn forwarding(&self) -> &ForwardingMap {
        &self.map
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    pub fn is_registered(&self, socket: RawFd) -> bool {
        self.peers.lock().contains_key(&socket)
    }

    /// Register a peer.
    ///
    /// The peer is entered into the table keyed by its socket handle,
    /// then the socket is subscribed for read-readiness OR'd with the
    /// caller's interest.  Insert-then-subscribe means a spurious early
    /// event can never find a missing peer.  When subscription fails
    /// the insert is rolled back and `Resources` returned; a socket
    /// that is already registered is rejected the same way before the
    /// facility can refuse it.
    ///
    /// Requesting write-readiness is a programming error: the engine
    /// assumes writes are short and non-blocking enough to inline.
    pub fn register(&self, peer: Arc<dyn Peer>, interest: Interest) -> Result<(), Error> {
        assert!(
            !interest.is_writable(),
            "write-readiness subscription is disallowed"
        );

        let socket = peer.socket();
        let address = peer.address();

        let mut peers = self.peers.lock();
        if peers.contains_key(&socket) {
            log::warn!("peer already registered: socket={}", socket);
            return Err(Error::Resources);
        }

        peers.insert(socket, peer);

        if let Err(e) = self
            .poll
            .register(socket, Interest::READABLE.add(interest))
        {
            peers.remove(&socket);
            log::warn!("peer subscription failed: socket={}, error={}", socket, e);
            return Err(Error::Resources);
        }

        log::info!("peer registered: socket={}, address={}", socket, address);
        Ok(())
    }

    /// Unregister a peer.  Never fails to the caller.
    ///
    /// The socket is unsubscribed before the table entry is removed, so
    /// a concurrent dispatch cannot observe a peer its owner has
    /// already freed; unsubscription errors are ignored because the
    /// descriptor may already be closed.  Forwarding entries pointing
    /// at the departing socket are scrubbed afterwards.
    pub fn unregister(&self, peer: &dyn Peer) {
        let socket = peer.socket();

        {
            let mut peers = self.peers.lock();
            self.poll.deregister(socket).ok();
            peers.remove(&socket);
        }

        self.map.remove_socket(socket);
        log::info!("peer unregistered: socket={}", socket);
    }

    /// One tick of the event loop.
    ///
    /// Waits on the readiness facility with the configured timeout and
    /// dispatches every reported event, iterating while the previous
    /// wait returned at least one event; the first wait is always
    /// performed.  A zero-event wait ends the tick, and the caller
    /// polls liveness and re-enters.
    pub fn run(&self) -> Result<(), Error> {
        let mut events = Events::with_capacity(self.max_concurrent);

        loop {
            if let Err(e) = self.poll.wait(&mut events, self.wait_timeout) {
                return Err(match e.kind() {
                    io::ErrorKind::Interrupted => Error::Interrupted,
                    _ => Error::Resources,
                });
            }

            if events.is_empty() {
                return Ok(());
            }

            for socket in events.iter() {
                self.dispatch(socket)?;
            }
        }
    }

    /// Dispatch one event to the peer owning its descriptor.
    ///
    /// The peer-table lock is only try-acquired: contention means a
    /// concurrent register/unregister is in progress, and the event is
    /// skipped rather than waited for since level-triggered readiness
    /// re-reports it on the next wait.  The lock is released before the
    /// handler runs so handlers may freely manipulate unrelated routers
    /// and maps.
    fn dispatch(&self, socket: RawFd) -> Result<(), Error> {
        let peer = {
            let Some(peers) = self.peers.try_lock() else {
                log::trace!("peer table contended: socket={}", socket);
                return Ok(());
            };

            match peers.get(&socket) {
                Some(peer) => peer.clone(),
                None => return Err(Error::NoHandler),
            }
        };

        match peer.handle(&self.map) {
            Ok(()) => Ok(()),
            Err(Error::HandlerRead) => {
                // Self-eviction on a broken source.
                self.unregister(peer.as_ref());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
