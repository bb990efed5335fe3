use std::{net::SocketAddr, os::fd::RawFd};

use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard};

/// Address to socket forwarding table.
///
/// The table is consulted on every packet by every peer and populated
/// by an external policy component; it is deliberately keyed on a full
/// socket address rather than a bare 4-octet address so the same map
/// can accept both TUN-style L3 entries (port zero) and, in future, L4
/// endpoints.  The value slot holds the socket handle, not a peer
/// reference: forwarding survives the transient absence of a peer and
/// is consulted without taking the router lock.
#[derive(Default)]
pub struct ForwardingMap {
    table: Mutex<AHashMap<SocketAddr, RawFd>>,
}

impl ForwardingMap {
    /// Insert an entry.  A later insert for the same key replaces the
    /// prior value, which is returned.
    ///
    /// # Test
    ///
    /// ```
    /// use tunnel_router_engine::map::ForwardingMap;
    ///
    /// let map = ForwardingMap::default();
    /// let key = "172.168.2.32:0".parse().unwrap();
    ///
    /// assert_eq!(map.insert(key, 4), None);
    /// assert_eq!(map.insert(key, 7), Some(4));
    /// assert_eq!(map.get(&key), Some(7));
    /// ```
    pub fn insert(&self, key: SocketAddr, socket: RawFd) -> Option<RawFd> {
        self.table.lock().insert(key, socket)
    }

    /// # Test
    ///
    /// ```
    /// use tunnel_router_engine::map::ForwardingMap;
    ///
    /// let map = ForwardingMap::default();
    /// let key = "172.168.2.32:0".parse().unwrap();
    ///
    /// assert_eq!(map.get(&key), None);
    ///
    /// map.insert(key, 4);
    /// assert_eq!(map.get(&key), Some(4));
    /// ```
    pub fn get(&self, key: &SocketAddr) -> Option<RawFd> {
        self.table.lock().get(key).copied()
    }

    /// # Test
    ///
    /// ```
    /// use tunnel_router_engine::map::ForwardingMap;
    ///
    /// let map = ForwardingMap::default();
    /// let key = "172.168.2.32:0".parse().unwrap();
    ///
    /// map.insert(key, 4);
    /// assert_eq!(map.remove(&key), Some(4));
    /// assert_eq!(map.get(&key), None);
    /// ```
    pub fn remove(&self, key: &SocketAddr) -> Option<RawFd> {
        self.table.lock().remove(key)
    }

    /// Scrub every entry that points at the given socket.  Called when
    /// the socket's peer leaves the router, so stale entries stop
    /// attracting traffic.
    ///
    /// # Test
    ///
    /// ```
    /// use tunnel_router_engine::map::ForwardingMap;
    ///
    /// let map = ForwardingMap::default();
    ///
    /// map.insert("10.0.0.1:0".parse().unwrap(), 4);
    /// map.insert("10.0.0.2:0".parse().unwrap(), 4);
    /// map.insert("10.0.0.3:0".parse().unwrap(), 5);
    ///
    /// map.remove_socket(4);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn remove_socket(&self, socket: RawFd) {
        self.table.lock().retain(|_, value| *value != socket);
    }

    /// Non-blocking access for handlers.  `None` means the lock is
    /// contended; the handler skips its packet for this tick instead of
    /// parking inside the event loop.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, AHashMap<SocketAddr, RawFd>>> {
        self.table.try_lock()
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}
