use std::{
    io,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    time::Duration,
};

/// A flag word for a readiness subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest(u32);

impl Interest {
    pub const READABLE: Self = Self(libc::EPOLLIN as u32);
    pub const PRIORITY: Self = Self(libc::EPOLLPRI as u32);
    pub const WRITABLE: Self = Self(libc::EPOLLOUT as u32);

    /// Combine two flag words.
    ///
    /// # Test
    ///
    /// ```
    /// use tunnel_router_engine::poll::Interest;
    ///
    /// let interest = Interest::READABLE.add(Interest::PRIORITY);
    /// assert!(!interest.is_writable());
    /// assert!(Interest::WRITABLE.is_writable());
    /// ```
    pub const fn add(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_writable(self) -> bool {
        self.0 & (libc::EPOLLOUT as u32) != 0
    }
}

/// Batch of readiness events filled by one wait.
pub struct Events {
    list: Vec<libc::epoll_event>,
}

impl Events {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The descriptors reported readable, in kernel order.
    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.list.iter().map(|event| event.u64 as RawFd)
    }
}

/// The kernel readiness facility.
///
/// Subscriptions are level-triggered: a descriptor holding unread data
/// is re-reported on every wait.  Handlers therefore may consume a
/// single datagram per event, and an event skipped under lock
/// contention is deferred to the next wait, not lost.
pub struct Poll {
    epoll: OwnedFd,
}

impl Poll {
    pub fn new() -> io::Result<Self> {
        let epoll = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll: unsafe { OwnedFd::from_raw_fd(epoll) },
        })
    }

    /// Subscribe a descriptor.  The descriptor itself identifies the
    /// event on the way back out.
    pub fn register(&self, socket: RawFd, interest: Interest) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: interest.0,
            u64: socket as u64,
        };

        if unsafe {
            libc::epoll_ctl(
                self.epoll.as_raw_fd(),
                libc::EPOLL_CTL_ADD,
                socket,
                &mut event,
            )
        } < 0
        {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub fn deregister(&self, socket: RawFd) -> io::Result<()> {
        if unsafe {
            libc::epoll_ctl(
                self.epoll.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                socket,
                std::ptr::null_mut(),
            )
        } < 0
        {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Wait for readiness, filling the batch up to its capacity.  A
    /// wait that reports nothing within the timeout leaves the batch
    /// empty.
    pub fn wait(&self, events: &mut Events, timeout: Duration) -> io::Result<()> {
        let n = unsafe {
            libc::epoll_wait(
                self.epoll.as_raw_fd(),
                events.list.as_mut_ptr(),
                events.list.capacity() as libc::c_int,
                timeout.as_millis() as libc::c_int,
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        // The kernel wrote the first `n` entries.
        unsafe { events.list.set_len(n as usize) };
        Ok(())
    }
}
