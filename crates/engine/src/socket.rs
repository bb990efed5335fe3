use std::{io, os::fd::RawFd};

/// Read once from a raw descriptor.
///
/// Peers are polymorphic over descriptor kinds (TUN device, TCP socket,
/// pipe), so I/O happens below the typed-socket layer.
pub fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(ret as usize)
}

/// Write a full slice to a raw descriptor.
///
/// Transient conditions are retried in place: packet sizes are bounded
/// and descriptors are expected to drain quickly.  `EACCES` and `EPIPE`
/// mean the destination is gone and are returned to the caller; every
/// other failure is retried.
pub fn write_all(fd: RawFd, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let ret = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::PermissionDenied | io::ErrorKind::BrokenPipe => return Err(err),
                _ => continue,
            }
        }

        if ret == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }

        buf = &buf[ret as usize..];
    }

    Ok(())
}

/// Switch a descriptor to non-blocking mode.
///
/// # Test
///
/// ```
/// use std::os::fd::AsRawFd;
///
/// let (reader, _writer) = std::io::pipe().unwrap();
/// tunnel_router_engine::socket::set_nonblocking(reader.as_raw_fd()).unwrap();
/// ```
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
