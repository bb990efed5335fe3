//! ## Internet Protocol (IPv4)
//!
//! [RFC791]: https://tools.ietf.org/html/rfc791
//!
//! The Internet Protocol is designed for use in interconnected systems of
//! packet-switched computer communication networks.  The internet
//! protocol provides for transmitting blocks of data called datagrams
//! from sources to destinations, where sources and destinations are
//! hosts identified by fixed length addresses.  The internet protocol
//! also provides for fragmentation and reassembly of long datagrams, if
//! necessary, for transmission through "small packet" networks.
//!
//! This crate only reads headers; it never fragments, reassembles or
//! verifies checksums.

pub mod ipv4;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    TooShort,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
