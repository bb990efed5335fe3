use std::net::Ipv4Addr;

use super::Error;

/// The IPv4 datagram header
///
/// A summary of the contents of the internet header follows:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Version|  IHL  |Type of Service|          Total Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Identification        |Flags|      Fragment Offset    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Time to Live |    Protocol   |         Header Checksum       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Source Address                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Destination Address                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// This type is a read-only view over the first twenty octets of a
/// datagram buffer.  Multi-octet fields are decoded in network byte
/// order by the accessors and never stored pre-swapped; the buffer is
/// indexed octet by octet, so no alignment is assumed.  The buffer must
/// outlive the view.
#[derive(Debug)]
pub struct Ipv4View<'a> {
    bytes: &'a [u8],
}

impl<'a> Ipv4View<'a> {
    /// The length of an IPv4 header without options, in octets.
    pub const MIN_LEN: usize = 20;

    /// # Test
    ///
    /// ```
    /// use tunnel_router_packet::{Error, ipv4::Ipv4View};
    ///
    /// let bytes: [u8; 20] = [
    ///     0x45, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11,
    ///     0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01, 0xac, 0xa8, 0x02, 0x20,
    /// ];
    ///
    /// assert!(Ipv4View::new(&bytes[..]).is_ok());
    /// assert_eq!(Ipv4View::new(&bytes[..10]).unwrap_err(), Error::TooShort);
    /// ```
    pub fn new(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < Self::MIN_LEN {
            return Err(Error::TooShort);
        }

        Ok(Self { bytes })
    }

    /// The Version field indicates the format of the internet header.
    ///
    /// # Test
    ///
    /// ```
    /// use tunnel_router_packet::ipv4::Ipv4View;
    ///
    /// let bytes: [u8; 20] = [
    ///     0x45, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11,
    ///     0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01, 0xac, 0xa8, 0x02, 0x20,
    /// ];
    ///
    /// assert_eq!(Ipv4View::new(&bytes[..]).unwrap().version(), 4);
    /// ```
    pub fn version(&self) -> u8 {
        self.bytes[0] >> 4
    }

    /// Internet Header Length is the length of the internet header in 32
    /// bit words, and thus points to the beginning of the data.  This
    /// accessor returns it converted to octets.
    pub fn header_len(&self) -> usize {
        ((self.bytes[0] & 0x0F) as usize) * 4
    }

    /// The Type of Service provides an indication of the abstract
    /// parameters of the quality of service desired.
    pub fn tos(&self) -> u8 {
        self.bytes[1]
    }

    /// Total Length is the length of the datagram, measured in octets,
    /// including internet header and data.
    ///
    /// On a byte-ordered transport this field is the sole framing
    /// contract: a receiver delimits concatenated datagrams with it.
    ///
    /// # Test
    ///
    /// ```
    /// use tunnel_router_packet::ipv4::Ipv4View;
    ///
    /// let bytes: [u8; 20] = [
    ///     0x45, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11,
    ///     0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01, 0xac, 0xa8, 0x02, 0x20,
    /// ];
    ///
    /// assert_eq!(Ipv4View::new(&bytes[..]).unwrap().total_length(), 25);
    /// ```
    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.bytes[2], self.bytes[3]])
    }

    /// An identifying value assigned by the sender to aid in assembling
    /// the fragments of a datagram.
    pub fn identification(&self) -> u16 {
        u16::from_be_bytes([self.bytes[4], self.bytes[5]])
    }

    /// The three control flags (reserved, don't fragment, more
    /// fragments), right-aligned.
    pub fn flags(&self) -> u8 {
        self.bytes[6] >> 5
    }

    /// This field indicates where in the datagram this fragment belongs.
    /// The fragment offset is measured in units of 8 octets.
    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([self.bytes[6] & 0x1F, self.bytes[7]])
    }

    /// This field indicates the maximum time the datagram is allowed to
    /// remain in the internet system.
    pub fn ttl(&self) -> u8 {
        self.bytes[8]
    }

    /// This field indicates the next level protocol used in the data
    /// portion of the internet datagram.
    pub fn protocol(&self) -> u8 {
        self.bytes[9]
    }

    /// A checksum on the header only.  Never verified nor rewritten
    /// here.
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.bytes[10], self.bytes[11]])
    }

    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.bytes[12],
            self.bytes[13],
            self.bytes[14],
            self.bytes[15],
        )
    }

    /// # Test
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use tunnel_router_packet::ipv4::Ipv4View;
    ///
    /// let bytes: [u8; 20] = [
    ///     0x45, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11,
    ///     0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01, 0xac, 0xa8, 0x02, 0x20,
    /// ];
    ///
    /// let view = Ipv4View::new(&bytes[..]).unwrap();
    /// assert_eq!(view.destination(), Ipv4Addr::new(172, 168, 2, 32));
    /// ```
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.bytes[16],
            self.bytes[17],
            self.bytes[18],
            self.bytes[19],
        )
    }
}
