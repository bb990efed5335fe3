use anyhow::Result;
use bytes::{BufMut, BytesMut};
use std::net::Ipv4Addr;
use tunnel_router_packet::{Error, ipv4::Ipv4View};

fn sample() -> BytesMut {
    let mut bytes = BytesMut::with_capacity(1500);
    bytes.put_u8(0x45);
    bytes.put_u8(0x10);
    bytes.put_u16(25);
    bytes.put_u16(0x1234);
    bytes.put_u16(0x4000);
    bytes.put_u8(64);
    bytes.put_u8(17);
    bytes.put_u16(0xbeef);
    bytes.put_slice(&[192, 168, 0, 1]);
    bytes.put_slice(&[172, 168, 2, 32]);
    bytes.put_slice(b"Hello");
    bytes
}

#[test]
fn test_ipv4_view() -> Result<()> {
    let bytes = sample();
    let view = Ipv4View::new(&bytes[..])?;

    assert_eq!(view.version(), 4);
    assert_eq!(view.header_len(), 20);
    assert_eq!(view.tos(), 0x10);
    assert_eq!(view.total_length(), 25);
    assert_eq!(view.identification(), 0x1234);
    assert_eq!(view.flags(), 0b010);
    assert_eq!(view.fragment_offset(), 0);
    assert_eq!(view.ttl(), 64);
    assert_eq!(view.protocol(), 17);
    assert_eq!(view.checksum(), 0xbeef);
    assert_eq!(view.source(), Ipv4Addr::new(192, 168, 0, 1));
    assert_eq!(view.destination(), Ipv4Addr::new(172, 168, 2, 32));

    Ok(())
}

#[test]
fn test_ipv4_view_header_only() -> Result<()> {
    let bytes = sample();
    let view = Ipv4View::new(&bytes[..20])?;

    assert_eq!(view.destination(), Ipv4Addr::new(172, 168, 2, 32));
    Ok(())
}

#[test]
fn test_ipv4_view_too_short() {
    assert_eq!(Ipv4View::new(&[0u8; 19]).unwrap_err(), Error::TooShort);
    assert_eq!(Ipv4View::new(&[]).unwrap_err(), Error::TooShort);
}

#[test]
fn test_fragment_offset_carries_high_bits() -> Result<()> {
    let mut bytes = sample();
    bytes[6] = 0x3F;
    bytes[7] = 0xFF;

    let view = Ipv4View::new(&bytes[..])?;
    assert_eq!(view.flags(), 0b001);
    assert_eq!(view.fragment_offset(), 0x1FFF);
    Ok(())
}
