use std::{
    io::{Read, Write},
    net::Ipv4Addr,
    os::fd::AsRawFd,
};

use anyhow::Result;
use bytes::{BufMut, BytesMut};
use tunnel_router_engine::{Error, l3::L3Peer, map::ForwardingMap, peer::Peer, socket};

fn datagram(source: Ipv4Addr, destination: Ipv4Addr, payload: &[u8]) -> BytesMut {
    let mut bytes = BytesMut::with_capacity(1500);
    bytes.put_u8(0x45);
    bytes.put_u8(0);
    bytes.put_u16(20 + payload.len() as u16);
    bytes.put_u16(0);
    bytes.put_u16(0);
    bytes.put_u8(64);
    bytes.put_u8(17);
    bytes.put_u16(0);
    bytes.put_slice(&source.octets());
    bytes.put_slice(&destination.octets());
    bytes.put_slice(payload);
    bytes
}

#[test]
fn test_l3_forwarding() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;
    let (mut output_reader, output_writer) = std::io::pipe()?;

    let map = ForwardingMap::default();
    map.insert("172.168.2.32:0".parse()?, output_writer.as_raw_fd());

    let bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);
    peer.handle(&map)?;

    let mut buf = [0u8; 100];
    let n = output_reader.read(&mut buf)?;

    assert_eq!(n, 25);
    assert_eq!(&buf[..n], &bytes[..]);
    Ok(())
}

#[test]
fn test_non_ipv4_drop() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;
    let (mut output_reader, output_writer) = std::io::pipe()?;
    socket::set_nonblocking(output_reader.as_raw_fd())?;

    let map = ForwardingMap::default();
    map.insert("172.168.2.32:0".parse()?, output_writer.as_raw_fd());

    let mut bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );
    bytes[0] = 0x65;

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);
    peer.handle(&map)?;

    let mut buf = [0u8; 100];
    let err = output_reader.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    Ok(())
}

#[test]
fn test_header_only_datagram() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;
    let (mut output_reader, output_writer) = std::io::pipe()?;

    let map = ForwardingMap::default();
    map.insert("172.168.2.32:0".parse()?, output_writer.as_raw_fd());

    let bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"",
    );

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);
    peer.handle(&map)?;

    let mut buf = [0u8; 100];
    assert_eq!(output_reader.read(&mut buf)?, 20);
    Ok(())
}

#[test]
fn test_forward_trusts_total_length() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;
    let (mut output_reader, output_writer) = std::io::pipe()?;

    let map = ForwardingMap::default();
    map.insert("172.168.2.32:0".parse()?, output_writer.as_raw_fd());

    let bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );

    // The header claims 25 octets but the read comes up short.
    input_writer.write_all(&bytes[..20])?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);
    peer.handle(&map)?;

    let mut buf = [0u8; 100];
    let n = output_reader.read(&mut buf)?;

    assert_eq!(n, 25);
    assert_eq!(&buf[..20], &bytes[..20]);
    Ok(())
}

#[test]
fn test_learning_peer_teaches_source() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;

    let map = ForwardingMap::default();
    let bytes = datagram(
        Ipv4Addr::new(10, 1, 0, 7),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?).learning();
    // Destination absent: the datagram is dropped, the source learned.
    peer.handle(&map)?;

    assert_eq!(
        map.get(&"10.1.0.7:0".parse()?),
        Some(input_reader.as_raw_fd())
    );
    Ok(())
}

#[test]
fn test_contended_map_skips_packet() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;
    let (mut output_reader, output_writer) = std::io::pipe()?;
    socket::set_nonblocking(output_reader.as_raw_fd())?;

    let map = ForwardingMap::default();
    map.insert("172.168.2.32:0".parse()?, output_writer.as_raw_fd());

    let bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);

    {
        let _guard = map.try_lock().unwrap();
        // The handler defers to the contender: success, nothing sent.
        peer.handle(&map)?;
    }

    let mut buf = [0u8; 100];
    let err = output_reader.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    Ok(())
}

#[test]
fn test_absent_destination_drops() -> Result<()> {
    let (input_reader, mut input_writer) = std::io::pipe()?;

    let map = ForwardingMap::default();
    let bytes = datagram(
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(172, 168, 2, 32),
        b"Hello",
    );

    input_writer.write_all(&bytes)?;

    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);
    peer.handle(&map)?;

    assert!(map.is_empty());
    Ok(())
}

#[test]
fn test_eof_is_handler_read() -> Result<()> {
    let (input_reader, input_writer) = std::io::pipe()?;
    drop(input_writer);

    let map = ForwardingMap::default();
    let peer = L3Peer::new(input_reader.as_raw_fd(), "0.0.0.0:0".parse()?);

    assert_eq!(peer.handle(&map), Err(Error::HandlerRead));
    Ok(())
}
