use std::{
    net::{Ipv4Addr, SocketAddr},
    os::fd::RawFd,
};

use engine::map::ForwardingMap;

/// Map the local tunnel address to the TUN descriptor so traffic
/// addressed to this node is delivered to the kernel.
pub fn install_local(map: &ForwardingMap, address: Ipv4Addr, tun: RawFd) {
    map.insert(SocketAddr::from((address, 0)), tun);
    log::info!("local route installed: address={}", address);
}

/// Client-mode routes: every host of the tunnel network resolves to
/// the server socket.
///
/// The map is exact-match, so hosts are enumerated one entry each; the
/// configuration layer bounds the prefix to keep the count reasonable.
/// The network and broadcast addresses and the local address are
/// skipped.
pub fn install_network(
    map: &ForwardingMap,
    network: Ipv4Addr,
    netmask: Ipv4Addr,
    local: Ipv4Addr,
    socket: RawFd,
) {
    let mask = u32::from(netmask);
    let base = u32::from(network) & mask;
    let broadcast = base | !mask;

    let Some(first) = base.checked_add(1) else {
        return;
    };

    let mut installed = 0usize;
    for host in first..broadcast {
        let address = Ipv4Addr::from(host);
        if address == local {
            continue;
        }

        map.insert(SocketAddr::from((address, 0)), socket);
        installed += 1;
    }

    log::info!(
        "network routes installed: network={}/{}, count={}",
        network,
        mask.count_ones(),
        installed
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_local() {
        let map = ForwardingMap::default();
        install_local(&map, Ipv4Addr::new(10, 0, 0, 1), 4);

        assert_eq!(map.get(&"10.0.0.1:0".parse().unwrap()), Some(4));
    }

    #[test]
    fn test_install_network_skips_local_and_edges() {
        let map = ForwardingMap::default();
        install_network(
            &map,
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 248),
            Ipv4Addr::new(10, 0, 0, 1),
            7,
        );

        // A /29 holds six hosts; the local address is excluded.
        assert_eq!(map.len(), 5);
        assert_eq!(map.get(&"10.0.0.1:0".parse().unwrap()), None);
        assert_eq!(map.get(&"10.0.0.0:0".parse().unwrap()), None);
        assert_eq!(map.get(&"10.0.0.7:0".parse().unwrap()), None);
        assert_eq!(map.get(&"10.0.0.2:0".parse().unwrap()), Some(7));
        assert_eq!(map.get(&"10.0.0.6:0".parse().unwrap()), Some(7));
    }
}
