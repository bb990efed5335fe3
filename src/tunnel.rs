use anyhow::Result;
use tun::Device;

use crate::config::Config;

/// Create and configure the TUN device.
///
/// The kernel presents the device as a file descriptor producing one
/// framed IPv4 datagram per read; the interface is addressed, masked
/// and brought up here so the forwarding engine only ever sees a ready
/// descriptor.  The descriptor is switched to non-blocking mode because
/// handlers read and write inline on the event loop.
pub fn create(config: &Config) -> Result<Device> {
    let mut options = tun::Configuration::default();
    options
        .name(&config.tunnel.device)
        .address(config.tunnel.address)
        .netmask(config.tunnel.netmask)
        .up();

    // The engine parses raw IPv4 headers; the packet-information
    // prefix would shift the version nibble.
    #[cfg(target_os = "linux")]
    options.platform_config(|options| {
        options.packet_information(false);
    });

    let device =
        tun::create(&options).map_err(|e| anyhow::anyhow!("failed to create tun device: {}", e))?;
    device.set_nonblock()?;

    log::info!(
        "tun device up: name={}, address={}, netmask={}",
        config.tunnel.device,
        config.tunnel.address,
        config.tunnel.netmask
    );

    Ok(device)
}
