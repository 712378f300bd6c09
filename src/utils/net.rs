//! Network helpers for the startup banner.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address of the interface used to reach the outside world.
///
/// "Connecting" a UDP socket sends nothing; it only makes the OS pick a
/// route, whose local end is the LAN address other devices can use.
pub fn local_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(socket.local_addr()?.ip())
}

/// Host to show in URLs for a bound interface (`0.0.0.0` is not browsable).
pub fn display_host(interface: IpAddr) -> IpAddr {
    if interface.is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        interface
    }
}
