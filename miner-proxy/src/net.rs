//! Outbound address discovery.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

// Any well-known external address works; the socket never transmits.
const PROBE_ADDR: &str = "8.8.8.8:80";

/// Determine the machine's outbound IPv4 address.
///
/// Binds an ephemeral UDP socket and connects it toward a known external
/// address. Connecting a UDP socket only selects a route and a source
/// address; no datagram is sent. The local endpoint of the connected
/// socket is the address the host would use for outbound traffic.
pub fn outbound_ipv4() -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(PROBE_ADDR)?;
    match socket.local_addr()? {
        SocketAddr::V4(addr) => Ok(*addr.ip()),
        SocketAddr::V6(addr) => Err(io::Error::other(format!(
            "expected an IPv4 local endpoint, got {addr}"
        ))),
    }
}
