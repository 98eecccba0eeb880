//! Hand-rolled ICMP echo request/reply over a raw socket.
//!
//! `ping` may be satisfied by the operating system directly rather than
//! through the router; this module is that OS-level path. It favors raw
//! sockets and manually decoded wire formats over reaching for an async
//! ICMP crate that would pull in a runtime this codebase doesn't use.

use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::TransportError;
use crate::router::PingResult;

const ICMP_ECHO_REQUEST: u8 = 8;
const ICMP_ECHO_REPLY: u8 = 0;
const ECHO_PAYLOAD: [u8; 32] = [0xAB; 32];

fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = *chunks.remainder() {
        sum += u32::from(last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

fn build_echo_request(identifier: u16, sequence: u16) -> [u8; 8 + ECHO_PAYLOAD.len()] {
    let mut packet = [0u8; 8 + ECHO_PAYLOAD.len()];
    packet[0] = ICMP_ECHO_REQUEST;
    packet[1] = 0; // code
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());
    packet[8..].copy_from_slice(&ECHO_PAYLOAD);
    let csum = checksum(&packet);
    packet[2..4].copy_from_slice(&csum.to_be_bytes());
    packet
}

/// An open raw ICMP socket, identified by this process's PID so replies
/// addressed to other processes' pings are ignored.
pub struct IcmpSocket {
    socket: Socket,
    identifier: u16,
}

impl IcmpSocket {
    pub fn open() -> Result<Self, TransportError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
            TransportError::Terminal(format!(
                "failed to open raw ICMP socket (needs CAP_NET_RAW): {e}"
            ))
        })?;
        socket.set_nonblocking(false).map_err(|e| {
            TransportError::Terminal(format!("failed to configure ICMP socket: {e}"))
        })?;
        Ok(IcmpSocket {
            socket,
            identifier: (std::process::id() & 0xFFFF) as u16,
        })
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Send one echo request to `dest` with the given sequence number.
    pub fn send_echo(&self, dest: Ipv4Addr, sequence: u16) -> io::Result<()> {
        let packet = build_echo_request(self.identifier, sequence);
        let addr = SockAddr::from(SocketAddr::new(IpAddr::V4(dest), 0));
        self.socket.send_to(&packet, &addr)?;
        Ok(())
    }

    /// Block for at most `timeout` waiting for the next echo reply destined
    /// for this process. Returns the reply's sequence number and source
    /// address, or `None` on timeout. Replies for other identifiers (not
    /// ours) or non-echo-reply ICMP types are silently skipped, but still
    /// consume the timeout budget.
    pub fn recv_echo(&self, timeout: Duration) -> Option<(u16, Ipv4Addr)> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if self.socket.set_read_timeout(Some(remaining)).is_err() {
                return None;
            }

            let mut buf = [MaybeUninit::new(0u8); 576];
            let (n, from) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return None;
                }
                Err(_) => continue,
            };
            let bytes: Vec<u8> = buf[..n].iter().map(|b| unsafe { b.assume_init() }).collect();

            let Some((ident, seq)) = parse_echo_reply(&bytes, self.identifier) else {
                continue;
            };
            let _ = ident; // already filtered to our identifier in parse_echo_reply
            let src_ip = from
                .as_socket()
                .and_then(|s| match s.ip() {
                    IpAddr::V4(v4) => Some(v4),
                    IpAddr::V6(_) => None,
                })
                .unwrap_or(Ipv4Addr::UNSPECIFIED);
            return Some((seq, src_ip));
        }
    }
}

/// Parse a raw-socket-received datagram (IP header + ICMP body) into
/// `(identifier, sequence)`, keeping only echo replies addressed to `want_identifier`.
fn parse_echo_reply(buf: &[u8], want_identifier: u16) -> Option<(u16, u16)> {
    if buf.len() < 20 {
        return None;
    }
    let ihl = (buf[0] & 0x0F) as usize * 4;
    let icmp = buf.get(ihl..)?;
    if icmp.len() < 8 || icmp[0] != ICMP_ECHO_REPLY {
        return None;
    }
    let identifier = u16::from_be_bytes([icmp[4], icmp[5]]);
    if identifier != want_identifier {
        return None;
    }
    let sequence = u16::from_be_bytes([icmp[6], icmp[7]]);
    Some((identifier, sequence))
}

/// Convenience single-host ping used by [`crate::router::RouterTransport`]'s
/// default `ping` implementation: send `count` sequential echoes to `host`,
/// each bounded by a fair share of `deadline`.
pub fn ping_host(host: &str, count: u32, deadline: Duration) -> Result<PingResult, TransportError> {
    let addr: Ipv4Addr = host
        .parse()
        .map_err(|_| TransportError::Terminal(format!("invalid reflector address '{host}'")))?;
    if count == 0 {
        return Ok(PingResult::default());
    }

    let socket = IcmpSocket::open()?;
    let per_echo_budget = deadline / count.max(1);
    let mut samples = Vec::new();

    for seq in 0..count as u16 {
        let sent_at = Instant::now();
        if socket.send_echo(addr, seq).is_err() {
            continue;
        }
        if socket.recv_echo(per_echo_budget).is_some() {
            samples.push(sent_at.elapsed().as_secs_f64() * 1000.0);
        }
    }

    Ok(PingResult { samples_ms: samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_all_zero_header_is_valid() {
        // A freshly built echo request (checksum field zeroed, then filled)
        // must checksum to 0 when the filled-in checksum is included.
        let mut packet = build_echo_request(1234, 1);
        let verify = checksum(&packet);
        assert_eq!(verify, 0, "checksum over {packet:?} should be 0, got {verify}");
        // sanity: corrupting a byte breaks the checksum
        packet[8] ^= 0xFF;
        assert_ne!(checksum(&packet), 0);
    }

    #[test]
    fn echo_request_has_correct_type_and_code() {
        let packet = build_echo_request(1, 2);
        assert_eq!(packet[0], ICMP_ECHO_REQUEST);
        assert_eq!(packet[1], 0);
    }

    #[test]
    fn echo_request_encodes_identifier_and_sequence() {
        let packet = build_echo_request(0xBEEF, 0x0042);
        assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), 0xBEEF);
        assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), 0x0042);
    }

    #[test]
    fn parse_echo_reply_rejects_wrong_identifier() {
        let mut buf = vec![0u8; 20];
        buf[0] = 0x45; // IHL = 5 (20-byte IP header)
        buf.extend_from_slice(&build_echo_request(42, 7));
        buf[20] = ICMP_ECHO_REPLY;
        assert!(parse_echo_reply(&buf, 99).is_none());
        assert_eq!(parse_echo_reply(&buf, 42), Some((42, 7)));
    }

    #[test]
    fn parse_echo_reply_rejects_non_reply_type() {
        let mut buf = vec![0u8; 20];
        buf[0] = 0x45;
        buf.extend_from_slice(&build_echo_request(42, 7)); // type 8 = request, not reply
        assert!(parse_echo_reply(&buf, 42).is_none());
    }

    #[test]
    fn invalid_reflector_address_is_terminal() {
        let result = ping_host("not-an-ip", 1, Duration::from_millis(10));
        assert!(matches!(result, Err(TransportError::Terminal(_))));
    }

    #[test]
    fn zero_count_returns_empty_without_opening_socket() {
        // Doesn't require CAP_NET_RAW since it returns before opening a socket.
        let result = ping_host("9.9.9.9", 0, Duration::from_millis(10)).unwrap();
        assert!(result.samples_ms.is_empty());
    }
}
