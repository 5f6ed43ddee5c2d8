//! Cycle UDP multicast d'un dialecte de sonde
//!
//! Un cycle = un socket. Le socket est ouvert, utilisé et fermé dans
//! l'appel ; aucune réutilisation entre cycles. Les réponses unicast
//! reviennent vers le port source de la sonde, donc l'envoi et l'écoute
//! partagent le même socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};

use super::{BUF_SIZE, CancelToken, DiscoveryError, MULTICAST_ADDR};

/// Tranche de lecture entre deux contrôles d'annulation
const POLL_SLICE: Duration = Duration::from_millis(200);

const MULTICAST_TTL: u32 = 2;

/// Première adresse IPv4 portée par l'interface nommée.
fn interface_ipv4(interface_name: &str) -> Result<Ipv4Addr, DiscoveryError> {
    for iface in get_if_addrs::get_if_addrs()? {
        if iface.name == interface_name {
            if let IpAddr::V4(ipv4) = iface.ip() {
                return Ok(ipv4);
            }
        }
    }
    Err(DiscoveryError::InterfaceNotFound(
        interface_name.to_string(),
    ))
}

fn open_probe_socket(iface_ip: Ipv4Addr, recv_port: u16) -> Result<UdpSocket, DiscoveryError> {
    let group: Ipv4Addr = MULTICAST_ADDR.parse().expect("valid multicast literal");

    let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket2.set_reuse_address(true)?;

    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), recv_port);
    socket2.bind(&bind_addr.into())?;

    socket2.set_multicast_if_v4(&iface_ip)?;
    socket2.set_multicast_ttl_v4(MULTICAST_TTL)?;
    if let Err(e) = socket2.join_multicast_v4(&group, &iface_ip) {
        // Les réponses unicast restent possibles sans adhésion au groupe.
        warn!("failed to join {} on {}: {}", MULTICAST_ADDR, iface_ip, e);
    }

    Ok(socket2.into())
}

/// Phase d'écoute : collecte tout datagramme reçu avant l'échéance.
///
/// L'échéance est dure : une réponse arrivée après coup est perdue même si
/// elle a été émise pendant la fenêtre. Le jeton d'annulation est contrôlé
/// entre deux lectures.
fn collect_responses(
    socket: &UdpSocket,
    window: Duration,
    cancel: Option<&CancelToken>,
) -> Result<Vec<String>, DiscoveryError> {
    let deadline = Instant::now() + window;
    let mut responses = Vec::new();
    let mut buf = [0u8; BUF_SIZE];

    loop {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket.set_read_timeout(Some(remaining.min(POLL_SLICE)))?;

        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                trace!("📥 {} bytes from {}", n, from);
                responses.push(String::from_utf8_lossy(&buf[..n]).into_owned());
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(responses)
}

/// Un cycle complet envoi / écoute / collecte sur une interface nommée.
///
/// `recv_port` à 0 laisse l'OS choisir le port source (dialecte générique :
/// les réponses reviennent vers ce port) ; le dialecte propriétaire impose
/// son port fixe dans les deux sens. Zéro réponse est un résultat vide,
/// pas une erreur.
pub fn send_probe_multicast(
    payload: &str,
    interface_name: &str,
    dst_port: u16,
    recv_port: u16,
    window: Duration,
    cancel: Option<&CancelToken>,
) -> Result<Vec<String>, DiscoveryError> {
    let iface_ip = interface_ipv4(interface_name)?;
    let socket = open_probe_socket(iface_ip, recv_port)?;

    let group: Ipv4Addr = MULTICAST_ADDR.parse().expect("valid multicast literal");
    let dst = SocketAddr::new(IpAddr::V4(group), dst_port);
    socket.send_to(payload.as_bytes(), dst)?;
    debug!(
        "📤 probe sent to {} via {} ({} bytes)",
        dst,
        interface_name,
        payload.len()
    );

    let responses = collect_responses(&socket, window, cancel)?;
    debug!(
        "probe window closed: {} response(s) on {}",
        responses.len(),
        interface_name
    );
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").expect("bind loopback")
    }

    #[test]
    fn test_empty_window_yields_empty_result() {
        let socket = loopback_socket();
        let responses = collect_responses(&socket, Duration::from_millis(150), None).unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn test_window_is_a_hard_deadline() {
        let socket = loopback_socket();
        let start = Instant::now();
        collect_responses(&socket, Duration::from_millis(150), None).unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_cancelled_token_aborts_listen() {
        let socket = loopback_socket();
        let token = CancelToken::new();
        token.cancel();

        let result = collect_responses(&socket, Duration::from_secs(5), Some(&token));
        assert!(matches!(result, Err(DiscoveryError::Cancelled)));
    }

    #[test]
    fn test_datagrams_within_window_are_collected() {
        let receiver = loopback_socket();
        let addr = receiver.local_addr().unwrap();

        let sender = loopback_socket();
        sender.send_to(b"<ProbeMatch/>", addr).unwrap();

        let responses = collect_responses(&receiver, Duration::from_millis(300), None).unwrap();
        assert_eq!(responses, vec!["<ProbeMatch/>".to_string()]);
    }

    #[test]
    fn test_unknown_interface_is_an_error() {
        let result = send_probe_multicast(
            "<Probe/>",
            "no-such-interface-0",
            3702,
            0,
            Duration::from_millis(50),
            None,
        );
        assert!(matches!(result, Err(DiscoveryError::InterfaceNotFound(_))));
    }
}
