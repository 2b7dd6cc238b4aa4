//! Local network address discovery.

use std::net::{IpAddr, Ipv4Addr};

/// Host shown when no private network address is found.
const FALLBACK_HOST: &str = "localhost";

/// Return the first private IPv4 address across all interfaces, or
/// `"localhost"`.
#[must_use]
pub fn local_network_host() -> String {
    let addresses = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.iter().map(if_addrs::Interface::ip).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to list network interfaces");
            Vec::new()
        }
    };
    first_lan_address(addresses).map_or_else(|| FALLBACK_HOST.to_owned(), |ip| ip.to_string())
}

fn first_lan_address(addresses: impl IntoIterator<Item = IpAddr>) -> Option<Ipv4Addr> {
    addresses.into_iter().find_map(|ip| match ip {
        IpAddr::V4(ip) if is_lan_address(&ip) => Some(ip),
        _ => None,
    })
}

/// Only `192.168.0.0/16` and `10.0.0.0/8` count as reachable LAN addresses.
fn is_lan_address(ip: &Ipv4Addr) -> bool {
    matches!(ip.octets(), [192, 168, ..] | [10, ..])
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_is_lan_address() {
        assert!(is_lan_address(&Ipv4Addr::new(192, 168, 1, 20)));
        assert!(is_lan_address(&Ipv4Addr::new(10, 0, 0, 5)));
        assert!(!is_lan_address(&Ipv4Addr::new(172, 16, 0, 1)));
        assert!(!is_lan_address(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(!is_lan_address(&Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_first_lan_address_skips_other_interfaces() {
        let addresses = [
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        ];

        assert_eq!(first_lan_address(addresses), Some(Ipv4Addr::new(10, 1, 2, 3)));
    }

    #[test]
    fn test_first_lan_address_none_without_private_interface() {
        let addresses = [
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)),
        ];

        assert_eq!(first_lan_address(addresses), None);
    }

    #[test]
    fn test_local_network_host_is_lan_or_fallback() {
        let host = local_network_host();

        if host != FALLBACK_HOST {
            let ip: Ipv4Addr = host.parse().unwrap();
            assert!(is_lan_address(&ip));
        }
    }
}
