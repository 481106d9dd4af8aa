//! Subnet broadcast address math.
//!
//! The relay refuses to start unless its configured broadcast address is the
//! directed broadcast (`ip | !mask`) of one of the host's IPv4 interfaces.

use std::net::Ipv4Addr;

/// Directed broadcast address of the subnet `ip` lives in.
pub fn subnet_broadcast(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(mask))
}

/// True if `candidate` is the broadcast address of any `(ip, mask)` pair.
pub fn is_subnet_broadcast<I>(candidate: Ipv4Addr, interfaces: I) -> bool
where
    I: IntoIterator<Item = (Ipv4Addr, Ipv4Addr)>,
{
    interfaces
        .into_iter()
        .any(|(ip, mask)| subnet_broadcast(ip, mask) == candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_c() {
        let b = subnet_broadcast(Ipv4Addr::new(192, 168, 1, 42), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(b, Ipv4Addr::new(192, 168, 1, 255));
    }

    #[test]
    fn test_odd_prefix() {
        // /20
        let b = subnet_broadcast(Ipv4Addr::new(10, 1, 17, 5), Ipv4Addr::new(255, 255, 240, 0));
        assert_eq!(b, Ipv4Addr::new(10, 1, 31, 255));
    }

    #[test]
    fn test_host_mask() {
        let b = subnet_broadcast(Ipv4Addr::LOCALHOST, Ipv4Addr::BROADCAST);
        assert_eq!(b, Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_is_subnet_broadcast() {
        let interfaces = [
            (Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(255, 0, 0, 0)),
            (Ipv4Addr::new(192, 168, 1, 42), Ipv4Addr::new(255, 255, 255, 0)),
        ];
        assert!(is_subnet_broadcast(Ipv4Addr::new(192, 168, 1, 255), interfaces));
        assert!(is_subnet_broadcast(Ipv4Addr::new(127, 255, 255, 255), interfaces));
        assert!(!is_subnet_broadcast(Ipv4Addr::new(192, 168, 2, 255), interfaces));
        assert!(!is_subnet_broadcast(Ipv4Addr::BROADCAST, interfaces));
        assert!(!is_subnet_broadcast(Ipv4Addr::new(192, 168, 1, 42), interfaces));
    }

    #[test]
    fn test_no_interfaces() {
        assert!(!is_subnet_broadcast(Ipv4Addr::new(192, 168, 1, 255), std::iter::empty()));
    }
}
