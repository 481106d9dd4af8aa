//! Local interface enumeration for broadcast address validation.

use std::net::Ipv4Addr;

use if_addrs::IfAddr;

use nmea_core::netaddr;

use crate::error::{RelayError, Result};

/// `(address, netmask)` of every local IPv4 interface.
pub fn local_ipv4_networks() -> Result<Vec<(Ipv4Addr, Ipv4Addr)>> {
    let interfaces = if_addrs::get_if_addrs()?;
    Ok(interfaces
        .into_iter()
        .filter_map(|iface| match iface.addr {
            IfAddr::V4(v4) => Some((v4.ip, v4.netmask)),
            IfAddr::V6(_) => None,
        })
        .collect())
}

/// Require `candidate` to be the subnet broadcast address of a local interface.
pub fn validate_broadcast(candidate: Ipv4Addr) -> Result<()> {
    let networks = local_ipv4_networks()?;
    log::debug!("Local IPv4 networks: {networks:?}");

    if netaddr::is_subnet_broadcast(candidate, networks) {
        return Ok(());
    }
    Err(RelayError::config(format!(
        "{candidate} is not the broadcast address of any local interface"
    )))
}
