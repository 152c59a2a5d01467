//! Address classification for resolved webhook destinations
//!
//! Static rules hold for every deployment: loopback, link-local and the
//! 224.0.0.0/24 local network control block are never reachable. Private
//! ranges (RFC 1918, fc00::/7) are only rejected when the operator lists
//! them in the blocklist.

use crate::blocklist::Blocklist;
use crate::error::AddressClass;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Classifies `ip`, returning `None` when it is an acceptable destination.
///
/// IPv4-mapped IPv6 addresses (`::ffff:127.0.0.1`) are checked as the IPv4
/// address they carry, in addition to their IPv6 form.
///
/// # Examples
///
/// ```
/// use hookgate::blocklist::Blocklist;
/// use hookgate::classify::classify_address;
/// use hookgate::error::AddressClass;
///
/// let blocklist = Blocklist::compile(["10.0.0.0/8"]);
/// assert_eq!(
///     classify_address("127.0.0.1".parse().unwrap(), &blocklist),
///     Some(AddressClass::Loopback)
/// );
/// assert!(classify_address("11.0.0.0".parse().unwrap(), &blocklist).is_none());
/// ```
pub fn classify_address(ip: IpAddr, blocklist: &Blocklist) -> Option<AddressClass> {
    if let Some(class) = static_class(ip) {
        return Some(class);
    }
    if let Some(net) = blocklist.network_containing(ip) {
        return Some(AddressClass::Configured(net));
    }

    if let IpAddr::V6(v6) = ip {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return classify_address(IpAddr::V4(v4), blocklist);
        }
    }

    None
}

fn static_class(ip: IpAddr) -> Option<AddressClass> {
    match ip {
        IpAddr::V4(v4) => static_class_v4(v4),
        IpAddr::V6(v6) => static_class_v6(v6),
    }
}

fn static_class_v4(ip: Ipv4Addr) -> Option<AddressClass> {
    if ip.is_loopback() {
        Some(AddressClass::Loopback)
    } else if ip.is_link_local() {
        Some(AddressClass::LinkLocal)
    } else if is_local_network_control(ip) {
        Some(AddressClass::LocalNetworkControl)
    } else {
        None
    }
}

fn static_class_v6(ip: Ipv6Addr) -> Option<AddressClass> {
    if ip.is_loopback() {
        Some(AddressClass::Loopback)
    } else if is_ipv6_link_local(ip) {
        Some(AddressClass::LinkLocal)
    } else {
        None
    }
}

// 224.0.0.0/24
fn is_local_network_control(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    a == 224 && b == 0 && c == 0
}

// fe80::/10
fn is_ipv6_link_local(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
