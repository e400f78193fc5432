//! Network address features

use std::net::Ipv4Addr;

/// Dotted-decimal IPv4 → 32-bit unsigned value
pub fn ipv4_to_u32(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

/// 32-bit unsigned value → dotted-decimal IPv4
pub fn u32_to_ipv4(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}
