//! Helpers shared between store implementations

use crate::error::StoreError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A banned entry: a single address or a CIDR range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPattern {
    network: IpAddr,
    prefix_len: u8,
}

impl AddressPattern {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => self.contains_v4(net, ip),
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                prefix_matches(u128::from(net), u128::from(ip), 128, self.prefix_len)
            }
            (IpAddr::V4(net), IpAddr::V6(ip)) => ip
                .to_ipv4_mapped()
                .is_some_and(|v4| self.contains_v4(net, v4)),
            (IpAddr::V6(_), IpAddr::V4(_)) => false,
        }
    }

    fn contains_v4(&self, net: std::net::Ipv4Addr, ip: std::net::Ipv4Addr) -> bool {
        prefix_matches(u32::from(net).into(), u32::from(ip).into(), 32, self.prefix_len)
    }
}

fn prefix_matches(net: u128, ip: u128, width: u8, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let shift = u32::from(width - prefix_len);
    (net >> shift) == (ip >> shift)
}

impl FromStr for AddressPattern {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || StoreError::InvalidAddress(s.to_string());
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let network: IpAddr = addr.parse().map_err(|_| invalid())?;
        let width = if network.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| invalid())?,
            None => width,
        };
        if prefix_len > width {
            return Err(invalid());
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = if self.network.is_ipv4() { 32 } else { 128 };
        if self.prefix_len == width {
            write!(f, "{}", self.network)
        } else {
            write!(f, "{}/{}", self.network, self.prefix_len)
        }
    }
}

/// Canonical stored form of a banned address or range
pub fn normalize_address(address: &str) -> Result<String, StoreError> {
    Ok(address.parse::<AddressPattern>()?.to_string())
}

/// Canonical stored form of a blacklist phrase
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_address() {
        let pattern: AddressPattern = "198.51.100.7".parse().unwrap();
        assert!(pattern.contains(ip("198.51.100.7")));
        assert!(!pattern.contains(ip("198.51.100.8")));
        assert!(!pattern.contains(ip("203.0.113.5")));
    }

    #[test]
    fn test_v4_range() {
        let pattern: AddressPattern = "198.51.100.0/24".parse().unwrap();
        assert!(pattern.contains(ip("198.51.100.1")));
        assert!(pattern.contains(ip("198.51.100.255")));
        assert!(!pattern.contains(ip("198.51.101.1")));
        assert!(pattern.contains(ip("::ffff:198.51.100.9")));
    }

    #[test]
    fn test_v6_range() {
        let pattern: AddressPattern = "2001:db8::/32".parse().unwrap();
        assert!(pattern.contains(ip("2001:db8:1::1")));
        assert!(!pattern.contains(ip("2001:db9::1")));
        assert!(!pattern.contains(ip("198.51.100.1")));
    }

    #[test]
    fn test_zero_prefix_matches_family() {
        let pattern: AddressPattern = "0.0.0.0/0".parse().unwrap();
        assert!(pattern.contains(ip("203.0.113.5")));
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert!("example.com".parse::<AddressPattern>().is_err());
        assert!("10.0.0.0/33".parse::<AddressPattern>().is_err());
        assert!("10.0.0.0/x".parse::<AddressPattern>().is_err());
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" 10.0.0.1 ").unwrap(), "10.0.0.1");
        assert_eq!(normalize_address("10.0.0.0/8").unwrap(), "10.0.0.0/8");
        assert_eq!(normalize_address("2001:DB8::1").unwrap(), "2001:db8::1");
    }
}
