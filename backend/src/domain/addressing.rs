//! Hardware and network address primitives shared by submissions and the
//! enrichment tables.
//!
//! Values are validated at construction so resolvers and rules only ever see
//! well-formed addresses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while parsing address primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// MAC address text did not match `XX:XX:XX:XX:XX:XX`.
    #[error("mac address must be six colon-separated hex pairs (got {value:?})")]
    MalformedMac { value: String },
    /// Mask was outside `1..=48`.
    #[error("mac mask must be between 1 and 48 bits (got {value})")]
    MaskOutOfRange { value: i64 },
    /// Address was not a private IPv4 address.
    #[error("{value} is not a private IPv4 address")]
    NotPrivateIpv4 { value: String },
}

/// Six-octet hardware address.
///
/// Parses from `XX:XX:XX:XX:XX:XX` in either case and always displays in
/// upper case.
///
/// # Examples
/// ```
/// use wifi_advisor::domain::MacAddress;
///
/// let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().expect("valid mac");
/// assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Build an address from raw octets.
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets in transmission order.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AddressParseError::MalformedMac {
            value: s.to_owned(),
        };
        let mut octets = [0_u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts.next().ok_or_else(malformed)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(malformed());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| malformed())?;
        }
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(value: MacAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Prefix length, in bits, used to key vendor records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MacMask(u8);

impl MacMask {
    /// Mask applied to device entries that do not specify one.
    pub const DEFAULT_DEVICE: Self = Self(24);

    /// Validate a prefix length.
    pub fn new(bits: i64) -> Result<Self, AddressParseError> {
        match u8::try_from(bits) {
            Ok(value @ 1..=48) => Ok(Self(value)),
            _ => Err(AddressParseError::MaskOutOfRange { value: bits }),
        }
    }

    /// Prefix length in bits.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for MacMask {
    fn default() -> Self {
        Self::DEFAULT_DEVICE
    }
}

impl TryFrom<i64> for MacMask {
    type Error = AddressParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MacMask> for i64 {
    fn from(value: MacMask) -> Self {
        Self::from(value.0)
    }
}

impl fmt::Display for MacMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IPv4 address inside one of the locally scoped ranges a device scan can
/// report: 10/8, 127/8, 169.254/16, 172.16/12 or 192.168/16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrivateIpv4(Ipv4Addr);

impl PrivateIpv4 {
    /// Validate that `addr` is locally scoped.
    pub fn new(addr: Ipv4Addr) -> Result<Self, AddressParseError> {
        if addr.is_private() || addr.is_loopback() || addr.is_link_local() {
            Ok(Self(addr))
        } else {
            Err(AddressParseError::NotPrivateIpv4 {
                value: addr.to_string(),
            })
        }
    }

    /// Underlying address.
    pub const fn addr(self) -> Ipv4Addr {
        self.0
    }
}

impl FromStr for PrivateIpv4 {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = s
            .parse::<Ipv4Addr>()
            .map_err(|_| AddressParseError::NotPrivateIpv4 {
                value: s.to_owned(),
            })?;
        Self::new(addr)
    }
}

impl TryFrom<String> for PrivateIpv4 {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrivateIpv4> for String {
    fn from(value: PrivateIpv4) -> Self {
        value.0.to_string()
    }
}

impl From<PrivateIpv4> for IpAddr {
    fn from(value: PrivateIpv4) -> Self {
        Self::V4(value.0)
    }
}
