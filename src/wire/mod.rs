/*! Low-level protocol constants and fixed-layout representations.

This module only covers the handful of on-the-wire structures the client
engine and the record model need to name: Solicit timing, the IA_NA option
code, the client DUID layout, DNS record types and classes. Full packet parsing
and emission lives elsewhere.
*/

use core::fmt;

#[cfg(feature = "proto-dhcpv6")]
pub mod dhcpv6;
#[cfg(feature = "proto-dns")]
pub mod dns;

#[cfg(feature = "proto-dhcpv6")]
pub use self::dhcpv6::{Duid as Dhcpv6Duid, DuidType as Dhcpv6DuidType};

#[cfg(feature = "proto-dns")]
pub use self::dns::{Class as DnsClass, Type as DnsType};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by smoldhcp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// A six-octet Ethernet II address.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EthernetAddress(pub [u8; 6]);

impl EthernetAddress {
    /// Return an Ethernet address as a sequence of octets, in big-endian.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for EthernetAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(
            f,
            "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

impl fmt::Debug for EthernetAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}
