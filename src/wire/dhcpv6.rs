// See https://datatracker.ietf.org/doc/html/rfc3315 for the DHCPv6 specification.

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};
use crate::time::Duration;

/// Private enterprise number the client DUID is registered under.
pub const ENTERPRISE_NUMBER: u32 = 43793;

// Solicit transmission parameters, RFC 3315 section 5.5.
pub const SOL_TIMEOUT: Duration = Duration::from_secs(1);
pub const SOL_MAX_RT: Duration = Duration::from_secs(120);

/// Option code of an identity association for non-temporary addresses.
pub const OPT_IA_NA: u16 = 3;

enum_with_unknown! {
    /// DUID types, RFC 3315 section 9.1.
    pub enum DuidType(u16) {
        LinkLayerTime = 1,
        EnterpriseNumber = 2,
        LinkLayer = 3,
    }
}

//     0                   1                   2                   3
//     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//    |               2               |       enterprise-number       |
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//    |   enterprise-number (contd)   |                               |
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               |
//    .                           identifier                          .
//    .                       (variable length)                       .
//    .                                                               .
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
//              Figure 2: DUID-EN format
//
/// A DUID based on an enterprise number, with a fixed 8 byte identifier.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duid {
    pub enterprise_number: u32,
    pub id: [u8; 8],
}

impl Duid {
    pub const LEN: usize = 14;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(Error);
        }
        if DuidType::from(NetworkEndian::read_u16(&data[0..2])) != DuidType::EnterpriseNumber {
            return Err(Error);
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&data[6..14]);
        Ok(Duid {
            enterprise_number: NetworkEndian::read_u32(&data[2..6]),
            id,
        })
    }

    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < Self::LEN {
            return Err(Error);
        }
        NetworkEndian::write_u16(&mut buffer[0..2], DuidType::EnterpriseNumber.into());
        NetworkEndian::write_u32(&mut buffer[2..6], self.enterprise_number);
        buffer[6..14].copy_from_slice(&self.id);
        Ok(())
    }

    /// The DUID as it appears inside a client identifier option.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        // the array is exactly LEN bytes
        let _ = self.emit(&mut bytes);
        bytes
    }
}

impl fmt::Display for Duid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "en({})", self.enterprise_number)?;
        for (i, b) in self.id.iter().enumerate() {
            write!(f, "{}{:02x}", if i == 0 { ":" } else { "" }, b)?;
        }
        Ok(())
    }
}
