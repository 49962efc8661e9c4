//! Stable client identifiers.
//!
//! Both the IAID and the DUID must survive restarts without being stored
//! anywhere, so they are derived from things that are already stable: the
//! predictable interface name (or the MAC address when there is none) and
//! the machine id. Neither is put on the wire verbatim; they go through a
//! keyed hash first.

use std::fs;
use std::path::PathBuf;

use super::Error;
use crate::hash::{siphash24, KEY_SIZE};
use crate::wire::dhcpv6::{Duid, ENTERPRISE_NUMBER};
use crate::wire::EthernetAddress;

/// Kernel limit on interface name length, including the terminating NUL.
pub const IFNAMSIZ: usize = 16;

pub const HASH_KEY: [u8; KEY_SIZE] = [
    0x80, 0x11, 0x8c, 0xc2, 0xfe, 0x4a, 0x03, 0xee, 0x3e, 0xd6, 0x0c, 0x6f, 0x36, 0x39, 0x14, 0x09,
];

/// A predictable network interface name, such as `enp3s0`.
pub type InterfaceName = heapless::String<IFNAMSIZ>;

/// Why a stable interface name could not be produced.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NamingError {
    /// The device exists but has not been fully set up yet. Try again later.
    NotReady,
    /// There is no device, or it has no predictable name.
    NotFound,
}

/// Resolves interface indices to predictable interface names.
pub trait DeviceNaming {
    fn stable_name(&self, ifindex: i32) -> Result<InterfaceName, NamingError>;
}

/// Reports whether we run inside a container or similar isolated
/// environment, where device naming is not available.
pub trait Virtualization {
    fn is_isolated(&self) -> bool;
}

/// Source of the 128-bit machine id.
pub trait MachineIdSource {
    fn machine_id(&self) -> Result<[u8; 16], Error>;
}

impl MachineIdSource for [u8; 16] {
    fn machine_id(&self) -> Result<[u8; 16], Error> {
        Ok(*self)
    }
}

/// Reads the machine id from a `machine-id(5)` formatted file.
#[derive(Debug, Clone)]
pub struct MachineIdFile {
    path: PathBuf,
}

impl MachineIdFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        MachineIdFile { path: path.into() }
    }
}

impl Default for MachineIdFile {
    fn default() -> Self {
        MachineIdFile::new("/etc/machine-id")
    }
}

impl MachineIdSource for MachineIdFile {
    fn machine_id(&self) -> Result<[u8; 16], Error> {
        let contents = fs::read_to_string(&self.path).map_err(|_| Error::NotFound)?;
        parse_machine_id(&contents)
    }
}

/// Parse 32 hexadecimal digits, optionally followed by a newline.
pub fn parse_machine_id(s: &str) -> Result<[u8; 16], Error> {
    let s = s.strip_suffix('\n').unwrap_or(s);
    if s.len() != 32 || !s.is_ascii() {
        return Err(Error::InvalidArgument);
    }

    let mut id = [0u8; 16];
    for (i, byte) in id.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|_| Error::InvalidArgument)?;
    }
    Ok(id)
}

/// Derive the DUID-EN of this machine.
pub fn derive_duid(machine_id: &[u8; 16]) -> Duid {
    Duid {
        enterprise_number: ENTERPRISE_NUMBER,
        id: siphash24(machine_id, &HASH_KEY).to_le_bytes(),
    }
}

/// Derive the IAID of an interface from its stable name, or from its MAC
/// address when it has none.
pub fn derive_iaid(name: Option<&str>, mac: &EthernetAddress) -> u32 {
    let id = match name {
        Some(name) => siphash24(name.as_bytes(), &HASH_KEY),
        None => siphash24(mac.as_bytes(), &HASH_KEY),
    };

    // fold into 32 bits
    (id & 0xffff_ffff) as u32 ^ (id >> 32) as u32
}

/// Look up the stable name of `ifindex` and derive its IAID.
pub(crate) fn resolve_iaid(
    ifindex: i32,
    mac: &EthernetAddress,
    naming: Option<&dyn DeviceNaming>,
    virtualization: Option<&dyn Virtualization>,
) -> Result<u32, Error> {
    let isolated = virtualization.map(|v| v.is_isolated()).unwrap_or(false);

    let name = match naming {
        Some(naming) if !isolated => match naming.stable_name(ifindex) {
            Ok(name) => Some(name),
            Err(NamingError::NotReady) => {
                net_debug!("DHCPv6 interface {} not yet initialized", ifindex);
                return Err(Error::NotReady);
            }
            Err(NamingError::NotFound) => None,
        },
        _ => None,
    };

    let iaid = derive_iaid(name.as_deref(), mac);
    match &name {
        Some(name) => net_debug!("DHCPv6 IAID {:08x} derived from name {}", iaid, name),
        None => net_debug!("DHCPv6 IAID {:08x} derived from MAC {}", iaid, mac),
    }
    Ok(iaid)
}

#[cfg(test)]
mod test {
    use super::*;
    use core::cell::Cell;

    const MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    struct Names {
        result: Result<&'static str, NamingError>,
        calls: Cell<u32>,
    }

    impl DeviceNaming for Names {
        fn stable_name(&self, _ifindex: i32) -> Result<InterfaceName, NamingError> {
            self.calls.set(self.calls.get() + 1);
            self.result.map(|s| {
                let mut name = InterfaceName::new();
                name.push_str(s).unwrap();
                name
            })
        }
    }

    struct Isolated(bool);

    impl Virtualization for Isolated {
        fn is_isolated(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_iaid_fold() {
        let id = siphash24(b"eth0", &HASH_KEY);
        let expected = (id as u32) ^ ((id >> 32) as u32);
        assert_eq!(derive_iaid(Some("eth0"), &MAC), expected);
    }

    #[test]
    fn test_iaid_deterministic() {
        assert_eq!(
            derive_iaid(Some("enp3s0"), &MAC),
            derive_iaid(Some("enp3s0"), &EthernetAddress([0xff; 6]))
        );
        assert_ne!(
            derive_iaid(Some("enp3s0"), &MAC),
            derive_iaid(Some("enp4s0"), &MAC)
        );
    }

    #[test]
    fn test_iaid_mac_fallback() {
        let id = siphash24(MAC.as_bytes(), &HASH_KEY);
        let expected = (id as u32) ^ ((id >> 32) as u32);
        assert_eq!(derive_iaid(None, &MAC), expected);
    }

    #[test]
    fn test_resolve_uses_name() {
        let names = Names {
            result: Ok("enp0s25"),
            calls: Cell::new(0),
        };
        assert_eq!(
            resolve_iaid(2, &MAC, Some(&names), None),
            Ok(derive_iaid(Some("enp0s25"), &MAC))
        );
        assert_eq!(names.calls.get(), 1);
    }

    #[test]
    fn test_resolve_not_ready() {
        let names = Names {
            result: Err(NamingError::NotReady),
            calls: Cell::new(0),
        };
        assert_eq!(
            resolve_iaid(2, &MAC, Some(&names), None),
            Err(Error::NotReady)
        );
    }

    #[test]
    fn test_resolve_not_found_falls_back() {
        let names = Names {
            result: Err(NamingError::NotFound),
            calls: Cell::new(0),
        };
        assert_eq!(
            resolve_iaid(2, &MAC, Some(&names), None),
            Ok(derive_iaid(None, &MAC))
        );
    }

    #[test]
    fn test_resolve_isolated_skips_naming() {
        let names = Names {
            result: Err(NamingError::NotReady),
            calls: Cell::new(0),
        };
        assert_eq!(
            resolve_iaid(2, &MAC, Some(&names), Some(&Isolated(true))),
            Ok(derive_iaid(None, &MAC))
        );
        assert_eq!(names.calls.get(), 0);
    }

    #[test]
    fn test_duid() {
        let machine_id = [0x5a; 16];
        let duid = derive_duid(&machine_id);
        assert_eq!(duid.enterprise_number, 43793);
        assert_eq!(duid.id, siphash24(&machine_id, &HASH_KEY).to_le_bytes());
        assert_eq!(derive_duid(&machine_id), duid);
        assert_ne!(derive_duid(&[0x5b; 16]), duid);
    }

    #[test]
    fn test_parse_machine_id() {
        let id = parse_machine_id("0123456789abcdef0123456789ABCDEF\n").unwrap();
        assert_eq!(id[0], 0x01);
        assert_eq!(id[7], 0xef);
        assert_eq!(id[15], 0xef);
        assert_eq!(
            parse_machine_id("0123456789abcdef"),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            parse_machine_id("0123456789abcdef0123456789abcdeg"),
            Err(Error::InvalidArgument)
        );
    }

    #[test]
    fn test_machine_id_file_missing() {
        let file = MachineIdFile::new("/nonexistent/machine-id");
        assert_eq!(file.machine_id(), Err(Error::NotFound));
    }
}
