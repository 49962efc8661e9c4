use core::fmt;
use core::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use super::{Class, Error, Type};
use crate::hash::{Siphash24, KEY_SIZE};

/// A record shared between its consumers. The record is freed when the
/// last clone is dropped.
pub type SharedRecord = Arc<ResourceRecord>;

/// The identity of a resource record: owner name, class and type.
#[derive(Debug, Clone)]
pub struct ResourceKey {
    class: Class,
    rtype: Type,
    name: String,
}

impl ResourceKey {
    pub fn new<N: Into<String>>(class: Class, rtype: Type, name: N) -> ResourceKey {
        ResourceKey {
            class,
            rtype,
            name: name.into(),
        }
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn rtype(&self) -> Type {
        self.rtype
    }

    /// The owner name, as given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash the key with SipHash-2-4 under `key`.
    ///
    /// Equal keys hash equal, whatever the case of their names.
    pub fn hash_with_key(&self, key: &[u8; KEY_SIZE]) -> u64 {
        let mut state = Siphash24::new(key);
        for byte in self.name.bytes() {
            state.write(&[byte.to_ascii_lowercase()]);
        }
        state.write(&u16::from(self.class).to_be_bytes());
        state.write(&u16::from(self.rtype).to_be_bytes());
        state.finish()
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &ResourceKey) -> bool {
        self.class == other.class
            && self.rtype == other.rtype
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.rtype.hash(state);
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(self.name.len());
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.class, self.rtype)
    }
}

/// Payload of a resource record. Which variant is allowed depends on the
/// record type of the key.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RecordData {
    /// Opaque RDATA of a type without a structured representation.
    Generic(Vec<u8>),
    /// Target of a PTR, NS or CNAME record.
    Name(String),
    Hinfo { cpu: String, os: String },
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
}

impl RecordData {
    /// Whether this payload may be carried by a record of type `rtype`.
    pub fn accepts(&self, rtype: Type) -> bool {
        match self {
            RecordData::Name(_) => matches!(rtype, Type::Ptr | Type::Ns | Type::Cname),
            RecordData::Hinfo { .. } => rtype == Type::Hinfo,
            RecordData::A(_) => rtype == Type::A,
            RecordData::Aaaa(_) => rtype == Type::Aaaa,
            RecordData::Generic(_) => !matches!(
                rtype,
                Type::Ptr | Type::Ns | Type::Cname | Type::Hinfo | Type::A | Type::Aaaa
            ),
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordData::Generic(data) => {
                write!(f, "\\# {}", data.len())?;
                if !data.is_empty() {
                    write!(f, " ")?;
                }
                for byte in data {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            RecordData::Name(name) => write!(f, "{name}"),
            RecordData::Hinfo { cpu, os } => write!(f, "\"{cpu}\" \"{os}\""),
            RecordData::A(addr) => write!(f, "{addr}"),
            RecordData::Aaaa(addr) => write!(f, "{addr}"),
        }
    }
}

/// A DNS resource record.
///
/// Two records are equal when their keys are equal, their TTLs are the same
/// and they carry equal payloads.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResourceRecord {
    key: ResourceKey,
    ttl: u32,
    data: Option<RecordData>,
}

impl ResourceRecord {
    /// Create a record with a zero TTL and no payload.
    pub fn new(key: ResourceKey) -> ResourceRecord {
        ResourceRecord {
            key,
            ttl: 0,
            data: None,
        }
    }

    /// Create a fully populated record.
    pub fn with_data(key: ResourceKey, ttl: u32, data: RecordData) -> Result<ResourceRecord, Error> {
        let mut record = ResourceRecord::new(key);
        record.set_ttl(ttl);
        record.set_data(data)?;
        Ok(record)
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }

    /// Set the payload, replacing any previous one.
    ///
    /// Fails if the payload does not fit the type of the key.
    pub fn set_data(&mut self, data: RecordData) -> Result<(), Error> {
        if !data.accepts(self.key.rtype) {
            net_debug!("dns: payload does not fit record type {}", self.key.rtype);
            return Err(Error::TypeMismatch);
        }
        self.data = Some(data);
        Ok(())
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// The payload, `None` while the record is still empty.
    pub fn data(&self) -> Option<&RecordData> {
        self.data.as_ref()
    }

    /// Freeze the record for sharing.
    pub fn into_shared(self) -> SharedRecord {
        Arc::new(self)
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key.name, self.ttl, self.key.class, self.key.rtype
        )?;
        if let Some(data) = &self.data {
            write!(f, " {data}")?;
        }
        Ok(())
    }
}
