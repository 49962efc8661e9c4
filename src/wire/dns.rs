// See https://www.rfc-editor.org/rfc/rfc1035 for the DNS specification.

use core::fmt;

enum_with_unknown! {
    /// DNS record types.
    pub enum Type(u16) {
        A = 0x0001,
        Ns = 0x0002,
        Cname = 0x0005,
        Soa = 0x0006,
        Ptr = 0x000c,
        Hinfo = 0x000d,
        Mx = 0x000f,
        Txt = 0x0010,
        Aaaa = 0x001c,
        Srv = 0x0021,
        Dname = 0x0027,
        Opt = 0x0029,
        Sshfp = 0x002c,
        Tkey = 0x00f9,
        Tsig = 0x00fa,
        Ixfr = 0x00fb,
        Axfr = 0x00fc,
        Any = 0x00ff,
    }
}

enum_with_unknown! {
    /// DNS record classes.
    pub enum Class(u16) {
        In = 0x0001,
        Any = 0x00ff,
    }
}

static TYPE_NAMES: &[(Type, &str)] = &[
    (Type::A, "A"),
    (Type::Ns, "NS"),
    (Type::Cname, "CNAME"),
    (Type::Soa, "SOA"),
    (Type::Ptr, "PTR"),
    (Type::Hinfo, "HINFO"),
    (Type::Mx, "MX"),
    (Type::Txt, "TXT"),
    (Type::Aaaa, "AAAA"),
    (Type::Srv, "SRV"),
    (Type::Dname, "DNAME"),
    (Type::Opt, "OPT"),
    (Type::Sshfp, "SSHFP"),
    (Type::Tkey, "TKEY"),
    (Type::Tsig, "TSIG"),
    (Type::Ixfr, "IXFR"),
    (Type::Axfr, "AXFR"),
    (Type::Any, "ANY"),
];

static CLASS_NAMES: &[(Class, &str)] = &[(Class::In, "IN"), (Class::Any, "ANY")];

impl Type {
    /// The mnemonic of a known record type, `None` for anything else.
    pub fn name(&self) -> Option<&'static str> {
        TYPE_NAMES
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, name)| *name)
    }
}

impl Class {
    /// The mnemonic of a known record class, `None` for anything else.
    pub fn name(&self) -> Option<&'static str> {
        CLASS_NAMES
            .iter()
            .find(|(c, _)| c == self)
            .map(|(_, name)| *name)
    }
}

// Unknown values use the generic notation of RFC 3597.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "TYPE{}", u16::from(*self)),
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "CLASS{}", u16::from(*self)),
        }
    }
}
