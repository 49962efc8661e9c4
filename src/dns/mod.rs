/*! DNS resource record model.

Records are built once, by a parser or by hand, and then shared as
[SharedRecord] between whatever needs them (a cache, an answer set, a
query in flight on another thread). A shared record is never mutated.

Names are compared and hashed without regard to ASCII case, so
`Example.COM` and `example.com` identify the same [ResourceKey].
*/

use core::fmt;

mod rr;

pub use self::rr::{RecordData, ResourceKey, ResourceRecord, SharedRecord};
pub use crate::wire::dns::{Class, Type};

/// Error returned when building a record.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The payload does not fit the record type of the key.
    TypeMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TypeMismatch => write!(f, "payload does not match record type"),
        }
    }
}

impl std::error::Error for Error {}
