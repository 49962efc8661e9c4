/*! The _smoldhcp_ library is the protocol core of a DHCPv6 client, together
with the DNS resource record model used by its companion resolver.

Nothing in here touches sockets, devices or the system clock. Collaborators
the host provides are reached through small traits, and everything the
client waits for is a timer on an abstract scheduler.

# The event layer
The `event` module defines the [Scheduler](event/trait.Scheduler.html)
the protocol engines arm their timers on, and provides
[EventLoop](event/struct.EventLoop.html), a caller-driven implementation
with fixed or growable timer storage.

# The DHCPv6 layer
The `dhcpv6` module holds the client state machine: stable IAID and DUID
derivation, and Solicit retransmission with RFC 3315 exponential backoff,
randomization and count/duration limits. Terminal events are reported
through a callback.

# The DNS layer
The `dns` module describes resource keys and records. Keys compare and
hash case-insensitively; records are shared between threads through
reference counting and never change once shared.

# The wire layer
The `wire` module carries protocol constants and the few fixed-layout
structures the other layers name, such as the DUID-EN identifier.

# Minimum Supported Rust Version (MSRV)
This crate is guaranteed to compile on stable Rust 1.65 and up with any
valid set of features.
*/

#![deny(unsafe_code)]

#[cfg(all(feature = "log", feature = "defmt"))]
compile_error!("You must enable at most one of the following features: defmt, log");

#[macro_use]
mod macros;

pub mod event;
pub mod hash;
pub mod time;
pub mod wire;

#[cfg(feature = "proto-dhcpv6")]
pub mod dhcpv6;
#[cfg(feature = "proto-dns")]
pub mod dns;
