//! Keyed SipHash-2-4.
//!
//! Identifiers that end up on the wire (IAIDs, DUIDs) must be stable across
//! restarts and across builds, so they cannot go through `RandomState`.
//! Keys are 16 bytes, split into two little-endian words like the reference
//! implementation does.

use core::hash::Hasher;
use siphasher::sip::SipHasher24;

pub const KEY_SIZE: usize = 16;

/// A streaming SipHash-2-4 state seeded with a 16-byte key.
#[derive(Debug, Clone)]
pub struct Siphash24(SipHasher24);

impl Siphash24 {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Siphash24(SipHasher24::new_with_key(key))
    }

    pub fn write(&mut self, data: &[u8]) {
        self.0.write(data)
    }

    pub fn finish(&self) -> u64 {
        self.0.finish()
    }
}

/// One-shot SipHash-2-4 of `data`.
pub fn siphash24(data: &[u8], key: &[u8; KEY_SIZE]) -> u64 {
    let mut state = Siphash24::new(key);
    state.write(data);
    state.finish()
}
