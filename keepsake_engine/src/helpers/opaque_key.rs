//! Opaque key generation.
//!
//! Session keys and founder-code suffixes are uniformly random tokens over the lowercase alphanumeric alphabet,
//! drawn from the operating system's CSPRNG. They are never sequential and never derived from user-supplied data,
//! so sealed links cannot be enumerated or guessed from one another.
//!
//! The generator only produces candidates. Resolving a candidate against the storage path it would occupy (and
//! re-rolling on a collision, uniformly, never by incrementing) is the flow API's job, since it needs the store.

use rand::{rngs::OsRng, Rng};

use crate::db_types::{SessionKey, FOUNDER_CODE_PREFIX, FOUNDER_SUFFIX_LEN, SESSION_KEY_LEN};

pub const KEY_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// How many candidate keys the resolution loop may try before giving up with a hard `CollisionExhausted` failure.
/// At 36^8 possible keys a single retry is already vanishingly rare; exhausting five means the store is lying to us.
pub const MAX_KEY_ATTEMPTS: usize = 5;

pub fn random_token(len: usize) -> String {
    let mut rng = OsRng;
    (0..len).map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char).collect()
}

/// A fresh, unresolved session key candidate.
pub fn new_session_key_candidate() -> SessionKey {
    SessionKey::new(random_token(SESSION_KEY_LEN)).expect("generated keys always match the key format")
}

/// A fresh founder code. Only used by out-of-band minting tools and tests; the server never creates codes.
pub fn new_founder_code() -> String {
    format!("{FOUNDER_CODE_PREFIX}{}", random_token(FOUNDER_SUFFIX_LEN))
}
