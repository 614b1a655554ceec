//! Name hashing shared by the command/cvar registries, the texture cache
//! and the CD file handles.
//!
//! Hashes are the lower 32 bits of XXH3-64 over the raw name bytes, so they
//! do not depend on registration order and can be computed at compile time.

use xxhash_rust::const_xxh3;
use xxhash_rust::xxh3;

/// Hash a name at runtime.
pub fn name_hash(name: &str) -> u32 {
    xxh3::xxh3_64(name.as_bytes()) as u32
}

/// Same hash as [`name_hash`], usable in `const` items.
pub const fn const_name_hash(name: &str) -> u32 {
    const_xxh3::xxh3_64(name.as_bytes()) as u32
}
