//! The process-wide keyed hash function.
//!
//! `hashtab.c` seeds SipHash-1-3 from 16 bytes gathered once at startup
//! (`/dev/urandom`, falling back to a time-based mix) so that hash-flooding
//! attacks against a long-lived process can't be staged offline. We do the
//! same with [`siphasher`]'s `SipHasher13`, which implements
//! `std::hash::Hasher` directly and so plugs straight into
//! `std::hash::Hash`.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use siphasher::sip::SipHasher13;

static SEED_LO: AtomicU64 = AtomicU64::new(0);
static SEED_HI: AtomicU64 = AtomicU64::new(0);
static SEED_INIT: Once = Once::new();

fn generated_seed() -> [u8; 16] {
    // A process-local fallback mix, not cryptographic: real deployments
    // that care about hash-flood resistance should call
    // `set_hash_function_seed` with bytes from an actual CSPRNG during
    // startup.
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let addr = &SEED_INIT as *const Once as u64;
    let lo = nanos ^ addr.rotate_left(17);
    let hi = addr ^ nanos.rotate_left(31) ^ 0x9E37_79B9_7F4A_7C15;
    let mut seed = [0u8; 16];
    seed[0..8].copy_from_slice(&lo.to_le_bytes());
    seed[8..16].copy_from_slice(&hi.to_le_bytes());
    seed
}

fn ensure_seed() {
    SEED_INIT.call_once(|| {
        let seed = generated_seed();
        store_seed(seed);
    });
}

fn store_seed(seed: [u8; 16]) {
    SEED_LO.store(u64::from_le_bytes(seed[0..8].try_into().unwrap()), Ordering::Relaxed);
    SEED_HI.store(u64::from_le_bytes(seed[8..16].try_into().unwrap()), Ordering::Relaxed);
}

/// Installs an explicit 128-bit hash seed, replacing the lazily-generated
/// default. Intended to be called once, early in process startup, before
/// any table is populated: changing the seed after elements are hashed
/// under the old one invalidates their bucket placement.
pub fn set_hash_function_seed(seed: [u8; 16]) {
    store_seed(seed);
    SEED_INIT.call_once(|| ());
}

/// The hash seed currently in effect, generating and storing one lazily if
/// none has been set yet.
pub fn hash_function_seed() -> [u8; 16] {
    ensure_seed();
    let mut seed = [0u8; 16];
    seed[0..8].copy_from_slice(&SEED_LO.load(Ordering::Relaxed).to_le_bytes());
    seed[8..16].copy_from_slice(&SEED_HI.load(Ordering::Relaxed).to_le_bytes());
    seed
}

fn hasher_for(seed: [u8; 16]) -> SipHasher13 {
    let lo = u64::from_le_bytes(seed[0..8].try_into().unwrap());
    let hi = u64::from_le_bytes(seed[8..16].try_into().unwrap());
    SipHasher13::new_with_keys(lo, hi)
}

/// Hashes a byte string under `seed`. Matches `hashtabGenHashFunction`.
pub fn hash_bytes(seed: [u8; 16], bytes: &[u8]) -> u64 {
    let mut hasher = hasher_for(seed);
    hasher.write(bytes);
    hasher.finish()
}

/// Case-insensitive variant of [`hash_bytes`], ASCII-folding each byte
/// before feeding it to the hasher. Matches `hashtabGenCaseHashFunction`.
pub fn hash_bytes_nocase(seed: [u8; 16], bytes: &[u8]) -> u64 {
    let mut hasher = hasher_for(seed);
    for &b in bytes {
        hasher.write_u8(b.to_ascii_lowercase());
    }
    hasher.finish()
}

/// Hashes `key` under the current process-wide seed via its `Hash` impl.
/// The default [`TableType::hash`](crate::config::TableType::hash) for key
/// types that are not raw byte strings.
pub fn keyed_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = hasher_for(hash_function_seed());
    key.hash(&mut hasher);
    hasher.finish()
}
