//! License key generation and domain normalization.
//!
//! Keys are opaque: no embedded payload, checksum, or signature. Validity is
//! decided solely by database lookup, so the generator only has to produce
//! well-distributed identifiers. Uniqueness is enforced by the UNIQUE
//! constraint on `sales.license_key`; callers retry generation on conflict.

use rand::Rng;

const KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const KEY_GROUPS: usize = 4;
const KEY_GROUP_LEN: usize = 4;

/// Generate a license key: `<prefix>-XXXX-XXXX-XXXX-XXXX` over [A-Z0-9].
///
/// Pure over the thread-local RNG; performs no uniqueness check.
pub fn generate_license_key(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(prefix.len() + KEY_GROUPS * (KEY_GROUP_LEN + 1));
    key.push_str(prefix);

    for _ in 0..KEY_GROUPS {
        key.push('-');
        for _ in 0..KEY_GROUP_LEN {
            let idx = rng.gen_range(0..KEY_CHARSET.len());
            key.push(KEY_CHARSET[idx] as char);
        }
    }

    key
}

/// Normalize a customer-supplied domain for ledger lookups and writes.
///
/// Lowercases, then strips a leading `http://` or `https://` scheme and a
/// leading `www.` label. Lowercasing comes first so the scheme strip also
/// catches `HTTP://` spellings. Two inputs that normalize identically are the
/// same domain for all activation purposes.
pub fn normalize_domain(raw: &str) -> String {
    let d = raw.trim().to_lowercase();
    let d = d
        .strip_prefix("https://")
        .or_else(|| d.strip_prefix("http://"))
        .unwrap_or(&d);
    let d = d.strip_prefix("www.").unwrap_or(d);
    d.to_string()
}
