//! String array entry encodings.
//!
//! The functions here produce the stored form of an entry. The matching
//! decoders emitted into the output undo them at runtime; the Rust decoders
//! below follow the same steps so round trips can be checked without a
//! JavaScript engine.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Alphabet used for rc4 keys.
pub const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a per-entry rc4 key.
pub const KEY_LENGTH: usize = 4;

/// Base64 of the UTF-8 bytes of `value`.
pub fn encode_base64(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// RC4 of the UTF-8 bytes of `value` under `key`, then base64.
pub fn encode_rc4(value: &str, key: &str) -> String {
    STANDARD.encode(rc4(key.as_bytes(), value.as_bytes()))
}

/// Inverse of [`encode_base64`].
pub fn decode_base64(stored: &str) -> Option<String> {
    let bytes = STANDARD.decode(stored).ok()?;
    String::from_utf8(bytes).ok()
}

/// Inverse of [`encode_rc4`].
pub fn decode_rc4(stored: &str, key: &str) -> Option<String> {
    let bytes = STANDARD.decode(stored).ok()?;
    String::from_utf8(rc4(key.as_bytes(), &bytes)).ok()
}

/// RC4 keystream applied to `data`. Symmetric.
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    if !key.is_empty() {
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            let k = s[s[i as usize].wrapping_add(s[j as usize]) as usize];
            byte ^ k
        })
        .collect()
}
