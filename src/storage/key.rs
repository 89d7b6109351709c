// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! MVCC key encoding and decoding.
//!
//! Maps a `(user key, timestamp)` pair onto one physical key for a store that
//! only orders flat byte strings.
//! Format: `[escaped key][0x00 0x01][MAX-ts:u64 BE]`
//!
//! Escaping turns every `0x00` of the user key into `0x00 0xFF`, so the
//! terminator `0x00 0x01` can never appear inside a key. Two properties follow:
//! user keys keep their byte order, and the versions of a key never interleave
//! with the versions of a longer key that starts with it.
//!
//! The timestamp is inverted (MAX - value) so that newer versions sort first
//! within the same user key. A forward scan starting at `encode(key, ts)`
//! therefore meets the newest version at or before `ts` first, and the range
//! `[encode(key, ts), key_boundary(key))` holds exactly the versions `<= ts`.

use super::{Key, StorageError, Timestamp};

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;
const BOUNDARY: u8 = 0x02;
const TIMESTAMP_LEN: usize = 8;

fn escape_into(buf: &mut Vec<u8>, key: &[u8]) {
    for &b in key {
        buf.push(b);
        if b == ESCAPE {
            buf.push(ESCAPED_ZERO);
        }
    }
}

fn escaped_capacity(key: &[u8]) -> usize {
    key.len() + key.iter().filter(|&&b| b == ESCAPE).count() + 2
}

/// Encodes a user key with timestamp into a physical key.
///
/// Using big-endian ensures proper lexicographic ordering.
/// Inverting the timestamp (MAX - value) ensures newer versions sort first.
#[inline]
pub fn encode_mvcc_key(key: &Key, ts: Timestamp) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    let mut encoded = Vec::with_capacity(escaped_capacity(key_bytes) + TIMESTAMP_LEN);

    escape_into(&mut encoded, key_bytes);
    encoded.push(ESCAPE);
    encoded.push(TERMINATOR);
    encoded.extend_from_slice(&(u64::MAX - ts).to_be_bytes());

    encoded
}

/// Returns the prefix shared by every version of a user key.
///
/// It is also the smallest physical key of that user key, so it doubles as
/// the inclusive start of a range over user keys.
#[inline]
pub fn user_key_prefix(key: &Key) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    let mut prefix = Vec::with_capacity(escaped_capacity(key_bytes));
    escape_into(&mut prefix, key_bytes);
    prefix.push(ESCAPE);
    prefix.push(TERMINATOR);
    prefix
}

/// Returns the exclusive upper bound of all versions of a user key.
///
/// Depends on the key alone. It sorts after every version of `key` and before
/// every version of any other key, including keys that extend `key`.
#[inline]
pub fn key_boundary(key: &Key) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    let mut boundary = Vec::with_capacity(escaped_capacity(key_bytes));
    escape_into(&mut boundary, key_bytes);
    boundary.push(ESCAPE);
    boundary.push(BOUNDARY);
    boundary
}

/// Decodes a physical key back into user key and timestamp.
pub fn decode_mvcc_key(encoded: &[u8]) -> Result<(Key, Timestamp), StorageError> {
    let mut key_bytes = Vec::with_capacity(encoded.len());
    let mut pos = 0;

    loop {
        let Some(&b) = encoded.get(pos) else {
            return Err(StorageError::InvalidKeyEncoding(
                "missing key terminator".to_string(),
            ));
        };
        if b != ESCAPE {
            key_bytes.push(b);
            pos += 1;
            continue;
        }
        match encoded.get(pos + 1) {
            Some(&ESCAPED_ZERO) => {
                key_bytes.push(ESCAPE);
                pos += 2;
            }
            Some(&TERMINATOR) => {
                pos += 2;
                break;
            }
            Some(other) => {
                return Err(StorageError::InvalidKeyEncoding(format!(
                    "unexpected byte {:#04x} after escape at offset {}",
                    other,
                    pos + 1
                )));
            }
            None => {
                return Err(StorageError::InvalidKeyEncoding(
                    "key ends inside an escape sequence".to_string(),
                ));
            }
        }
    }

    let suffix = &encoded[pos..];
    let inverted: [u8; TIMESTAMP_LEN] = suffix.try_into().map_err(|_| {
        StorageError::InvalidKeyEncoding(format!(
            "expected {} timestamp bytes, got {}",
            TIMESTAMP_LEN,
            suffix.len()
        ))
    })?;

    Ok((Key::new(key_bytes), u64::MAX - u64::from_be_bytes(inverted)))
}

/// Returns the smallest byte string that sorts strictly after `key`.
#[inline]
pub(crate) fn successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MAX_TIMESTAMP;

    #[test]
    fn test_encode_decode_roundtrip() {
        let key = Key::from("hello");

        let encoded = encode_mvcc_key(&key, 42);
        let (decoded_key, decoded_ts) = decode_mvcc_key(&encoded).unwrap();

        assert_eq!(key, decoded_key);
        assert_eq!(decoded_ts, 42);
    }

    #[test]
    fn test_encode_decode_key_with_zero_bytes() {
        let key = Key::new(vec![0x00, b'a', 0x00, 0x00, 0xFF, 0x01]);

        let encoded = encode_mvcc_key(&key, MAX_TIMESTAMP);
        let (decoded_key, decoded_ts) = decode_mvcc_key(&encoded).unwrap();

        assert_eq!(key, decoded_key);
        assert_eq!(decoded_ts, MAX_TIMESTAMP);
    }

    #[test]
    fn test_encode_decode_empty_key() {
        let key = Key::from(Vec::<u8>::new());

        let encoded = encode_mvcc_key(&key, 0);
        let (decoded_key, decoded_ts) = decode_mvcc_key(&encoded).unwrap();

        assert!(decoded_key.is_empty());
        assert_eq!(decoded_ts, 0);
    }

    #[test]
    fn test_newer_versions_sort_first() {
        let key = Key::from("key");

        let encoded_old = encode_mvcc_key(&key, 100);
        let encoded_new = encode_mvcc_key(&key, 200);

        assert!(encoded_new < encoded_old, "newer version should sort first");
    }

    #[test]
    fn test_max_timestamp_is_smallest_version() {
        let key = Key::from("key");

        assert_eq!(
            encode_mvcc_key(&key, MAX_TIMESTAMP)[..],
            [user_key_prefix(&key), vec![0u8; 8]].concat()[..]
        );
        assert!(encode_mvcc_key(&key, 0) < key_boundary(&key));
    }

    #[test]
    fn test_different_keys_sort_correctly() {
        let encoded_a = encode_mvcc_key(&Key::from("aaa"), 1);
        let encoded_b = encode_mvcc_key(&Key::from("bbb"), 1);

        assert!(encoded_a < encoded_b);
    }

    #[test]
    fn test_boundary_separates_prefix_keys() {
        let short = Key::from("a");
        let boundary = key_boundary(&short);

        for long in [
            Key::from("ab"),
            Key::new(vec![b'a', 0x00]),
            Key::new(vec![b'a', 0x00, 0x01]),
            Key::new(vec![b'a', 0x01]),
        ] {
            let newest = encode_mvcc_key(&long, MAX_TIMESTAMP);
            let oldest = encode_mvcc_key(&long, 0);
            assert!(boundary < newest, "boundary must precede {:?}", long);
            assert!(encode_mvcc_key(&short, 0) < oldest);
        }
    }

    #[test]
    fn test_user_key_prefix() {
        let key = Key::from("hello");
        let prefix = user_key_prefix(&key);

        assert!(encode_mvcc_key(&key, 1).starts_with(&prefix));
        assert!(encode_mvcc_key(&key, 2).starts_with(&prefix));
        assert!(!encode_mvcc_key(&Key::from("hello!"), 1).starts_with(&prefix));
    }

    #[test]
    fn test_successor_is_next_key() {
        let key = encode_mvcc_key(&Key::from("k"), 7);
        let next = successor(&key);

        assert!(next > key);
        assert!(next < encode_mvcc_key(&Key::from("k"), 6));
    }

    #[test]
    fn test_decode_missing_terminator() {
        assert!(decode_mvcc_key(b"abc").is_err());
        assert!(decode_mvcc_key(&[b'a', 0x00]).is_err());
    }

    #[test]
    fn test_decode_bad_escape() {
        let result = decode_mvcc_key(&[b'a', 0x00, 0x07, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(result, Err(StorageError::InvalidKeyEncoding(_))));
    }

    #[test]
    fn test_decode_wrong_timestamp_length() {
        let mut encoded = encode_mvcc_key(&Key::from("k"), 5);
        encoded.pop();
        assert!(decode_mvcc_key(&encoded).is_err());

        let boundary = key_boundary(&Key::from("k"));
        assert!(decode_mvcc_key(&boundary).is_err());
    }
}
