// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `base64url` encoding & decoding helpers.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};

/// Returns the `base64url`-encoded string **without padding** of the given
/// `payload`.
pub fn base64_url_encode<T: AsRef<[u8]>>(payload: T) -> String {
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decodes the given `payload` as the `base64url`-encoded string **without
/// padding** into bytes.
pub fn base64_url_decode<T: AsRef<[u8]>>(payload: T) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(payload)
}

/// Decodes the given `base64url` `payload`, accepting both padded and unpadded
/// input.
///
/// Wallet clients are inconsistent about padding, so the unpadded decode is
/// retried with the padded alphabet on [`base64::DecodeError::InvalidPadding`].
pub fn base64_url_decode_tolerant<T: AsRef<[u8]>>(
    payload: T,
) -> Result<Vec<u8>, base64::DecodeError> {
    match base64_url_decode(payload.as_ref()) {
        Err(base64::DecodeError::InvalidPadding) => URL_SAFE.decode(payload),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE;

    use super::*;

    const TEST_CASES: [(&str, &str); 4] = [
        ("Hello, World!", "SGVsbG8sIFdvcmxkIQ"),
        ("", ""),
        ("Rust! 🚀", "UnVzdCEg8J-agA"),
        ("no padding here", "bm8gcGFkZGluZyBoZXJl"),
    ];

    #[test]
    fn test_base64_url_encode() {
        for (input, expected) in TEST_CASES {
            let result = base64_url_encode(input);
            assert_eq!(result, expected, "{input}");
        }
    }

    #[test]
    fn test_base64_url_encode_binary_data() {
        let input = [0xDE, 0xAD, 0xBE, 0xEF];
        let expected = "3q2-7w";
        let result = base64_url_encode(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_base64_url_decode() {
        for (expected, input) in TEST_CASES {
            let result = base64_url_decode(input).unwrap();
            assert_eq!(result, expected.as_bytes(), "{input}");
        }
    }

    #[test]
    fn test_base64_url_decode_padded_input() {
        let input = "SGVsbG8sIFdvcmxkIQ==";
        let err = base64_url_decode(input).unwrap_err();
        assert!(matches!(err, base64::DecodeError::InvalidPadding));

        let result = base64_url_decode_tolerant(input).unwrap();
        assert_eq!(result, b"Hello, World!");
    }

    #[test]
    fn test_base64_url_decode_invalid_input() {
        let input = "inv@lid";
        let err = base64_url_decode(input).unwrap_err();
        assert!(matches!(err, base64::DecodeError::InvalidByte(3, b'@')));

        let err = base64_url_decode_tolerant(input).unwrap_err();
        assert!(matches!(err, base64::DecodeError::InvalidByte(3, b'@')));
    }

    #[test]
    fn test_round_trip_all_lengths() {
        for len in 0..=256usize {
            let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();

            let unpadded = base64_url_encode(&payload);
            assert_eq!(base64_url_decode(&unpadded).unwrap(), payload, "{len}");
            assert_eq!(
                base64_url_decode_tolerant(&unpadded).unwrap(),
                payload,
                "{len}"
            );

            let padded = URL_SAFE.encode(&payload);
            assert_eq!(
                base64_url_decode_tolerant(&padded).unwrap(),
                payload,
                "{len}"
            );
        }
    }
}
