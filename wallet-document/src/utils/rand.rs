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

//! Generation of random salts, nonces and opaque tokens.

use rand::Rng;

use super::base64::base64_url_encode;

/// A length in bytes of the `random` salt carried by every
/// [`SignedClaim`][crate::models::document::SignedClaim].
///
/// The minimum value is specified to be `16` in the section `9.1.2.5` of the [ISO/IEC
/// 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
const SALT_ENTROPY_BYTES: usize = 16;

/// A length in bytes of challenge nonces and session tokens.
///
/// 32 bytes gives 256 bits of entropy, comfortably above the 128-bit floor
/// required for unguessable security tokens.
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Generates the random salt for a single
/// [`SignedClaim`][crate::models::document::SignedClaim].
pub fn generate_salt<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut salt = vec![0u8; SALT_ENTROPY_BYTES];
    rng.fill_bytes(&mut salt);
    debug_assert_eq!(
        salt.len(),
        SALT_ENTROPY_BYTES,
        "`salt` length MUST be {}",
        SALT_ENTROPY_BYTES
    );
    salt
}

/// Generates a challenge `nonce` as a raw byte sequence.
pub fn generate_nonce<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut nonce = vec![0u8; TOKEN_ENTROPY_BYTES];
    rng.fill_bytes(&mut nonce);
    nonce
}

/// Generates an unguessable opaque token.
///
/// The token is generated as a random, `base64url`-encoded `String` with 256
/// bits of entropy.
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut token_bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rng.fill_bytes(&mut token_bytes);
    base64_url_encode(token_bytes)
}
