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

//! Signing and signature-verification primitives used by the crate.
//!
//! The document layer only depends on the [`Signer`] and [`SignatureVerifier`]
//! traits; the `ES256` implementations based on `openssl` are provided for
//! production use and for tests.

use openssl::{
    bn::BigNum,
    ec::{EcGroup, EcKey},
    ecdsa::EcdsaSig,
    nid::Nid,
    pkey::{PKey, Private, Public},
};

use crate::utils::{
    base64::{base64_url_decode, base64_url_encode},
    digest::sha256,
};

/// A JSON Web Key containing only public key material.
pub type JwkPublic = serde_json::Map<String, serde_json::Value>;

/// Boxed error type returned by the [`Signer`] & [`SignatureVerifier`] traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The byte length of a single `ES256` signature scalar (`r` or `s`).
const ES256_SCALAR_BYTES: i32 = 32;

/// Signing algorithms supported by the document layer.
///
/// Signatures are always carried in the JWS format, i.e. `r || s` for the
/// ECDSA family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum SigningAlgorithm {
    /// ECDSA using P-256 and SHA-256.
    #[strum(to_string = "ES256")]
    Es256,
    /// ECDSA using P-384 and SHA-384.
    #[strum(to_string = "ES384")]
    Es384,
    /// ECDSA using P-521 and SHA-512.
    #[strum(to_string = "ES512")]
    Es512,
}

/// A producer of digital signatures over arbitrary messages.
pub trait Signer {
    /// The algorithm the signatures are produced with.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Sign the given `message`, returning the signature in the JWS format.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// The public counterpart of the signing key, as a JWK.
    fn public_jwk(&self) -> Result<JwkPublic, BoxError>;
}

/// A verifier of digital signatures against a public key in the JWK format.
pub trait SignatureVerifier {
    /// The algorithm this verifier checks signatures of.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Verify the `signature` over the `message` against the `public_key`.
    ///
    /// Returns `Ok(false)` when the signature is well-formed but does not
    /// match; errors are reserved for malformed inputs.
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> Result<bool, BoxError>;
}

/// An `ES256` [`Signer`] backed by an `openssl` P-256 private key.
pub struct Es256Signer {
    key: EcKey<Private>,
}

impl Es256Signer {
    /// Generate a fresh P-256 signing key.
    pub fn generate() -> Result<Self, BoxError> {
        let group = p256_group()?;
        let key = EcKey::generate(&group)?;
        Ok(Self { key })
    }

    /// Load the signing key from a PEM-encoded EC private key.
    pub fn from_private_pem(pem: &[u8]) -> Result<Self, BoxError> {
        let key = EcKey::private_key_from_pem(pem)?;
        Ok(Self { key })
    }

    /// The public key as a DER-encoded `SubjectPublicKeyInfo` structure.
    pub fn public_key_der(&self) -> Result<Vec<u8>, BoxError> {
        let public = EcKey::from_public_key(self.key.group(), self.key.public_key())?;
        let pkey = PKey::from_ec_key(public)?;
        Ok(pkey.public_key_to_der()?)
    }
}

impl Signer for Es256Signer {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        let digest = sha256(message);
        let signature = EcdsaSig::sign(&digest, self.key.as_ref())?;

        let mut jws_signature = signature.r().to_vec_padded(ES256_SCALAR_BYTES)?;
        jws_signature.extend(signature.s().to_vec_padded(ES256_SCALAR_BYTES)?);

        Ok(jws_signature)
    }

    fn public_jwk(&self) -> Result<JwkPublic, BoxError> {
        let public = EcKey::from_public_key(self.key.group(), self.key.public_key())?;
        ec_public_key_to_jwk(&public, None)
    }
}

/// An `ES256` [`SignatureVerifier`] backed by `openssl`.
pub struct Es256Verifier;

impl SignatureVerifier for Es256Verifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> Result<bool, BoxError> {
        if signature.len() != 2 * ES256_SCALAR_BYTES as usize {
            return Err("ES256 signature must be 64 bytes".into());
        }

        let (r, s) = signature.split_at(ES256_SCALAR_BYTES as usize);
        let signature =
            EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;

        let key = jwk_to_ec_public_key(public_key)?;
        let digest = sha256(message);

        Ok(signature.verify(&digest, &key)?)
    }
}

/// Builds a P-256 public JWK from the affine coordinates of an EC point.
pub fn ec_public_affine_coords_to_jwk(x: &[u8], y: &[u8], kid: Option<&str>) -> JwkPublic {
    let mut jwk = serde_json::Map::new();
    jwk.insert("kty".to_owned(), "EC".into());
    jwk.insert("alg".to_owned(), "ES256".into());
    jwk.insert("use".to_owned(), "sig".into());
    jwk.insert("crv".to_owned(), "P-256".into());
    jwk.insert("x".to_owned(), base64_url_encode(x).into());
    jwk.insert("y".to_owned(), base64_url_encode(y).into());
    if let Some(kid) = kid {
        jwk.insert("kid".to_owned(), kid.into());
    }
    jwk
}

/// Converts an `openssl` P-256 public key into a JWK.
pub fn ec_public_key_to_jwk(key: &EcKey<Public>, kid: Option<&str>) -> Result<JwkPublic, BoxError> {
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let mut x = BigNum::new()?;
    let mut y = BigNum::new()?;
    key.public_key()
        .affine_coordinates(key.group(), &mut x, &mut y, &mut ctx)?;

    Ok(ec_public_affine_coords_to_jwk(
        &x.to_vec_padded(ES256_SCALAR_BYTES)?,
        &y.to_vec_padded(ES256_SCALAR_BYTES)?,
        kid,
    ))
}

/// Extracts the P-256 public JWK from a PEM-encoded public key.
pub fn public_jwk_from_pem(pem: &[u8]) -> Result<JwkPublic, BoxError> {
    let pkey = PKey::public_key_from_pem(pem)?;
    let key = pkey.ec_key()?;
    ec_public_key_to_jwk(&key, None)
}

/// Converts a P-256 public JWK into an `openssl` EC key.
fn jwk_to_ec_public_key(jwk: &JwkPublic) -> Result<EcKey<Public>, BoxError> {
    let coord = |name: &str| -> Result<BigNum, BoxError> {
        let value = jwk
            .get(name)
            .and_then(|value| value.as_str())
            .ok_or_else(|| format!("JWK is missing the \"{name}\" coordinate"))?;
        Ok(BigNum::from_slice(&base64_url_decode(value)?)?)
    };

    let group = p256_group()?;
    let x = coord("x")?;
    let y = coord("y")?;
    let key = EcKey::from_public_key_affine_coordinates(&group, &x, &y)?;
    key.check_key()?;

    Ok(key)
}

fn p256_group() -> Result<EcGroup, BoxError> {
    Ok(EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = Es256Signer::generate().unwrap();
        let message = b"identity verification challenge";

        let signature = signer.sign(message).unwrap();
        assert_eq!(signature.len(), 64);

        let jwk = signer.public_jwk().unwrap();
        assert!(Es256Verifier.verify(message, &signature, &jwk).unwrap());
    }

    #[test]
    fn verify_rejects_other_message() {
        let signer = Es256Signer::generate().unwrap();
        let signature = signer.sign(b"original message").unwrap();

        let jwk = signer.public_jwk().unwrap();
        assert!(!Es256Verifier
            .verify(b"tampered message", &signature, &jwk)
            .unwrap());
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let signer = Es256Signer::generate().unwrap();
        let other = Es256Signer::generate().unwrap();
        let message = b"bound to one key only";

        let signature = signer.sign(message).unwrap();
        let jwk = other.public_jwk().unwrap();

        assert!(!Es256Verifier.verify(message, &signature, &jwk).unwrap());
    }

    #[test]
    fn public_key_der_round_trips_through_pem() {
        let signer = Es256Signer::generate().unwrap();
        let der = signer.public_key_der().unwrap();

        let pkey = PKey::public_key_from_der(&der).unwrap();
        let pem = pkey.public_key_to_pem().unwrap();

        assert_eq!(public_jwk_from_pem(&pem).unwrap(), signer.public_jwk().unwrap());
    }
}
