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

//! The issuer's signature over the document: a `COSE_Sign1` structure whose
//! payload is the [`SecurityObject`] carrying the claim digests, the bound
//! holder key and the validity window.

use std::collections::BTreeMap;

use bherror::traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _};
use coset::{Algorithm, CborOrdering, CoseKey, Header, RegisteredLabelWithPrivate};

use super::{
    document::{DigestId, DocType, NameSpace, NamespaceClaims},
    Bytes, DateTime, TaggedCbor,
};
use crate::{
    crypto::{JwkPublic, SignatureVerifier, Signer, SigningAlgorithm},
    error::{DocumentError, Result},
    utils::{
        coset::{
            cose_key_from_jwk, cose_key_to_jwk, coset_alg_to_jws_alg, deserialize_coset,
            jws_alg_to_coset_alg, serialize_coset,
        },
        digest::{sha256, sha384, sha512},
    },
};

/// The version of the [`SecurityObject`] structure.
const SECURITY_OBJECT_VERSION: &str = "1.0";

/// The default digest algorithm used to add claim digests to the
/// [`SecurityObject`].
const DEFAULT_DIGEST_ALG: DigestAlgorithm = DigestAlgorithm::Sha256;

/// The issuer's `COSE_Sign1` signature over the [`SecurityObject`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IssuerAuth(
    #[serde(
        serialize_with = "serialize_coset",
        deserialize_with = "deserialize_coset"
    )]
    pub(crate) coset::CoseSign1,
);

impl IssuerAuth {
    /// Create a new [`IssuerAuth`] by signing the [`SecurityObject`] built
    /// from the given claims.
    ///
    /// Only `ES256` signing is currently supported.  The claim digests are
    /// computed over the tagged byte-string form of each claim, which makes
    /// individual claims disclosable without invalidating the signature.
    pub fn new<S: Signer>(
        doc_type: DocType,
        name_spaces: &[NamespaceClaims],
        holder_key: HolderKey,
        signer: &S,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let SigningAlgorithm::Es256 = signer.algorithm() else {
            return Err(bherror::Error::root(DocumentError::IssuerAuth)
                .ctx("Only ES256 signatures are currently supported"));
        };
        let protected = Header {
            alg: Some(Algorithm::Assigned(jws_alg_to_coset_alg(
                &signer.algorithm(),
            ))),
            ..Default::default()
        };

        let security_object: SecurityObjectBytes =
            SecurityObject::new(doc_type, name_spaces, holder_key, validity_info)?.into();
        let mut payload = vec![];
        ciborium::into_writer(&security_object, &mut payload)
            .foreign_err(|| DocumentError::IssuerAuth)?;

        let cose_sign1 = coset::CoseSign1Builder::new()
            .protected(protected)
            .payload(payload)
            .try_create_signature(&[], |data| signer.sign(data))
            .foreign_boxed_err(|| DocumentError::Signing)?
            .build();

        Ok(Self(cose_sign1))
    }

    /// Verifies the issuer's signature of the [`IssuerAuth`] against the
    /// trusted issuer key.
    pub(crate) fn verify_signature<'a>(
        &self,
        issuer_jwk: &JwkPublic,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        let alg = self
            .signing_algorithm()
            .ok_or_else(|| bherror::Error::root(DocumentError::MissingSigningAlgorithm))
            .ctx(|| "issuer authentication")?;

        let signature_verifier = get_signature_verifier(alg)
            .ok_or_else(|| bherror::Error::root(DocumentError::MissingSignatureVerifier(alg)))?;

        self.0.verify_signature(&[], |sig, data| {
            let verified = signature_verifier
                .verify(data, sig, issuer_jwk)
                .foreign_boxed_err(|| DocumentError::InvalidIssuerSignature)
                .ctx(|| "error while verifying signature")?;

            if !verified {
                return Err(bherror::Error::root(DocumentError::InvalidIssuerSignature)
                    .ctx("the signature is not valid"));
            };

            Ok(())
        })
    }

    /// Validates the disclosed claims against the signed digests of the
    /// underlying [`SecurityObject`].
    pub(crate) fn validate_claims(&self, name_spaces: &[NamespaceClaims]) -> Result<()> {
        self.security_object()?.validate_name_spaces(name_spaces)
    }

    /// Validates the document type and the time-validity information of the
    /// underlying [`SecurityObject`].
    pub(crate) fn validate(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        self.security_object()?.validate(current_time, doc_type)
    }

    /// Return the [`SecurityObject`] from the payload of the underlying
    /// `COSE_Sign1` structure.
    pub(crate) fn security_object(&self) -> Result<SecurityObject> {
        let Some(payload) = &self.0.payload else {
            return Err(
                bherror::Error::root(DocumentError::IssuerAuth).ctx("Security Object is missing")
            );
        };

        let security_object: SecurityObjectBytes = ciborium::from_reader(payload.as_slice())
            .foreign_err(|| DocumentError::IssuerAuth)
            .ctx(|| "Invalid Security Object")?;

        Ok(security_object.into())
    }

    /// Returns the [`HolderKey`] from the underlying [`SecurityObject`].
    pub fn holder_key(&self) -> Result<HolderKey> {
        Ok(self.security_object()?.holder_key_info.holder_key)
    }

    /// Return the `alg` element from the protected header of the underlying
    /// `COSE_Sign1` structure.
    pub fn signing_algorithm(&self) -> Option<SigningAlgorithm> {
        let alg = self.0.protected.header.alg.as_ref()?;

        let RegisteredLabelWithPrivate::Assigned(alg) = alg else {
            return None;
        };

        coset_alg_to_jws_alg(alg)
    }
}

/// [`SecurityObject`] in its tagged byte-string form.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SecurityObjectBytes(TaggedCbor<SecurityObject>);

impl From<SecurityObject> for SecurityObjectBytes {
    fn from(value: SecurityObject) -> Self {
        Self(value.into())
    }
}

impl From<SecurityObjectBytes> for SecurityObject {
    fn from(value: SecurityObjectBytes) -> Self {
        value.0.inner
    }
}

/// The issuer-signed security metadata of a document: per-claim digests, the
/// bound holder key and the validity window.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityObject {
    version: String,
    digest_algorithm: DigestAlgorithm,
    value_digests: ValueDigests,
    holder_key_info: HolderKeyInfo,
    doc_type: DocType,
    validity_info: ValidityInfo,
}

impl SecurityObject {
    fn new(
        doc_type: DocType,
        name_spaces: &[NamespaceClaims],
        holder_key: HolderKey,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let value_digests = name_spaces
            .iter()
            .map(|namespace_claims| {
                let digests = namespace_claims
                    .items
                    .iter()
                    .map(|item| {
                        Ok((item.0.inner.digest_id, item.digest(&DEFAULT_DIGEST_ALG)?.into()))
                    })
                    .collect::<Result<_>>()
                    .ctx(|| "failed to digest claims")?;

                Ok((namespace_claims.name_space.clone(), DigestIds(digests)))
            })
            .collect::<Result<_>>()?;

        Ok(SecurityObject {
            version: SECURITY_OBJECT_VERSION.to_owned(),
            digest_algorithm: DEFAULT_DIGEST_ALG,
            value_digests: ValueDigests(value_digests),
            holder_key_info: HolderKeyInfo { holder_key },
            doc_type,
            validity_info,
        })
    }

    /// Validates the underlying [`DocType`] and the time-validity
    /// information of the [`SecurityObject`].
    fn validate(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        if &self.doc_type != doc_type {
            return Err(bherror::Error::root(DocumentError::InvalidDocType(
                doc_type.clone(),
                self.doc_type.clone(),
            )));
        }

        self.validity_info.validate(current_time)
    }

    /// Validates only the digests of the disclosed claims.
    ///
    /// The digests of the disclosed claims are recomputed and checked against
    /// the signed digests of this [`SecurityObject`].
    fn validate_name_spaces(&self, name_spaces: &[NamespaceClaims]) -> Result<()> {
        for namespace_claims in name_spaces {
            if namespace_claims.items.is_empty() {
                continue;
            }
            let name_space = &namespace_claims.name_space;

            let signed_digests = self.value_digests.0.get(name_space).ok_or_else(|| {
                bherror::Error::root(DocumentError::MissingDigestNamespace(name_space.clone()))
            })?;

            for item in &namespace_claims.items {
                let digest_id = &item.0.inner.digest_id;

                let signed_digest = signed_digests.0.get(digest_id).ok_or_else(|| {
                    bherror::Error::root(DocumentError::MissingOrInvalidDigest(
                        name_space.clone(),
                        *digest_id,
                    ))
                    .ctx("the digest is missing")
                })?;
                let target_digest = item.digest(&self.digest_algorithm)?;

                if signed_digest.as_bytes() != target_digest {
                    return Err(bherror::Error::root(DocumentError::MissingOrInvalidDigest(
                        name_space.clone(),
                        *digest_id,
                    ))
                    .ctx("the digest is not valid"));
                }
            }
        }

        Ok(())
    }
}

/// Supported digest algorithms for the claim digests of a
/// [`SecurityObject`].
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DigestAlgorithm {
    /// The SHA-256 digest algorithm.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// The SHA-384 digest algorithm.
    #[serde(rename = "SHA-384")]
    Sha384,
    /// The SHA-512 digest algorithm.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Computes the digest of the `payload` with this algorithm.
    pub(crate) fn digest(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => sha256(payload).to_vec(),
            DigestAlgorithm::Sha384 => sha384(payload).to_vec(),
            DigestAlgorithm::Sha512 => sha512(payload).to_vec(),
        }
    }
}

/// The signed claim digests, grouped by namespace.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueDigests(BTreeMap<NameSpace, DigestIds>);

/// The signed claim digests of a single namespace.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DigestIds(BTreeMap<DigestId, Bytes>);

/// The holder key material signed into the [`SecurityObject`].
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderKeyInfo {
    holder_key: HolderKey,
}

/// The holder's public key the credential is bound to.
///
/// For more details on COSE_Key specifications look
/// [here](https://datatracker.ietf.org/doc/html/rfc8152)
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HolderKey(
    #[serde(
        serialize_with = "serialize_coset",
        deserialize_with = "deserialize_coset"
    )]
    pub(crate) CoseKey,
);

impl HolderKey {
    /// Method for creating a [`HolderKey`] out of a `JWK`.
    pub fn from_jwk(jwk: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(Self(
            cose_key_from_jwk(jwk).ctx(|| "Failed to create HolderKey")?,
        ))
    }

    /// Returns a JWK representation of the underlying `COSE_Key`.
    pub fn as_jwk(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        cose_key_to_jwk(&self.0)
    }

    /// Re-order the contents of the key lexicographically, as per
    /// `Section 4.2.1` of the `RFC 8949` (_Core Deterministic Encoding
    /// Requirements_).
    pub(crate) fn canonicalize(&mut self) {
        self.0.canonicalize(CborOrdering::Lexicographic);
    }
}

/// The time-validity window of a credential.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(
    deny_unknown_fields,
    rename_all = "camelCase",
    try_from = "ValidityInfoDeserializeHelper"
)]
#[non_exhaustive]
pub struct ValidityInfo {
    /// The timestamp at which the signature was created.
    pub signed: DateTime,

    /// The timestamp before which the credential is not yet valid.
    pub valid_from: DateTime,

    /// The timestamp after which the credential is no longer valid.
    pub valid_until: DateTime,

    /// The timestamp at which the issuing authority infrastructure expects to
    /// re-sign the credential (and potentially update data elements).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_update: Option<DateTime>,
}

/// A helper struct to [`Deserialize`][serde::Deserialize] [`ValidityInfo`] with
/// custom invariants.
///
/// **NEVER** use this `struct` for anything else.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
#[non_exhaustive]
struct ValidityInfoDeserializeHelper {
    signed: DateTime,
    valid_from: DateTime,
    valid_until: DateTime,
    expected_update: Option<DateTime>,
}

impl TryFrom<ValidityInfoDeserializeHelper> for ValidityInfo {
    type Error = bherror::Error<DocumentError>;

    fn try_from(value: ValidityInfoDeserializeHelper) -> std::result::Result<Self, Self::Error> {
        Self::new(
            value.signed,
            value.valid_from,
            value.valid_until,
            value.expected_update,
        )
    }
}

impl ValidityInfo {
    /// Creates new [`ValidityInfo`], checking the provided data along the way.
    ///
    /// - The timestamp of `valid_from` shall be equal or later than the
    ///   `signed` element.
    /// - The value of the `valid_until` timestamp shall be later than the
    ///   `valid_from` element.
    pub fn new(
        signed: DateTime,
        valid_from: DateTime,
        valid_until: DateTime,
        expected_update: Option<DateTime>,
    ) -> Result<Self> {
        if valid_from.0 < signed.0 {
            return Err(bherror::Error::root(DocumentError::InvalidValidityInfo)
                .ctx("`valid_from` must be equal or later than `signed`"));
        }

        if valid_until.0 <= valid_from.0 {
            return Err(bherror::Error::root(DocumentError::InvalidValidityInfo)
                .ctx("`valid_until` must be later than `valid_from`"));
        }

        Ok(Self {
            signed,
            valid_from,
            valid_until,
            expected_update,
        })
    }

    /// Validates the expiration and the not-valid-before claim.
    fn validate(&self, current_time: u64) -> Result<()> {
        let valid_from = self.valid_from.0.timestamp();
        if (current_time as i128) < (valid_from as i128) {
            return Err(bherror::Error::root(DocumentError::DocumentNotYetValid(
                valid_from,
            )));
        }

        let valid_until = self.valid_until.0.timestamp();
        if (current_time as i128) > (valid_until as i128) {
            return Err(bherror::Error::root(DocumentError::DocumentExpired(
                valid_until,
            )));
        }

        Ok(())
    }
}
