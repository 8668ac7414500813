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

//! The identity document envelope posted by the wallet, and the issuer-signed
//! claim structures it carries.

use std::fmt;

use bherror::traits::ForeignError as _;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    binding::ReaderBinding,
    issuer_auth::{HolderKey, IssuerAuth, ValidityInfo},
    Bytes, TaggedCbor,
};
use crate::{
    crypto::{JwkPublic, SignatureVerifier, Signer, SigningAlgorithm},
    error::{DocumentError, Result},
    models::issuer_auth::DigestAlgorithm,
    utils::base64::{base64_url_decode_tolerant, base64_url_encode},
};

/// The version of the [`IdentityDocument`] container.
const IDENTITY_DOCUMENT_VERSION: &str = "1.0";

/// The document type, e.g. `org.iso.18013.5.1.mDL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocType(String);

/// A namespace grouping related claims, e.g. `org.iso.18013.5.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameSpace(String);

/// The identifier of a single claim within a namespace, e.g. `family_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementIdentifier(String);

/// The raw CBOR value of a single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimValue(ciborium::Value);

/// The identifier of a claim digest within the
/// [`SecurityObject`][super::issuer_auth::SecurityObject].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DigestId(u64);

macro_rules! impl_string_newtype {
    ($name:ident) => {
        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $name {
            /// A view of the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_newtype!(DocType);
impl_string_newtype!(NameSpace);
impl_string_newtype!(ElementIdentifier);

impl From<u64> for DigestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DigestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ClaimValue {
    /// A view of the underlying CBOR value.
    pub fn as_value(&self) -> &ciborium::Value {
        &self.0
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self(ciborium::Value::Text(value.to_owned()))
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self(ciborium::Value::Text(value))
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self(ciborium::Value::Integer(value.into()))
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self(ciborium::Value::Bool(value))
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self(ciborium::Value::Float(value))
    }
}

impl From<ciborium::Value> for ClaimValue {
    fn from(value: ciborium::Value) -> Self {
        Self(value)
    }
}

/// The ordered claim set of a document, keyed by namespace.
///
/// Both the namespaces and the claims within a namespace keep their insertion
/// order, which determines the order of the extracted attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Claims(pub Vec<(NameSpace, Vec<(ElementIdentifier, ClaimValue)>)>);

/// The decoded form of the opaque document blob posted by the wallet.
///
/// Contains the issuer-signed claims together with the holder's
/// reader-binding proof for a single presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    pub(crate) version: String,
    pub(crate) doc_type: DocType,
    pub(crate) issuer_signed: IssuerSigned,
    pub(crate) binding: ReaderBinding,
}

impl IdentityDocument {
    pub(crate) fn new(doc_type: DocType, issuer_signed: IssuerSigned, binding: ReaderBinding) -> Self {
        Self {
            version: IDENTITY_DOCUMENT_VERSION.to_owned(),
            doc_type,
            issuer_signed,
            binding,
        }
    }

    /// Parses the provided `base64url`-encoded `string` of _CBOR_ data into an
    /// [`IdentityDocument`].
    ///
    /// This performs structural checks only; no trust decision is made here.
    /// Both padded and unpadded `base64url` input is accepted, because wallet
    /// clients are inconsistent about padding.
    pub fn from_base64_cbor(value: &str) -> Result<Self> {
        let decoded = base64_url_decode_tolerant(value)
            .foreign_err(|| DocumentError::MalformedDocument("invalid base64".to_owned()))?;

        let document: Self = ciborium::from_reader(decoded.as_slice())
            .foreign_err(|| DocumentError::MalformedDocument("invalid CBOR".to_owned()))?;

        if document.version != IDENTITY_DOCUMENT_VERSION {
            return Err(bherror::Error::root(DocumentError::MalformedDocument(
                format!("unsupported container version \"{}\"", document.version),
            )));
        }

        Ok(document)
    }

    /// Serializes the [`IdentityDocument`] to a `base64url`-encoded (**without
    /// padding**) `string` of _CBOR_ data.
    pub fn to_base64_cbor(&self) -> Result<String> {
        let mut cbor = Vec::new();
        ciborium::into_writer(self, &mut cbor).foreign_err(|| {
            DocumentError::MalformedDocument("serialization to CBOR failed".to_owned())
        })?;

        Ok(base64_url_encode(cbor))
    }

    /// The document type the credential was issued for.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// The nonce echoed by the wallet in the reader-binding proof.
    pub fn nonce(&self) -> &[u8] {
        self.binding.nonce()
    }
}

/// The issuer-signed portion of an [`IdentityDocument`]: the disclosed claims
/// together with the issuer's signature over their digests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSigned {
    pub(crate) name_spaces: Vec<NamespaceClaims>,
    pub(crate) issuer_auth: IssuerAuth,
}

impl IssuerSigned {
    /// Creates a new [`IssuerSigned`], salting and digesting each claim and
    /// signing the resulting security object.
    pub(crate) fn new<S: Signer, R: Rng + ?Sized>(
        doc_type: DocType,
        claims: Claims,
        holder_key: HolderKey,
        signer: &S,
        rng: &mut R,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let name_spaces = claims
            .0
            .into_iter()
            .map(|(name_space, items)| {
                let items = items
                    .into_iter()
                    .enumerate()
                    .map(|(digest_id, (element_identifier, element_value))| {
                        SignedClaim {
                            digest_id: (digest_id as u64).into(),
                            random: Bytes::random_salt(rng),
                            element_identifier,
                            element_value,
                        }
                        .into()
                    })
                    .collect();

                NamespaceClaims { name_space, items }
            })
            .collect::<Vec<_>>();

        let issuer_auth =
            IssuerAuth::new(doc_type, &name_spaces, holder_key, signer, validity_info)?;

        Ok(Self {
            name_spaces,
            issuer_auth,
        })
    }

    /// Extracts and returns only the data elements, in disclosure order.
    pub fn into_claims(self) -> Claims {
        Claims(
            self.name_spaces
                .into_iter()
                .map(|namespace_claims| {
                    let items = namespace_claims
                        .items
                        .into_iter()
                        .map(|item| {
                            let claim = SignedClaim::from(item);
                            (claim.element_identifier, claim.element_value)
                        })
                        .collect();

                    (namespace_claims.name_space, items)
                })
                .collect(),
        )
    }

    /// Verifies the issuer's signature of the underlying [`IssuerAuth`]
    /// against the trusted issuer key.
    pub(crate) fn verify_signature<'a>(
        &self,
        issuer_jwk: &JwkPublic,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        self.issuer_auth
            .verify_signature(issuer_jwk, get_signature_verifier)
    }

    /// Validates the disclosed claims against the signed digests.
    pub(crate) fn validate_claims(&self) -> Result<()> {
        self.issuer_auth.validate_claims(&self.name_spaces)
    }

    /// Validates the document type and the time-validity of the security
    /// object.
    pub(crate) fn validate(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        self.issuer_auth.validate(current_time, doc_type)
    }

    /// Returns the signed [`HolderKey`] the credential is bound to.
    pub fn holder_key(&self) -> Result<HolderKey> {
        self.issuer_auth.holder_key()
    }
}

/// The disclosed claims of a single namespace, in disclosure order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceClaims {
    pub(crate) name_space: NameSpace,
    pub(crate) items: Vec<SignedClaimBytes>,
}

/// A [`SignedClaim`] in its tagged byte-string form, over which the issuer's
/// digests are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedClaimBytes(pub(crate) TaggedCbor<SignedClaim>);

impl SignedClaimBytes {
    /// Computes the digest of the serialized `self`.
    pub fn digest(&self, alg: &DigestAlgorithm) -> Result<Vec<u8>> {
        let serialize = || -> Result<Vec<u8>> {
            let mut payload = Vec::new();
            ciborium::into_writer(self, &mut payload)
                .foreign_err(|| DocumentError::IssuerAuth)?;

            Ok(payload)
        };

        let payload = match self.0.original_data {
            Some(ref original_data) => original_data,
            None => &serialize()?,
        };

        Ok(alg.digest(payload))
    }
}

impl From<SignedClaim> for SignedClaimBytes {
    fn from(value: SignedClaim) -> Self {
        Self(value.into())
    }
}

impl From<SignedClaimBytes> for SignedClaim {
    fn from(value: SignedClaimBytes) -> Self {
        value.0.inner
    }
}

/// A single salted claim, the unit of selective disclosure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedClaim {
    pub(crate) random: Bytes,
    #[serde(rename = "digestID")]
    pub(crate) digest_id: DigestId,
    pub(crate) element_identifier: ElementIdentifier,
    pub(crate) element_value: ClaimValue,
}
