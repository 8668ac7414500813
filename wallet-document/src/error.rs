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

//! This module defines the error values returned by the crate API.

use crate::{
    crypto::SigningAlgorithm,
    models::document::{DigestId, DocType, ElementIdentifier, NameSpace},
};

/// Error type used across the crate API.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum DocumentError {
    /// Error when the identity document container fails structural checks.
    #[strum(to_string = "Malformed identity document: {0}")]
    MalformedDocument(String),
    /// Error used by the [`SecurityObject`][crate::models::issuer_auth::SecurityObject] API.
    #[strum(to_string = "Error in Security Object")]
    SecurityObject,
    /// Error used by the [`IssuerAuth`][crate::models::issuer_auth::IssuerAuth] API.
    #[strum(to_string = "Error in Issuer Auth")]
    IssuerAuth,
    /// Error when we fail to produce a signature.
    #[strum(to_string = "Error when signing data")]
    Signing,
    /// Error when we detect the issuer's signature isn't valid.
    #[strum(to_string = "Issuer signature validation failed")]
    InvalidIssuerSignature,
    /// Error when the nonce echoed by the wallet does not match the challenge.
    #[strum(to_string = "Nonce does not match the issued challenge")]
    NonceMismatch,
    /// Error when the reader-binding proof fails to verify.
    #[strum(to_string = "Reader binding validation failed")]
    ReaderBindingFailed,
    /// Error when the underlying data model is missing a signing algorithm or if we don't
    /// support it.
    #[strum(to_string = "Signing algorithm is missing or unsupported")]
    MissingSigningAlgorithm,
    /// Error when we are missing an appropriate signature verification implementation.
    #[strum(to_string = "Signature verifier for the {0} is missing")]
    MissingSignatureVerifier(SigningAlgorithm),
    /// Error when we encounter an unexpected `doc_type`.
    #[strum(to_string = "Invalid `doc_type`, expected {0}, actual {1}")]
    InvalidDocType(DocType, DocType),
    /// Error when the document isn't valid yet, but will be at a later time.
    #[strum(to_string = "Document becomes valid at timestamp {0}")]
    DocumentNotYetValid(i64),
    /// Error when the document has expired.
    #[strum(to_string = "Document expired at timestamp {0}")]
    DocumentExpired(i64),
    /// Error when we are missing digests for a whole namespace of the
    /// [`SecurityObject`][crate::models::issuer_auth::SecurityObject].
    #[strum(to_string = "Missing digests for namespace {0}")]
    MissingDigestNamespace(NameSpace),
    /// Error when a disclosed claim has a missing or mismatched digest.
    #[strum(to_string = "Missing or invalid digest, namespace=\"{0}\", id=\"{1}\"")]
    MissingOrInvalidDigest(NameSpace, DigestId),
    /// Error when the wallet disclosed a claim that was never requested.
    #[strum(to_string = "Element was not requested, namespace=\"{0}\", identifier=\"{1}\"")]
    UnrequestedElement(NameSpace, ElementIdentifier),
    /// Error when a claim value cannot be decoded into any supported scalar kind.
    #[strum(to_string = "Unsupported value type for element \"{0}\"")]
    UnsupportedValueType(ElementIdentifier),
    /// Error when we fail to decode a JWK.
    #[strum(to_string = "Error while converting JWK to HolderKey: {0}")]
    JwkToCoseKey(String),
    /// Error when we fail to encode a JWK.
    #[strum(to_string = "Error while converting HolderKey to JWK: {0}")]
    CoseKeyToJwk(String),
    /// Error when we fail to serialize the
    /// [`BindingTranscript`][crate::models::binding::BindingTranscript].
    #[strum(to_string = "Failed to serialize the reader-binding transcript")]
    BindingTranscript,
    /// Error when we try to construct [`DateTime`][crate::models::DateTime] from an invalid
    /// value.
    #[strum(to_string = "Invalid value for Date Time")]
    InvalidDateTime,
    /// Invalid [`ValidityInfo`][crate::models::issuer_auth::ValidityInfo] data.
    #[strum(to_string = "Validity Info is invalid")]
    InvalidValidityInfo,
}

impl bherror::BhError for DocumentError {}

/// Type alias for [`bherror::Result`] types returned by the crate's API.
pub type Result<T> = bherror::Result<T, DocumentError>;
