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

//! The reader-binding proof: the holder's detached `COSE_Sign1` signature
//! over a transcript of the challenge nonce and the verifier's public key.
//!
//! The transcript ties a presentation to a single challenge, so a document
//! proven for one session's nonce can never be replayed against another
//! session, nor relayed to a different verifier.

use bherror::traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _};
use coset::{Algorithm, Header};
use serde::{Deserialize, Serialize};

use super::{document::DocType, issuer_auth::HolderKey, Bytes};
use crate::{
    crypto::{SignatureVerifier, Signer, SigningAlgorithm},
    error::{DocumentError, Result},
    utils::coset::{coset_alg_to_jws_alg, deserialize_coset, jws_alg_to_coset_alg, serialize_coset},
};

/// The context string leading the [`BindingTranscript`].
const BINDING_CONTEXT: &str = "ReaderBinding";

/// The reader-binding proof carried by an
/// [`IdentityDocument`][super::document::IdentityDocument].
///
/// The `auth` signature is detached: its payload is the serialized
/// [`BindingTranscript`], which both sides reconstruct independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderBinding {
    pub(crate) nonce: Bytes,
    #[serde(
        serialize_with = "serialize_coset",
        deserialize_with = "deserialize_coset"
    )]
    pub(crate) auth: coset::CoseSign1,
}

impl ReaderBinding {
    /// Creates a new [`ReaderBinding`] by signing the `transcript` with the
    /// holder's key.
    pub(crate) fn new<S: Signer>(transcript: &BindingTranscript, signer: &S) -> Result<Self> {
        let SigningAlgorithm::Es256 = signer.algorithm() else {
            return Err(bherror::Error::root(DocumentError::Signing)
                .ctx("Only ES256 signatures are currently supported"));
        };
        let protected = Header {
            alg: Some(Algorithm::Assigned(jws_alg_to_coset_alg(
                &signer.algorithm(),
            ))),
            ..Default::default()
        };

        let payload = transcript.to_bytes()?;

        let auth = coset::CoseSign1Builder::new()
            .protected(protected)
            .try_create_detached_signature(&payload, &[], |data| signer.sign(data))
            .foreign_boxed_err(|| DocumentError::Signing)?
            .build();

        Ok(Self {
            nonce: transcript.nonce.clone(),
            auth,
        })
    }

    /// Verifies the detached binding signature over the given `transcript`
    /// against the holder key signed into the credential.
    pub(crate) fn verify<'a>(
        &self,
        transcript: &BindingTranscript,
        holder_key: &HolderKey,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        let alg = self
            .signing_algorithm()
            .ok_or_else(|| bherror::Error::root(DocumentError::MissingSigningAlgorithm))
            .ctx(|| "reader binding")?;

        let signature_verifier = get_signature_verifier(alg)
            .ok_or_else(|| bherror::Error::root(DocumentError::MissingSignatureVerifier(alg)))?;

        let jwk = holder_key
            .as_jwk()
            .ctx(|| "holder key is not a valid verification key")?;

        let payload = transcript.to_bytes()?;

        self.auth
            .verify_detached_signature(&payload, &[], |sig, data| {
                let verified = signature_verifier
                    .verify(data, sig, &jwk)
                    .foreign_boxed_err(|| DocumentError::ReaderBindingFailed)
                    .ctx(|| "error while verifying the binding signature")?;

                if !verified {
                    return Err(bherror::Error::root(DocumentError::ReaderBindingFailed)
                        .ctx("the binding signature is not valid"));
                }

                Ok(())
            })
    }

    /// The nonce echoed by the wallet.
    pub fn nonce(&self) -> &[u8] {
        self.nonce.as_bytes()
    }

    fn signing_algorithm(&self) -> Option<SigningAlgorithm> {
        let alg = self.auth.protected.header.alg.as_ref()?;

        let coset::RegisteredLabelWithPrivate::Assigned(alg) = alg else {
            return None;
        };

        coset_alg_to_jws_alg(alg)
    }
}

/// The data the holder signs to bind a presentation to a single challenge.
///
/// Serialized as the CBOR array
/// `["ReaderBinding", doc_type, nonce, reader_public_key / null]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingTranscript {
    pub(crate) doc_type: DocType,
    pub(crate) nonce: Bytes,
    pub(crate) reader_public_key: Option<Bytes>,
}

impl BindingTranscript {
    /// Creates a new [`BindingTranscript`] over the session's challenge data.
    pub fn new(doc_type: DocType, nonce: Vec<u8>, reader_public_key: Option<Vec<u8>>) -> Self {
        Self {
            doc_type,
            nonce: nonce.into(),
            reader_public_key: reader_public_key.map(Into::into),
        }
    }

    /// Serializes the transcript deterministically to CBOR.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let reader_public_key = match &self.reader_public_key {
            Some(key) => ciborium::Value::from(key.clone()),
            None => ciborium::Value::Null,
        };

        let transcript = ciborium::Value::Array(vec![
            ciborium::Value::Text(BINDING_CONTEXT.to_owned()),
            ciborium::Value::Text(self.doc_type.as_str().to_owned()),
            ciborium::Value::from(self.nonce.clone()),
            reader_public_key,
        ]);

        let mut bytes = Vec::new();
        ciborium::into_writer(&transcript, &mut bytes)
            .foreign_err(|| DocumentError::BindingTranscript)?;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        crypto::{Es256Verifier, Signer as _},
        utils::test::{holder_key, holder_signer, TEST_DOC_TYPE},
    };

    fn transcript(nonce: &[u8]) -> BindingTranscript {
        BindingTranscript::new(TEST_DOC_TYPE.into(), nonce.to_vec(), Some(vec![4u8; 20]))
    }

    #[test]
    fn binding_verifies_for_same_transcript() {
        let signer = holder_signer();
        let key = HolderKey::from_jwk(&signer.public_jwk().unwrap()).unwrap();

        let binding = ReaderBinding::new(&transcript(b"nonce-a"), &signer).unwrap();

        assert_matches!(
            binding.verify(&transcript(b"nonce-a"), &key, |_| Some(&Es256Verifier)),
            Ok(())
        );
    }

    #[test]
    fn binding_fails_for_different_nonce() {
        let signer = holder_signer();
        let key = HolderKey::from_jwk(&signer.public_jwk().unwrap()).unwrap();

        let binding = ReaderBinding::new(&transcript(b"nonce-a"), &signer).unwrap();

        let err = binding
            .verify(&transcript(b"nonce-b"), &key, |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn binding_fails_for_foreign_holder_key() {
        let signer = holder_signer();

        let binding = ReaderBinding::new(&transcript(b"nonce-a"), &signer).unwrap();

        let (_, other_key) = holder_key();
        let err = binding
            .verify(&transcript(b"nonce-a"), &other_key, |_| {
                Some(&Es256Verifier)
            })
            .unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn binding_fails_for_different_reader_key() {
        let signer = holder_signer();
        let key = HolderKey::from_jwk(&signer.public_jwk().unwrap()).unwrap();

        let binding = ReaderBinding::new(&transcript(b"nonce-a"), &signer).unwrap();

        let other =
            BindingTranscript::new(TEST_DOC_TYPE.into(), b"nonce-a".to_vec(), Some(vec![5u8; 20]));
        let err = binding
            .verify(&other, &key, |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn binding_cbor_round_trip() {
        let signer = holder_signer();
        let binding = ReaderBinding::new(&transcript(b"nonce-a"), &signer).unwrap();

        let mut encoded = Vec::new();
        ciborium::into_writer(&binding, &mut encoded).unwrap();
        let decoded: ReaderBinding = ciborium::from_reader(encoded.as_slice()).unwrap();

        assert_eq!(binding.nonce(), decoded.nonce());

        let key = HolderKey::from_jwk(&signer.public_jwk().unwrap()).unwrap();
        assert_matches!(
            decoded.verify(&transcript(b"nonce-a"), &key, |_| Some(&Es256Verifier)),
            Ok(())
        );
    }
}
