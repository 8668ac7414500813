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

//! This module defines the [`DocumentVerifier`], which runs the ordered
//! verification pipeline over a decoded
//! [`IdentityDocument`][crate::models::document::IdentityDocument].

use crate::{
    crypto::{JwkPublic, SignatureVerifier, SigningAlgorithm},
    error::DocumentError,
    models::{
        binding::BindingTranscript,
        document::{Claims, DocType, ElementIdentifier, IdentityDocument, NameSpace},
    },
    Result,
};

/// A single element the verifier asked the wallet to disclose.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedElement {
    /// The namespace of the requested element.
    pub name_space: NameSpace,
    /// The identifier of the requested element.
    pub identifier: ElementIdentifier,
}

impl RequestedElement {
    /// Creates a new [`RequestedElement`].
    pub fn new(name_space: impl Into<NameSpace>, identifier: impl Into<ElementIdentifier>) -> Self {
        Self {
            name_space: name_space.into(),
            identifier: identifier.into(),
        }
    }
}

/// The verifier side of a single challenge: checks a presented document
/// against the session's nonce, the verifier's key and the requested
/// elements.
///
/// The checks run in a fixed order and short-circuit on the first failure:
///
/// 1. issuer signature and claim digests,
/// 2. nonce echo and reader-binding signature,
/// 3. document type and time-validity,
/// 4. disclosed claims are limited to the requested elements.
///
/// No claims are released on any failure.
pub struct DocumentVerifier {
    doc_type: DocType,
    nonce: Vec<u8>,
    reader_public_key: Option<Vec<u8>>,
    requested: Vec<RequestedElement>,
}

impl DocumentVerifier {
    /// Creates a new [`DocumentVerifier`] for a single challenge.
    ///
    /// The `nonce` and `reader_public_key` must be the exact values issued
    /// with the challenge the document responds to.
    pub fn new(
        doc_type: DocType,
        nonce: Vec<u8>,
        reader_public_key: Option<Vec<u8>>,
        requested: Vec<RequestedElement>,
    ) -> Self {
        Self {
            doc_type,
            nonce,
            reader_public_key,
            requested,
        }
    }

    /// Verifies the `document` and, on success, releases its claim set.
    ///
    /// `current_time` is the number of seconds since the UNIX epoch.
    pub fn verify<'a>(
        &self,
        document: IdentityDocument,
        current_time: u64,
        issuer_jwk: &JwkPublic,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<Claims> {
        // 1. the issuer vouches for the claims
        document
            .issuer_signed
            .verify_signature(issuer_jwk, &get_signature_verifier)?;
        document.issuer_signed.validate_claims()?;

        // 2. the holder proves the claims were presented for this challenge
        if document.binding.nonce() != self.nonce {
            return Err(bherror::Error::root(DocumentError::NonceMismatch));
        }

        let transcript = BindingTranscript::new(
            self.doc_type.clone(),
            self.nonce.clone(),
            self.reader_public_key.clone(),
        );
        let holder_key = document.issuer_signed.holder_key()?;
        document
            .binding
            .verify(&transcript, &holder_key, &get_signature_verifier)?;

        // 3. the credential is of the expected type and currently valid
        document
            .issuer_signed
            .validate(current_time, &self.doc_type)?;

        // 4. nothing beyond the requested elements was disclosed
        let claims = document.issuer_signed.into_claims();
        self.check_requested(&claims)?;

        Ok(claims)
    }

    /// Rejects any disclosed claim that was not among the requested
    /// elements.
    ///
    /// Over-disclosure is treated as a hard failure rather than silently
    /// dropped, so a misbehaving wallet is surfaced instead of masked.
    fn check_requested(&self, claims: &Claims) -> Result<()> {
        for (name_space, items) in &claims.0 {
            for (identifier, _) in items {
                let requested = self.requested.iter().any(|element| {
                    &element.name_space == name_space && &element.identifier == identifier
                });

                if !requested {
                    return Err(bherror::Error::root(DocumentError::UnrequestedElement(
                        name_space.clone(),
                        identifier.clone(),
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        crypto::{Es256Verifier, Signer as _},
        models::document::SignedClaim,
        utils::test::{
            issuer_jwk, present_dummy_document, requested_elements, NONCE, TEST_DOC_TYPE,
            TEST_NAMESPACE,
        },
    };

    fn verifier(nonce: &[u8], reader_public_key: Option<Vec<u8>>) -> DocumentVerifier {
        DocumentVerifier::new(
            TEST_DOC_TYPE.into(),
            nonce.to_vec(),
            reader_public_key,
            requested_elements(),
        )
    }

    #[test]
    fn verify_valid_document() {
        let document = present_dummy_document(100, NONCE, None);

        let claims = verifier(NONCE, None)
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap();

        assert_eq!(claims.0.len(), 1);
        assert_eq!(claims.0[0].0, TEST_NAMESPACE.into());
    }

    #[test]
    fn verify_tampered_claim_fails() {
        let mut document = present_dummy_document(100, NONCE, None);

        // forge a claim value after signing
        let items = &mut document.issuer_signed.name_spaces[0].items;
        let mut claim = SignedClaim::from(items[0].clone());
        claim.element_value = "Mallory".into();
        items[0] = claim.into();

        let err = verifier(NONCE, None)
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::MissingOrInvalidDigest(_, _));
    }

    #[test]
    fn verify_tampered_security_object_fails() {
        let mut document = present_dummy_document(100, NONCE, None);

        // forge the signed payload itself
        if let Some(payload) = document.issuer_signed.issuer_auth.0.payload.as_mut() {
            let last = payload.last_mut().unwrap();
            *last = last.wrapping_add(1);
        }

        let err = verifier(NONCE, None)
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::InvalidIssuerSignature);
    }

    #[test]
    fn verify_untrusted_issuer_fails() {
        let document = present_dummy_document(100, NONCE, None);

        let other_issuer = crate::crypto::Es256Signer::generate().unwrap();
        let err = verifier(NONCE, None)
            .verify(document, 100, &other_issuer.public_jwk().unwrap(), |_| {
                Some(&Es256Verifier)
            })
            .unwrap_err();
        assert_matches!(err.error, DocumentError::InvalidIssuerSignature);
    }

    #[test]
    fn verify_foreign_nonce_fails() {
        // document bound to session B's nonce, verified against session A
        let document = present_dummy_document(100, b"session-b-nonce", None);

        let err = verifier(b"session-a-nonce", None)
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::NonceMismatch);
    }

    #[test]
    fn verify_forged_nonce_echo_fails() {
        // the wallet echoes the expected nonce but signed a different one
        let mut document = present_dummy_document(100, b"session-b-nonce", None);
        document.binding.nonce = NONCE.to_vec().into();

        let err = verifier(NONCE, None)
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn verify_wrong_reader_key_fails() {
        let document = present_dummy_document(100, NONCE, Some(vec![1u8; 20]));

        let err = verifier(NONCE, Some(vec![2u8; 20]))
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn verify_expired_document_fails() {
        let document = present_dummy_document(100, NONCE, None);

        let after_expiry = 100 + 400 * 24 * 60 * 60;
        let err = verifier(NONCE, None)
            .verify(document, after_expiry, &issuer_jwk(), |_| {
                Some(&Es256Verifier)
            })
            .unwrap_err();
        assert_matches!(err.error, DocumentError::DocumentExpired(_));
    }

    #[test]
    fn verify_unrequested_element_fails() {
        let document = present_dummy_document(100, NONCE, None);

        // narrow the request below what the wallet disclosed
        let narrow = DocumentVerifier::new(
            TEST_DOC_TYPE.into(),
            NONCE.to_vec(),
            None,
            vec![RequestedElement::new(TEST_NAMESPACE, "family_name")],
        );

        let err = narrow
            .verify(document, 100, &issuer_jwk(), |_| Some(&Es256Verifier))
            .unwrap_err();
        assert_matches!(err.error, DocumentError::UnrequestedElement(_, _));
    }
}
