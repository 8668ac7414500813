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

//! This module defines the [`Holder`] type, which presents an issued
//! credential in response to a verifier's challenge.
//!
//! The production service is the verifier side of this exchange; the holder
//! implementation exists for wallet simulators and the end-to-end tests.

use bherror::traits::ForeignBoxed as _;

use crate::{
    crypto::Signer,
    error::DocumentError,
    models::{
        binding::{BindingTranscript, ReaderBinding},
        document::{DocType, IdentityDocument, IssuerSigned},
        issuer_auth::HolderKey,
    },
    verify::RequestedElement,
    Result,
};

/// The [`Holder`] presents an issued credential, proving possession of the
/// bound key for a single challenge.
#[derive(Debug)]
pub struct Holder {
    doc_type: DocType,
    issuer_signed: IssuerSigned,
}

impl Holder {
    /// Accepts an issued credential, checking that it is bound to the
    /// holder's own signing key.
    pub fn new<S: Signer>(
        doc_type: DocType,
        issuer_signed: IssuerSigned,
        signer: &S,
    ) -> Result<Self> {
        let mut bound_key = issuer_signed.holder_key()?;
        let mut own_key = HolderKey::from_jwk(
            &signer
                .public_jwk()
                .foreign_boxed_err(|| DocumentError::Signing)?,
        )?;

        bound_key.canonicalize();
        own_key.canonicalize();

        if bound_key != own_key {
            return Err(bherror::Error::root(DocumentError::ReaderBindingFailed)
                .ctx("the credential is bound to a different holder key"));
        }

        Ok(Self {
            doc_type,
            issuer_signed,
        })
    }

    /// Presents the credential for the given challenge, disclosing all
    /// claims.
    ///
    /// The `nonce` and `reader_public_key` must be the exact values received
    /// in the verifier's challenge; the holder signs them into the binding
    /// transcript.
    pub fn present<S: Signer>(
        &self,
        nonce: Vec<u8>,
        reader_public_key: Option<Vec<u8>>,
        signer: &S,
    ) -> Result<IdentityDocument> {
        self.present_internal(self.issuer_signed.clone(), nonce, reader_public_key, signer)
    }

    /// Presents the credential, disclosing only the requested claims.
    pub fn present_selected<S: Signer>(
        &self,
        requested: &[RequestedElement],
        nonce: Vec<u8>,
        reader_public_key: Option<Vec<u8>>,
        signer: &S,
    ) -> Result<IdentityDocument> {
        let mut issuer_signed = self.issuer_signed.clone();

        issuer_signed.name_spaces.retain_mut(|namespace_claims| {
            namespace_claims.items.retain(|item| {
                requested.iter().any(|element| {
                    element.name_space == namespace_claims.name_space
                        && element.identifier == item.0.inner.element_identifier
                })
            });
            !namespace_claims.items.is_empty()
        });

        self.present_internal(issuer_signed, nonce, reader_public_key, signer)
    }

    fn present_internal<S: Signer>(
        &self,
        issuer_signed: IssuerSigned,
        nonce: Vec<u8>,
        reader_public_key: Option<Vec<u8>>,
        signer: &S,
    ) -> Result<IdentityDocument> {
        let transcript = BindingTranscript::new(self.doc_type.clone(), nonce, reader_public_key);
        let binding = ReaderBinding::new(&transcript, signer)?;

        Ok(IdentityDocument::new(
            self.doc_type.clone(),
            issuer_signed,
            binding,
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::utils::test::{
        holder_signer, issue_dummy_credential, issuer_signer, NONCE, TEST_DOC_TYPE, TEST_NAMESPACE,
    };

    #[test]
    fn holder_accepts_credential_bound_to_own_key() {
        let issuer_signed = issue_dummy_credential(100);

        assert_matches!(
            Holder::new(TEST_DOC_TYPE.into(), issuer_signed, &holder_signer()),
            Ok(_)
        );
    }

    #[test]
    fn holder_rejects_credential_bound_to_other_key() {
        let issuer_signed = issue_dummy_credential(100);

        // the issuer's key is not the holder's key
        let err =
            Holder::new(TEST_DOC_TYPE.into(), issuer_signed, &issuer_signer()).unwrap_err();
        assert_matches!(err.error, DocumentError::ReaderBindingFailed);
    }

    #[test]
    fn present_echoes_nonce() {
        let issuer_signed = issue_dummy_credential(100);
        let signer = holder_signer();
        let holder = Holder::new(TEST_DOC_TYPE.into(), issuer_signed, &signer).unwrap();

        let document = holder.present(NONCE.to_vec(), None, &signer).unwrap();

        assert_eq!(document.nonce(), NONCE);
    }

    #[test]
    fn present_selected_discloses_subset() {
        let issuer_signed = issue_dummy_credential(100);
        let signer = holder_signer();
        let holder = Holder::new(TEST_DOC_TYPE.into(), issuer_signed, &signer).unwrap();

        let requested = vec![RequestedElement {
            name_space: TEST_NAMESPACE.into(),
            identifier: "family_name".into(),
        }];

        let document = holder
            .present_selected(&requested, NONCE.to_vec(), None, &signer)
            .unwrap();

        let claims = document.issuer_signed.into_claims();
        assert_eq!(claims.0.len(), 1);
        let (_, items) = &claims.0[0];
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0.as_str(), "family_name");
    }
}
