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

//! This module defines the [`Issuer`] type, which signs a claim set into a
//! credential bound to a holder key.
//!
//! The production service never issues credentials; this side of the flow
//! exists so holders (and the end-to-end tests) can construct documents the
//! verifier accepts.

use rand::Rng;

use crate::{
    crypto::Signer,
    models::{
        document::{Claims, DocType, IssuerSigned},
        issuer_auth::{HolderKey, ValidityInfo},
    },
    Result,
};

/// The [`Issuer`] signs a claim set into a credential bound to a holder key.
pub struct Issuer;

impl Issuer {
    /// Issue a new credential over the given claims.
    ///
    /// Each claim is salted individually so it can later be disclosed (or
    /// withheld) without affecting the issuer's signature.
    pub fn issue<S: Signer, R: Rng + ?Sized>(
        &self,
        doc_type: DocType,
        claims: Claims,
        holder_key: HolderKey,
        signer: &S,
        rng: &mut R,
        validity_info: ValidityInfo,
    ) -> Result<IssuerSigned> {
        IssuerSigned::new(doc_type, claims, holder_key, signer, rng, validity_info)
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::utils::test::{
        holder_key, issuer_signer, validity_info, TEST_DOC_TYPE, TEST_NAMESPACE,
    };

    #[test]
    fn test_issue() {
        let mut rng = thread_rng();
        let issuer_signer = issuer_signer();
        let (_, holder_key) = holder_key();

        let claims = Claims(vec![(
            TEST_NAMESPACE.into(),
            vec![("name".into(), "John".into())],
        )]);

        let issued = Issuer
            .issue(
                TEST_DOC_TYPE.into(),
                claims,
                holder_key,
                &issuer_signer,
                &mut rng,
                validity_info(100),
            )
            .unwrap();

        let claims = issued.into_claims();
        assert_eq!(claims.0.len(), 1);
        assert_eq!(claims.0[0].1.len(), 1);
    }
}
