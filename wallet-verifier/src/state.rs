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

//! Shared application state handed to the request handlers.

use std::sync::Arc;

use bherror::traits::{ErrorContext as _, ForeignBoxed as _};
use wallet_document::crypto::{Es256Signer, JwkPublic};

use crate::{
    config::Config,
    error::{Result, VerifierError},
    session::SessionStore,
};

/// The shared state of the service; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    store: SessionStore,
    /// DER-encoded `SubjectPublicKeyInfo` of the per-process reader key.
    reader_public_key_der: Vec<u8>,
    issuer_jwk: JwkPublic,
}

impl AppState {
    /// Creates the state from the configuration and the trusted issuer key.
    ///
    /// A fresh reader key pair is generated per process; only its public half
    /// is kept, since the document exchange never requires the service to
    /// sign or decrypt.
    pub fn new(config: Config, issuer_jwk: JwkPublic) -> Result<Self> {
        let reader_key = Es256Signer::generate()
            .foreign_boxed_err(|| VerifierError::Internal)
            .ctx(|| "failed to generate the reader key")?;
        let reader_public_key_der = reader_key
            .public_key_der()
            .foreign_boxed_err(|| VerifierError::Internal)
            .ctx(|| "failed to encode the reader public key")?;

        let store = SessionStore::new(config.session_ttl_secs);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                reader_public_key_der,
                issuer_jwk,
            }),
        })
    }

    /// The service configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The session store.
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// The DER-encoded public half of the reader key.
    pub fn reader_public_key_der(&self) -> &[u8] {
        &self.inner.reader_public_key_der
    }

    /// The public key of the trusted credential issuer.
    pub fn issuer_jwk(&self) -> &JwkPublic {
        &self.inner.issuer_jwk
    }
}
