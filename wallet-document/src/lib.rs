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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the functionality for handling digital identity
//! documents presented by wallet applications: CBOR/COSE credentials carrying
//! issuer-signed claims together with a holder proof binding the presentation
//! to a single verifier challenge.
//!
//! # Details
//!
//! The crate defines multiple modules, which can be roughly divided as
//! follows.
//!
//!   * High-level modules: [`issue`], [`present`], [`verify`] and
//!     [`extract`].
//!   * The [`error`] module describing the error values.
//!   * The [`crypto`] module with the signing & verification primitives.
//!   * Low-level data model -- [`models`].
//!
//! A verifier backend only needs [`verify`] and [`extract`] together with
//! [`models::document::IdentityDocument::from_base64_cbor`]; the [`issue`]
//! and [`present`] modules implement the wallet side of the exchange for
//! simulators and end-to-end tests.
//!
//! # Examples
//!
//! ## Verifying a Presented Identity Document
//!
//! ```no_run
//! use wallet_document::{
//!     crypto::Es256Verifier, extract_elements, DocumentVerifier, IdentityDocument,
//!     RequestedElement,
//! };
//!
//! // the opaque blob posted by the wallet
//! let blob = "Base64url encoded CBOR identity document";
//! let document = IdentityDocument::from_base64_cbor(blob).unwrap();
//!
//! let verifier = DocumentVerifier::new(
//!     "org.iso.18013.5.1.mDL".into(),
//!     b"challenge nonce".to_vec(),
//!     None,
//!     vec![RequestedElement::new("org.iso.18013.5.1", "family_name")],
//! );
//!
//! let issuer_jwk = serde_json::Map::new(); // the trusted issuer key
//! let current_time = 100;
//!
//! let claims = verifier
//!     .verify(document, current_time, &issuer_jwk, |_alg| {
//!         Some(&Es256Verifier)
//!     })
//!     .unwrap();
//!
//! let elements = extract_elements(claims).unwrap();
//! ```

pub mod crypto;
pub mod error;
pub mod extract;
pub mod issue;
pub mod models;
pub mod present;
pub mod utils;
pub mod verify;

pub use error::{DocumentError, Result};
pub use extract::{extract_elements, Element, ElementValue};
pub use issue::Issuer;
pub use models::document::{Claims, DocType, IdentityDocument, NameSpace};
pub use present::Holder;
pub use utils::rand::{generate_nonce, generate_token};
pub use verify::{DocumentVerifier, RequestedElement};
