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

//! A verifier backend for wallet identity presentations.
//!
//! The service exposes two JSON endpoints: `POST /getIdentityRequest` issues
//! a single-use challenge (session id, nonce, reader public key), and `POST
//! /verifyIdentityResponse` verifies the wallet's signed document against
//! that challenge and returns the disclosed attributes in a uniform result
//! envelope.

pub mod config;
pub mod error;
pub mod handlers;
pub mod session;
pub mod state;

use axum::{routing::post, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use error::{Result, VerifierError};
pub use state::AppState;

/// Builds the service router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/getIdentityRequest", post(handlers::get_identity_request))
        .route(
            "/verifyIdentityResponse",
            post(handlers::verify_identity_response),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
