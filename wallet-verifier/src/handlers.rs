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

//! The HTTP handlers: challenge issuance and the verification orchestrator.

use std::fmt;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use wallet_document::{
    crypto::{Es256Verifier, SigningAlgorithm},
    extract_elements,
    utils::base64::base64_url_encode,
    DocumentError, DocumentVerifier, Element, IdentityDocument,
};

use crate::{
    error::{Result, VerifierError},
    session::Protocol,
    state::AppState,
};

/// The body of a `POST /getIdentityRequest` request.
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    /// The wallet protocol tag, e.g. `"apple"`.
    pub protocol: String,
}

/// The body of a `POST /getIdentityRequest` response.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    /// The opaque session identifier to post back with the document.
    pub session_id: String,
    /// The challenge material the wallet signs over.
    pub data: ChallengeData,
}

/// The challenge material of a [`ChallengeResponse`].
#[derive(Debug, Serialize)]
pub struct ChallengeData {
    /// The challenge nonce, `base64url`-encoded without padding.
    pub nonce: String,
    /// The verifier's public key, `base64url`-encoded DER, if any.
    #[serde(rename = "readerPublicKey")]
    pub reader_public_key: Option<String>,
}

/// Issues a fresh challenge for the requested protocol.
pub async fn get_identity_request(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>> {
    let protocol: Protocol = request.protocol.parse()?;

    let session = state
        .store()
        .create(protocol, Some(state.reader_public_key_der().to_vec()))?;

    tracing::info!(session_id = %session.session_id, %protocol, "issued identity challenge");

    Ok(Json(ChallengeResponse {
        session_id: session.session_id,
        data: ChallengeData {
            nonce: base64_url_encode(&session.nonce),
            reader_public_key: session.reader_public_key.as_deref().map(base64_url_encode),
        },
    }))
}

/// The body of a `POST /verifyIdentityResponse` request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// The session the document responds to.
    pub session_id: String,
    /// The wallet protocol tag the document was produced with.
    pub protocol: String,
    /// The opaque document blob, `base64url`-encoded.
    pub data: String,
}

/// The uniform result envelope of a `POST /verifyIdentityResponse` response.
///
/// Exactly one of `error` and `elements` is populated; the other serializes
/// as `null`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// The user-visible failure message, if verification failed.
    pub error: Option<String>,
    /// The verified attributes, in disclosure order, if verification
    /// succeeded.
    pub elements: Option<Vec<Element>>,
}

/// Verifies a posted identity document against its session.
///
/// Always responds with HTTP 200; failures are expressed through the `error`
/// field of the envelope. Non-200 statuses are reserved for requests that do
/// not parse at all.
pub async fn verify_identity_response(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let session_id = request.session_id.clone();

    match verify_document(&state, request) {
        Ok(elements) => {
            tracing::info!(%session_id, elements = elements.len(), "identity verified");
            Json(VerifyResponse {
                error: None,
                elements: Some(elements),
            })
        }
        Err(failure) => {
            // the specific failure is logged; the wallet only sees the
            // collapsed message
            tracing::warn!(%session_id, error = %failure, "identity verification failed");
            Json(VerifyResponse {
                error: Some(failure.external_message()),
                elements: None,
            })
        }
    }
}

/// The verification pipeline: session consumption, decoding, cryptographic
/// checks and attribute extraction.
fn verify_document(
    state: &AppState,
    request: VerifyRequest,
) -> std::result::Result<Vec<Element>, VerifyFailure> {
    let protocol: Protocol = request.protocol.parse()?;

    // single atomic consumption; a concurrent retry observes SessionConsumed
    let session = state.store().consume(&request.session_id)?;

    if session.protocol != protocol {
        return Err(bherror::Error::root(VerifierError::InvalidRequest(
            "protocol does not match the session".to_owned(),
        ))
        .into());
    }

    let document = IdentityDocument::from_base64_cbor(&request.data)?;

    let verifier = DocumentVerifier::new(
        state.config().doc_type.as_str().into(),
        session.nonce,
        session.reader_public_key,
        state.config().requested_elements.clone(),
    );

    let current_time = Utc::now().timestamp().max(0) as u64;
    let claims = verifier.verify(
        document,
        current_time,
        state.issuer_jwk(),
        |alg| match alg {
            SigningAlgorithm::Es256 => Some(&Es256Verifier),
            _ => None,
        },
    )?;

    Ok(extract_elements(claims)?)
}

/// A failure anywhere in the verification pipeline.
enum VerifyFailure {
    Service(bherror::Error<VerifierError>),
    Document(bherror::Error<DocumentError>),
}

impl VerifyFailure {
    /// The message exposed to the caller.
    ///
    /// Cryptographic failures collapse to a generic message so the response
    /// cannot be used as an oracle for which check failed; session lifecycle
    /// and structural failures keep their specific messages.
    fn external_message(&self) -> String {
        match self {
            Self::Service(err) => err.error.to_string(),
            Self::Document(err) => match &err.error {
                DocumentError::MalformedDocument(_) => "malformed identity document".to_owned(),
                DocumentError::UnsupportedValueType(_) => {
                    "unsupported element value type".to_owned()
                }
                _ => "identity verification failed".to_owned(),
            },
        }
    }
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(err) => err.fmt(f),
            Self::Document(err) => err.fmt(f),
        }
    }
}

impl From<bherror::Error<VerifierError>> for VerifyFailure {
    fn from(err: bherror::Error<VerifierError>) -> Self {
        Self::Service(err)
    }
}

impl From<bherror::Error<DocumentError>> for VerifyFailure {
    fn from(err: bherror::Error<DocumentError>) -> Self {
        Self::Document(err)
    }
}
