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

//! End-to-end tests of the challenge/verify exchange over the router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt as _;
use serde_json::{json, Value};
use tower::ServiceExt as _;
use wallet_document::{
    crypto::{Es256Signer, Signer as _},
    models::issuer_auth::{HolderKey, ValidityInfo},
    utils::base64::base64_url_decode,
    Claims, Holder, Issuer,
};
use wallet_verifier::{router, AppState, Config};

const DOC_TYPE: &str = "org.iso.18013.5.1.mDL";
const NAMESPACE: &str = "org.iso.18013.5.1";

fn test_state(config: Config) -> (AppState, Es256Signer) {
    let issuer_signer = Es256Signer::generate().unwrap();
    let state = AppState::new(config, issuer_signer.public_jwk().unwrap()).unwrap();
    (state, issuer_signer)
}

async fn post(state: &AppState, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    // error responses carry a plain-text body
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    (status, body)
}

/// Issues a credential, accepts it as a holder and presents it for the given
/// challenge, returning the wire-encoded document.
fn present_document(
    issuer_signer: &Es256Signer,
    nonce: Vec<u8>,
    reader_public_key: Option<Vec<u8>>,
) -> String {
    let holder_signer = Es256Signer::generate().unwrap();
    let holder_key = HolderKey::from_jwk(&holder_signer.public_jwk().unwrap()).unwrap();

    let now = Utc::now().timestamp() as u64;
    let validity = ValidityInfo::new(
        now.try_into().unwrap(),
        now.try_into().unwrap(),
        (now + 3600).try_into().unwrap(),
        None,
    )
    .unwrap();

    let claims = Claims(vec![(
        NAMESPACE.into(),
        vec![
            ("family_name".into(), "Doe".into()),
            ("given_name".into(), "John".into()),
            ("age_over_18".into(), true.into()),
        ],
    )]);

    let issued = Issuer
        .issue(
            DOC_TYPE.into(),
            claims,
            holder_key,
            issuer_signer,
            &mut rand::thread_rng(),
            validity,
        )
        .unwrap();

    let holder = Holder::new(DOC_TYPE.into(), issued, &holder_signer).unwrap();
    let document = holder
        .present(nonce, reader_public_key, &holder_signer)
        .unwrap();

    document.to_base64_cbor().unwrap()
}

async fn issue_challenge(state: &AppState) -> (String, Vec<u8>, Vec<u8>) {
    let (status, challenge) =
        post(state, "/getIdentityRequest", json!({ "protocol": "apple" })).await;
    assert_eq!(status, StatusCode::OK);

    let session_id = challenge["session_id"].as_str().unwrap().to_owned();
    let nonce = base64_url_decode(challenge["data"]["nonce"].as_str().unwrap()).unwrap();
    let reader_public_key =
        base64_url_decode(challenge["data"]["readerPublicKey"].as_str().unwrap()).unwrap();

    (session_id, nonce, reader_public_key)
}

#[tokio::test]
async fn end_to_end_verification_flow() {
    let (state, issuer_signer) = test_state(Config::default());

    let (session_id, nonce, reader_public_key) = issue_challenge(&state).await;
    assert!(nonce.len() >= 16);

    let document = present_document(&issuer_signer, nonce, Some(reader_public_key));

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": session_id, "protocol": "apple", "data": document }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], Value::Null);
    assert_eq!(
        result["elements"],
        json!([
            { "namespace": NAMESPACE, "identifier": "family_name", "value": "Doe" },
            { "namespace": NAMESPACE, "identifier": "given_name", "value": "John" },
            { "namespace": NAMESPACE, "identifier": "age_over_18", "value": true },
        ])
    );
}

#[tokio::test]
async fn replayed_session_is_rejected() {
    let (state, issuer_signer) = test_state(Config::default());

    let (session_id, nonce, reader_public_key) = issue_challenge(&state).await;
    let document = present_document(&issuer_signer, nonce, Some(reader_public_key));
    let request = json!({ "session_id": session_id, "protocol": "apple", "data": document });

    let (status, first) = post(&state, "/verifyIdentityResponse", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["error"], Value::Null);

    let (status, replay) = post(&state, "/verifyIdentityResponse", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["error"], "Session already consumed");
    assert_eq!(replay["elements"], Value::Null);
}

#[tokio::test]
async fn unsupported_protocol_is_a_request_error() {
    let (state, _) = test_state(Config::default());

    let (status, body) = post(&state, "/getIdentityRequest", json!({ "protocol": "carrier-pigeon" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Unsupported protocol \"carrier-pigeon\"");
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let config = Config {
        session_ttl_secs: 0,
        ..Config::default()
    };
    let (state, issuer_signer) = test_state(config);

    let (session_id, nonce, reader_public_key) = issue_challenge(&state).await;
    let document = present_document(&issuer_signer, nonce, Some(reader_public_key));

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": session_id, "protocol": "apple", "data": document }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], "Session expired");
    assert_eq!(result["elements"], Value::Null);
}

#[tokio::test]
async fn document_bound_to_another_challenge_is_rejected() {
    let (state, issuer_signer) = test_state(Config::default());

    let (session_a, _, reader_public_key) = issue_challenge(&state).await;
    let (_, nonce_b, _) = issue_challenge(&state).await;

    // signed over session B's nonce, posted against session A
    let document = present_document(&issuer_signer, nonce_b, Some(reader_public_key));

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": session_a, "protocol": "apple", "data": document }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], "identity verification failed");
    assert_eq!(result["elements"], Value::Null);
}

#[tokio::test]
async fn untrusted_issuer_is_rejected() {
    let (state, _) = test_state(Config::default());

    let (session_id, nonce, reader_public_key) = issue_challenge(&state).await;

    let rogue_issuer = Es256Signer::generate().unwrap();
    let document = present_document(&rogue_issuer, nonce, Some(reader_public_key));

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": session_id, "protocol": "apple", "data": document }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], "identity verification failed");
}

#[tokio::test]
async fn malformed_document_is_rejected() {
    let (state, _) = test_state(Config::default());

    let (session_id, _, _) = issue_challenge(&state).await;

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": session_id, "protocol": "apple", "data": "n0t@document" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], "malformed identity document");
    assert_eq!(result["elements"], Value::Null);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let (state, _) = test_state(Config::default());

    let (status, result) = post(
        &state,
        "/verifyIdentityResponse",
        json!({ "session_id": "never-issued", "protocol": "apple", "data": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["error"], "Session not found");
}
