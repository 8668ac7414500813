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

//! Per-challenge session state and the in-memory store that tracks it.
//!
//! A session is created when a challenge is issued and consumed exactly once
//! when a verification attempt arrives. The store is the only shared mutable
//! state in the service.

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};
use wallet_document::{generate_nonce, generate_token};

use crate::error::{Result, VerifierError};

/// The wallet protocol a challenge was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Protocol {
    /// The Apple Wallet identity document exchange.
    #[strum(to_string = "apple")]
    Apple,
}

impl FromStr for Protocol {
    type Err = bherror::Error<VerifierError>;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "apple" => Ok(Self::Apple),
            other => Err(bherror::Error::root(VerifierError::UnsupportedProtocol(
                other.to_owned(),
            ))),
        }
    }
}

/// The state of a single issued challenge.
#[derive(Debug, Clone)]
pub struct Session {
    /// The opaque, unguessable session identifier.
    pub session_id: String,
    /// The challenge nonce the wallet must sign into its binding proof.
    pub nonce: Vec<u8>,
    /// The verifier's public key material sent with the challenge, if any.
    pub reader_public_key: Option<Vec<u8>>,
    /// The protocol the challenge was issued for.
    pub protocol: Protocol,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session stops being accepted for verification.
    pub expires_at: DateTime<Utc>,
    /// Whether a verification attempt already consumed the session.
    pub consumed: bool,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An in-memory, thread-safe store of active [`Session`]s.
///
/// Consumed sessions are kept around until the expiry sweep removes them, so
/// a replayed session id is reported as consumed rather than unknown.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates an empty store whose sessions live for `ttl_secs` seconds.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Creates and stores a fresh [`Session`] for the given protocol.
    ///
    /// The session id and nonce are generated from a cryptographically secure
    /// source with 256 bits of entropy each.
    pub fn create(
        &self,
        protocol: Protocol,
        reader_public_key: Option<Vec<u8>>,
    ) -> Result<Session> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        let session = Session {
            session_id: generate_token(&mut rng),
            nonce: generate_nonce(&mut rng),
            reader_public_key,
            protocol,
            created_at: now,
            expires_at: now + self.ttl,
            consumed: false,
        };

        self.lock()?
            .insert(session.session_id.clone(), session.clone());

        Ok(session)
    }

    /// Looks up a session without consuming it.
    pub fn get(&self, session_id: &str) -> Result<Session> {
        let sessions = self.lock()?;

        let session = sessions
            .get(session_id)
            .ok_or_else(|| bherror::Error::root(VerifierError::SessionNotFound))?;

        if session.is_expired(Utc::now()) {
            return Err(bherror::Error::root(VerifierError::SessionExpired));
        }

        Ok(session.clone())
    }

    /// Atomically consumes the session, returning its state.
    ///
    /// Exactly one of any number of concurrent `consume` calls for the same
    /// session id succeeds; the rest observe
    /// [`VerifierError::SessionConsumed`].
    pub fn consume(&self, session_id: &str) -> Result<Session> {
        let mut sessions = self.lock()?;

        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| bherror::Error::root(VerifierError::SessionNotFound))?;

        if session.consumed {
            return Err(bherror::Error::root(VerifierError::SessionConsumed));
        }

        // expiry is checked against issue time, not consumption time
        if session.is_expired(Utc::now()) {
            return Err(bherror::Error::root(VerifierError::SessionExpired));
        }

        session.consumed = true;

        Ok(session.clone())
    }

    /// Removes expired sessions, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut sessions = self.lock()?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));

        Ok(before - sessions.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| {
                bherror::Error::root(VerifierError::SessionStoreUnavailable)
                    .ctx("session store lock poisoned")
            })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn protocol_round_trip() {
        let protocol: Protocol = "apple".parse().unwrap();
        assert_eq!(protocol.to_string(), "apple");

        let err = "android".parse::<Protocol>().unwrap_err();
        assert_matches!(
            err.error,
            VerifierError::UnsupportedProtocol(tag) if tag == "android"
        );
    }

    #[test]
    fn create_and_consume() {
        let store = SessionStore::new(300);

        let session = store.create(Protocol::Apple, Some(vec![1, 2, 3])).unwrap();
        assert!(!session.consumed);
        assert!(session.nonce.len() >= 16);

        let consumed = store.consume(&session.session_id).unwrap();
        assert_eq!(consumed.nonce, session.nonce);
        assert_eq!(consumed.reader_public_key, Some(vec![1, 2, 3]));
    }

    #[test]
    fn consume_twice_fails() {
        let store = SessionStore::new(300);
        let session = store.create(Protocol::Apple, None).unwrap();

        store.consume(&session.session_id).unwrap();

        let err = store.consume(&session.session_id).unwrap_err();
        assert_matches!(err.error, VerifierError::SessionConsumed);
    }

    #[test]
    fn consume_unknown_fails() {
        let store = SessionStore::new(300);

        let err = store.consume("no-such-session").unwrap_err();
        assert_matches!(err.error, VerifierError::SessionNotFound);
    }

    #[test]
    fn consume_expired_fails() {
        let store = SessionStore::new(0);
        let session = store.create(Protocol::Apple, None).unwrap();

        let err = store.consume(&session.session_id).unwrap_err();
        assert_matches!(err.error, VerifierError::SessionExpired);
    }

    #[test]
    fn purge_removes_expired_sessions() {
        let store = SessionStore::new(0);
        store.create(Protocol::Apple, None).unwrap();
        store.create(Protocol::Apple, None).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 2);
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn concurrent_consume_single_winner() {
        let store = Arc::new(SessionStore::new(300));
        let session = store.create(Protocol::Apple, None).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let session_id = session.session_id.clone();
                std::thread::spawn(move || store.consume(&session_id).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&succeeded| succeeded)
            .count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn session_ids_and_nonces_unique() {
        let store = SessionStore::new(300);

        let mut session_ids = HashSet::new();
        let mut nonces = HashSet::new();
        for _ in 0..10_000 {
            let session = store.create(Protocol::Apple, None).unwrap();
            session_ids.insert(session.session_id);
            nonces.insert(session.nonce);
        }

        assert_eq!(session_ids.len(), 10_000);
        assert_eq!(nonces.len(), 10_000);
    }
}
