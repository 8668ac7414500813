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

//! Service configuration, loaded from the environment.

use std::{env, path::PathBuf};

use wallet_document::RequestedElement;

use crate::error::{Result, VerifierError};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_DOC_TYPE: &str = "org.iso.18013.5.1.mDL";
const DEFAULT_NAMESPACE: &str = "org.iso.18013.5.1";

const DEFAULT_REQUESTED_ELEMENTS: [&str; 6] = [
    "given_name",
    "family_name",
    "document_number",
    "issuing_authority",
    "age_over_18",
    "resident_address",
];

/// The service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The socket address the server listens on.
    pub bind_addr: String,
    /// How long an issued challenge stays valid, in seconds.
    pub session_ttl_secs: u64,
    /// How often expired sessions are reclaimed, in seconds.
    pub sweep_interval_secs: u64,
    /// The document type accepted for verification.
    pub doc_type: String,
    /// The elements the wallet is asked (and allowed) to disclose.
    pub requested_elements: Vec<RequestedElement>,
    /// Path to the PEM-encoded public key of the trusted credential issuer.
    pub issuer_public_key_pem: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            doc_type: DEFAULT_DOC_TYPE.to_owned(),
            requested_elements: DEFAULT_REQUESTED_ELEMENTS
                .into_iter()
                .map(|identifier| RequestedElement::new(DEFAULT_NAMESPACE, identifier))
                .collect(),
            issuer_public_key_pem: None,
        }
    }
}

impl Config {
    /// Loads the configuration from `WALLET_VERIFIER_*` environment
    /// variables, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = env::var("WALLET_VERIFIER_BIND_ADDR") {
            config.bind_addr = value;
        }
        if let Ok(value) = env::var("WALLET_VERIFIER_SESSION_TTL_SECS") {
            config.session_ttl_secs = parse_secs("WALLET_VERIFIER_SESSION_TTL_SECS", &value)?;
        }
        if let Ok(value) = env::var("WALLET_VERIFIER_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse_secs("WALLET_VERIFIER_SWEEP_INTERVAL_SECS", &value)?;
        }
        if let Ok(value) = env::var("WALLET_VERIFIER_DOC_TYPE") {
            config.doc_type = value;
        }
        if let Ok(value) = env::var("WALLET_VERIFIER_REQUESTED_ELEMENTS") {
            config.requested_elements = parse_requested_elements(&value)?;
        }
        if let Ok(value) = env::var("WALLET_VERIFIER_ISSUER_KEY_PEM") {
            config.issuer_public_key_pem = Some(PathBuf::from(value));
        }

        Ok(config)
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        bherror::Error::root(VerifierError::Configuration(format!(
            "{name} must be a non-negative number of seconds, got \"{value}\""
        )))
    })
}

/// Parses a comma-separated list of `namespace/identifier` pairs.
fn parse_requested_elements(value: &str) -> Result<Vec<RequestedElement>> {
    value
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            entry
                .rsplit_once('/')
                .filter(|(name_space, identifier)| {
                    !name_space.is_empty() && !identifier.is_empty()
                })
                .map(|(name_space, identifier)| RequestedElement::new(name_space, identifier))
                .ok_or_else(|| {
                    bherror::Error::root(VerifierError::Configuration(format!(
                        "requested element \"{entry}\" is not of the form namespace/identifier"
                    )))
                })
        })
        .collect()
}
