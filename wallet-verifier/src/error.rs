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

//! This module defines the error values returned by the service.

use bherror::adapters::axum::{IntoAxumResponse, StatusCode};

/// Error type used across the service.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum VerifierError {
    /// Error when the request carries a protocol tag we do not recognize.
    #[strum(to_string = "Unsupported protocol \"{0}\"")]
    UnsupportedProtocol(String),
    /// Error when no session exists for the given session id.
    #[strum(to_string = "Session not found")]
    SessionNotFound,
    /// Error when the session's validity window has passed.
    #[strum(to_string = "Session expired")]
    SessionExpired,
    /// Error when the session was already used for a verification attempt.
    #[strum(to_string = "Session already consumed")]
    SessionConsumed,
    /// Error when the session store cannot be reached.
    #[strum(to_string = "Session store unavailable")]
    SessionStoreUnavailable,
    /// Error when the request is structurally valid but inconsistent.
    #[strum(to_string = "Invalid request: {0}")]
    InvalidRequest(String),
    /// Error when the service configuration is invalid.
    #[strum(to_string = "Invalid configuration: {0}")]
    Configuration(String),
    /// Catch-all error for internal failures.
    #[strum(to_string = "Internal server error")]
    Internal,
}

impl bherror::BhError for VerifierError {}

impl IntoAxumResponse for VerifierError {
    fn http_status_code(&self) -> StatusCode {
        match self {
            VerifierError::UnsupportedProtocol(_) | VerifierError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            VerifierError::SessionNotFound => StatusCode::NOT_FOUND,
            VerifierError::SessionExpired => StatusCode::GONE,
            VerifierError::SessionConsumed => StatusCode::CONFLICT,
            VerifierError::SessionStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            VerifierError::Configuration(_) | VerifierError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Type alias for [`bherror::Result`] types returned by the service.
pub type Result<T> = bherror::Result<T, VerifierError>;
