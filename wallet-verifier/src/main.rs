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

//! The `wallet-verifier` service binary.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};
use wallet_document::crypto::public_jwk_from_pem;
use wallet_verifier::{router, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_verifier=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let pem_path = config
        .issuer_public_key_pem
        .clone()
        .expect("WALLET_VERIFIER_ISSUER_KEY_PEM must point to the trusted issuer public key");
    let pem = std::fs::read(&pem_path).expect("failed to read the issuer public key");
    let issuer_jwk = public_jwk_from_pem(&pem).expect("invalid issuer public key");

    let bind_addr = config.bind_addr.clone();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);

    let state = AppState::new(config, issuer_jwk).expect("failed to initialize state");

    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            match sweep_state.store().purge_expired() {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "reclaimed expired sessions"),
                Err(err) => tracing::error!(%err, "session sweep failed"),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install the Ctrl+C handler");
}
