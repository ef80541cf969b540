//! A minimal service with one protected route, configured from the environment.
//!
//! ```text
//! AUTH_ENABLED=true AUTH_DOMAIN=tenant.example.com AUTH_AUDIENCE=https://rooms.api \
//!     cargo run --example gate_server
//! curl -v -H "Authorization: Bearer <YOUR_JWT_TOKEN>" -X POST http://localhost:6188/api/rooms
//! ```

use axum::{
    extract::Extension,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use nila_gate::prelude::*;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn whoami(Extension(identity): Extension<Identity>) -> Json<Value> {
    match identity {
        Identity::Anonymous => Json(json!({ "authenticated": false })),
        Identity::Authenticated(token) => Json(json!({
            "authenticated": true,
            "claims": token.into_claims(),
        })),
    }
}

async fn up() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = IssuerConfig::from_env()?;
    info!(
        enabled = config.enabled,
        domain = config.domain.as_deref().unwrap_or("<unset>"),
        algorithm = ?config.algorithm,
        "Authentication gate configured"
    );
    let gate = AuthGate::new(config)?;

    let protected = Router::new()
        .route("/api/rooms", post(whoami))
        .route_layer(from_fn_with_state(gate, require_auth));
    let app = Router::new().route("/up", get(up)).merge(protected);

    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:6188".to_string());
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
