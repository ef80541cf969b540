//! axum integration for the authentication gate.
//!
//! Apply [`require_auth`] to the router that holds the protected routes:
//!
//! ```ignore
//! let protected = Router::new()
//!     .route("/rooms", post(create_room))
//!     .route_layer(axum::middleware::from_fn_with_state(gate.clone(), require_auth));
//! ```
//!
//! Handlers read the caller through [`IdentityExt`] or by extracting
//! `Extension<Identity>`.

use crate::gate::{AuthGate, Decision, Identity, Rejection};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::instrument;

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = self.body();
        (self.status, Json(body)).into_response()
    }
}

/// Authentication middleware for protected routes.
///
/// Runs the gate and either answers with the rejection, or stores the
/// caller's [`Identity`] in the request extensions and calls the next handler.
#[instrument(skip_all, name = "nila_gate.middleware.auth")]
pub async fn require_auth(State(gate): State<AuthGate>, mut req: Request, next: Next) -> Response {
    match gate.authenticate(req.headers(), true).await {
        Decision::Proceed(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Decision::Reject(rejection) => rejection.into_response(),
    }
}

/// Extension trait for extracting the caller's identity from a request.
pub trait IdentityExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}
