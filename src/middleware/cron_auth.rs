//! Scheduler secret middleware.
//!
//! The reminder endpoint is only meant to be called by the cron scheduler,
//! which sends `Authorization: Bearer <CRON_SECRET>`. This middleware:
//! 1. Reads the Authorization header
//! 2. Compares it with the expected value
//! 3. Rejects mismatches with HTTP 401 before any handler runs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::{AppState, error::AppError};

/// Cron secret authentication middleware function.
///
/// The whole header value must equal `Bearer <secret>` exactly. Both sides
/// are hashed with SHA-256 and the digests compared, so timing does not depend
/// on where the strings first differ. With no secret configured every request
/// is rejected.
pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = state.cron_secret.as_ref().ok_or_else(|| {
        tracing::warn!("CRON_SECRET is not configured; rejecting scheduler request");
        AppError::Unauthorized
    })?;

    let presented = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let expected = format!("Bearer {}", secret.expose_secret());

    if Sha256::digest(presented.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        tracing::warn!("Rejected scheduler request with invalid bearer secret");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
