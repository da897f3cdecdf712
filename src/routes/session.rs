//! Session routes: sign in by email, navigation state, sign out.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::routes::error::ApiError;
use crate::services::session::{self, SessionPatch, SessionState, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// SESSION EXTRACTOR
// =============================================================================

/// Signed-in caller with the navigation state of their session.
/// Use as a handler parameter to require a session.
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    pub state: SessionState,
}

impl Session {
    /// Persist `self.state` back to the session row.
    ///
    /// # Errors
    ///
    /// Returns a 500 if the update fails.
    pub async fn save(&self, app: &AppState) -> Result<(), ApiError> {
        session::save_state(&app.pool, &self.token, &self.state).await?;
        Ok(())
    }
}

impl<S> axum::extract::FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(ApiError::unauthorized());
        }

        let app_state = AppState::from_ref(state);
        let record = session::validate_session(&app_state.pool, token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { token: record.token, user: record.user, state: record.state })
    }
}

fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUser,
    pub state: SessionState,
}

/// `POST /api/session`: sign in as an imported user.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = session::create_session(&state.pool, &body.email, state.config.session_ttl_hours).await?;
    let cookie = session_cookie(
        record.token.clone(),
        state.config.cookie_secure,
        Duration::hours(i64::from(state.config.session_ttl_hours)),
    );
    let response = SessionResponse { success: true, user: record.user, state: record.state };
    Ok((jar.add(cookie), Json(response)))
}

/// `GET /api/session`: current user and navigation state.
pub async fn current(session: Session) -> Json<SessionResponse> {
    Json(SessionResponse { success: true, user: session.user, state: session.state })
}

/// `PATCH /api/session`: update navigation state.
pub async fn update(
    State(state): State<AppState>,
    mut session: Session,
    Json(patch): Json<SessionPatch>,
) -> Result<Json<SessionResponse>, ApiError> {
    patch.apply(&mut session.state);
    session.save(&state).await?;
    Ok(Json(SessionResponse { success: true, user: session.user, state: session.state }))
}

/// `DELETE /api/session`: sign out, drop the cart, clear the cookie.
pub async fn logout(State(state): State<AppState>, session: Session, jar: CookieJar) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &session.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }
    state.discard_cart(&session.token).await;

    let cookie = session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO);
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
