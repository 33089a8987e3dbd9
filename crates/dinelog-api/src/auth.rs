use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use dinelog_types::api::{DeleteAccountRequest, LoginRequest, SignupRequest, SignupResponse};

use crate::credentials;
use crate::error::{ApiError, ApiResult};
use crate::session::{self, AuthSession};
use crate::state::{AppState, blocking};

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password are required".into()));
    }

    let user_id = blocking(&state, move |s| {
        credentials::register(&s.db, &req.username, &req.password)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = blocking(&state, move |s| {
        let user = credentials::verify(&s.db, &req.username, &req.password)?;
        session::open(s, user.id, &user.username)
    })
    .await?;

    info!("User {} logged in", response.username);
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<impl IntoResponse> {
    let sid = auth.session_id;
    blocking(&state, move |s| session::close(s, sid)).await?;

    info!("User {} logged out", auth.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Requires a live session and the account's own credentials; a session
/// cannot delete some other account.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Json(req): Json<DeleteAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username != auth.username {
        return Err(ApiError::InvalidCredentials);
    }

    blocking(&state, move |s| {
        credentials::delete(&s.db, &req.username, &req.password)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
