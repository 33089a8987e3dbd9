use std::time::Duration as StdDuration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dinelog_types::api::{Claims, LoginResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, AppStateInner, blocking};

/// The authenticated caller, attached to requests that pass
/// [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub user_id: i64,
    pub username: String,
}

/// Open a server-side session for `user_id` and sign a token naming it.
pub fn open(state: &AppStateInner, user_id: i64, username: &str) -> ApiResult<LoginResponse> {
    // A non-positive lifetime would hand out tokens that are dead on arrival.
    if state.session_ttl <= chrono::Duration::zero() {
        return Err(ApiError::Internal(format!(
            "Session lifetime must be positive, got {}",
            state.session_ttl
        )));
    }

    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let expires_at = now + state.session_ttl;

    state.db.write("open_session", |txn| {
        txn.insert_session(session_id, user_id, now, expires_at)
    })?;

    let token = create_token(&state.jwt_secret, session_id, user_id, username, expires_at)?;
    debug!("Session {} opened for user {}", session_id, user_id);

    Ok(LoginResponse {
        user_id,
        username: username.to_string(),
        token,
        expires_at,
    })
}

/// Delete the session row. Tokens naming it stop working immediately.
pub fn close(state: &AppStateInner, session_id: Uuid) -> ApiResult<()> {
    let deleted = state
        .db
        .write("close_session", |txn| txn.delete_session(session_id))?;
    if deleted {
        debug!("Session {} closed", session_id);
    }
    Ok(())
}

fn create_token(
    secret: &str,
    session_id: Uuid,
    user_id: i64,
    username: &str,
    expires_at: DateTime<Utc>,
) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        username: username.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))
}

/// Validate the bearer token and its session row, then attach an
/// [`AuthSession`] to the request.
pub async fn require_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?
    .claims;

    let sid = claims.sid;
    let session = blocking(&state, move |s| Ok(s.db.find_live_session(sid, Utc::now())?))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // The row is authoritative; the token only names it.
    if session.user_id != claims.sub {
        warn!("Token subject {} does not own session {}", claims.sub, sid);
        return Err(ApiError::Unauthorized);
    }

    debug!("Session {} for user {} valid until {}", sid, session.user_id, session.expires_at);
    req.extensions_mut().insert(AuthSession {
        session_id: sid,
        user_id: session.user_id,
        username: session.username,
    });
    Ok(next.run(req).await)
}

const MIN_PURGE_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Background task that deletes expired sessions. Intervals below one second
/// are raised to one second.
pub async fn run_purge_loop(state: AppState, interval: StdDuration) {
    if interval < MIN_PURGE_INTERVAL {
        warn!("Session purge interval {:?} too short, using {:?}", interval, MIN_PURGE_INTERVAL);
    }
    let mut interval = tokio::time::interval(interval.max(MIN_PURGE_INTERVAL));

    loop {
        interval.tick().await;

        match blocking(&state, |s| Ok(s.db.purge_expired_sessions(Utc::now())?)).await {
            Ok(count) => {
                if count > 0 {
                    info!("Session purge: removed {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session purge error: {}", e);
            }
        }
    }
}
