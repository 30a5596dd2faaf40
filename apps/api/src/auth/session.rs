use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use super::tokens::TokenManager;
use crate::bypass::fixtures::{DEV_EMAIL, DEV_USER_ID};
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::CredentialStore;

pub const AUTH_COOKIE: &str = "auth-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

impl Identity {
    /// The fixture identity every request carries while the bypass is on.
    pub fn dev() -> Self {
        Self {
            user_id: DEV_USER_ID,
            email: DEV_EMAIL.to_string(),
        }
    }
}

/// Outcome of session resolution. Never an error: anything short of a valid
/// token for an existing user is `Unauthenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(Identity),
    Unauthenticated,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Authenticated(identity) => Some(identity),
            Session::Unauthenticated => None,
        }
    }

    /// Precondition of every write.
    pub fn require(&self) -> Result<&Identity, AppError> {
        self.identity().ok_or(AppError::Unauthorized)
    }
}

/// Session token from the `auth-token` cookie, else from `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value);

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

#[derive(Clone)]
pub struct SessionResolver {
    tokens: TokenManager,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionResolver {
    pub fn new(tokens: TokenManager, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            tokens,
            credentials,
        }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> Session {
        let Some(token) = token_from_headers(headers) else {
            return Session::Unauthenticated;
        };

        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected session token: {e}");
                return Session::Unauthenticated;
            }
        };

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            tracing::debug!("Session token subject is not a user id");
            return Session::Unauthenticated;
        };

        // The account may have been removed since the token was issued.
        match self.credentials.find_user_by_id(user_id).await {
            Ok(Some(user)) => Session::Authenticated(Identity {
                user_id: user.id,
                email: user.email,
            }),
            Ok(None) => Session::Unauthenticated,
            Err(e) => {
                tracing::warn!("Session lookup failed, treating as signed out: {e}");
                Session::Unauthenticated
            }
        }
    }
}

/// Extractor giving handlers the caller's session. With the development
/// bypass on, no resolution happens and the fixture identity is returned.
pub struct CurrentSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.bypass.is_enabled() {
            return Ok(CurrentSession(Session::Authenticated(Identity::dev())));
        }
        Ok(CurrentSession(state.sessions.resolve(&parts.headers).await))
    }
}
