use std::collections::HashMap;
use std::sync::Mutex;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::constant_time::verify_slices_are_equal;
use ring::rand::{SecureRandom, SystemRandom};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use shared::models::AdminSession;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};
use crate::routes::AppState;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect password")]
    InvalidPassword,
    #[error("Admin session required")]
    MissingToken,
    #[error("Admin session not recognised")]
    UnknownSession,
    #[error("Admin session expired, please log in again")]
    Expired,
    #[error("Failed to issue session token")]
    TokenGeneration,
}

/// Shared-secret admin login issuing expiring bearer sessions.
pub struct AdminGate {
    password: String,
    ttl: Duration,
    sessions: Mutex<HashMap<String, OffsetDateTime>>,
    rng: SystemRandom,
}

impl AdminGate {
    pub fn new(password: impl Into<String>, ttl: Duration) -> Self {
        Self {
            password: password.into(),
            ttl,
            sessions: Mutex::new(HashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    pub fn login(&self, attempt: &str) -> Result<AdminSession, AuthError> {
        verify_slices_are_equal(attempt.as_bytes(), self.password.as_bytes())
            .map_err(|_| AuthError::InvalidPassword)?;

        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| AuthError::TokenGeneration)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.ttl;

        let mut sessions = self.sessions.lock().map_err(|_| {
            error!("Failed to acquire lock for session storage");
            AuthError::TokenGeneration
        })?;
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);
        debug!("Issued admin session, {} active", sessions.len());

        Ok(AdminSession { token, expires_at })
    }

    /// Checks a bearer token on every admin action. Every expired session is dropped on the way.
    pub fn validate(&self, token: &str) -> Result<(), AuthError> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.lock().map_err(|_| AuthError::UnknownSession)?;
        let expires_at = sessions.get(token).copied();
        sessions.retain(|_, expiry| *expiry > now);
        match expires_at {
            None => Err(AuthError::UnknownSession),
            Some(expires_at) if now >= expires_at => Err(AuthError::Expired),
            Some(_) => Ok(()),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    pub fn logout(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(token);
        }
    }
}

/// Request guard for admin-only routes: `Authorization: Bearer <token>`.
pub struct Admin {
    token: String,
}

impl Admin {
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(token) = req
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
        else {
            return Outcome::Error((Status::Unauthorized, AuthError::MissingToken));
        };

        let state = match req.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state,
            _ => return Outcome::Error((Status::InternalServerError, AuthError::UnknownSession)),
        };

        match state.admin.validate(token) {
            Ok(()) => Outcome::Success(Admin { token: token.to_string() }),
            Err(e) => {
                debug!("Admin guard rejected request: {}", e);
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}
