//! Login sessions and the extractors that resolve the acting user.

use crate::errors::AppError;
use crate::models::UserId;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

/// Sessions unused for this long are dropped.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Default session cap; opening one more evicts the least recently used.
pub const MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    flash: Vec<String>,
    last_seen: Instant,
}

impl Session {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) >= SESSION_IDLE_TTL
    }
}

#[derive(Debug)]
pub struct Sessions {
    by_token: HashMap<String, Session>,
    limit: usize,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::with_limit(MAX_SESSIONS)
    }
}

impl Sessions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            by_token: HashMap::new(),
            limit: limit.max(1),
        }
    }

    pub fn open(&mut self, user_id: UserId) -> String {
        self.open_at(user_id, Instant::now())
    }

    pub fn open_at(&mut self, user_id: UserId, now: Instant) -> String {
        self.by_token.retain(|_, session| !session.expired(now));
        while self.by_token.len() >= self.limit {
            let oldest = self
                .by_token
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(token, _)| token.clone());
            match oldest {
                Some(token) => {
                    self.by_token.remove(&token);
                    debug!("evicted least recently used session");
                }
                None => break,
            }
        }

        let token = Uuid::new_v4().to_string();
        self.by_token.insert(
            token.clone(),
            Session {
                user_id,
                flash: Vec::new(),
                last_seen: now,
            },
        );
        token
    }

    pub fn close(&mut self, token: &str) {
        self.by_token.remove(token);
    }

    pub fn user_id(&mut self, token: &str) -> Option<UserId> {
        self.user_id_at(token, Instant::now())
    }

    /// Resolves the token and marks the session as used at `now`.
    pub fn user_id_at(&mut self, token: &str, now: Instant) -> Option<UserId> {
        let session = self.by_token.get_mut(token)?;
        if session.expired(now) {
            self.by_token.remove(token);
            return None;
        }
        session.last_seen = now;
        Some(session.user_id)
    }

    pub fn flash(&mut self, token: &str, message: impl Into<String>) {
        if let Some(session) = self.by_token.get_mut(token) {
            session.flash.push(message.into());
        }
    }

    pub fn take_flash(&mut self, token: &str) -> Vec<String> {
        self.by_token
            .get_mut(token)
            .map(|session| std::mem::take(&mut session.flash))
            .unwrap_or_default()
    }
}

/// Session token from a `session=` cookie or an `Authorization: Bearer` header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub token: String,
}

async fn resolve(parts: &Parts, state: &AppState) -> Option<CurrentUser> {
    let token = token_from_headers(&parts.headers)?;
    let id = state.sessions.lock().await.user_id(&token)?;
    Some(CurrentUser { id, token })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.ok_or_else(AppError::unauthorized)
    }
}

/// Like [`CurrentUser`], but sends anonymous visitors to the login page.
#[derive(Debug, Clone)]
pub struct PageUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await
            .map(PageUser)
            .ok_or_else(|| Redirect::to("/login?required=1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_read_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc-123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn flash_messages_are_consumed_once() {
        let mut sessions = Sessions::default();
        let token = sessions.open(7);
        assert_eq!(sessions.user_id(&token), Some(7));
        sessions.flash(&token, "saved");
        assert_eq!(sessions.take_flash(&token), vec!["saved".to_string()]);
        assert!(sessions.take_flash(&token).is_empty());
        sessions.close(&token);
        assert_eq!(sessions.user_id(&token), None);
    }

    #[test]
    fn idle_sessions_expire() {
        let start = Instant::now();
        let mut sessions = Sessions::default();
        let token = sessions.open_at(1, start);

        let later = start + SESSION_IDLE_TTL - Duration::from_secs(1);
        assert_eq!(sessions.user_id_at(&token, later), Some(1));
        let still_active = later + SESSION_IDLE_TTL - Duration::from_secs(1);
        assert_eq!(sessions.user_id_at(&token, still_active), Some(1));

        let idle = still_active + SESSION_IDLE_TTL;
        assert_eq!(sessions.user_id_at(&token, idle), None);
        assert!(sessions.by_token.is_empty());
    }

    #[test]
    fn opening_prunes_expired_sessions() {
        let start = Instant::now();
        let mut sessions = Sessions::default();
        sessions.open_at(1, start);
        sessions.open_at(2, start);
        let fresh = sessions.open_at(3, start + SESSION_IDLE_TTL);
        assert_eq!(sessions.by_token.len(), 1);
        assert!(sessions.by_token.contains_key(&fresh));
    }

    #[test]
    fn full_table_evicts_least_recently_used() {
        let start = Instant::now();
        let mut sessions = Sessions::with_limit(2);
        let first = sessions.open_at(1, start);
        let second = sessions.open_at(2, start + Duration::from_secs(1));
        sessions.user_id_at(&first, start + Duration::from_secs(2));

        let third = sessions.open_at(3, start + Duration::from_secs(3));
        assert_eq!(sessions.by_token.len(), 2);
        assert_eq!(sessions.user_id_at(&second, start + Duration::from_secs(4)), None);
        assert_eq!(sessions.user_id_at(&first, start + Duration::from_secs(4)), Some(1));
        assert_eq!(sessions.user_id_at(&third, start + Duration::from_secs(4)), Some(3));
    }
}
