//! Request credentials: producer sessions, gate cookies, client identity

use crate::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use snapgate_core::SnapError;
use std::net::SocketAddr;

/// Cookie carrying a producer session
pub const SESSION_COOKIE: &str = "snapgate_session";

/// Value of cookie `name`, if present
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Authenticated producer identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Producer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(&parts.headers)
            .or_else(|| cookie(&parts.headers, SESSION_COOKIE))
            .ok_or_else(|| SnapError::unauthorized("producer session required"))?;
        Ok(Self(state.sessions.authenticate(token)?))
    }
}

/// Network identity and user agent used for view fingerprints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Client address as reported by the edge, or the peer address
    pub ip: String,
    /// User agent, empty when absent
    pub user_agent: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let forwarded = header("cf-connecting-ip").or_else(|| {
            header("x-forwarded-for")
                .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
        });
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self {
            ip: forwarded
                .filter(|ip| !ip.is_empty())
                .or(peer)
                .unwrap_or_else(|| "unknown".to_string()),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        })
    }
}
