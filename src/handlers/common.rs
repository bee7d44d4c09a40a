//! Request-scoped context extraction.
//!
//! The session actor arrives in `x-actor-*` headers set by the front end
//! after login; the service never keeps ambient session state. Client
//! attribution is best-effort and falls back to "Unknown".

use std::convert::Infallible;
use std::str::FromStr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::models::{ClientContext, Role, SessionContext};

const ACTOR_USERNAME: &str = "x-actor-username";
const ACTOR_NAME: &str = "x-actor-name";
const ACTOR_ROLE: &str = "x-actor-role";
const ACTOR_DEPARTMENT: &str = "x-actor-department";

/// The acting session, when the request carries one.
#[derive(Debug, Clone)]
pub struct Actor(pub Option<SessionContext>);

impl Actor {
    pub fn context(&self) -> Option<&SessionContext> {
        self.0.as_ref()
    }

    /// The actor, or an authentication error for operations that must not
    /// run anonymously.
    pub fn required(&self) -> Result<&SessionContext, crate::errors::ServiceError> {
        self.0.as_ref().ok_or_else(|| {
            crate::errors::ServiceError::AuthError(
                "this operation requires an authenticated session".to_string(),
            )
        })
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = match header_str(parts, ACTOR_USERNAME) {
            Some(username) => username.to_string(),
            None => return Ok(Actor(None)),
        };
        let role = header_str(parts, ACTOR_ROLE)
            .and_then(|raw| Role::from_str(raw).ok())
            .unwrap_or_default();
        Ok(Actor(Some(SessionContext {
            full_name: header_str(parts, ACTOR_NAME)
                .map(str::to_string)
                .unwrap_or_else(|| username.clone()),
            department: header_str(parts, ACTOR_DEPARTMENT)
                .map(str::to_string)
                .unwrap_or_else(|| "Unknown".to_string()),
            username,
            role,
        })))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = header_str(parts, "x-forwarded-for")
            .map(|raw| raw.split(',').next().unwrap_or(raw).trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let user_agent = header_str(parts, "user-agent")
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown".to_string());
        Ok(ClientContext {
            ip_address,
            user_agent,
        })
    }
}
