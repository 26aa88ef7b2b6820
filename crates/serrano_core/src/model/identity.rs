//! Requester identity model and resolution.
//!
//! # Responsibility
//! - Resolve a stable requester identity from transport request context.
//! - Keep identity matching rules in one place for access checks.
//!
//! # Invariants
//! - Resolution order is: authenticated user, then session key, then
//!   anonymous. Exactly one variant applies per request.
//! - `Anonymous` never owns records; listings for it must stay empty
//!   without touching storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an authenticated user principal.
pub type UserId = Uuid;

/// Transport-agnostic request context handed in by the HTTP boundary.
///
/// The boundary resolves authentication and cookies; this core only sees
/// the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Present when the requester is an authenticated user.
    pub user_id: Option<UserId>,
    /// Present when a browser session exists for the requester.
    pub session_key: Option<String>,
}

/// Resolved requester identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Identity {
    /// Authenticated, durable user account.
    User(UserId),
    /// Anonymous requester with a stable browser session key.
    Session(String),
    /// No identity at all. Cookieless agents such as bots and most
    /// non-browser clients land here since no session exists yet.
    Anonymous,
}

impl Identity {
    /// Resolves the requester identity from request context.
    ///
    /// No side effects. Empty or whitespace-only session keys resolve
    /// to `Anonymous`.
    pub fn resolve(context: &RequestContext) -> Self {
        if let Some(user_id) = context.user_id {
            return Self::User(user_id);
        }
        match context.session_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Self::Session(key.to_string()),
            _ => Self::Anonymous,
        }
    }

    /// Returns whether this identity carries no principal at all.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the user id for authenticated identities.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(user_id) => Some(*user_id),
            _ => None,
        }
    }

    /// Returns the session key for session identities.
    pub fn session_key(&self) -> Option<&str> {
        match self {
            Self::Session(key) => Some(key.as_str()),
            _ => None,
        }
    }
}
