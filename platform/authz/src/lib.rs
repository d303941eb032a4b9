//! Authorization primitives for the HR directory.
//!
//! A request is either [`Caller::Anonymous`] or carries an authenticated
//! [`Session`]. Operations declare a [`Policy`]; the check happens before any
//! store access.

use entity::users::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role {role:?} of {username} may not perform this operation")]
    Denied { username: String, role: Role },
}

/// The principal attached to an authenticated request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn is_hr(&self) -> bool {
        self.role == Role::Hr
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Caller {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl Caller {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(session) => Some(session),
        }
    }

    pub fn check(&self, policy: Policy) -> Result<&Session, AuthzError> {
        let session = self.session().ok_or(AuthzError::Unauthenticated)?;
        match policy {
            Policy::AnySession => Ok(session),
            Policy::HrOnly if session.is_hr() => Ok(session),
            Policy::HrOnly => {
                debug!(username = %session.username, role = ?session.role, "hr-only check denied");
                Err(AuthzError::Denied {
                    username: session.username.clone(),
                    role: session.role,
                })
            }
        }
    }

    pub fn require_hr(&self) -> Result<&Session, AuthzError> {
        self.check(Policy::HrOnly)
    }
}

impl From<Session> for Caller {
    fn from(value: Session) -> Self {
        Caller::Authenticated(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    AnySession,
    HrOnly,
}
