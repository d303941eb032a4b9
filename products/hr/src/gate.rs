//! Login, logout and session resolution.
//!
//! Sessions live in the `sessions` table; the transport keeps only the row id
//! (in a private cookie). Only HR principals can log in.

use chrono::{Duration, Utc};
use entity::{sessions, users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authn::verify_password;
use platform_authz::{Caller, Policy, Session};
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{db_error, denied},
    profile::Profile,
};

/// Two weeks.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 336;

#[derive(Clone, Debug)]
pub struct AccessGate {
    db: DbPool,
    ttl: Duration,
}

/// A freshly established session.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub session_id: Uuid,
    pub session: Session,
    pub first_name: String,
}

impl LoginOutcome {
    pub fn welcome(&self) -> String {
        format!("Welcome {}!", self.first_name)
    }
}

impl AccessGate {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check credentials and establish a session. A non-HR principal is
    /// refused before its password is looked at.
    #[instrument(name = "gate.login", skip_all, fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        user_agent: Option<String>,
    ) -> ApiResult<LoginOutcome> {
        let identity = users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .filter(|identity| identity.is_active)
            .ok_or(ApiError::InvalidCredentials)?;
        if identity.role != Role::Hr {
            debug!(role = ?identity.role, "login refused for non-hr principal");
            return Err(ApiError::NotHr);
        }
        if !verify_password(identity.password_hash.as_deref(), password) {
            warn!("login failed");
            return Err(ApiError::InvalidCredentials);
        }
        let profile = Profile::load(&self.db, &identity)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("HR profile not found"))?;
        profile.ensure_owned_by(&identity)?;
        let first_name = profile.first_name().to_string();

        let now = Utc::now();
        let expires_at = now + self.ttl;
        let session_id = Uuid::new_v4();
        sessions::ActiveModel {
            id: Set(session_id),
            user_id: Set(identity.id),
            created_at: Set(now.into()),
            expires_at: Set(expires_at.into()),
            user_agent: Set(user_agent),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;

        let session = Session::new(identity.username.clone(), identity.role);
        let mut active: users::ActiveModel = identity.into();
        active.last_login = Set(Some(now.into()));
        active.update(&self.db).await.map_err(db_error)?;

        info!("login succeeded");
        Ok(LoginOutcome {
            session_id,
            session,
            first_name,
        })
    }

    /// Map a session id to its caller. Unknown, expired or orphaned sessions
    /// resolve to [`Caller::Anonymous`]; expired rows are removed.
    pub async fn resolve(&self, session_id: Uuid) -> ApiResult<Caller> {
        let Some((session, identity)) = sessions::Entity::find_by_id(session_id)
            .find_also_related(users::Entity)
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(Caller::Anonymous);
        };
        if session.expires_at.with_timezone(&Utc) < Utc::now() {
            sessions::Entity::delete_by_id(session.id)
                .exec(&self.db)
                .await
                .map_err(db_error)?;
            debug!(%session_id, "expired session removed");
            return Ok(Caller::Anonymous);
        }
        Ok(match identity {
            Some(identity) if identity.is_active => {
                Caller::Authenticated(Session::new(identity.username, identity.role))
            }
            _ => Caller::Anonymous,
        })
    }

    /// End the caller's session and return the departing username.
    #[instrument(name = "gate.logout", skip_all)]
    pub async fn logout(&self, caller: &Caller, session_id: Option<Uuid>) -> ApiResult<String> {
        let session = caller.check(Policy::AnySession).map_err(denied)?;
        if let Some(session_id) = session_id {
            sessions::Entity::delete_by_id(session_id)
                .exec(&self.db)
                .await
                .map_err(db_error)?;
        }
        info!(username = %session.username, "logged out");
        Ok(session.username.clone())
    }

    /// Drop every expired session row.
    pub async fn purge_expired(&self) -> ApiResult<u64> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }
}
