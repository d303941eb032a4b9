//! CRUD over identities and their role profiles.
//!
//! Every operation that writes both an identity and its profile runs inside
//! one transaction; a failure in either step rolls both back.

mod employee;
mod hr;
mod leave;
mod project_manager;

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use entity::{users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Caller, Session};
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::{
    error::{db_error, denied},
    validate::USERNAME_MAX,
};

/// Source of "now" for derived usernames and timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct Directory {
    db: DbPool,
    clock: Clock,
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory").finish_non_exhaustive()
    }
}

impl Directory {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn require_hr<'a>(&self, caller: &'a Caller) -> ApiResult<&'a Session> {
        caller.require_hr().map_err(denied)
    }
}

/// Identity by username, optionally restricted to one role.
async fn find_identity<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    role: Option<Role>,
) -> ApiResult<Option<users::Model>> {
    let mut query = users::Entity::find().filter(users::Column::Username.eq(username));
    if let Some(role) = role {
        query = query.filter(users::Column::Role.eq(role));
    }
    query.one(conn).await.map_err(db_error)
}

/// Identity fields shared with the profile.
struct IdentityFields<'a> {
    username: &'a str,
    role: Role,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password_hash: Option<String>,
}

async fn insert_identity<C: ConnectionTrait>(
    conn: &C,
    fields: IdentityFields<'_>,
    now: DateTime<Utc>,
) -> ApiResult<users::Model> {
    // Derived names can outgrow the column even when every input field fits.
    if fields.username.chars().count() > USERNAME_MAX {
        return Err(ApiError::validation(format!(
            "username must be <= {USERNAME_MAX} characters"
        )));
    }
    if find_identity(conn, fields.username, None).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "Username {} is already taken",
            fields.username
        )));
    }
    users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(fields.username.to_string()),
        password_hash: Set(fields.password_hash),
        role: Set(fields.role),
        first_name: Set(fields.first_name.to_string()),
        last_name: Set(fields.last_name.to_string()),
        email: Set(fields.email.to_string()),
        is_staff: Set(false),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await
    .map_err(db_error)
}

/// Name/email changes destined for both identity and profile.
#[derive(Default)]
struct SharedPatch {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

async fn sync_identity<C: ConnectionTrait>(
    conn: &C,
    identity: users::Model,
    patch: &SharedPatch,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    let mut active: users::ActiveModel = identity.into();
    if let Some(first_name) = &patch.first_name {
        active.first_name = Set(first_name.clone());
    }
    if let Some(last_name) = &patch.last_name {
        active.last_name = Set(last_name.clone());
    }
    if let Some(email) = &patch.email {
        active.email = Set(email.clone());
    }
    if !active.is_changed() {
        return Ok(());
    }
    active.updated_at = Set(now.into());
    active.update(conn).await.map_err(db_error)?;
    Ok(())
}

fn email_taken(email: &str) -> ApiError {
    ApiError::conflict(format!("Email {email} is already in use"))
}
