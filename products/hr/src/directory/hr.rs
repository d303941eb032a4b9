use entity::{hrs, users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authn::hash_password;
use platform_authz::Caller;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    Directory, IdentityFields, SharedPatch, email_taken, find_identity, insert_identity,
    sync_identity,
};
use crate::{
    error::db_error,
    input::{HrPatch, NewHr},
    profile::HrRecord,
    username,
    validate::{DEPARTMENT_MAX, NAME_MAX, normalize_email, optional, optional_email, required},
};

impl Directory {
    /// Self-registration of an HR principal. Returns the derived username.
    #[instrument(name = "hr.register", skip_all)]
    pub async fn register_hr(&self, input: NewHr) -> ApiResult<String> {
        let first_name = required("first_name", &input.first_name, NAME_MAX)?;
        let last_name = required("last_name", &input.last_name, NAME_MAX)?;
        let email = normalize_email(&input.email)?;
        let branch = required("branch", &input.branch, DEPARTMENT_MAX)?;
        if input.password.is_empty() {
            return Err(ApiError::validation("password is required"));
        }
        let password_hash =
            hash_password(&input.password).map_err(|err| ApiError::internal(err.into()))?;
        let username = username::for_hr(&first_name, &branch);
        let now = self.now();

        let txn = self.db.begin().await.map_err(db_error)?;
        if hrs::Entity::find()
            .filter(hrs::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await
            .map_err(db_error)?
            .is_some()
        {
            return Err(email_taken(&email));
        }
        let identity = insert_identity(
            &txn,
            IdentityFields {
                username: &username,
                role: Role::Hr,
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
                password_hash: Some(password_hash),
            },
            now,
        )
        .await?;
        hrs::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(identity.id),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            branch: Set(branch),
            birthday: Set(input.birthday),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!(%username, "hr registered");
        Ok(username)
    }

    /// Partial update of an HR profile and its identity.
    #[instrument(name = "hr.update", skip_all, fields(username = %username))]
    pub async fn update_hr(
        &self,
        caller: &Caller,
        username: &str,
        patch: HrPatch,
    ) -> ApiResult<()> {
        self.require_hr(caller)?;
        let shared = SharedPatch {
            first_name: optional("first_name", patch.first_name.as_deref(), NAME_MAX)?,
            last_name: optional("last_name", patch.last_name.as_deref(), NAME_MAX)?,
            email: optional_email(patch.email.as_deref())?,
        };
        let branch = optional("branch", patch.branch.as_deref(), DEPARTMENT_MAX)?;

        let txn = self.db.begin().await.map_err(db_error)?;
        let identity = find_identity(&txn, username, Some(Role::Hr))
            .await?
            .ok_or_else(|| ApiError::not_found("HR not found"))?;
        let profile = hrs::Entity::find()
            .filter(hrs::Column::UserId.eq(identity.id))
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("HR profile not found"))?;
        if let Some(email) = &shared.email {
            let clash = hrs::Entity::find()
                .filter(hrs::Column::Email.eq(email.as_str()))
                .filter(hrs::Column::Id.ne(profile.id))
                .one(&txn)
                .await
                .map_err(db_error)?;
            if clash.is_some() {
                return Err(email_taken(email));
            }
        }

        let mut active: hrs::ActiveModel = profile.into();
        if let Some(first_name) = &shared.first_name {
            active.first_name = Set(first_name.clone());
        }
        if let Some(last_name) = &shared.last_name {
            active.last_name = Set(last_name.clone());
        }
        if let Some(email) = &shared.email {
            active.email = Set(email.clone());
        }
        if let Some(branch) = branch {
            active.branch = Set(branch);
        }
        if let Some(birthday) = patch.birthday {
            active.birthday = Set(Some(birthday));
        }
        if active.is_changed() {
            active.update(&txn).await.map_err(db_error)?;
        }
        sync_identity(&txn, identity, &shared, self.now()).await?;
        txn.commit().await.map_err(db_error)?;

        info!("hr updated");
        Ok(())
    }

    #[instrument(name = "hr.delete", skip_all, fields(username = %username))]
    pub async fn delete_hr(&self, caller: &Caller, username: &str) -> ApiResult<bool> {
        self.require_hr(caller)?;
        let txn = self.db.begin().await.map_err(db_error)?;
        let identity = find_identity(&txn, username, Some(Role::Hr))
            .await?
            .ok_or_else(|| ApiError::not_found("HR not found"))?;
        hrs::Entity::delete_many()
            .filter(hrs::Column::UserId.eq(identity.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        identity.delete(&txn).await.map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!("hr deleted");
        Ok(true)
    }

    #[instrument(name = "hr.list", skip_all)]
    pub async fn list_hrs(&self, caller: &Caller) -> ApiResult<Vec<HrRecord>> {
        self.require_hr(caller)?;
        let rows = hrs::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(hrs::Column::FirstName)
            .order_by_asc(hrs::Column::LastName)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .filter_map(|(profile, identity)| {
                identity.map(|identity| HrRecord::new(&identity, profile))
            })
            .collect())
    }

    #[instrument(name = "hr.get", skip_all, fields(username = %username))]
    pub async fn get_hr(&self, caller: &Caller, username: &str) -> ApiResult<HrRecord> {
        self.require_hr(caller)?;
        let identity = find_identity(&self.db, username, Some(Role::Hr))
            .await?
            .ok_or_else(|| ApiError::not_found("HR not found"))?;
        let profile = hrs::Entity::find()
            .filter(hrs::Column::UserId.eq(identity.id))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("HR not found"))?;
        Ok(HrRecord::new(&identity, profile))
    }
}
