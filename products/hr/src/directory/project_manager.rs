use entity::{employees, project_managers, users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authz::Caller;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    Directory, IdentityFields, SharedPatch, email_taken, find_identity, insert_identity,
    sync_identity,
};
use crate::{
    error::db_error,
    input::{NewProjectManager, ProjectManagerPatch},
    profile::ProjectManagerRecord,
    username,
    validate::{
        DEPARTMENT_MAX, NAME_MAX, PHONE_MAX, normalize_email, optional, optional_email, required,
    },
};

impl Directory {
    /// Create a project manager identity and profile. Returns the derived
    /// username.
    #[instrument(name = "project_manager.create", skip_all)]
    pub async fn create_project_manager(
        &self,
        caller: &Caller,
        input: NewProjectManager,
    ) -> ApiResult<String> {
        self.require_hr(caller)?;
        let first_name = required("first_name", &input.first_name, NAME_MAX)?;
        let last_name = required("last_name", &input.last_name, NAME_MAX)?;
        let email = normalize_email(&input.email)?;
        let phone_number = optional("phone_number", input.phone_number.as_deref(), PHONE_MAX)?;
        let department = required("department", &input.department, DEPARTMENT_MAX)?;
        let now = self.now();
        let username = username::with_timestamp(&first_name, now);

        let txn = self.db.begin().await.map_err(db_error)?;
        ensure_email_free(&txn, &email, None).await?;
        let identity = insert_identity(
            &txn,
            IdentityFields {
                username: &username,
                role: Role::ProjectManager,
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
                password_hash: None,
            },
            now,
        )
        .await?;
        project_managers::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(identity.id),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone_number: Set(phone_number),
            department: Set(department),
            birthday: Set(input.birthday),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!(%username, "project manager created");
        Ok(username)
    }

    #[instrument(name = "project_manager.update", skip_all, fields(username = %username))]
    pub async fn update_project_manager(
        &self,
        caller: &Caller,
        username: &str,
        patch: ProjectManagerPatch,
    ) -> ApiResult<()> {
        self.require_hr(caller)?;
        let shared = SharedPatch {
            first_name: optional("first_name", patch.first_name.as_deref(), NAME_MAX)?,
            last_name: optional("last_name", patch.last_name.as_deref(), NAME_MAX)?,
            email: optional_email(patch.email.as_deref())?,
        };
        let phone_number = optional("phone_number", patch.phone_number.as_deref(), PHONE_MAX)?;
        let department = optional("department", patch.department.as_deref(), DEPARTMENT_MAX)?;

        let txn = self.db.begin().await.map_err(db_error)?;
        let (identity, profile) = find_project_manager(&txn, username).await?;
        if let Some(email) = &shared.email {
            ensure_email_free(&txn, email, Some(profile.id)).await?;
        }

        let mut active: project_managers::ActiveModel = profile.into();
        if let Some(first_name) = &shared.first_name {
            active.first_name = Set(first_name.clone());
        }
        if let Some(last_name) = &shared.last_name {
            active.last_name = Set(last_name.clone());
        }
        if let Some(email) = &shared.email {
            active.email = Set(email.clone());
        }
        if let Some(phone_number) = phone_number {
            active.phone_number = Set(Some(phone_number));
        }
        if let Some(department) = department {
            active.department = Set(department);
        }
        if let Some(birthday) = patch.birthday {
            active.birthday = Set(Some(birthday));
        }
        if active.is_changed() {
            active.update(&txn).await.map_err(db_error)?;
        }
        sync_identity(&txn, identity, &shared, self.now()).await?;
        txn.commit().await.map_err(db_error)?;

        info!("project manager updated");
        Ok(())
    }

    /// Remove the profile and identity. Employees reporting to this manager
    /// keep their rows with the reporting link cleared.
    #[instrument(name = "project_manager.delete", skip_all, fields(username = %username))]
    pub async fn delete_project_manager(&self, caller: &Caller, username: &str) -> ApiResult<bool> {
        self.require_hr(caller)?;
        let txn = self.db.begin().await.map_err(db_error)?;
        let (identity, profile) = find_project_manager(&txn, username).await?;
        let detached = employees::Entity::update_many()
            .col_expr(
                employees::Column::ReportingManagerId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(employees::Column::ReportingManagerId.eq(profile.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        profile.delete(&txn).await.map_err(db_error)?;
        identity.delete(&txn).await.map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!(reports = detached.rows_affected, "project manager deleted");
        Ok(true)
    }

    #[instrument(name = "project_manager.list", skip_all)]
    pub async fn list_project_managers(
        &self,
        caller: &Caller,
    ) -> ApiResult<Vec<ProjectManagerRecord>> {
        self.require_hr(caller)?;
        let rows = project_managers::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(project_managers::Column::FirstName)
            .order_by_asc(project_managers::Column::LastName)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .filter_map(|(profile, identity)| {
                identity.map(|identity| ProjectManagerRecord::new(&identity, profile))
            })
            .collect())
    }

    #[instrument(name = "project_manager.get", skip_all, fields(username = %username))]
    pub async fn get_project_manager(
        &self,
        caller: &Caller,
        username: &str,
    ) -> ApiResult<ProjectManagerRecord> {
        self.require_hr(caller)?;
        let (identity, profile) = find_project_manager(&self.db, username).await?;
        Ok(ProjectManagerRecord::new(&identity, profile))
    }
}

async fn find_project_manager<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> ApiResult<(users::Model, project_managers::Model)> {
    let not_found = || ApiError::not_found("Project Manager not found");
    let identity = find_identity(conn, username, Some(Role::ProjectManager))
        .await?
        .ok_or_else(not_found)?;
    let profile = project_managers::Entity::find()
        .filter(project_managers::Column::UserId.eq(identity.id))
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;
    Ok((identity, profile))
}

async fn ensure_email_free<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    let mut query =
        project_managers::Entity::find().filter(project_managers::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(project_managers::Column::Id.ne(id));
    }
    match query.one(conn).await.map_err(db_error)? {
        Some(_) => Err(email_taken(email)),
        None => Ok(()),
    }
}
