use std::collections::HashMap;

use entity::{employees, leaves, project_managers, users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authz::Caller;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    Directory, IdentityFields, SharedPatch, email_taken, find_identity, insert_identity,
    sync_identity,
};
use crate::{
    error::db_error,
    input::{EmployeePatch, NewEmployee},
    profile::EmployeeRecord,
    username,
    validate::{
        DEPARTMENT_MAX, NAME_MAX, PHONE_MAX, USERNAME_MAX, checked_salary, normalize_email,
        optional, optional_email, required,
    },
};

impl Directory {
    /// Create an employee identity and profile. The identity carries no usable
    /// credential. Returns the derived username.
    #[instrument(name = "employee.create", skip_all)]
    pub async fn create_employee(&self, caller: &Caller, input: NewEmployee) -> ApiResult<String> {
        self.require_hr(caller)?;
        let first_name = required("first_name", &input.first_name, NAME_MAX)?;
        let last_name = required("last_name", &input.last_name, NAME_MAX)?;
        let email = normalize_email(&input.email)?;
        let phone_number = optional("phone_number", input.phone_number.as_deref(), PHONE_MAX)?;
        let department = required("department", &input.department, DEPARTMENT_MAX)?;
        let designation = optional("designation", input.designation.as_deref(), DEPARTMENT_MAX)?;
        let salary = checked_salary(input.salary)?;
        let date_of_joining = input
            .date_of_joining
            .ok_or_else(|| ApiError::validation("date_of_joining is required"))?;
        let manager = optional(
            "reporting_manager",
            input.reporting_manager.as_deref(),
            USERNAME_MAX,
        )?;
        let now = self.now();
        let username = username::with_timestamp(&first_name, now);

        let txn = self.db.begin().await.map_err(db_error)?;
        ensure_email_free(&txn, &email, None).await?;
        let reporting_manager_id = match manager {
            Some(manager) => Some(resolve_manager(&txn, &manager).await?),
            None => None,
        };
        let identity = insert_identity(
            &txn,
            IdentityFields {
                username: &username,
                role: Role::Employee,
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
                password_hash: None,
            },
            now,
        )
        .await?;
        employees::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(identity.id),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone_number: Set(phone_number),
            department: Set(department),
            designation: Set(designation),
            salary: Set(salary),
            date_of_joining: Set(date_of_joining),
            birthday: Set(input.birthday),
            reporting_manager_id: Set(reporting_manager_id),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!(%username, "employee created");
        Ok(username)
    }

    /// Apply the present fields of `patch`; omitted or blank fields keep their
    /// prior values. Name and email land on both identity and profile.
    #[instrument(name = "employee.update", skip_all, fields(username = %username))]
    pub async fn update_employee(
        &self,
        caller: &Caller,
        username: &str,
        patch: EmployeePatch,
    ) -> ApiResult<()> {
        self.require_hr(caller)?;
        let shared = SharedPatch {
            first_name: optional("first_name", patch.first_name.as_deref(), NAME_MAX)?,
            last_name: optional("last_name", patch.last_name.as_deref(), NAME_MAX)?,
            email: optional_email(patch.email.as_deref())?,
        };
        let phone_number = optional("phone_number", patch.phone_number.as_deref(), PHONE_MAX)?;
        let department = optional("department", patch.department.as_deref(), DEPARTMENT_MAX)?;
        let designation = optional("designation", patch.designation.as_deref(), DEPARTMENT_MAX)?;
        let salary = checked_salary(patch.salary)?;
        let manager = optional(
            "reporting_manager",
            patch.reporting_manager.as_deref(),
            USERNAME_MAX,
        )?;

        let txn = self.db.begin().await.map_err(db_error)?;
        let identity = find_identity(&txn, username, Some(Role::Employee))
            .await?
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;
        let profile = employees::Entity::find()
            .filter(employees::Column::UserId.eq(identity.id))
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("Employee profile not found"))?;
        if let Some(email) = &shared.email {
            ensure_email_free(&txn, email, Some(profile.id)).await?;
        }
        let reporting_manager_id = match manager {
            Some(manager) => Some(resolve_manager(&txn, &manager).await?),
            None => None,
        };

        let mut active: employees::ActiveModel = profile.into();
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
        if let Some(designation) = designation {
            active.designation = Set(Some(designation));
        }
        if let Some(salary) = salary {
            active.salary = Set(Some(salary));
        }
        if let Some(date_of_joining) = patch.date_of_joining {
            active.date_of_joining = Set(date_of_joining);
        }
        if let Some(birthday) = patch.birthday {
            active.birthday = Set(Some(birthday));
        }
        if let Some(manager_id) = reporting_manager_id {
            active.reporting_manager_id = Set(Some(manager_id));
        }
        if active.is_changed() {
            active.update(&txn).await.map_err(db_error)?;
        }
        sync_identity(&txn, identity, &shared, self.now()).await?;
        txn.commit().await.map_err(db_error)?;

        info!("employee updated");
        Ok(())
    }

    /// Remove the employee's leaves, profile and identity in one transaction.
    #[instrument(name = "employee.delete", skip_all, fields(username = %username))]
    pub async fn delete_employee(&self, caller: &Caller, username: &str) -> ApiResult<bool> {
        self.require_hr(caller)?;
        let txn = self.db.begin().await.map_err(db_error)?;
        let identity = find_identity(&txn, username, Some(Role::Employee))
            .await?
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;
        if let Some(profile) = employees::Entity::find()
            .filter(employees::Column::UserId.eq(identity.id))
            .one(&txn)
            .await
            .map_err(db_error)?
        {
            let removed = leaves::Entity::delete_many()
                .filter(leaves::Column::EmployeeId.eq(profile.id))
                .exec(&txn)
                .await
                .map_err(db_error)?;
            tracing::debug!(leaves = removed.rows_affected, "cascaded leave removal");
            profile.delete(&txn).await.map_err(db_error)?;
        }
        identity.delete(&txn).await.map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        info!("employee deleted");
        Ok(true)
    }

    #[instrument(name = "employee.list", skip_all)]
    pub async fn list_employees(&self, caller: &Caller) -> ApiResult<Vec<EmployeeRecord>> {
        self.require_hr(caller)?;
        let managers = manager_usernames(&self.db).await?;
        let rows = employees::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(employees::Column::FirstName)
            .order_by_asc(employees::Column::LastName)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .filter_map(|(profile, identity)| {
                let identity = identity?;
                let manager = profile
                    .reporting_manager_id
                    .and_then(|id| managers.get(&id).cloned());
                Some(EmployeeRecord::new(&identity, profile, manager))
            })
            .collect())
    }

    #[instrument(name = "employee.get", skip_all, fields(username = %username))]
    pub async fn get_employee(&self, caller: &Caller, username: &str) -> ApiResult<EmployeeRecord> {
        self.require_hr(caller)?;
        let identity = find_identity(&self.db, username, Some(Role::Employee))
            .await?
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;
        let profile = employees::Entity::find()
            .filter(employees::Column::UserId.eq(identity.id))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;
        let manager = match profile.reporting_manager_id {
            Some(manager_id) => manager_username(&self.db, manager_id).await?,
            None => None,
        };
        Ok(EmployeeRecord::new(&identity, profile, manager))
    }
}

async fn ensure_email_free<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    let mut query = employees::Entity::find().filter(employees::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(employees::Column::Id.ne(id));
    }
    match query.one(conn).await.map_err(db_error)? {
        Some(_) => Err(email_taken(email)),
        None => Ok(()),
    }
}

/// Project manager profile id for a username.
async fn resolve_manager<C: ConnectionTrait>(conn: &C, username: &str) -> ApiResult<Uuid> {
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
    Ok(profile.id)
}

async fn manager_username<C: ConnectionTrait>(
    conn: &C,
    manager_id: Uuid,
) -> ApiResult<Option<String>> {
    let row = project_managers::Entity::find_by_id(manager_id)
        .find_also_related(users::Entity)
        .one(conn)
        .await
        .map_err(db_error)?;
    Ok(row.and_then(|(_, identity)| identity).map(|identity| identity.username))
}

async fn manager_usernames<C: ConnectionTrait>(conn: &C) -> ApiResult<HashMap<Uuid, String>> {
    let rows = project_managers::Entity::find()
        .find_also_related(users::Entity)
        .all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .filter_map(|(profile, identity)| identity.map(|identity| (profile.id, identity.username)))
        .collect())
}
