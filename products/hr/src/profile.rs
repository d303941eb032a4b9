//! Role profiles and the flat records returned by directory reads.

use async_graphql::SimpleObject;
use chrono::NaiveDate;
use entity::{employees, holidays, hrs, leaves, project_managers, users, users::Role};
use platform_api::{ApiError, ApiResult};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::validate::render_salary;

/// The role-specific extension of an identity. The variant always matches the
/// owning identity's role tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Profile {
    Employee(employees::Model),
    ProjectManager(project_managers::Model),
    Hr(hrs::Model),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Employee(_) => Role::Employee,
            Profile::ProjectManager(_) => Role::ProjectManager,
            Profile::Hr(_) => Role::Hr,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            Profile::Employee(model) => model.user_id,
            Profile::ProjectManager(model) => model.user_id,
            Profile::Hr(model) => model.user_id,
        }
    }

    pub fn first_name(&self) -> &str {
        match self {
            Profile::Employee(model) => &model.first_name,
            Profile::ProjectManager(model) => &model.first_name,
            Profile::Hr(model) => &model.first_name,
        }
    }

    /// Load the profile table selected by the identity's role.
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        identity: &users::Model,
    ) -> Result<Option<Self>, DbErr> {
        let profile = match identity.role {
            Role::Employee => employees::Entity::find()
                .filter(employees::Column::UserId.eq(identity.id))
                .one(conn)
                .await?
                .map(Profile::Employee),
            Role::ProjectManager => project_managers::Entity::find()
                .filter(project_managers::Column::UserId.eq(identity.id))
                .one(conn)
                .await?
                .map(Profile::ProjectManager),
            Role::Hr => hrs::Entity::find()
                .filter(hrs::Column::UserId.eq(identity.id))
                .one(conn)
                .await?
                .map(Profile::Hr),
        };
        Ok(profile)
    }

    /// Reject a profile that does not belong to `identity` or disagrees with
    /// its role tag.
    pub fn ensure_owned_by(&self, identity: &users::Model) -> ApiResult<()> {
        if self.user_id() != identity.id || self.role() != identity.role {
            return Err(ApiError::internal(anyhow::anyhow!(
                "profile of role {:?} does not belong to {} ({:?})",
                self.role(),
                identity.username,
                identity.role
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct HrRecord {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub branch: String,
    pub birthday: Option<NaiveDate>,
}

impl HrRecord {
    pub fn new(identity: &users::Model, profile: hrs::Model) -> Self {
        Self {
            username: identity.username.clone(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            branch: profile.branch,
            birthday: profile.birthday,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct EmployeeRecord {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department: String,
    pub designation: Option<String>,
    /// Decimal string with two places, e.g. `"52000.00"`.
    pub salary: Option<String>,
    pub date_of_joining: NaiveDate,
    pub birthday: Option<NaiveDate>,
    /// Username of the reporting project manager.
    pub reporting_manager: Option<String>,
}

impl EmployeeRecord {
    pub fn new(
        identity: &users::Model,
        profile: employees::Model,
        reporting_manager: Option<String>,
    ) -> Self {
        Self {
            username: identity.username.clone(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            phone_number: profile.phone_number,
            department: profile.department,
            designation: profile.designation,
            salary: profile.salary.map(render_salary),
            date_of_joining: profile.date_of_joining,
            birthday: profile.birthday,
            reporting_manager,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct ProjectManagerRecord {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department: String,
    pub birthday: Option<NaiveDate>,
}

impl ProjectManagerRecord {
    pub fn new(identity: &users::Model, profile: project_managers::Model) -> Self {
        Self {
            username: identity.username.clone(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            phone_number: profile.phone_number,
            department: profile.department,
            birthday: profile.birthday,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct LeaveRecord {
    pub id: Uuid,
    /// Username of the owning employee.
    pub employee: String,
    pub employee_name: String,
    pub approvable: bool,
    pub number_of_days: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl LeaveRecord {
    pub fn new(model: leaves::Model, employee: String, employee_name: String) -> Self {
        Self {
            id: model.id,
            employee,
            employee_name,
            approvable: model.approvable,
            number_of_days: model.number_of_days,
            start_date: model.start_date,
            end_date: model.end_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct HolidayRecord {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
}

impl From<holidays::Model> for HolidayRecord {
    fn from(model: holidays::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            date: model.date,
        }
    }
}
