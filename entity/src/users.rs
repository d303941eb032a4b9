use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    /// `None` means the principal has no usable credential.
    pub password_hash: Option<String>,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub last_login: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::employees::Entity")]
    Employee,
    #[sea_orm(has_one = "super::project_managers::Entity")]
    ProjectManager,
    #[sea_orm(has_one = "super::hrs::Entity")]
    Hr,
    #[sea_orm(has_many = "super::sessions::Entity")]
    Session,
}

impl Related<super::employees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::project_managers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectManager.def()
    }
}

impl Related<super::hrs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hr.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

/// Role tag fixed at creation time.
#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
    #[sea_orm(string_value = "PROJECT_MANAGER")]
    ProjectManager,
    #[sea_orm(string_value = "HR")]
    Hr,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::ProjectManager => "PROJECT_MANAGER",
            Role::Hr => "HR",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
