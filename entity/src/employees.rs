use sea_orm::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone_number: Option<String>,
    pub department: String,
    pub designation: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub salary: Option<Decimal>,
    pub date_of_joining: Date,
    pub birthday: Option<Date>,
    #[sea_orm(indexed)]
    pub reporting_manager_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::project_managers::Entity",
        from = "Column::ReportingManagerId",
        to = "super::project_managers::Column::Id",
        on_delete = "SetNull"
    )]
    ReportingManager,
    #[sea_orm(has_many = "super::leaves::Entity")]
    Leave,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::project_managers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportingManager.def()
    }
}

impl Related<super::leaves::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Leave.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
