use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    FirstName,
    LastName,
    Email,
    IsStaff,
    IsActive,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    UserId,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Department,
    DateOfJoining,
    Birthday,
    ReportingManagerId,
}

#[derive(DeriveIden)]
enum ProjectManagers {
    Table,
    Id,
    UserId,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Department,
    Birthday,
}

#[derive(DeriveIden)]
enum Hrs {
    Table,
    Id,
    UserId,
    FirstName,
    LastName,
    Email,
    Branch,
    Birthday,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    CreatedAt,
    ExpiresAt,
    UserAgent,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string())
                    .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                    .col(ColumnDef::new(Users::FirstName).string_len(150).not_null())
                    .col(ColumnDef::new(Users::LastName).string_len(150).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(254).not_null())
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::cust(
                        "role IN ('EMPLOYEE', 'PROJECT_MANAGER', 'HR')",
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectManagers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectManagers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProjectManagers::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ProjectManagers::FirstName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectManagers::LastName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectManagers::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ProjectManagers::PhoneNumber).string_len(15))
                    .col(
                        ColumnDef::new(ProjectManagers::Department)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectManagers::Birthday).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_managers_user")
                            .from(ProjectManagers::Table, ProjectManagers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employees::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Employees::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employees::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Employees::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employees::PhoneNumber).string_len(15))
                    .col(
                        ColumnDef::new(Employees::Department)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Employees::DateOfJoining).date().not_null())
                    .col(ColumnDef::new(Employees::Birthday).date())
                    .col(ColumnDef::new(Employees::ReportingManagerId).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_user")
                            .from(Employees::Table, Employees::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_reporting_manager")
                            .from(Employees::Table, Employees::ReportingManagerId)
                            .to(ProjectManagers::Table, ProjectManagers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_reporting_manager")
                    .table(Employees::Table)
                    .col(Employees::ReportingManagerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Hrs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Hrs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Hrs::UserId).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Hrs::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(Hrs::LastName).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Hrs::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Hrs::Branch).string_len(100).not_null())
                    .col(ColumnDef::new(Hrs::Birthday).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hrs_user")
                            .from(Hrs::Table, Hrs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::UserAgent).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_user")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_user")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hrs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employees::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectManagers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
