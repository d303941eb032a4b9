use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    Designation,
    Salary,
}

#[derive(DeriveIden)]
enum Leaves {
    Table,
    Id,
    EmployeeId,
    Approvable,
    NumberOfDays,
    StartDate,
    EndDate,
}

#[derive(DeriveIden)]
enum Holidays {
    Table,
    Id,
    Name,
    Date,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite accepts only one column per ALTER TABLE.
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .add_column(ColumnDef::new(Employees::Designation).string_len(100))
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .add_column(ColumnDef::new(Employees::Salary).decimal_len(10, 2))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Holidays::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Holidays::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Holidays::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Holidays::Date).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Leaves::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leaves::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leaves::EmployeeId).uuid().not_null())
                    .col(
                        ColumnDef::new(Leaves::Approvable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Leaves::NumberOfDays).integer().not_null())
                    .col(ColumnDef::new(Leaves::StartDate).date().not_null())
                    .col(ColumnDef::new(Leaves::EndDate).date().not_null())
                    .check(Expr::cust("number_of_days > 0"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leaves_employee")
                            .from(Leaves::Table, Leaves::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leaves_employee")
                    .table(Leaves::Table)
                    .col(Leaves::EmployeeId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Leaves::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Holidays::Table).if_exists().to_owned())
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .drop_column(Employees::Salary)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .drop_column(Employees::Designation)
                    .to_owned(),
            )
            .await
    }
}
