pub use sea_orm_migration::prelude::*;

mod m20241130_000001_identity_profiles;
mod m20241130_000002_leaves_holidays;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241130_000001_identity_profiles::Migration),
            Box::new(m20241130_000002_leaves_holidays::Migration),
        ]
    }
}
