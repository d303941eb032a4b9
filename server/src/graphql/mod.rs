mod me;

use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject,
};
use platform_api::ApiResult;
use products_hr::{
    Caller, Directory, EmployeeRecord, HolidayRecord, HrRecord, LeaveRecord, ProjectManagerRecord,
};
use serde::Serialize;
use tracing::instrument;

pub use me::MePayload;

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Read-only mirror of the directory listings. The caller is attached per
/// request as schema data.
pub fn build_schema(directory: Directory) -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(directory)
        .finish()
}

/// SDL of the schema, without runtime data.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .finish()
        .sdl()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self, ctx: &Context<'_>) -> async_graphql::Result<HealthPayload> {
        let directory = ctx.data::<Directory>()?;
        let db_ok = platform_db::ping(directory.db()).await;
        Ok(HealthPayload { ok: db_ok })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<MePayload>> {
        let caller = ctx.data_opt::<Caller>().cloned().unwrap_or_default();
        Ok(caller.session().map(MePayload::from))
    }

    #[instrument(name = "graphql.hrs", skip_all)]
    async fn hrs(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<HrRecord>> {
        let (directory, caller) = scope(ctx)?;
        extend(directory.list_hrs(&caller).await)
    }

    #[instrument(name = "graphql.employees", skip_all)]
    async fn employees(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<EmployeeRecord>> {
        let (directory, caller) = scope(ctx)?;
        extend(directory.list_employees(&caller).await)
    }

    #[instrument(name = "graphql.project_managers", skip_all)]
    async fn project_managers(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<ProjectManagerRecord>> {
        let (directory, caller) = scope(ctx)?;
        extend(directory.list_project_managers(&caller).await)
    }

    /// All leaves, or those of one identity when `username` is given.
    #[instrument(name = "graphql.leaves", skip_all)]
    async fn leaves(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
    ) -> async_graphql::Result<Vec<LeaveRecord>> {
        let (directory, caller) = scope(ctx)?;
        match username {
            Some(username) => extend(directory.list_leaves_for_user(&caller, &username).await),
            None => extend(directory.list_leaves(&caller).await),
        }
    }

    #[instrument(name = "graphql.holidays", skip_all)]
    async fn holidays(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<HolidayRecord>> {
        let (directory, caller) = scope(ctx)?;
        extend(directory.list_holidays(&caller).await)
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

fn scope<'a>(ctx: &Context<'a>) -> async_graphql::Result<(&'a Directory, Caller)> {
    let directory = ctx.data::<Directory>()?;
    let caller = ctx.data_opt::<Caller>().cloned().unwrap_or_default();
    Ok((directory, caller))
}

fn extend<T>(result: ApiResult<T>) -> async_graphql::Result<T> {
    result.map_err(|err| err.extend())
}
