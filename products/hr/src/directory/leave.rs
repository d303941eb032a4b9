use std::collections::HashMap;

use chrono::NaiveDate;
use entity::{employees, holidays, leaves, users, users::Role};
use platform_api::{ApiError, ApiResult};
use platform_authz::Caller;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Directory, find_identity};
use crate::{
    error::db_error,
    input::{NewHoliday, NewLeave},
    profile::{HolidayRecord, LeaveRecord, Profile},
    validate::{HOLIDAY_NAME_MAX, required},
};

impl Directory {
    /// Record a leave for an employee. The span must not end before it starts.
    #[instrument(name = "leave.create", skip_all, fields(employee = %input.employee_username))]
    pub async fn create_leave(&self, caller: &Caller, input: NewLeave) -> ApiResult<LeaveRecord> {
        self.require_hr(caller)?;
        let number_of_days = i32::try_from(input.number_of_days)
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| ApiError::validation("number_of_days must be a positive integer"))?;
        let start_date = input
            .start_date
            .ok_or_else(|| ApiError::validation("start_date is required"))?;
        let end_date = input
            .end_date
            .ok_or_else(|| ApiError::validation("end_date is required"))?;
        if end_date < start_date {
            return Err(ApiError::validation("end_date cannot be before start_date"));
        }

        let not_found = || ApiError::not_found("Employee not found");
        let username = input.employee_username.trim();
        let identity = find_identity(&self.db, username, Some(Role::Employee))
            .await?
            .ok_or_else(not_found)?;
        let employee = employees::Entity::find()
            .filter(employees::Column::UserId.eq(identity.id))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(not_found)?;

        let leave = leaves::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            approvable: Set(input.approvable),
            number_of_days: Set(number_of_days),
            start_date: Set(start_date),
            end_date: Set(end_date),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;

        info!(leave_id = %leave.id, days = number_of_days, "leave recorded");
        Ok(LeaveRecord::new(
            leave,
            identity.username,
            full_name(&employee.first_name, &employee.last_name),
        ))
    }

    #[instrument(name = "leave.list", skip_all)]
    pub async fn list_leaves(&self, caller: &Caller) -> ApiResult<Vec<LeaveRecord>> {
        self.require_hr(caller)?;
        let owners: HashMap<Uuid, (String, String)> = employees::Entity::find()
            .find_also_related(users::Entity)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .filter_map(|(employee, identity)| {
                let name = full_name(&employee.first_name, &employee.last_name);
                identity.map(|identity| (employee.id, (identity.username, name)))
            })
            .collect();
        let rows = leaves::Entity::find()
            .order_by_asc(leaves::Column::StartDate)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .filter_map(|leave| {
                let (username, name) = owners.get(&leave.employee_id)?.clone();
                Some(LeaveRecord::new(leave, username, name))
            })
            .collect())
    }

    /// Leaves attached to `username`. Any role resolves; only employees own
    /// leaves, so other roles yield an empty list.
    #[instrument(name = "leave.list_for_user", skip_all, fields(username = %username))]
    pub async fn list_leaves_for_user(
        &self,
        caller: &Caller,
        username: &str,
    ) -> ApiResult<Vec<LeaveRecord>> {
        self.require_hr(caller)?;
        let identity = find_identity(&self.db, username, None)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let Some(profile) = Profile::load(&self.db, &identity)
            .await
            .map_err(db_error)?
        else {
            return Ok(Vec::new());
        };
        profile.ensure_owned_by(&identity)?;
        let Profile::Employee(employee) = profile else {
            return Ok(Vec::new());
        };
        let name = full_name(&employee.first_name, &employee.last_name);
        let rows = leaves::Entity::find()
            .filter(leaves::Column::EmployeeId.eq(employee.id))
            .order_by_asc(leaves::Column::StartDate)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|leave| LeaveRecord::new(leave, identity.username.clone(), name.clone()))
            .collect())
    }

    #[instrument(name = "holiday.list", skip_all)]
    pub async fn list_holidays(&self, caller: &Caller) -> ApiResult<Vec<HolidayRecord>> {
        self.require_hr(caller)?;
        let rows = holidays::Entity::find()
            .order_by_asc(holidays::Column::Date)
            .order_by_asc(holidays::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(HolidayRecord::from).collect())
    }

    #[instrument(name = "holiday.create", skip_all)]
    pub async fn create_holiday(
        &self,
        caller: &Caller,
        input: NewHoliday,
    ) -> ApiResult<HolidayRecord> {
        self.require_hr(caller)?;
        let name = required("name", &input.name, HOLIDAY_NAME_MAX)?;
        let date = input
            .date
            .ok_or_else(|| ApiError::validation("date is required"))?;
        self.ensure_holiday(&name, date).await
    }

    /// Insert a holiday unless one with the same name and date exists.
    /// Unguarded; used by provisioning.
    pub async fn ensure_holiday(&self, name: &str, date: NaiveDate) -> ApiResult<HolidayRecord> {
        let existing = holidays::Entity::find()
            .filter(holidays::Column::Name.eq(name))
            .filter(holidays::Column::Date.eq(date))
            .one(&self.db)
            .await
            .map_err(db_error)?;
        if let Some(existing) = existing {
            return Ok(existing.into());
        }
        let holiday = holidays::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            date: Set(date),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;
        info!(name, %date, "holiday added");
        Ok(holiday.into())
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{first} {last}")
}
