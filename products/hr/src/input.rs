//! Request payloads. Required text fields default to empty so that a missing
//! field surfaces as a validation error rather than a decode failure.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewHr {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HrPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub branch: Option<String>,
    pub birthday: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewEmployee {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub salary: Option<Decimal>,
    #[serde(default)]
    pub date_of_joining: Option<NaiveDate>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    /// Username of a project manager.
    #[serde(default)]
    pub reporting_manager: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<Decimal>,
    pub date_of_joining: Option<NaiveDate>,
    pub birthday: Option<NaiveDate>,
    pub reporting_manager: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewProjectManager {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectManagerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub birthday: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewLeave {
    #[serde(default)]
    pub employee_username: String,
    #[serde(default)]
    pub number_of_days: i64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub approvable: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewHoliday {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}
