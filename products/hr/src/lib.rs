//! HR directory: one authentication principal per person, each owning exactly
//! one role profile (employee, project manager or HR), plus leave and holiday
//! records.
//!
//! [`Directory`] performs the create/update/delete/list operations and keeps
//! identity and profile rows in sync inside a single transaction.
//! [`AccessGate`] turns credentials into a [`Session`].

mod directory;
mod error;
mod gate;
pub mod input;
pub mod profile;
pub mod username;
mod validate;

pub use directory::{Clock, Directory};
pub use entity::users::Role;
pub use gate::{AccessGate, DEFAULT_SESSION_TTL_HOURS, LoginOutcome};
pub use input::{
    EmployeePatch, HrPatch, NewEmployee, NewHoliday, NewHr, NewLeave, NewProjectManager,
    ProjectManagerPatch,
};
pub use platform_api::{ApiError, ApiResult};
pub use platform_authz::{Caller, Policy, Session};
pub use profile::{
    EmployeeRecord, HolidayRecord, HrRecord, LeaveRecord, Profile, ProjectManagerRecord,
};
pub use rust_decimal::Decimal;
