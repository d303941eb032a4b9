//! Persistent records backing the HR directory.
//!
//! `users` is the authentication principal. Each principal owns exactly one
//! row in `employees`, `project_managers` or `hrs`, matching its role tag.

pub mod employees;
pub mod holidays;
pub mod hrs;
pub mod leaves;
pub mod project_managers;
pub mod sessions;
pub mod users;
