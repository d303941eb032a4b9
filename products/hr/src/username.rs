//! Derived usernames. The username is the only externally visible key of an
//! identity and never changes after creation.

use chrono::{DateTime, Utc};

/// `first_branch`, lowercased, spaces in the branch replaced by underscores.
/// Two HRs sharing a first name and branch collide by construction.
pub fn for_hr(first_name: &str, branch: &str) -> String {
    format!(
        "{}_{}",
        first_name.trim().to_lowercase(),
        branch.trim().to_lowercase().replace(' ', "_")
    )
}

/// `first_yymmddHHMMSS` for employees and project managers.
pub fn with_timestamp(first_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        first_name.trim().to_lowercase(),
        at.format("%y%m%d%H%M%S")
    )
}
