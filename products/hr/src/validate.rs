use platform_api::{ApiError, ApiResult};
use rust_decimal::Decimal;

pub(crate) const NAME_MAX: usize = 50;
pub(crate) const EMAIL_MAX: usize = 254;
pub(crate) const PHONE_MAX: usize = 15;
pub(crate) const DEPARTMENT_MAX: usize = 100;
pub(crate) const HOLIDAY_NAME_MAX: usize = 100;
pub(crate) const USERNAME_MAX: usize = 150;
/// `DECIMAL(10, 2)`: eight digits before the point, two after.
const SALARY_SCALE: u32 = 2;
const SALARY_INTEGER_DIGITS: u32 = 8;

/// Trimmed value of a required field.
pub(crate) fn required(field: &str, value: &str, max: usize) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    validate_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// `None` for absent or blank input.
pub(crate) fn optional(field: &str, value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            validate_length(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub(crate) fn normalize_email(value: &str) -> ApiResult<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(ApiError::validation("email is required"));
    }
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::validation("Invalid email address"));
    }
    validate_length("email", &trimmed, EMAIL_MAX)?;
    Ok(trimmed)
}

/// Partial-update variant of [`normalize_email`]: blank means "unchanged".
pub(crate) fn optional_email(value: Option<&str>) -> ApiResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => normalize_email(raw).map(Some),
    }
}

/// Salary must be non-negative and fit the fixed-point column without
/// rounding. Trailing zeros beyond two places are accepted.
pub(crate) fn checked_salary(value: Option<Decimal>) -> ApiResult<Option<Decimal>> {
    let Some(mut value) = value else {
        return Ok(None);
    };
    if value < Decimal::ZERO {
        return Err(ApiError::validation("salary must not be negative"));
    }
    if value.normalize().scale() > SALARY_SCALE {
        return Err(ApiError::validation("salary must have at most 2 decimal places"));
    }
    if value.trunc() >= Decimal::from(10_i64.pow(SALARY_INTEGER_DIGITS)) {
        return Err(ApiError::validation("salary must have at most 10 digits"));
    }
    value.rescale(SALARY_SCALE);
    Ok(Some(value))
}

/// Two-place rendering, e.g. `52000.00`.
pub(crate) fn render_salary(mut value: Decimal) -> String {
    value.rescale(SALARY_SCALE);
    value.to_string()
}

fn validate_length(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be <= {max} characters"
        )));
    }
    Ok(())
}
