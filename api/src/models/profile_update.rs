use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    error::AppError,
    models::user::{Gender, Role},
};

/// One accepted column change from a `PUT /api/users/profile` body.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileChange {
    FirstName(String),
    LastName(String),
    Phone(Option<String>),
    Specialty(Option<String>),
    Country(Option<String>),
    LicenseNumber(Option<String>),
    YearsOfExperience(Option<i64>),
    About(Option<String>),
    DateOfBirth(Option<NaiveDate>),
    Gender(Option<Gender>),
    EmergencyContact(Option<String>),
}

impl ProfileChange {
    pub fn column(&self) -> &'static str {
        match self {
            ProfileChange::FirstName(_) => "first_name",
            ProfileChange::LastName(_) => "last_name",
            ProfileChange::Phone(_) => "phone",
            ProfileChange::Specialty(_) => "specialty",
            ProfileChange::Country(_) => "country",
            ProfileChange::LicenseNumber(_) => "license_number",
            ProfileChange::YearsOfExperience(_) => "years_of_experience",
            ProfileChange::About(_) => "about",
            ProfileChange::DateOfBirth(_) => "date_of_birth",
            ProfileChange::Gender(_) => "gender",
            ProfileChange::EmergencyContact(_) => "emergency_contact",
        }
    }

    /// Parses one body entry. Returns `Ok(None)` when `key` is not on the
    /// allow-list for `role`; such keys are dropped without error.
    pub fn parse(role: Role, key: &str, value: &Value) -> Result<Option<Self>, AppError> {
        let change = match (role, key) {
            (_, "first_name") => ProfileChange::FirstName(required_text(key, value)?),
            (_, "last_name") => ProfileChange::LastName(required_text(key, value)?),
            (_, "phone") => ProfileChange::Phone(optional_text(key, value)?),

            (Role::Doctor, "specialty") => ProfileChange::Specialty(optional_text(key, value)?),
            (Role::Doctor, "country") => ProfileChange::Country(optional_text(key, value)?),
            (Role::Doctor, "license_number") => {
                ProfileChange::LicenseNumber(optional_text(key, value)?)
            }
            (Role::Doctor, "years_of_experience") => {
                ProfileChange::YearsOfExperience(optional_years(key, value)?)
            }
            (Role::Doctor, "about") => ProfileChange::About(optional_text(key, value)?),

            (Role::Patient, "date_of_birth") => ProfileChange::DateOfBirth(
                optional_text(key, value)?
                    .map(|s| parse_date(key, &s))
                    .transpose()?,
            ),
            (Role::Patient, "gender") => ProfileChange::Gender(
                optional_text(key, value)?
                    .map(|s| s.parse::<Gender>())
                    .transpose()?,
            ),
            (Role::Patient, "emergency_contact") => {
                ProfileChange::EmergencyContact(optional_text(key, value)?)
            }

            _ => return Ok(None),
        };
        Ok(Some(change))
    }

    /// Collects the allowed changes from a JSON object body. Errors when the
    /// body is not an object or when nothing allowed is left.
    pub fn collect(role: Role, body: &Value) -> Result<Vec<Self>, AppError> {
        let fields = body
            .as_object()
            .ok_or_else(|| AppError::bad_request("Request body must be a JSON object"))?;

        let changes = fields
            .iter()
            .filter_map(|(key, value)| Self::parse(role, key, value).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        if changes.is_empty() {
            return Err(AppError::bad_request("No valid fields to update"));
        }
        Ok(changes)
    }
}

pub fn parse_date(key: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("{key} must be a date in YYYY-MM-DD format")))
}

pub fn parse_years(key: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|years| *years >= 0)
        .ok_or_else(|| AppError::bad_request(format!("{key} must be a non-negative integer")))
}

fn optional_text(key: &str, value: &Value) -> Result<Option<String>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => Err(AppError::bad_request(format!("{key} must be a string"))),
    }
}

fn required_text(key: &str, value: &Value) -> Result<String, AppError> {
    optional_text(key, value)?.ok_or_else(|| AppError::bad_request(format!("{key} cannot be empty")))
}

fn optional_years(key: &str, value: &Value) -> Result<Option<i64>, AppError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|years| *years >= 0)
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("{key} must be a non-negative integer"))),
        other => optional_text(key, other)?
            .map(|s| parse_years(key, &s))
            .transpose(),
    }
}
