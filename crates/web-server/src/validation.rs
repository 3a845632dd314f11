use crate::error::AppError;
use core_types::{NewCareer, NewStudent, NewSubject, NewTeacher, StudentChanges};

/// Request payloads that must be checked before they reach the database.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), AppError> {
    let plausible = value
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !plausible || value.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!("'{}' is not a valid email address", value)));
    }
    Ok(())
}

pub fn require_id(field: &str, value: i32) -> Result<(), AppError> {
    if value <= 0 {
        return Err(AppError::Validation(format!("{} must be a positive integer", field)));
    }
    Ok(())
}

fn require_optional_id(field: &str, value: Option<i32>) -> Result<(), AppError> {
    value.map_or(Ok(()), |id| require_id(field, id))
}

impl Validate for NewStudent {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        require_email(&self.email)?;
        require_optional_id("career_id", self.career_id)
    }
}

impl Validate for StudentChanges {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        require_optional_id("career_id", self.career_id)
    }
}

impl Validate for NewTeacher {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        require_email(&self.email)
    }
}

impl Validate for NewCareer {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)
    }
}

impl Validate for NewSubject {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        if self.capacity < 0 {
            return Err(AppError::Validation("capacity must not be negative".to_string()));
        }
        require_optional_id("career_id", self.career_id)?;
        require_optional_id("teacher_id", self.teacher_id)
    }
}
