use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{FieldError, UserError};
use crate::users::dto::{CreateUserRequest, LoginRequest, NewUser, UpdateUserRequest};
use crate::users::repo_types::UserPatch;

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn finish<T>(errors: Vec<FieldError>, value: T) -> Result<T, UserError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(UserError::Validation(errors))
    }
}

pub fn validate_create(req: CreateUserRequest) -> Result<NewUser, UserError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "Name is required",
        });
    }
    if !is_valid_email(&email) {
        errors.push(FieldError {
            field: "email",
            message: "Valid email is required",
        });
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError {
            field: "password",
            message: "Password must be at least 6 characters",
        });
    }

    finish(
        errors,
        NewUser {
            name,
            email,
            password: req.password,
        },
    )
}

/// Absent fields stay absent; present ones must be usable.
pub fn validate_update(req: UpdateUserRequest) -> Result<UserPatch, UserError> {
    let name = req.name.map(|n| n.trim().to_string());
    let email = req.email.map(|e| e.trim().to_string());
    let mut errors = Vec::new();

    if matches!(&name, Some(n) if n.is_empty()) {
        errors.push(FieldError {
            field: "name",
            message: "Name cannot be empty",
        });
    }
    if matches!(&email, Some(e) if !is_valid_email(e)) {
        errors.push(FieldError {
            field: "email",
            message: "Valid email is required",
        });
    }

    finish(errors, UserPatch { name, email })
}

pub fn validate_login(req: LoginRequest) -> Result<(String, String), UserError> {
    let email = req.email.trim().to_string();
    let mut errors = Vec::new();

    if !is_valid_email(&email) {
        errors.push(FieldError {
            field: "email",
            message: "Valid email is required",
        });
    }
    if req.password.is_empty() {
        errors.push(FieldError {
            field: "password",
            message: "Password is required",
        });
    }

    finish(errors, (email, req.password))
}

pub fn parse_user_id(raw: &str) -> Result<i64, UserError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(UserError::InvalidArgument(
            "User ID must be a positive integer".into(),
        )),
    }
}
