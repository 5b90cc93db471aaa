//! Field-level validation
//!
//! Validators collect every problem into a [`FieldErrors`] map instead of stopping
//! at the first one, so callers can report all failing fields at once.

use crate::error::{Result, TaskdeskError};
use crate::models::{CreateTaskRequest, CreateUserRequest, UpdateTaskRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use taskdesk_common::{
    MAX_NAME_LENGTH, MAX_PRIORITY, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_PRIORITY,
};

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one error
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(value)` when no errors were recorded, otherwise [`TaskdeskError::InvalidInput`]
    ///
    /// # Errors
    /// Returns `InvalidInput` carrying every recorded field error
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(TaskdeskError::InvalidInput(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn check_task_name(errors: &mut FieldErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("Ensure this value has at most {MAX_NAME_LENGTH} characters."),
        );
    }
}

fn check_priority(errors: &mut FieldErrors, priority: i32) {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        errors.add(
            "priority",
            format!("Priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}."),
        );
    }
}

/// Validate a task create request
///
/// # Errors
/// Returns `InvalidInput` listing the failing fields
pub fn validate_create_task(request: &CreateTaskRequest) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_task_name(&mut errors, &request.name);
    if let Some(priority) = request.priority {
        check_priority(&mut errors, priority);
    }
    errors.into_result(())
}

/// Validate a task update request
///
/// # Errors
/// Returns `InvalidInput` listing the failing fields
pub fn validate_update_task(request: &UpdateTaskRequest) -> Result<()> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &request.name {
        check_task_name(&mut errors, name);
    }
    if let Some(priority) = request.priority {
        check_priority(&mut errors, priority);
    }
    errors.into_result(())
}

/// Check a username: 1 to 150 characters of letters, digits and `@.+-_`
pub fn check_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "This field is required.");
        return;
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            format!("Ensure this value has at most {MAX_USERNAME_LENGTH} characters."),
        );
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

/// Check an email address: exactly one `@` with a non-empty local part and a dotted domain
pub fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add(field, "This field is required.");
        return;
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add(field, "Enter a valid email address.");
    }
}

/// Check a new password and its confirmation
///
/// Errors about the password go on `field`, a mismatch goes on `confirmation_field`.
pub fn check_new_password(
    errors: &mut FieldErrors,
    field: &str,
    confirmation_field: &str,
    password: &str,
    confirmation: &str,
) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    if password != confirmation {
        errors.add(confirmation_field, "The two password fields didn't match.");
    }
}

/// Validate a registration form
///
/// Uniqueness of the username is checked by the store, not here.
///
/// # Errors
/// Returns `InvalidInput` listing the failing fields
pub fn validate_registration(request: &CreateUserRequest) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_username(&mut errors, &request.username);
    check_email(&mut errors, "email", &request.email);
    check_new_password(
        &mut errors,
        "password",
        "password_confirmation",
        &request.password,
        &request.password_confirmation,
    );
    errors.into_result(())
}
