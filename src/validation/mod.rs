//! Boundary validation for inbound payloads. Each rule mirrors a field
//! constraint from the product requirements; failures collect into a
//! field -> message map and surface as a 400 before any database access.

use std::collections::HashMap;

use crate::error::ApiError;

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self { errors: HashMap::new() }
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        // First error per field wins, matching one-message-per-field output
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// Empty means the payload passed
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Validation failed", Some(self.errors)))
        }
    }
}

impl Default for FieldErrors {
    fn default() -> Self {
        Self::new()
    }
}

fn check_user_name(errors: &mut FieldErrors, name: &str) {
    let len = name.chars().count();
    if !(20..=60).contains(&len) {
        errors.add("name", "Name must be between 20 and 60 characters");
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !email_is_well_formed(email) {
        errors.add("email", "Please provide a valid email");
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    let len = password.chars().count();
    if !(8..=16).contains(&len) {
        errors.add(field, "Password must be between 8 and 16 characters");
        return;
    }
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !has_uppercase || !has_special {
        errors.add(field, "Password must contain at least one uppercase letter and one special character");
    }
}

fn check_address(errors: &mut FieldErrors, address: &str) {
    if address.chars().count() > 400 {
        errors.add("address", "Address must not exceed 400 characters");
    }
}

fn email_is_well_formed(email: &str) -> bool {
    if email.is_empty() || email.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Registration and admin user creation share the same field constraints
pub fn validate_user_payload(name: &str, email: &str, password: &str, address: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    check_user_name(&mut errors, name);
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password);
    check_address(&mut errors, address);
    errors.into_result()
}

/// User update carries no password
pub fn validate_user_update(name: &str, email: &str, address: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    check_user_name(&mut errors, name);
    check_email(&mut errors, email);
    check_address(&mut errors, address);
    errors.into_result()
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

pub fn validate_password_change(current_password: &str, new_password: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if current_password.is_empty() {
        errors.add("currentPassword", "Current password is required");
    }
    check_password(&mut errors, "newPassword", new_password);
    errors.into_result()
}

pub fn validate_store_payload(name: &str, email: &str, address: &str) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if name.is_empty() || name.chars().count() > 100 {
        errors.add("name", "Store name is required and must not exceed 100 characters");
    }
    check_email(&mut errors, email);
    if address.is_empty() {
        errors.add("address", "Address is required and must not exceed 400 characters");
    }
    check_address(&mut errors, address);
    errors.into_result()
}

pub fn validate_rating_value(rating: i32) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if !(1..=5).contains(&rating) {
        errors.add("rating", "Rating must be an integer between 1 and 5");
    }
    errors.into_result()
}
