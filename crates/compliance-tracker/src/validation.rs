//! Field validators shared by the account and requirement forms.
//!
//! Every validator returns an empty string when the input is acceptable and a
//! human-readable message otherwise. Whole-form validators collect the messages
//! into [`ValidationErrors`], keyed by the form's field name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const CONTACT_PATTERN: &str = r"^(09|\+639)\d{9}$";

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_ADDRESS_LEN: usize = 10;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

fn contact_regex() -> &'static Regex {
    static CONTACT: OnceLock<Regex> = OnceLock::new();
    CONTACT.get_or_init(|| Regex::new(CONTACT_PATTERN).expect("contact pattern compiles"))
}

pub fn validate_email(email: &str) -> String {
    if email.is_empty() {
        "Email is required".to_string()
    } else if !email_regex().is_match(email) {
        "Invalid email format".to_string()
    } else {
        String::new()
    }
}

pub fn validate_password(password: &str) -> String {
    if password.is_empty() {
        "Password is required".to_string()
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        format!("Password must be at least {MIN_PASSWORD_LEN} characters")
    } else {
        String::new()
    }
}

pub fn validate_confirm_password(password: &str, confirm_password: &str) -> String {
    if confirm_password.is_empty() {
        "Please confirm your password".to_string()
    } else if password != confirm_password {
        "Passwords do not match".to_string()
    } else {
        String::new()
    }
}

/// Shared rule for first/middle/last name and department fields.
pub fn validate_name(value: &str, label: &str) -> String {
    if value.is_empty() {
        format!("{label} is required")
    } else if value.chars().count() < MIN_NAME_LEN {
        format!("{label} must be at least {MIN_NAME_LEN} characters")
    } else {
        String::new()
    }
}

/// Philippine mobile numbers: `09XXXXXXXXX` or `+639XXXXXXXXX`.
pub fn validate_contact(contact: &str) -> String {
    if contact.is_empty() {
        "Contact number is required".to_string()
    } else if !contact_regex().is_match(contact) {
        "Invalid contact number (use 09XXXXXXXXX or +639XXXXXXXXX)".to_string()
    } else {
        String::new()
    }
}

pub fn validate_address(address: &str) -> String {
    if address.is_empty() {
        "Address is required".to_string()
    } else if address.chars().count() < MIN_ADDRESS_LEN {
        format!("Address must be at least {MIN_ADDRESS_LEN} characters")
    } else {
        String::new()
    }
}

pub fn validate_required(value: &str, label: &str) -> String {
    if value.trim().is_empty() {
        format!("{label} is required")
    } else {
        String::new()
    }
}

/// Form dates are submitted as `YYYY-MM-DD`.
pub fn validate_date(value: &str, label: &str) -> String {
    if value.trim().is_empty() {
        format!("{label} is required")
    } else if parse_form_date(value).is_none() {
        format!("{label} must be a date in YYYY-MM-DD format")
    } else {
        String::new()
    }
}

pub fn parse_form_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Field name to message mapping produced by a rejected form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the validator outcome for `field`; empty messages are ignored.
    pub fn check(&mut self, field: &'static str, message: String) -> &mut Self {
        if !message.is_empty() {
            self.fields.entry(field).or_insert(message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }

    /// Converts the accumulated messages into a result, rejecting the form when
    /// any validator failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.fields.values().map(String::as_str).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}
