use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::{
    validate_address, validate_confirm_password, validate_contact, validate_email, validate_name,
    validate_password, ValidationErrors,
};

/// Store-assigned identifier of a user document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier issued by the external authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthUid(pub String);

impl fmt::Display for AuthUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Registered user profile. Passwords never reach this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub uid: AuthUid,
}

impl User {
    pub fn with_id(id: UserId, user: NewUser) -> Self {
        Self {
            id,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            email: user.email,
            department: user.department,
            contact: user.contact,
            address: user.address,
            role: user.role,
            uid: user.uid,
        }
    }
}

/// User document awaiting its store id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub uid: AuthUid,
}

/// Raw registration form input.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub department: String,
    pub contact: String,
    pub address: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("department", &self.department)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors
            .check("firstName", validate_name(self.first_name.trim(), "First name"))
            .check("lastName", validate_name(self.last_name.trim(), "Last name"))
            .check("email", validate_email(self.email.trim()))
            .check("password", validate_password(&self.password))
            .check(
                "confirmPassword",
                validate_confirm_password(&self.password, &self.confirm_password),
            )
            .check("department", validate_name(self.department.trim(), "Department"));

        // Optional fields are checked only when the user filled them in.
        if !self.middle_name.trim().is_empty() {
            errors.check(
                "middleName",
                validate_name(self.middle_name.trim(), "Middle name"),
            );
        }
        if !self.contact.trim().is_empty() {
            errors.check("contact", validate_contact(self.contact.trim()));
        }
        if !self.address.trim().is_empty() {
            errors.check("address", validate_address(self.address.trim()));
        }
        errors
    }

    pub fn validate(self) -> Result<ValidatedRegistration, ValidationErrors> {
        self.errors().into_result()?;

        Ok(ValidatedRegistration {
            first_name: self.first_name.trim().to_string(),
            middle_name: non_blank(&self.middle_name),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            department: self.department.trim().to_string(),
            contact: non_blank(&self.contact),
            address: non_blank(&self.address),
        })
    }
}

/// Registration input that passed every field validator.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub contact: Option<String>,
    pub address: Option<String>,
}

impl fmt::Debug for ValidatedRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedRegistration")
            .field("email", &self.email)
            .field("department", &self.department)
            .finish_non_exhaustive()
    }
}

impl ValidatedRegistration {
    /// Drops the password and attaches the provider-issued UID. Public
    /// registration always yields a regular user.
    pub fn into_new_user(self, uid: AuthUid) -> NewUser {
        NewUser {
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            department: self.department,
            contact: self.contact,
            address: self.address,
            role: Role::User,
            uid,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let password = if self.password.is_empty() {
            "Password is required".to_string()
        } else {
            String::new()
        };
        errors
            .check("email", validate_email(self.email.trim()))
            .check("password", password);
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordResetForm {
    pub email: String,
}

impl PasswordResetForm {
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check("email", validate_email(self.email.trim()));
        errors
    }
}

fn non_blank(value: &str) -> Option<String> {
    Some(value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            first_name: "Ana".to_string(),
            last_name: "Santos".to_string(),
            email: "ana.santos@agency.gov.ph".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            department: "Finance".to_string(),
            ..RegistrationForm::default()
        }
    }

    #[test]
    fn optional_fields_are_skipped_when_blank() {
        let validated = form().validate().expect("valid form");
        assert_eq!(validated.middle_name, None);
        assert_eq!(validated.contact, None);
    }

    #[test]
    fn submitted_role_is_ignored_and_user_role_assigned() {
        let input: RegistrationForm = serde_json::from_value(serde_json::json!({
            "firstName": "Ana",
            "lastName": "Santos",
            "email": "ana.santos@agency.gov.ph",
            "password": "secret1",
            "confirmPassword": "secret1",
            "department": "Finance",
            "role": "admin"
        }))
        .expect("form parses");

        let user = input
            .validate()
            .expect("valid form")
            .into_new_user(AuthUid("uid-9".to_string()));
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn supplied_optional_fields_are_validated() {
        let mut input = form();
        input.middle_name = "R".to_string();
        input.contact = "12345".to_string();
        input.address = "Makati".to_string();

        let errors = input.errors();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.get("middleName"),
            Some("Middle name must be at least 2 characters")
        );
        assert!(errors.get("contact").is_some());
        assert_eq!(
            errors.get("address"),
            Some("Address must be at least 10 characters")
        );
    }

    #[test]
    fn mismatched_passwords_are_reported() {
        let mut input = form();
        input.confirm_password = "secret2".to_string();
        let errors = input.validate().expect_err("mismatch rejected");
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn debug_output_omits_passwords() {
        let rendered = format!("{:?}", form());
        assert!(!rendered.contains("secret1"));
        let rendered = format!(
            "{:?}",
            LoginForm {
                email: "ana@agency.ph".to_string(),
                password: "hunter22".to_string(),
            }
        );
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).expect("json"), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").expect("role");
        assert_eq!(role, Role::User);
    }
}
