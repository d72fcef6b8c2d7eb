use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reference::DocumentReference;
use crate::validation::{
    parse_form_date, validate_date, validate_email, validate_name, validate_required,
    ValidationErrors,
};

/// Store-assigned identifier; the authoritative key for a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(pub String);

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Responsible staff member as stored on the document.
///
/// Older documents were written without address validation, so the stored
/// value is not guaranteed to be a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonInCharge {
    Address(String),
    Other(serde_json::Value),
}

impl PersonInCharge {
    /// The address to notify, if the stored value is a non-empty string.
    pub fn address(&self) -> Option<&str> {
        match self {
            PersonInCharge::Address(address) if !address.trim().is_empty() => {
                Some(address.trim())
            }
            _ => None,
        }
    }

    /// Text rendering for tables and exports.
    pub fn display_value(&self) -> String {
        match self {
            PersonInCharge::Address(address) => address.clone(),
            PersonInCharge::Other(value) => value.to_string(),
        }
    }
}

/// A tracked compliance obligation as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: RequirementId,
    pub compliance_list: String,
    pub department: String,
    pub entity: String,
    pub frequency_of_compliance: String,
    pub type_of_compliance: String,
    pub date_submitted: NaiveDate,
    pub expiration: NaiveDate,
    pub renewal: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_in_charge: Option<PersonInCharge>,
    pub status: String,
    pub document_reference: DocumentReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_file_url: Option<String>,
}

impl Requirement {
    pub fn with_id(id: RequirementId, new: NewRequirement) -> Self {
        Self {
            id,
            compliance_list: new.compliance_list,
            department: new.department,
            entity: new.entity,
            frequency_of_compliance: new.frequency_of_compliance,
            type_of_compliance: new.type_of_compliance,
            date_submitted: new.date_submitted,
            expiration: new.expiration,
            renewal: new.renewal,
            person_in_charge: Some(PersonInCharge::Address(new.person_in_charge)),
            status: new.status,
            document_reference: new.document_reference,
            uploaded_file_url: new.uploaded_file_url,
        }
    }
}

/// Validated requirement ready to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequirement {
    pub compliance_list: String,
    pub department: String,
    pub entity: String,
    pub frequency_of_compliance: String,
    pub type_of_compliance: String,
    pub date_submitted: NaiveDate,
    pub expiration: NaiveDate,
    pub renewal: NaiveDate,
    pub person_in_charge: String,
    pub status: String,
    pub document_reference: DocumentReference,
    pub uploaded_file_url: Option<String>,
}

/// Raw requirement form as submitted by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequirementDraft {
    pub compliance_list: String,
    pub department: String,
    pub entity: String,
    pub frequency_of_compliance: String,
    pub type_of_compliance: String,
    pub date_submitted: String,
    pub expiration: String,
    pub renewal: String,
    pub person_in_charge: String,
    pub status: String,
    pub document_reference: Option<String>,
    pub uploaded_file_url: Option<String>,
}

/// Draft fields after validation, still lacking a resolved document reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub compliance_list: String,
    pub department: String,
    pub entity: String,
    pub frequency_of_compliance: String,
    pub type_of_compliance: String,
    pub date_submitted: NaiveDate,
    pub expiration: NaiveDate,
    pub renewal: NaiveDate,
    pub person_in_charge: String,
    pub status: String,
    pub document_reference: Option<DocumentReference>,
    pub uploaded_file_url: Option<String>,
}

impl ValidatedDraft {
    pub fn into_new(self, document_reference: DocumentReference) -> NewRequirement {
        NewRequirement {
            compliance_list: self.compliance_list,
            department: self.department,
            entity: self.entity,
            frequency_of_compliance: self.frequency_of_compliance,
            type_of_compliance: self.type_of_compliance,
            date_submitted: self.date_submitted,
            expiration: self.expiration,
            renewal: self.renewal,
            person_in_charge: self.person_in_charge,
            status: self.status,
            document_reference,
            uploaded_file_url: self.uploaded_file_url,
        }
    }
}

pub fn validate_person_in_charge(value: &str) -> String {
    if value.trim().is_empty() {
        "Person in charge is required".to_string()
    } else if !validate_email(value.trim()).is_empty() {
        "Person in charge must be an email address".to_string()
    } else {
        String::new()
    }
}

impl RequirementDraft {
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors
            .check(
                "complianceList",
                validate_required(&self.compliance_list, "Compliance list"),
            )
            .check("department", validate_name(self.department.trim(), "Department"))
            .check("entity", validate_required(&self.entity, "Entity"))
            .check(
                "frequencyOfCompliance",
                validate_required(&self.frequency_of_compliance, "Frequency of compliance"),
            )
            .check(
                "typeOfCompliance",
                validate_required(&self.type_of_compliance, "Type of compliance"),
            )
            .check(
                "dateSubmitted",
                validate_date(&self.date_submitted, "Date submitted"),
            )
            .check("expiration", validate_date(&self.expiration, "Expiration"))
            .check("renewal", validate_date(&self.renewal, "Renewal"))
            .check(
                "personInCharge",
                validate_person_in_charge(&self.person_in_charge),
            )
            .check("status", validate_required(&self.status, "Status"));
        errors
    }

    /// Validates every field and, when all pass, returns the typed form.
    pub fn validate(self) -> Result<ValidatedDraft, ValidationErrors> {
        self.errors().into_result()?;

        let (Some(date_submitted), Some(expiration), Some(renewal)) = (
            parse_form_date(&self.date_submitted),
            parse_form_date(&self.expiration),
            parse_form_date(&self.renewal),
        ) else {
            // Unreachable once the date validators have passed.
            let mut errors = ValidationErrors::new();
            errors.check("expiration", "Dates must use YYYY-MM-DD".to_string());
            return Err(errors);
        };

        Ok(ValidatedDraft {
            compliance_list: self.compliance_list.trim().to_string(),
            department: self.department.trim().to_string(),
            entity: self.entity.trim().to_string(),
            frequency_of_compliance: self.frequency_of_compliance.trim().to_string(),
            type_of_compliance: self.type_of_compliance.trim().to_string(),
            date_submitted,
            expiration,
            renewal,
            person_in_charge: self.person_in_charge.trim().to_string(),
            status: self.status.trim().to_string(),
            document_reference: non_blank(self.document_reference).map(DocumentReference),
            uploaded_file_url: non_blank(self.uploaded_file_url),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
