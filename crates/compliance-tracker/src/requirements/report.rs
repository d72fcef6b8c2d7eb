use std::io::Write;

use super::domain::Requirement;

pub const REPORT_HEADERS: [&str; 11] = [
    "Compliance List",
    "Department",
    "Entity",
    "Frequency of Compliance",
    "Type of Compliance",
    "Date Submitted",
    "Expiration",
    "Renewal",
    "Person in Charge",
    "Status",
    "Document Reference",
];

pub const REPORT_FILE_NAME: &str = "requirements_report.csv";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the requirements table as a spreadsheet-friendly CSV.
pub fn write_csv<W: Write>(writer: W, requirements: &[Requirement]) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_HEADERS)?;

    for requirement in requirements {
        let person_in_charge = requirement
            .person_in_charge
            .as_ref()
            .map(|person| person.display_value())
            .unwrap_or_default();
        let date_submitted = requirement.date_submitted.to_string();
        let expiration = requirement.expiration.to_string();
        let renewal = requirement.renewal.to_string();
        csv_writer.write_record([
            requirement.compliance_list.as_str(),
            requirement.department.as_str(),
            requirement.entity.as_str(),
            requirement.frequency_of_compliance.as_str(),
            requirement.type_of_compliance.as_str(),
            date_submitted.as_str(),
            expiration.as_str(),
            renewal.as_str(),
            person_in_charge.as_str(),
            requirement.status.as_str(),
            requirement.document_reference.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
