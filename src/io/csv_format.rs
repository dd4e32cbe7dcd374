//! CSV format handling for roster input and import report output
//!
//! This module centralizes all CSV format concerns, providing:
//! - RosterRecord structure for deserialization
//! - Conversion from roster records to provisioning requests
//! - Import report serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::core::batch_import::ImportOutcome;
use crate::types::NewStudent;
use serde::Deserialize;
use std::io::Write;

/// Roster CSV record
///
/// Matches the input CSV format with columns: student_id, cn, full_name,
/// university_id. `cn` and `university_id` may be left empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RosterRecord {
    pub student_id: String,
    #[serde(default)]
    pub cn: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub university_id: Option<String>,
}

/// Convert a RosterRecord to a provisioning request
///
/// Format validation (digit counts, blank names) is left to provisioning so
/// that roster rows and API requests are held to exactly the same rules.
/// Blank optional columns are dropped here.
pub fn convert_roster_record(record: RosterRecord) -> NewStudent {
    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    NewStudent {
        student_id: record.student_id,
        cn: non_blank(record.cn),
        full_name: record.full_name,
        university_id: non_blank(record.university_id),
        profile_image: None,
    }
}

/// Write the outcome of a roster import in CSV format
///
/// Writes one row per roster row with columns:
/// student_id, card_id, card_number, balance, status, error.
/// Rows are ordered by their position in the roster. `status` is `created`
/// for provisioned students and the error code otherwise.
///
/// # Arguments
///
/// * `outcomes` - Per-row import outcomes
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_import_report_csv(
    outcomes: &[ImportOutcome],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "student_id",
            "card_id",
            "card_number",
            "balance",
            "status",
            "error",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&ImportOutcome> = outcomes.iter().collect();
    sorted.sort_by_key(|outcome| outcome.row);

    for outcome in sorted {
        let record = match &outcome.result {
            Ok(created) => [
                created.student.student_id.to_string(),
                created.card.card_id.to_string(),
                created.card.card_number.to_string(),
                created.card.balance.to_string(),
                "created".to_string(),
                String::new(),
            ],
            Err(e) => [
                outcome.student_id.clone(),
                String::new(),
                String::new(),
                String::new(),
                e.code().to_string(),
                e.to_string(),
            ],
        };
        writer
            .write_record(&record)
            .map_err(|e| format!("Failed to write import record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProvisionedStudent;
    use crate::types::{money, Card, CardNumber, LedgerError, Student, StudentId};
    use chrono::Utc;
    use rstest::rstest;

    fn provisioned(student_id: &str, card_id: u64, number: &str) -> ProvisionedStudent {
        let now = Utc::now();
        let student_id = StudentId::parse(student_id).unwrap();
        ProvisionedStudent {
            student: Student {
                student_id: student_id.clone(),
                cn: None,
                full_name: "Someone".to_string(),
                profile_image: None,
                university_id: None,
                card_id: Some(card_id),
                qr_payload: None,
                created_at: now,
                updated_at: now,
                created_by: 1,
                updated_by: 1,
            },
            card: Card {
                card_id,
                student_id,
                card_number: CardNumber::parse(number).unwrap(),
                balance: money::zero(),
                used: false,
                created_at: now,
                updated_at: now,
                created_by: 1,
                updated_by: 1,
            },
        }
    }

    #[rstest]
    #[case::all_columns(Some("12345678"), Some("U-1"), Some("12345678"), Some("U-1"))]
    #[case::blank_optionals(Some("  "), Some(""), None, None)]
    #[case::missing_optionals(None, None, None, None)]
    fn test_convert_roster_record(
        #[case] cn: Option<&str>,
        #[case] university_id: Option<&str>,
        #[case] expected_cn: Option<&str>,
        #[case] expected_university_id: Option<&str>,
    ) {
        let record = RosterRecord {
            student_id: "10001".to_string(),
            cn: cn.map(str::to_string),
            full_name: "John Smith".to_string(),
            university_id: university_id.map(str::to_string),
        };

        let request = convert_roster_record(record);

        assert_eq!(request.student_id, "10001");
        assert_eq!(request.full_name, "John Smith");
        assert_eq!(request.cn.as_deref(), expected_cn);
        assert_eq!(request.university_id.as_deref(), expected_university_id);
    }

    #[test]
    fn test_write_import_report_orders_rows_and_reports_errors() {
        let outcomes = vec![
            ImportOutcome {
                row: 2,
                student_id: "10001".to_string(),
                result: Err(LedgerError::duplicate("student_id", "10001")),
            },
            ImportOutcome {
                row: 1,
                student_id: "10001".to_string(),
                result: Ok(provisioned("10001", 1, "ABCD12345")),
            },
        ];

        let mut output = Vec::new();
        write_import_report_csv(&outcomes, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "student_id,card_id,card_number,balance,status,error\n\
             10001,1,ABCD12345,0.00,created,\n\
             10001,,,,duplicate_entry,Duplicate student_id: '10001' is already in use\n"
        );
    }

    #[test]
    fn test_write_import_report_empty() {
        let mut output = Vec::new();
        write_import_report_csv(&[], &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "student_id,card_id,card_number,balance,status,error\n"
        );
    }
}
