use crate::core::{InspectionResult, ServiceRecord};
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::parse_date;
use serde::Deserialize;
use serde_json::Map;
use std::io::Read;
use std::path::Path;

/// Row layout of a service-record table exported as CSV.
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: i64,
    equipment_serial: String,
    test_date: String,
    #[serde(default)]
    retest_date: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    equipment_name: Option<String>,
    #[serde(default)]
    certificate_number: Option<String>,
    #[serde(default)]
    engineer_name: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CsvRow {
    fn into_record(self, line: usize) -> Result<ServiceRecord> {
        let test_date = parse_date(&self.test_date)?;
        let retest_date = match non_empty(self.retest_date) {
            Some(raw) => parse_date(&raw)?,
            None => crate::core::retest::retest_date_for(test_date)?,
        };
        let result = match non_empty(self.result) {
            Some(raw) => Some(raw.parse::<InspectionResult>().map_err(|reason| {
                ComplianceError::ValidationError {
                    message: format!("line {}: {}", line, reason),
                }
            })?),
            None => None,
        };

        Ok(ServiceRecord {
            id: self.id,
            company_id: non_empty(self.company_id),
            equipment_serial: self.equipment_serial.trim().to_string(),
            equipment_name: non_empty(self.equipment_name),
            certificate_number: non_empty(self.certificate_number),
            test_date,
            retest_date,
            engineer_name: non_empty(self.engineer_name),
            result,
            status: None,
            notes: non_empty(self.notes),
            created_at: None,
            details: Map::new(),
        })
    }
}

/// Reads service records from CSV with a header row. A missing
/// `retest_date` is scheduled from `test_date`.
pub fn load_records_csv<R: Read>(reader: R) -> Result<Vec<ServiceRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        records.push(row?.into_record(index + 2)?);
    }
    tracing::debug!("loaded {} service records from CSV", records.len());
    Ok(records)
}

pub fn load_records_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<ServiceRecord>> {
    let file = std::fs::File::open(path)?;
    load_records_csv(file)
}
