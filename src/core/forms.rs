//! Schema-driven form validation shared by every entity editor.
//!
//! One [`EntitySchema`] per table replaces the per-equipment add/edit form
//! variants: the field list says what is required and how each value is
//! checked before anything is sent to the backend.

use crate::core::EquipmentKind;
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::{parse_date, validate_email};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Email,
    Number,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub table: &'static str,
    pub fields: Vec<FieldSpec>,
}

const RESULTS: &[&str] = &["pass", "fail"];
const KINDS: &[&str] = &["compressor", "rivet_tool", "spot_welder", "loler", "service"];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl EntitySchema {
    pub fn company() -> Self {
        Self {
            entity: "company",
            table: "companies",
            fields: vec![
                FieldSpec::required("name", FieldKind::Text),
                FieldSpec::optional("address", FieldKind::Text),
                FieldSpec::optional("contact_name", FieldKind::Text),
                FieldSpec::optional("contact_email", FieldKind::Email),
                FieldSpec::optional("contact_phone", FieldKind::Text),
            ],
        }
    }

    pub fn equipment() -> Self {
        Self {
            entity: "equipment",
            table: "equipment",
            fields: vec![
                FieldSpec::required("company_id", FieldKind::Text),
                FieldSpec::required("kind", FieldKind::Choice(KINDS)),
                FieldSpec::required("name", FieldKind::Text),
                FieldSpec::required("serial_number", FieldKind::Text),
                FieldSpec::optional("manufacturer", FieldKind::Text),
                FieldSpec::optional("model", FieldKind::Text),
                FieldSpec::optional("location", FieldKind::Text),
            ],
        }
    }

    pub fn service_record(kind: EquipmentKind) -> Self {
        let mut fields = vec![
            FieldSpec::required("equipment_serial", FieldKind::Text),
            FieldSpec::required("test_date", FieldKind::Date),
            FieldSpec::optional("company_id", FieldKind::Text),
            FieldSpec::optional("equipment_name", FieldKind::Text),
            FieldSpec::optional("engineer_name", FieldKind::Text),
            FieldSpec::optional("result", FieldKind::Choice(RESULTS)),
            FieldSpec::optional("notes", FieldKind::Text),
        ];

        match kind {
            EquipmentKind::Loler => {
                fields.push(FieldSpec::required("safe_working_load", FieldKind::Number));
            }
            EquipmentKind::Compressor => {
                fields.push(FieldSpec::required("working_pressure", FieldKind::Number));
            }
            _ => {}
        }

        Self {
            entity: "service record",
            table: kind.service_table(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks a full form submission. Every missing required field is
    /// reported at once; type errors are reported one at a time. Choice
    /// values are rewritten to their canonical lowercase option.
    pub fn validate(&self, values: &mut Map<String, Value>) -> Result<()> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && values.get(f.name).map_or(true, is_blank))
            .map(|f| f.name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ComplianceError::MissingFields {
                entity: self.entity.to_string(),
                fields: missing,
            });
        }

        self.validate_present(values)
    }

    /// Checks a partial update: only the fields present are validated, and
    /// a required field may not be cleared.
    pub fn validate_patch(&self, values: &mut Map<String, Value>) -> Result<()> {
        let cleared: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && values.get(f.name).is_some_and(is_blank))
            .map(|f| f.name.to_string())
            .collect();

        if !cleared.is_empty() {
            return Err(ComplianceError::MissingFields {
                entity: self.entity.to_string(),
                fields: cleared,
            });
        }

        self.validate_present(values)
    }

    fn validate_present(&self, values: &mut Map<String, Value>) -> Result<()> {
        for spec in &self.fields {
            match values.get_mut(spec.name) {
                Some(value) if !is_blank(value) => check_value(self.entity, spec, value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn type_error(entity: &str, spec: &FieldSpec, expected: &str, value: &Value) -> ComplianceError {
    ComplianceError::ValidationError {
        message: format!("{} field '{}' must be {}, got {}", entity, spec.name, expected, value),
    }
}

fn check_value(entity: &str, spec: &FieldSpec, value: &mut Value) -> Result<()> {
    match spec.kind {
        FieldKind::Text => match value {
            Value::String(_) | Value::Number(_) => Ok(()),
            _ => Err(type_error(entity, spec, "text", value)),
        },
        FieldKind::Date => match value {
            Value::String(s) => parse_date(s).map(|_| ()),
            _ => Err(type_error(entity, spec, "a date", value)),
        },
        FieldKind::Email => match value {
            Value::String(s) => validate_email(spec.name, s),
            _ => Err(type_error(entity, spec, "an email address", value)),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Ok(()),
            Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(()),
            _ => Err(type_error(entity, spec, "a number", value)),
        },
        FieldKind::Choice(options) => {
            let wanted = value.as_str().map(|s| s.trim().to_ascii_lowercase());
            match wanted.and_then(|w| options.iter().find(|option| **option == w)) {
                Some(option) => {
                    // Stored enums only deserialize from the lowercase spelling.
                    *value = Value::String(option.to_string());
                    Ok(())
                }
                None => Err(type_error(
                    entity,
                    spec,
                    &format!("one of {}", options.join(", ")),
                    value,
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_all_missing_fields_reported_together() {
        let schema = EntitySchema::service_record(EquipmentKind::Loler);
        let err = schema
            .validate(&mut form(json!({ "equipment_serial": "  ", "notes": "x" })))
            .unwrap_err();

        match err {
            ComplianceError::MissingFields { entity, fields } => {
                assert_eq!(entity, "service record");
                assert_eq!(fields, vec!["equipment_serial", "test_date", "safe_working_load"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_valid_service_record() {
        let schema = EntitySchema::service_record(EquipmentKind::Compressor);
        let mut values = form(json!({
            "equipment_serial": "CMP-77",
            "test_date": "2024-05-01",
            "working_pressure": "8.5",
            "result": "Pass"
        }));

        assert!(schema.validate(&mut values).is_ok());
        assert_eq!(values["result"], json!("pass"));
        assert_eq!(schema.table, "compressor_service_records");
    }

    #[test]
    fn test_type_checks() {
        let schema = EntitySchema::service_record(EquipmentKind::Service);

        let mut bad_date = form(json!({ "equipment_serial": "A", "test_date": "31/12/2024" }));
        assert!(matches!(
            schema.validate(&mut bad_date),
            Err(ComplianceError::InvalidDate { .. })
        ));

        let mut bad_result = form(json!({ "equipment_serial": "A", "test_date": "2024-12-31", "result": "maybe" }));
        assert!(matches!(
            schema.validate(&mut bad_result),
            Err(ComplianceError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_company_email_checked_only_when_present() {
        let schema = EntitySchema::company();
        assert!(schema.validate(&mut form(json!({ "name": "Acme Ltd" }))).is_ok());
        assert!(schema
            .validate(&mut form(json!({ "name": "Acme Ltd", "contact_email": "nope" })))
            .is_err());
    }

    #[test]
    fn test_patch_may_omit_but_not_clear_required_fields() {
        let schema = EntitySchema::equipment();
        assert!(schema.validate_patch(&mut form(json!({ "location": "Bay 3" }))).is_ok());

        let err = schema
            .validate_patch(&mut form(json!({ "serial_number": "" })))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::MissingFields { .. }));
    }

    #[test]
    fn test_choice_values_are_lowercased() {
        let mut patch = form(json!({ "kind": " Loler ", "location": "Yard" }));
        EntitySchema::equipment().validate_patch(&mut patch).unwrap();
        assert_eq!(patch["kind"], json!("loler"));
        let kind: EquipmentKind = serde_json::from_value(patch["kind"].clone()).unwrap();
        assert_eq!(kind, EquipmentKind::Loler);

        let mut record = form(json!({ "result": "FAIL" }));
        EntitySchema::service_record(EquipmentKind::Service)
            .validate_patch(&mut record)
            .unwrap();
        assert_eq!(record["result"], json!("fail"));
    }
}
