// SPDX-License-Identifier: MIT

//! Schema check for generated record lists

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Schema applied to generated test cases
pub static TEST_CASE_SCHEMA: Lazy<RecordSchema> = Lazy::new(RecordSchema::test_cases);

/// Outcome of validating an artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationResult {
    #[default]
    Pending,
    Pass,
    Fail,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationResult::Pending => "pending",
            ValidationResult::Pass => "pass",
            ValidationResult::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Shape every generated record list has to satisfy
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub min_records: usize,
    pub required_fields: Vec<String>,
    pub list_field: String,
    pub min_list_len: usize,
}

impl RecordSchema {
    /// Test-case schema: at least 3 records, 5 required fields, `steps` with 2+ items
    pub fn test_cases() -> Self {
        Self {
            min_records: 3,
            required_fields: ["id", "title", "steps", "expected", "priority"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            list_field: "steps".to_string(),
            min_list_len: 2,
        }
    }

    /// First violation, if any
    pub fn check(&self, records: &[Value]) -> Result<(), String> {
        if records.len() < self.min_records {
            return Err(format!(
                "Less than {} records (got {})",
                self.min_records,
                records.len()
            ));
        }

        for (i, record) in records.iter().enumerate() {
            let missing: Vec<&str> = self
                .required_fields
                .iter()
                .filter(|f| record.get(f.as_str()).map_or(true, is_blank))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(format!("Record {} missing fields {:?}", i + 1, missing));
            }

            match record.get(&self.list_field).and_then(Value::as_array) {
                Some(items) if items.len() >= self.min_list_len => {}
                _ => {
                    return Err(format!(
                        "Record {}: '{}' must be a list with {}+ items",
                        i + 1,
                        self.list_field,
                        self.min_list_len
                    ))
                }
            }
        }
        Ok(())
    }

    /// Pass or Fail, logging the reason for a failure
    pub fn validate(&self, records: &[Value]) -> ValidationResult {
        match self.check(records) {
            Ok(()) => {
                log::info!("Validation PASSED ({} records)", records.len());
                ValidationResult::Pass
            }
            Err(reason) => {
                log::warn!("Validation FAILED: {}", reason);
                ValidationResult::Fail
            }
        }
    }
}

/// Falsy values count as missing: null, false, zero, blank text and empty containers
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}
