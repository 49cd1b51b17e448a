//! Feature encoding: answers to the exact vector layout the classifier was
//! trained on.
//!
//! The layout is the ordered column list saved next to the model. Numeric
//! answers land under their own column name, categorical answers switch on a
//! single `<Field>_<code>` indicator, and every column the answers do not
//! mention is zero.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::records::{indicator, one_hot_levels, RawAnswers, NUMERIC_COLUMNS};

/// How to treat indicator columns the schema does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Drop unknown indicators silently.
    #[default]
    Lenient,
    /// Reject schemas that cannot represent every answer.
    Strict,
}

/// Ordered column names agreed at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ExpectedColumns {
    names: Vec<String>,
}

impl ExpectedColumns {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(HeartError::schema("expected column list is empty"));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(HeartError::schema(format!("duplicate column {:?}", name)));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Checks the schema can represent every possible answer.
    ///
    /// All numeric columns must be present. A one-hot field may leave out at
    /// most one of its levels, the reference level dropped by drop-first
    /// encoding.
    pub fn check_coverage(&self) -> Result<()> {
        let missing_numeric: Vec<&str> = NUMERIC_COLUMNS
            .iter()
            .copied()
            .filter(|name| !self.contains(name))
            .collect();
        if !missing_numeric.is_empty() {
            return Err(HeartError::schema(format!(
                "numeric columns missing from schema: {}",
                missing_numeric.join(", ")
            )));
        }

        for (field, codes) in one_hot_levels() {
            let missing: Vec<&str> = codes
                .iter()
                .copied()
                .filter(|code| !self.contains(&indicator(field, code)))
                .collect();
            if missing.len() > 1 {
                return Err(HeartError::schema(format!(
                    "{} has no columns for levels {}",
                    field,
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for ExpectedColumns {
    type Error = HeartError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        ExpectedColumns::new(names)
    }
}

impl From<ExpectedColumns> for Vec<String> {
    fn from(columns: ExpectedColumns) -> Vec<String> {
        columns.names
    }
}

/// Encodes `answers` into a vector aligned with `columns`.
pub fn encode(answers: &RawAnswers, columns: &ExpectedColumns) -> Vec<f64> {
    let mut sparse: HashMap<String, f64> = HashMap::new();

    for (name, value) in answers.numeric_features() {
        sparse.insert(name.to_string(), value);
    }
    for name in answers.indicator_columns() {
        sparse.insert(name, 1.0);
    }

    for name in sparse.keys() {
        if !columns.contains(name) {
            debug!("column {} is not part of the model schema, dropped", name);
        }
    }

    columns
        .names()
        .iter()
        .map(|name| sparse.get(name).copied().unwrap_or(0.0))
        .collect()
}
