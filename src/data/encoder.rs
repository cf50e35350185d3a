//! Categorical Encoder
//!
//! Stable integer codes for locations, drivers and constructors. Codes follow
//! the lexicographic order of the observed vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::PipelineError;
use crate::models::RaceRecord;

/// Code for a value never seen while encoding
pub const UNSEEN_CODE: i64 = -1;

/// Value -> code mapping for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    codes: BTreeMap<String, i64>,
}

impl CategoryEncoding {
    /// Assign codes 0..n to the distinct values in sorted order
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vocabulary: BTreeSet<&str> = values.into_iter().collect();
        let codes = vocabulary
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code as i64))
            .collect();
        Self { codes }
    }

    /// Rebuild an encoding from (value, code) pairs recorded in a table.
    ///
    /// Every value must carry a single non-negative code and no two values
    /// may share one.
    pub fn from_pairs<'a, I>(category: &str, pairs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut codes: BTreeMap<String, i64> = BTreeMap::new();
        for (value, code) in pairs {
            match codes.get(value) {
                Some(&existing) if existing != code => {
                    return Err(conflict(
                        category,
                        format!("{:?} has codes {} and {}", value, existing, code),
                    ));
                }
                Some(_) => {}
                None => {
                    codes.insert(value.to_string(), code);
                }
            }
        }
        let encoding = Self { codes };
        encoding.validate(category)?;
        Ok(encoding)
    }

    /// Code for a value, or `UNSEEN_CODE`
    pub fn encode(&self, value: &str) -> i64 {
        self.codes.get(value).copied().unwrap_or(UNSEEN_CODE)
    }

    pub fn encode_opt(&self, value: Option<&str>) -> i64 {
        value.map_or(UNSEEN_CODE, |v| self.encode(v))
    }

    /// Observed values in sorted order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Check the mapping is injective into non-negative integers
    pub fn validate(&self, category: &str) -> Result<(), PipelineError> {
        let mut seen = HashSet::with_capacity(self.codes.len());
        for (value, &code) in &self.codes {
            if code < 0 {
                return Err(conflict(category, format!("{:?} has negative code {}", value, code)));
            }
            if !seen.insert(code) {
                return Err(conflict(category, format!("code {} is assigned twice", code)));
            }
        }
        Ok(())
    }
}

fn conflict(category: &str, detail: String) -> PipelineError {
    PipelineError::EncodingConflict {
        category: category.to_string(),
        detail,
    }
}

/// Encodings for every categorical feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTable {
    pub location: CategoryEncoding,
    pub driver: CategoryEncoding,
    pub constructor: CategoryEncoding,
}

impl EncodingTable {
    /// Fit all encodings on the full observed vocabulary
    pub fn fit(records: &[RaceRecord]) -> Self {
        Self {
            location: CategoryEncoding::fit(records.iter().filter_map(|r| r.location.as_deref())),
            driver: CategoryEncoding::fit(records.iter().map(|r| r.driver_id.as_str())),
            constructor: CategoryEncoding::fit(records.iter().map(|r| r.constructor_id.as_str())),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.location.validate("location")?;
        self.driver.validate("driver")?;
        self.constructor.validate("constructor")
    }
}
