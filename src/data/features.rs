//! Feature schema
//!
//! The model consumes positional arrays, so the column order recorded here is
//! the contract between training and serving.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{HousingError, Result};

/// Canonical feature order used at training time
pub const FEATURE_COLUMNS: [&str; 10] = [
    "bedrooms",
    "bathrooms",
    "sqft_living",
    "sqft_above",
    "grade",
    "floors",
    "view",
    "sqft_lot",
    "waterfront",
    "zipcode",
];

/// Logical column type, named as the tracking service names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: FeatureType,
}

/// Ordered list of feature columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::from_names(FEATURE_COLUMNS.iter().copied())
    }
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self { columns }
    }

    /// Schema with every column typed as double
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|name| FeatureColumn {
                    name: name.into(),
                    dtype: FeatureType::Double,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// For each schema column, the index it occupies in `names`.
    ///
    /// `names` must be a permutation of the schema: no unknown, missing or
    /// repeated names.
    pub fn reorder_indices(&self, names: &[String]) -> Result<Vec<usize>> {
        if names.len() != self.columns.len() {
            return Err(HousingError::ShapeError {
                expected: format!("{} feature names", self.columns.len()),
                actual: format!("{} feature names", names.len()),
            });
        }

        let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if self.position(name).is_none() {
                return Err(HousingError::FeatureNotFound(name.clone()));
            }
            if lookup.insert(name.as_str(), idx).is_some() {
                return Err(HousingError::InvalidParameter {
                    name: "names".to_string(),
                    value: name.clone(),
                    reason: "feature name repeated".to_string(),
                });
            }
        }

        self.columns
            .iter()
            .map(|c| {
                lookup
                    .get(c.name.as_str())
                    .copied()
                    .ok_or_else(|| HousingError::FeatureNotFound(c.name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_order() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.len(), 10);
        assert_eq!(schema.position("bedrooms"), Some(0));
        assert_eq!(schema.position("zipcode"), Some(9));
    }

    #[test]
    fn test_reorder_identity() {
        let schema = FeatureSchema::default();
        let idx = schema.reorder_indices(&schema.names()).unwrap();
        assert_eq!(idx, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_reorder_permutation() {
        let schema = FeatureSchema::from_names(["a", "b", "c"]);
        let names = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(schema.reorder_indices(&names).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_reorder_rejects_unknown_and_duplicates() {
        let schema = FeatureSchema::from_names(["a", "b"]);
        let unknown = vec!["a".to_string(), "z".to_string()];
        assert!(matches!(
            schema.reorder_indices(&unknown),
            Err(HousingError::FeatureNotFound(_))
        ));

        let dup = vec!["a".to_string(), "a".to_string()];
        assert!(schema.reorder_indices(&dup).is_err());

        let short = vec!["a".to_string()];
        assert!(matches!(
            schema.reorder_indices(&short),
            Err(HousingError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_schema_serde_uses_type_key() {
        let schema = FeatureSchema::from_names(["bedrooms"]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["columns"][0]["type"], "double");
    }
}
