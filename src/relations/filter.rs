//! Equality filters over the categorical columns of `relationships`.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::db::table_columns;
use crate::error::{GalynError, Result};

/// Filterable columns when config.toml does not list any
pub const DEFAULT_FILTER_FIELDS: &[&str] =
    &["subject_gender", "subject_race", "object_gender", "object_race"];

/// The configured set of filterable columns (`[relations] filter_fields`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFields(Vec<String>);

impl FilterFields {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Check every configured field against the `relationships` table, so a
    /// typo in config.toml fails at startup instead of on the first request.
    pub fn verify_columns(&self, conn: &Connection) -> Result<()> {
        let columns = table_columns(conn, "relationships")?;
        let missing: Vec<&str> = self.iter().filter(|f| !columns.iter().any(|c| c == f)).collect();
        if !missing.is_empty() {
            return Err(GalynError::Config(format!(
                "relations.filter_fields names unknown relationship columns: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for FilterFields {
    fn default() -> Self {
        Self(DEFAULT_FILTER_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

/// A conjunction of `column = value` predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationFilter {
    conditions: Vec<(String, String)>,
}

impl RelationFilter {
    /// No filtering at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a filter from request parameters. Only configured fields are
    /// looked at, and empty values are ignored.
    pub fn from_params(fields: &FilterFields, params: &HashMap<String, String>) -> Self {
        let conditions = fields
            .iter()
            .filter_map(|field| {
                params
                    .get(field)
                    .filter(|v| !v.is_empty())
                    .map(|v| (field.to_string(), v.clone()))
            })
            .collect();
        Self { conditions }
    }

    /// Add a predicate if `field` is one of the configured fields.
    pub fn with(mut self, fields: &FilterFields, field: &str, value: &str) -> Result<Self> {
        if !fields.iter().any(|f| f == field) {
            return Err(GalynError::InvalidInput(format!(
                "Unknown filter field: {}. Recognized fields are: {}",
                field,
                fields.iter().collect::<Vec<_>>().join(", ")
            )));
        }
        if !value.is_empty() {
            self.conditions.push((field.to_string(), value.to_string()));
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    /// SQL `WHERE` clause (empty when there are no predicates) and its
    /// positional parameters. Column names come from [`FilterFields`], which
    /// config validation restricts to plain identifiers.
    pub fn where_clause(&self) -> (String, Vec<String>) {
        if self.conditions.is_empty() {
            return (String::new(), Vec::new());
        }
        let clause = self
            .conditions
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("\"{}\" = ?{}", field, i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let values = self.conditions.iter().map(|(_, v)| v.clone()).collect();
        (format!(" WHERE {}", clause), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_db;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_from_params_ignores_unknown_and_empty() {
        let fields = FilterFields::default();
        let filter = RelationFilter::from_params(
            &fields,
            &params(&[("subject_gender", "M"), ("object_race", ""), ("story", "12")]),
        );
        assert_eq!(
            filter.conditions(),
            &[("subject_gender".to_string(), "M".to_string())]
        );
    }

    #[test]
    fn test_where_clause() {
        let fields = FilterFields::default();
        let filter = RelationFilter::from_params(
            &fields,
            &params(&[("object_race", "black"), ("subject_gender", "M")]),
        );
        let (clause, values) = filter.where_clause();
        // Configured field order, not request order
        assert_eq!(clause, " WHERE \"subject_gender\" = ?1 AND \"object_race\" = ?2");
        assert_eq!(values, vec!["M".to_string(), "black".to_string()]);
    }

    #[test]
    fn test_empty_filter_has_no_clause() {
        let (clause, values) = RelationFilter::none().where_clause();
        assert!(clause.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_with_rejects_unconfigured_field() {
        let fields = FilterFields::new(vec!["subject_race".to_string()]);
        let err = RelationFilter::none().with(&fields, "subject_gender", "F").unwrap_err();
        assert!(matches!(err, GalynError::InvalidInput(_)));
        let ok = RelationFilter::none().with(&fields, "subject_race", "white").unwrap();
        assert!(!ok.is_empty());
    }

    #[tokio::test]
    async fn test_verify_columns() {
        let (db, _temp) = migrated_db().await;
        db.with_connection(|conn| {
            FilterFields::default().verify_columns(conn)?;
            let bad = FilterFields::new(vec!["subject_gender".to_string(), "shoe_size".to_string()]);
            let err = bad.verify_columns(conn).unwrap_err();
            assert!(err.to_string().contains("shoe_size"));
            Ok::<(), GalynError>(())
        })
        .await
        .unwrap();
    }
}
