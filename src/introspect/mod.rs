//! Database introspection
//!
//! This module provides functionality for extracting schema information
//! from databases. Each supported database has its own feature-gated submodule.

use crate::codegen::declarations;
use crate::codegen::AnnotationStyle;
use crate::prelude::{EntigenError, TableDescriptor};

mod memory;

pub use memory::MemoryInspector;

/// Filters to apply when resolving the tables of a run
#[derive(Debug, Default, Clone)]
pub struct TableFilter {
    /// Only these tables, in this order (if non-empty)
    pub include: Vec<String>,
    /// Exclude these tables
    pub exclude: Vec<String>,
}

impl TableFilter {
    /// Check if a table should be included
    pub fn should_include(&self, table_name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|t| t == table_name) {
            return false;
        }

        !self.exclude.iter().any(|t| t == table_name)
    }

    /// Pick the tables to generate out of everything the catalog lists
    ///
    /// Every included name must exist; all missing names are reported in
    /// a single [`EntigenError::UnknownTable`].
    pub fn resolve(&self, available: &[String]) -> Result<Vec<String>, EntigenError> {
        let missing: Vec<String> = self
            .include
            .iter()
            .filter(|name| !available.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EntigenError::UnknownTable(missing));
        }

        let ordered = if self.include.is_empty() {
            available
        } else {
            self.include.as_slice()
        };

        let mut tables: Vec<String> = Vec::with_capacity(ordered.len());
        for name in ordered {
            if self.should_include(name) && !tables.contains(name) {
                tables.push(name.clone());
            }
        }
        Ok(tables)
    }
}

/// Read-only view of a database catalog, one implementation per engine
pub trait SchemaInspector {
    /// Names of every table, in catalog order
    fn list_tables(&mut self) -> Result<Vec<String>, EntigenError>;

    /// Column and index metadata of one table
    fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, EntigenError>;

    /// One declaration per non-primary index, in catalog order
    fn build_index_declarations(
        &self,
        table: &TableDescriptor,
        style: AnnotationStyle,
    ) -> Vec<String> {
        declarations::build_index_declarations(table, style)
    }

    /// Property and accessor blocks, columns in catalog order
    fn build_property_declarations(
        &self,
        table: &TableDescriptor,
        style: AnnotationStyle,
    ) -> Result<(String, String), EntigenError> {
        declarations::build_property_declarations(table, style)
    }
}

// Feature-gated database implementations
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresInspector;

#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "mysql")]
pub use mysql::MySqlInspector;

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        ["tbl_order", "tbl_user", "migrations"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_resolve_everything() {
        let tables = TableFilter::default().resolve(&catalog()).unwrap();
        assert_eq!(tables, catalog());
    }

    #[test]
    fn test_resolve_allow_list_order() {
        let filter = TableFilter {
            include: vec!["tbl_user".to_string(), "tbl_order".to_string()],
            exclude: vec![],
        };
        assert_eq!(filter.resolve(&catalog()).unwrap(), ["tbl_user", "tbl_order"]);
    }

    #[test]
    fn test_resolve_reports_all_missing() {
        let filter = TableFilter {
            include: vec![
                "tbl_user".to_string(),
                "ghost".to_string(),
                "phantom".to_string(),
            ],
            exclude: vec![],
        };
        match filter.resolve(&catalog()) {
            Err(EntigenError::UnknownTable(missing)) => assert_eq!(missing, ["ghost", "phantom"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_exclude() {
        let filter = TableFilter {
            include: vec![],
            exclude: vec!["migrations".to_string()],
        };
        assert_eq!(filter.resolve(&catalog()).unwrap(), ["tbl_order", "tbl_user"]);
        assert!(!filter.should_include("migrations"));
        assert!(filter.should_include("tbl_user"));
    }

    #[test]
    fn test_resolve_drops_repeated_names() {
        let filter = TableFilter {
            include: vec!["tbl_user".to_string(), "tbl_user".to_string()],
            exclude: vec![],
        };
        assert_eq!(filter.resolve(&catalog()).unwrap(), ["tbl_user"]);
    }
}
