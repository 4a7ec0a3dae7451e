//! Code generation
//!
//! This module turns introspected tables into Doctrine entity and
//! repository classes.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::prelude::EntigenError;

pub mod declarations;
pub mod engine;
pub mod php;
pub mod types;

pub use engine::{GeneratedTable, GenerationReport, Generator, TableFailure};

pub const DEFAULT_ENTITY_NAMESPACE: &str = "App\\Entity";
pub const DEFAULT_REPOSITORY_NAMESPACE: &str = "App\\Repository";

/// How Doctrine mapping metadata is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnnotationStyle {
    /// PHP 8 attributes, `#[ORM\Column(...)]`
    #[default]
    Attribute,
    /// Docblock annotations, `@ORM\Column(...)`
    Docblock,
}

impl FromStr for AnnotationStyle {
    type Err = EntigenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "attribute" | "attributes" => Ok(AnnotationStyle::Attribute),
            "docblock" | "annotation" | "annotations" => Ok(AnnotationStyle::Docblock),
            other => Err(EntigenError::Config(format!(
                "unknown annotation style '{}', expected 'attribute' or 'docblock'",
                other
            ))),
        }
    }
}

/// Parameters of one generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub entity_namespace: String,
    pub repository_namespace: String,
    pub style: AnnotationStyle,
    /// Comma-separated allow-list; empty means every table
    pub table_list: String,
    /// Comma-separated tables to skip
    pub exclude_list: String,
    /// Prefix removed from table names before deriving class names
    pub table_prefix: String,
    /// Database (or schema) being introspected
    pub database: String,
    pub entity_dir: PathBuf,
    pub repository_dir: PathBuf,
}

impl GenerationRequest {
    pub fn new(entity_dir: impl Into<PathBuf>, repository_dir: impl Into<PathBuf>) -> Self {
        Self {
            entity_namespace: DEFAULT_ENTITY_NAMESPACE.to_string(),
            repository_namespace: DEFAULT_REPOSITORY_NAMESPACE.to_string(),
            style: AnnotationStyle::default(),
            table_list: String::new(),
            exclude_list: String::new(),
            table_prefix: String::new(),
            database: String::new(),
            entity_dir: entity_dir.into(),
            repository_dir: repository_dir.into(),
        }
    }

    /// Empty values keep the default namespace
    pub fn with_entity_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.trim().is_empty() {
            self.entity_namespace = namespace.trim().trim_matches('\\').to_string();
        }
        self
    }

    /// Empty values keep the default namespace
    pub fn with_repository_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.trim().is_empty() {
            self.repository_namespace = namespace.trim().trim_matches('\\').to_string();
        }
        self
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_table_list(mut self, tables: impl Into<String>) -> Self {
        self.table_list = tables.into();
        self
    }

    pub fn with_exclude_list(mut self, tables: impl Into<String>) -> Self {
        self.exclude_list = tables.into();
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Requested tables, in the order given
    pub fn requested_tables(&self) -> Vec<String> {
        split_list(&self.table_list)
    }

    pub fn excluded_tables(&self) -> Vec<String> {
        split_list(&self.exclude_list)
    }

    pub fn entity_path(&self, class_name: &str) -> PathBuf {
        file_path(&self.entity_dir, class_name)
    }

    pub fn repository_path(&self, class_name: &str) -> PathBuf {
        file_path(&self.repository_dir, &format!("{}Repository", class_name))
    }
}

fn file_path(dir: &Path, class_name: &str) -> PathBuf {
    dir.join(format!("{}.php", class_name))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("src/Entity", "src/Repository")
            .with_entity_namespace("")
            .with_repository_namespace("  ");

        assert_eq!(request.entity_namespace, "App\\Entity");
        assert_eq!(request.repository_namespace, "App\\Repository");
        assert_eq!(request.style, AnnotationStyle::Attribute);
    }

    #[test]
    fn test_request_custom_namespace() {
        let request = GenerationRequest::new("e", "r").with_entity_namespace("\\Shop\\Model\\");
        assert_eq!(request.entity_namespace, "Shop\\Model");
    }

    #[test]
    fn test_requested_tables_are_trimmed() {
        let request = GenerationRequest::new("e", "r").with_table_list(",users , orders,,");
        assert_eq!(request.requested_tables(), ["users", "orders"]);
        assert!(GenerationRequest::new("e", "r").requested_tables().is_empty());
    }

    #[test]
    fn test_output_paths() {
        let request = GenerationRequest::new("src/Entity", "src/Repository");
        assert_eq!(request.entity_path("User"), PathBuf::from("src/Entity/User.php"));
        assert_eq!(
            request.repository_path("User"),
            PathBuf::from("src/Repository/UserRepository.php")
        );
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("".parse::<AnnotationStyle>().unwrap(), AnnotationStyle::Attribute);
        assert_eq!(
            "Docblock".parse::<AnnotationStyle>().unwrap(),
            AnnotationStyle::Docblock
        );
        assert!("yaml".parse::<AnnotationStyle>().is_err());
    }
}
