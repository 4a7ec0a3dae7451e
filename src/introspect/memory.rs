use tracing::trace;

use super::SchemaInspector;
use crate::prelude::{EntigenError, TableDescriptor};

/// Inspector over an in-memory catalog
///
/// Useful when the schema is already known, e.g. loaded from a snapshot,
/// and for exercising the generator without a live database.
#[derive(Debug, Clone, Default)]
pub struct MemoryInspector {
    tables: Vec<TableDescriptor>,
}

impl MemoryInspector {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.tables.push(table);
        self
    }
}

impl SchemaInspector for MemoryInspector {
    fn list_tables(&mut self) -> Result<Vec<String>, EntigenError> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, EntigenError> {
        trace!(table = ?name, "Describing in-memory table");
        self.tables
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| EntigenError::TableNotFound {
                table: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_describe() {
        let mut inspector = MemoryInspector::default()
            .with_table(TableDescriptor::new("users"))
            .with_table(TableDescriptor::new("orders"));

        assert_eq!(inspector.list_tables().unwrap(), ["users", "orders"]);
        assert_eq!(inspector.describe_table("orders").unwrap().name, "orders");
    }

    #[test]
    fn test_describe_missing_table() {
        let mut inspector = MemoryInspector::new(vec![TableDescriptor::new("users")]);

        assert!(matches!(
            inspector.describe_table("orders"),
            Err(EntigenError::TableNotFound { table }) if table == "orders"
        ));
    }
}
