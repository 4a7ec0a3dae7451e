use mysql::prelude::Queryable;
use mysql::Conn;
use tracing::{debug, error, trace};

use super::SchemaInspector;
use crate::prelude::EntigenError;
use crate::schema::{Column, DataType, ForeignKey, Index, IndexKind, TableDescriptor};

/// MySQL / MariaDB inspector over `information_schema`
pub struct MySqlInspector<'a> {
    conn: &'a mut Conn,
    database: String,
}

impl<'a> MySqlInspector<'a> {
    pub fn new(conn: &'a mut Conn, database: impl Into<String>) -> Self {
        Self {
            conn,
            database: database.into(),
        }
    }

    fn unavailable(&self, what: &str, e: mysql::Error) -> EntigenError {
        error!(database = ?self.database, error = ?e, "Failed to query {}", what);
        EntigenError::SchemaUnavailable {
            database: self.database.clone(),
            message: format!("Failed to query {}: {}", what, e),
        }
    }
}

type ColumnRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<u64>,
    Option<u64>,
    Option<u64>,
    String,
    String,
    Option<String>,
);

impl SchemaInspector for MySqlInspector<'_> {
    fn list_tables(&mut self) -> Result<Vec<String>, EntigenError> {
        trace!(database = ?self.database, "Querying tables");

        let sql = r#"
            SELECT TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
                AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let tables: Vec<String> = self
            .conn
            .exec(sql, (self.database.clone(),))
            .map_err(|e| self.unavailable("tables", e))?;
        debug!(database = ?self.database, count = ?tables.len(), "Found tables");
        Ok(tables)
    }

    fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, EntigenError> {
        debug!(database = ?self.database, table = ?name, "Introspecting table");
        let params = (self.database.clone(), name.to_string());

        let found: Option<i64> = self
            .conn
            .exec_first(
                "SELECT COUNT(*) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND TABLE_TYPE = 'BASE TABLE'",
                params.clone(),
            )
            .map_err(|e| self.unavailable("table existence", e))?;
        if found.unwrap_or(0) == 0 {
            return Err(EntigenError::TableNotFound {
                table: name.to_string(),
            });
        }

        let column_sql = r#"
            SELECT
                COLUMN_NAME,
                DATA_TYPE,
                COLUMN_TYPE,
                IS_NULLABLE,
                COLUMN_DEFAULT,
                CHARACTER_MAXIMUM_LENGTH,
                NUMERIC_PRECISION,
                NUMERIC_SCALE,
                COLUMN_KEY,
                EXTRA,
                COLUMN_COMMENT
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ?
                AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        let rows: Vec<ColumnRow> = self
            .conn
            .exec(column_sql, params.clone())
            .map_err(|e| self.unavailable("columns", e))?;
        trace!(table = ?name, columns = ?rows.len(), "Found columns");

        let foreign_key_sql = r#"
            SELECT CONSTRAINT_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
                AND TABLE_NAME = ?
                AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
        let key_rows: Vec<(String, String, String, String)> = self
            .conn
            .exec(foreign_key_sql, params.clone())
            .map_err(|e| self.unavailable("foreign keys", e))?;
        let foreign_keys = single_column_foreign_keys(key_rows);

        let index_sql = r#"
            SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = ?
                AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;
        let index_rows: Vec<(String, i64, Option<String>)> = self
            .conn
            .exec(index_sql, params)
            .map_err(|e| self.unavailable("indexes", e))?;
        let indexes = group_indexes(index_rows);
        trace!(table = ?name, indexes = ?indexes.len(), "Found indexes");

        let columns = rows
            .into_iter()
            .map(
                |(
                    column_name,
                    data_type,
                    column_type,
                    is_nullable,
                    default,
                    char_length,
                    precision,
                    scale,
                    column_key,
                    extra,
                    comment,
                )| {
                    let parsed = parse_data_type(
                        &data_type,
                        &column_type,
                        char_length,
                        precision,
                        scale,
                    );
                    trace!(
                        column = ?column_name,
                        column_type = ?column_type,
                        parsed_type = ?parsed,
                        "Parsed column"
                    );
                    Column {
                        references: foreign_keys
                            .iter()
                            .find(|(column, _)| column == &column_name)
                            .map(|(_, fk)| fk.clone()),
                        name: column_name,
                        data_type: parsed,
                        is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
                        default,
                        is_primary_key: column_key == "PRI",
                        is_auto_generated: extra.to_lowercase().contains("auto_increment"),
                        comment: comment.filter(|c| !c.is_empty()),
                    }
                },
            )
            .collect();

        Ok(TableDescriptor {
            name: name.to_string(),
            columns,
            indexes,
        })
    }
}

/// Keep foreign keys made of exactly one column
fn single_column_foreign_keys(
    rows: Vec<(String, String, String, String)>,
) -> Vec<(String, ForeignKey)> {
    let mut keys: Vec<(String, String, ForeignKey, usize)> = Vec::new();
    for (constraint, column, ref_table, ref_column) in rows {
        if let Some(existing) = keys.iter_mut().find(|k| k.0 == constraint) {
            existing.3 += 1;
            continue;
        }
        keys.push((
            constraint,
            column,
            ForeignKey {
                table: ref_table,
                column: ref_column,
            },
            1,
        ));
    }
    keys.into_iter()
        .filter(|k| k.3 == 1)
        .map(|(_, column, fk, _)| (column, fk))
        .collect()
}

/// Fold STATISTICS rows (one per index column) into indexes
fn group_indexes(rows: Vec<(String, i64, Option<String>)>) -> Vec<Index> {
    let mut indexes: Vec<Index> = Vec::new();
    let mut functional: Vec<String> = Vec::new();

    for (index_name, non_unique, column) in rows {
        // Functional key parts have no column to map
        let Some(column) = column else {
            functional.push(index_name);
            continue;
        };
        if let Some(existing) = indexes.iter_mut().find(|i| i.name == index_name) {
            existing.columns.push(column);
            continue;
        }
        let kind = if index_name == "PRIMARY" {
            IndexKind::Primary
        } else if non_unique == 0 {
            IndexKind::Unique
        } else {
            IndexKind::Plain
        };
        indexes.push(Index {
            name: index_name,
            kind,
            columns: vec![column],
        });
    }

    indexes.retain(|i| !functional.contains(&i.name));
    indexes
}

/// Parse a MySQL column type into DataType enum
fn parse_data_type(
    data_type: &str,
    column_type: &str,
    char_length: Option<u64>,
    precision: Option<u64>,
    scale: Option<u64>,
) -> DataType {
    let column_type_lower = column_type.to_lowercase();
    let to_u32 = |v: Option<u64>| v.and_then(|v| u32::try_from(v).ok());

    match data_type.to_lowercase().as_str() {
        "tinyint" if column_type_lower.starts_with("tinyint(1)") => DataType::Boolean,
        "bit" if column_type_lower.starts_with("bit(1)") => DataType::Boolean,
        "bool" | "boolean" => DataType::Boolean,
        "tinyint" | "smallint" | "year" => DataType::SmallInt,
        "mediumint" | "int" | "integer" => DataType::Integer,
        "bigint" => DataType::BigInt,
        "decimal" | "numeric" => DataType::Numeric(to_u32(precision), to_u32(scale)),
        "float" => DataType::Real,
        "double" | "real" => DataType::DoublePrecision,
        "char" => DataType::Char(to_u32(char_length)),
        "varchar" => DataType::Varchar(to_u32(char_length)),
        "tinytext" | "text" | "mediumtext" | "longtext" => DataType::Text,
        "date" => DataType::Date,
        "datetime" | "timestamp" => DataType::Timestamp,
        "time" => DataType::Time,
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
            DataType::Binary
        }
        "json" => DataType::Json,
        "enum" => DataType::Enum {
            name: column_type.to_string(),
            values: parse_enum_values(column_type),
        },
        _ => DataType::Other(column_type.to_string()),
    }
}

/// Extract the labels of `enum('a','b')`
fn parse_enum_values(column_type: &str) -> Vec<String> {
    let Some(start) = column_type.find('(') else {
        return Vec::new();
    };
    let body = &column_type[start + 1..];

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('\'', false) => in_quotes = true,
            ('\'', true) if chars.peek() == Some(&'\'') => {
                chars.next();
                current.push('\'');
            }
            ('\'', true) => {
                in_quotes = false;
                values.push(std::mem::take(&mut current));
            }
            ('\\', true) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (c, true) => current.push(c),
            (')', false) => break,
            _ => {}
        }
    }
    values
}
