use postgres::Client;
use tracing::{debug, error, trace};

use super::SchemaInspector;
use crate::prelude::EntigenError;
use crate::schema::{Column, DataType, ForeignKey, Index, IndexKind, TableDescriptor};

/// PostgreSQL inspector, scoped to one schema (namespace)
pub struct PostgresInspector<'a> {
    client: &'a mut Client,
    schema: String,
    enums: Option<Vec<EnumType>>,
}

impl<'a> PostgresInspector<'a> {
    pub fn new(client: &'a mut Client, schema: impl Into<String>) -> Self {
        Self {
            client,
            schema: schema.into(),
            enums: None,
        }
    }

    fn unavailable(&self, what: &str, e: postgres::Error) -> EntigenError {
        error!(schema = ?self.schema, error = ?e, "Failed to query {}", what);
        EntigenError::SchemaUnavailable {
            database: self.schema.clone(),
            message: format!("Failed to query {}: {}", what, e),
        }
    }

    /// Enum types of the schema, loaded once per inspector
    fn enums(&mut self) -> Result<&[EnumType], EntigenError> {
        if self.enums.is_none() {
            let enums = query_enums(self.client, &self.schema)
                .map_err(|e| self.unavailable("enum types", e))?;
            debug!(count = ?enums.len(), "Found enum types");
            self.enums = Some(enums);
        }
        Ok(self.enums.as_deref().unwrap_or_default())
    }
}

impl SchemaInspector for PostgresInspector<'_> {
    fn list_tables(&mut self) -> Result<Vec<String>, EntigenError> {
        let tables = query_tables(self.client, &self.schema)
            .map_err(|e| self.unavailable("tables", e))?;
        debug!(schema = ?self.schema, count = ?tables.len(), "Found tables");
        Ok(tables)
    }

    fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, EntigenError> {
        debug!(schema = ?self.schema, table = ?name, "Introspecting table");

        let exists = table_exists(self.client, &self.schema, name)
            .map_err(|e| self.unavailable("table existence", e))?;
        if !exists {
            return Err(EntigenError::TableNotFound {
                table: name.to_string(),
            });
        }

        let enums = self.enums()?.to_vec();

        let raw_columns = query_columns(self.client, &self.schema, name)
            .map_err(|e| self.unavailable("columns", e))?;
        trace!(table = ?name, columns = ?raw_columns.len(), "Found columns");

        let primary_key = query_primary_key(self.client, &self.schema, name)
            .map_err(|e| self.unavailable("primary key", e))?;
        trace!(table = ?name, primary_key = ?primary_key, "Found primary key");

        let foreign_keys = query_foreign_keys(self.client, &self.schema, name)
            .map_err(|e| self.unavailable("foreign keys", e))?;

        let indexes = query_indexes(self.client, &self.schema, name)
            .map_err(|e| self.unavailable("indexes", e))?;
        trace!(table = ?name, indexes = ?indexes.len(), "Found indexes");

        let columns = raw_columns
            .into_iter()
            .map(|raw| {
                let data_type = if raw.is_enum {
                    let values = enums
                        .iter()
                        .find(|e| e.name == raw.type_name)
                        .map(|e| e.values.clone())
                        .unwrap_or_default();
                    DataType::Enum {
                        name: raw.type_name.clone(),
                        values,
                    }
                } else {
                    parse_data_type(&raw.data_type)
                };

                trace!(
                    column = ?raw.name,
                    data_type = ?raw.data_type,
                    parsed_type = ?data_type,
                    is_nullable = ?raw.is_nullable,
                    "Parsed column"
                );

                Column {
                    is_primary_key: primary_key.contains(&raw.name),
                    is_auto_generated: raw.is_identity
                        || is_auto_generated_column(&raw.default_value),
                    references: foreign_keys
                        .iter()
                        .find(|(column, _)| column == &raw.name)
                        .map(|(_, fk)| fk.clone()),
                    name: raw.name,
                    data_type,
                    is_nullable: raw.is_nullable,
                    default: raw.default_value,
                    comment: raw.comment,
                }
            })
            .collect();

        Ok(TableDescriptor {
            name: name.to_string(),
            columns,
            indexes,
        })
    }
}

/// A custom enum type defined in the database
#[derive(Debug, Clone)]
struct EnumType {
    name: String,
    values: Vec<String>,
}

/// Column as read from the catalog
struct RawColumn {
    name: String,
    data_type: String,
    type_name: String,
    is_enum: bool,
    is_nullable: bool,
    is_identity: bool,
    default_value: Option<String>,
    comment: Option<String>,
}

/// Query all table names in a schema
fn query_tables(client: &mut Client, schema_name: &str) -> Result<Vec<String>, postgres::Error> {
    trace!(schema = ?schema_name, "Querying tables");

    let sql = r#"
        SELECT c.relname AS table_name
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind = 'r'
            AND n.nspname = $1
        ORDER BY c.relname
    "#;

    let rows = client.query(sql, &[&schema_name])?;
    Ok(rows.iter().map(|row| row.get("table_name")).collect())
}

fn table_exists(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<bool, postgres::Error> {
    let sql = r#"
        SELECT EXISTS (
            SELECT 1
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind = 'r'
                AND c.relname = $1
                AND n.nspname = $2
        ) AS found
    "#;

    let row = client.query_one(sql, &[&table_name, &schema_name])?;
    Ok(row.get("found"))
}

/// Query all columns for a table
fn query_columns(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<RawColumn>, postgres::Error> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying columns");

    let sql = r#"
        SELECT
            a.attname AS column_name,
            format_type(a.atttypid, a.atttypmod) AS data_type,
            t.typname::text AS type_name,
            (t.typtype = 'e') AS is_enum,
            NOT a.attnotnull AS is_nullable,
            (a.attidentity <> '') AS is_identity,
            pg_get_expr(d.adbin, d.adrelid) AS default_value,
            col_description(c.oid, a.attnum) AS comment
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_type t ON t.oid = a.atttypid
        LEFT JOIN pg_attrdef d ON d.adrelid = c.oid AND d.adnum = a.attnum
        WHERE c.relname = $1
            AND n.nspname = $2
            AND a.attnum > 0
            AND NOT a.attisdropped
        ORDER BY a.attnum
    "#;

    let rows = client.query(sql, &[&table_name, &schema_name])?;

    Ok(rows
        .iter()
        .map(|row| RawColumn {
            name: row.get("column_name"),
            data_type: row.get("data_type"),
            type_name: row.get("type_name"),
            is_enum: row.get("is_enum"),
            is_nullable: row.get("is_nullable"),
            is_identity: row.get("is_identity"),
            default_value: row.get("default_value"),
            comment: row.get("comment"),
        })
        .collect())
}

/// Query primary key columns for a table
fn query_primary_key(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<String>, postgres::Error> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying primary key");

    let sql = r#"
        SELECT a.attname AS column_name
        FROM pg_constraint con
        JOIN pg_class c ON c.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey)
        WHERE con.contype = 'p'
            AND c.relname = $1
            AND n.nspname = $2
        ORDER BY array_position(con.conkey, a.attnum)
    "#;

    let rows = client.query(sql, &[&table_name, &schema_name])?;
    Ok(rows.iter().map(|row| row.get("column_name")).collect())
}

/// Query single-column foreign keys, keyed by the referencing column
fn query_foreign_keys(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<(String, ForeignKey)>, postgres::Error> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying foreign keys");

    let sql = r#"
        SELECT
            a.attname AS column_name,
            rt.relname AS ref_table,
            ra.attname AS ref_column
        FROM pg_constraint con
        JOIN pg_class c ON c.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_class rt ON rt.oid = con.confrelid
        JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = con.conkey[1]
        JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = con.confkey[1]
        WHERE con.contype = 'f'
            AND array_length(con.conkey, 1) = 1
            AND c.relname = $1
            AND n.nspname = $2
        ORDER BY con.conname
    "#;

    let rows = client.query(sql, &[&table_name, &schema_name])?;
    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("column_name"),
                ForeignKey {
                    table: row.get("ref_table"),
                    column: row.get("ref_column"),
                },
            )
        })
        .collect())
}

/// Query indexes with their columns in index order
fn query_indexes(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<Index>, postgres::Error> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying indexes");

    // Expression indexes have no column to map and are skipped
    let sql = r#"
        SELECT
            i.relname AS index_name,
            ix.indisprimary AS is_primary,
            ix.indisunique AS is_unique,
            array_agg(a.attname::text ORDER BY k.ord) AS columns
        FROM pg_index ix
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE t.relname = $1
            AND n.nspname = $2
            AND NOT (0 = ANY(ix.indkey::int2[]))
        GROUP BY i.relname, ix.indisprimary, ix.indisunique
        ORDER BY i.relname
    "#;

    let rows = client.query(sql, &[&table_name, &schema_name])?;
    Ok(rows
        .iter()
        .map(|row| {
            let is_primary: bool = row.get("is_primary");
            let is_unique: bool = row.get("is_unique");
            let kind = if is_primary {
                IndexKind::Primary
            } else if is_unique {
                IndexKind::Unique
            } else {
                IndexKind::Plain
            };
            Index {
                name: row.get("index_name"),
                kind,
                columns: row.get("columns"),
            }
        })
        .collect())
}

/// Query all enum types in a schema
fn query_enums(client: &mut Client, schema_name: &str) -> Result<Vec<EnumType>, postgres::Error> {
    trace!(schema = ?schema_name, "Querying enum types");

    let sql = r#"
        SELECT
            t.typname AS enum_name,
            e.enumlabel AS enum_value
        FROM pg_type t
        JOIN pg_enum e ON e.enumtypid = t.oid
        JOIN pg_namespace n ON n.oid = t.typnamespace
        WHERE n.nspname = $1
        ORDER BY t.typname, e.enumsortorder
    "#;

    let rows = client.query(sql, &[&schema_name])?;

    // Group enum values by enum name
    let mut enums: Vec<EnumType> = Vec::new();
    for row in rows {
        let enum_name: String = row.get("enum_name");
        let enum_value: String = row.get("enum_value");

        if let Some(existing) = enums.iter_mut().find(|e| e.name == enum_name) {
            existing.values.push(enum_value);
        } else {
            trace!(enum_name = ?enum_name, "Found new enum type");
            enums.push(EnumType {
                name: enum_name,
                values: vec![enum_value],
            });
        }
    }

    Ok(enums)
}

/// Check if a column is auto-generated (SERIAL, BIGSERIAL)
fn is_auto_generated_column(default_value: &Option<String>) -> bool {
    match default_value {
        Some(default) => {
            let lower = default.to_lowercase();
            // SERIAL/BIGSERIAL columns have nextval('sequence_name') as default
            lower.contains("nextval(") || lower.contains("generated")
        }
        None => false,
    }
}

/// Parse PostgreSQL type string into DataType enum
fn parse_data_type(type_str: &str) -> DataType {
    let lower = type_str.to_lowercase();
    let trimmed = lower.trim();

    // Arrays have no Doctrine counterpart
    if trimmed.ends_with("[]") {
        return DataType::Other(type_str.to_string());
    }

    // Handle types with parameters
    if trimmed.starts_with("character varying") || trimmed.starts_with("varchar") {
        return DataType::Varchar(extract_length(trimmed));
    }
    if trimmed.starts_with("character(") || trimmed.starts_with("char(") {
        return DataType::Char(extract_length(trimmed));
    }
    if trimmed.starts_with("numeric") || trimmed.starts_with("decimal") {
        let (precision, scale) = extract_precision_scale(trimmed);
        return DataType::Numeric(precision, scale);
    }

    // Handle timestamp variations
    if trimmed.starts_with("timestamp") {
        if trimmed.contains("with time zone") || trimmed.contains("timestamptz") {
            return DataType::TimestampTz;
        }
        return DataType::Timestamp;
    }

    // Handle time variations
    if trimmed.starts_with("time ") || trimmed.starts_with("time(") || trimmed == "time" {
        if trimmed.contains("with time zone") {
            return DataType::TimeTz;
        }
        return DataType::Time;
    }

    // Simple type matching
    match trimmed {
        "smallint" | "int2" => DataType::SmallInt,
        "integer" | "int" | "int4" => DataType::Integer,
        "bigint" | "int8" => DataType::BigInt,
        "boolean" | "bool" => DataType::Boolean,
        "text" => DataType::Text,
        "character" | "char" => DataType::Char(Some(1)),
        "real" | "float4" => DataType::Real,
        "double precision" | "float8" => DataType::DoublePrecision,
        "date" => DataType::Date,
        "uuid" => DataType::Uuid,
        "json" => DataType::Json,
        "jsonb" => DataType::JsonBinary,
        "bytea" => DataType::Binary,
        "timetz" => DataType::TimeTz,
        "timestamptz" => DataType::TimestampTz,
        _ => DataType::Other(type_str.to_string()),
    }
}

/// Extract length parameter from type like "varchar(255)" or "character varying(100)"
fn extract_length(type_str: &str) -> Option<u32> {
    type_params(type_str).first().copied()
}

/// Extract precision and scale from a type like "numeric(10,2)"
fn extract_precision_scale(type_str: &str) -> (Option<u32>, Option<u32>) {
    let params = type_params(type_str);
    (params.first().copied(), params.get(1).copied())
}

fn type_params(type_str: &str) -> Vec<u32> {
    let Some(start) = type_str.find('(') else {
        return Vec::new();
    };
    let Some(end) = type_str[start..].find(')') else {
        return Vec::new();
    };
    type_str[start + 1..start + end]
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect()
}
