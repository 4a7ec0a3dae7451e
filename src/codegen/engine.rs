//! Generation engine
//!
//! Drives a run: resolves the tables, introspects each one, renders the
//! entity and repository classes and hands them to the writer.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use super::php::{repository_patch, EntityParts, PhpRenderer};
use super::GenerationRequest;
use crate::error::EntigenError;
use crate::introspect::{SchemaInspector, TableFilter};
use crate::naming::{strip_prefix, to_class_name};
use crate::writer::{self, GeneratedFile, WriteOutcome, WritePolicy};

/// A table whose files were written
#[derive(Debug, Clone)]
pub struct GeneratedTable {
    pub table: String,
    pub class_name: String,
    pub entity_path: PathBuf,
    pub entity: WriteOutcome,
    pub repository_path: PathBuf,
    pub repository: WriteOutcome,
}

/// A table that could not be generated
#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: EntigenError,
}

/// Outcome of a run, in processing order
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub generated: Vec<GeneratedTable>,
    pub failed: Vec<TableFailure>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A resolved table and the class it becomes
struct PlannedTable {
    table: String,
    class_name: String,
    /// Other tables mapping to the same class
    conflicts: Vec<String>,
}

/// Generates entity and repository classes for the tables of one inspector
pub struct Generator<I> {
    request: GenerationRequest,
    inspector: I,
    renderer: PhpRenderer,
}

impl<I: SchemaInspector> Generator<I> {
    pub fn new(request: GenerationRequest, inspector: I) -> Self {
        Self {
            request,
            inspector,
            renderer: PhpRenderer::new(),
        }
    }

    /// Run the generation
    ///
    /// Unknown tables in the allow-list and an unreadable catalog abort the
    /// run before anything is written. Failures of a single table are
    /// recorded in the report and the run moves on.
    pub fn run(&mut self) -> Result<GenerationReport, EntigenError> {
        info!(
            database = ?self.request.database,
            style = ?self.request.style,
            entity_dir = ?self.request.entity_dir,
            repository_dir = ?self.request.repository_dir,
            "Starting code generation"
        );

        let available = self.inspector.list_tables()?;
        debug!(count = ?available.len(), "Tables in catalog");

        let filter = TableFilter {
            include: self.request.requested_tables(),
            exclude: self.request.excluded_tables(),
        };
        let tables = filter.resolve(&available).inspect_err(|e| {
            error!(error = %e, "Table list does not match the database");
        })?;
        debug!(tables = ?tables, "Resolved tables");

        let mut report = GenerationReport::default();
        for planned in plan(&tables, &self.request.table_prefix) {
            if !planned.conflicts.is_empty() {
                let mut tables = vec![planned.table.clone()];
                tables.extend(planned.conflicts);
                let error = EntigenError::DuplicateClassName {
                    class_name: planned.class_name,
                    tables,
                };
                warn!(table = ?planned.table, error = %error, "Skipping table");
                report.failed.push(TableFailure {
                    table: planned.table,
                    error,
                });
                continue;
            }

            match self.generate_table(&planned.table, &planned.class_name) {
                Ok(generated) => report.generated.push(generated),
                Err(e) if e.is_fatal() => {
                    error!(table = ?planned.table, error = %e, "Aborting code generation");
                    return Err(e);
                }
                Err(e) => {
                    warn!(table = ?planned.table, error = %e, "Table generation failed");
                    report.failed.push(TableFailure {
                        table: planned.table,
                        error: e,
                    });
                }
            }
        }

        info!(
            generated = report.generated.len(),
            failed = report.failed.len(),
            "Code generation complete"
        );
        Ok(report)
    }

    fn generate_table(
        &mut self,
        table: &str,
        class_name: &str,
    ) -> Result<GeneratedTable, EntigenError> {
        debug!(table = ?table, class_name = ?class_name, "Generating table");
        let style = self.request.style;

        let descriptor = self.inspector.describe_table(table)?;
        let indexes = self.inspector.build_index_declarations(&descriptor, style);
        let (properties, accessors) = self
            .inspector
            .build_property_declarations(&descriptor, style)?;

        let parts = EntityParts {
            indexes,
            properties,
            accessors,
        };
        let entity = GeneratedFile {
            path: self.request.entity_path(class_name),
            contents: self
                .renderer
                .render_entity(&self.request, table, class_name, &parts)?,
            policy: WritePolicy::Overwrite,
        };
        let repository = GeneratedFile {
            path: self.request.repository_path(class_name),
            contents: self
                .renderer
                .render_repository(&self.request, table, class_name)?,
            policy: WritePolicy::CreateOrPatch(repository_patch(class_name)),
        };

        let entity_outcome = write_file(table, &entity)?;
        let repository_outcome = write_file(table, &repository)?;

        info!(
            table = ?table,
            class_name = ?class_name,
            entity = ?entity_outcome,
            repository = ?repository_outcome,
            "Generated table"
        );

        Ok(GeneratedTable {
            table: table.to_string(),
            class_name: class_name.to_string(),
            entity_path: entity.path,
            entity: entity_outcome,
            repository_path: repository.path,
            repository: repository_outcome,
        })
    }
}

/// Derive class names and find tables that would share one
///
/// PHP class names and the file names on case-insensitive filesystems
/// ignore case, so `USER` and `User` count as the same class.
fn plan(tables: &[String], prefix: &str) -> Vec<PlannedTable> {
    let class_names: Vec<String> = tables
        .iter()
        .map(|table| to_class_name(strip_prefix(table, prefix)))
        .collect();

    tables
        .iter()
        .zip(&class_names)
        .map(|(table, class_name)| PlannedTable {
            table: table.clone(),
            class_name: class_name.clone(),
            conflicts: tables
                .iter()
                .zip(&class_names)
                .filter(|(other, other_class)| {
                    *other != table && other_class.eq_ignore_ascii_case(class_name)
                })
                .map(|(other, _)| other.clone())
                .collect(),
        })
        .collect()
}

fn write_file(table: &str, file: &GeneratedFile) -> Result<WriteOutcome, EntigenError> {
    writer::write(file).map_err(|source| EntigenError::WriteFailure {
        table: table.to_string(),
        path: file.path.clone(),
        source,
    })
}
