//! # entigen
//!
//! Generate Doctrine entities and repositories from database schemas
//!
//! This crate provides a CLI tool and library for introspecting database
//! schemas and generating PHP entity classes plus their repositories.
//! Entities are regenerated on every run; repositories are created once and
//! afterwards only patched, so hand-written methods survive.

pub mod codegen;
pub mod config;
pub mod error;
pub mod introspect;
pub mod naming;
pub mod schema;
pub mod writer;

pub mod prelude {
    pub use crate::codegen::{AnnotationStyle, GenerationReport, GenerationRequest, Generator};
    pub use crate::config::DbConfig;
    pub use crate::error::EntigenError;
    pub use crate::introspect::{MemoryInspector, SchemaInspector, TableFilter};
    pub use crate::schema::{Column, DataType, Index, IndexKind, TableDescriptor};
}

#[cfg(feature = "mysql")]
pub use introspect::MySqlInspector;
#[cfg(feature = "postgres")]
pub use introspect::PostgresInspector;
