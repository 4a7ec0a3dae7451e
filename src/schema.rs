//! Schema data structures
//!
//! These types represent database schema information and form the contract
//! between introspection (produces) and code generation (consumes).

/// Column and index metadata of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    /// Columns in catalog order
    pub columns: Vec<Column>,
    /// Indexes in catalog order, primary key included
    pub indexes: Vec<Index>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Indexes other than the primary key, in catalog order
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes
            .iter()
            .filter(|index| index.kind != IndexKind::Primary)
    }
}

/// A table column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub is_nullable: bool,
    /// Server-side default expression, verbatim
    pub default: Option<String>,
    pub is_primary_key: bool,
    /// Column is auto-generated (SERIAL, IDENTITY, AUTO_INCREMENT)
    pub is_auto_generated: bool,
    pub references: Option<ForeignKey>,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_nullable: false,
            default: None,
            is_primary_key: false,
            is_auto_generated: false,
            references: None,
            comment: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn auto_generated(mut self) -> Self {
        self.is_auto_generated = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Target of a single-column foreign key
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
}

/// A table index
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    /// Participating columns, in index order
    pub columns: Vec<String>,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, kind: IndexKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Engine-neutral column type
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Text,
    Varchar(Option<u32>),
    Char(Option<u32>),
    Real,
    DoublePrecision,
    /// Precision and scale, when declared
    Numeric(Option<u32>, Option<u32>),
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Uuid,
    Json,
    JsonBinary,
    Binary,
    Enum { name: String, values: Vec<String> },
    /// A type the introspector could not classify, stored verbatim
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableDescriptor {
        TableDescriptor::new("users")
            .with_column(
                Column::new("id", DataType::Integer)
                    .primary_key()
                    .auto_generated(),
            )
            .with_column(Column::new("tenant", DataType::Uuid).primary_key())
            .with_column(Column::new("email", DataType::Varchar(Some(100))).nullable())
            .with_index(Index::new("users_pkey", IndexKind::Primary, ["id", "tenant"]))
            .with_index(Index::new("users_email_key", IndexKind::Unique, ["email"]))
    }

    #[test]
    fn test_secondary_indexes() {
        let table = users();
        let names: Vec<_> = table.secondary_indexes().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["users_email_key"]);
    }
}
