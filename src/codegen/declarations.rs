//! Mapping declarations
//!
//! Builds the index declarations and the property / accessor blocks that
//! are embedded into an entity class. Every block is indented for the
//! class body and carries no trailing newline.

use std::fmt::Write;

use tracing::trace;

use super::types::{map_type, MappedType};
use super::AnnotationStyle;
use crate::error::EntigenError;
use crate::naming::{to_class_name, to_member_name};
use crate::schema::{Column, Index, IndexKind, TableDescriptor};

const INDENT: &str = "    ";

/// One column, resolved for code generation
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub property: String,
    pub mapped: MappedType,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_auto_generated: bool,
    /// Free-text lines for the property docblock
    pub notes: Vec<String>,
}

impl ColumnSpec {
    /// Resolve a column of `table`
    pub fn resolve(table: &str, column: &Column) -> Result<Self, EntigenError> {
        // Doctrine leaves generated keys unset until the entity is persisted
        let is_nullable = column.is_nullable || (column.is_primary_key && column.is_auto_generated);

        let mapped = map_type(&column.data_type, is_nullable).map_err(|unsupported| {
            EntigenError::UnsupportedColumnType {
                table: table.to_string(),
                column: column.name.clone(),
                data_type: unsupported.0,
            }
        })?;

        let mut notes = Vec::new();
        if let Some(comment) = column.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            notes.extend(comment.lines().map(|l| l.trim().replace("*/", "* /")));
        }
        if !mapped.enum_values.is_empty() {
            let values: Vec<_> = mapped
                .enum_values
                .iter()
                .map(|v| format!("'{}'", php_escape(v)))
                .collect();
            notes.push(format!("One of: {}", values.join(", ")));
        }
        if let Some(fk) = &column.references {
            notes.push(format!("References {}.{}", fk.table, fk.column));
        }

        trace!(
            table = ?table,
            column = ?column.name,
            doctrine = ?mapped.doctrine,
            php = ?mapped.php,
            "Resolved column"
        );

        Ok(Self {
            name: column.name.clone(),
            property: to_member_name(&column.name),
            mapped,
            is_nullable,
            is_primary_key: column.is_primary_key,
            is_auto_generated: column.is_auto_generated,
            notes,
        })
    }

    fn accessor_suffix(&self) -> String {
        to_class_name(&self.property)
    }

    /// Type hint without the nullable marker, for constructor parameters
    fn strict_php_type(&self) -> &str {
        self.mapped.php.trim_start_matches('?')
    }
}

/// Resolve every column of a table, in catalog order
///
/// Columns whose member names only differ in case are rejected: PHP method
/// names are case-insensitive, so their accessors would clash.
pub fn column_specs(table: &TableDescriptor) -> Result<Vec<ColumnSpec>, EntigenError> {
    let specs = table
        .columns
        .iter()
        .map(|column| ColumnSpec::resolve(&table.name, column))
        .collect::<Result<Vec<_>, _>>()?;

    for (position, spec) in specs.iter().enumerate() {
        let earlier = specs[..position]
            .iter()
            .find(|other| other.property.eq_ignore_ascii_case(&spec.property));
        if let Some(other) = earlier {
            return Err(EntigenError::DuplicatePropertyName {
                table: table.name.clone(),
                property: spec.property.clone(),
                columns: vec![other.name.clone(), spec.name.clone()],
            });
        }
    }

    Ok(specs)
}

/// One declaration per non-primary index, in catalog order
pub fn build_index_declarations(table: &TableDescriptor, style: AnnotationStyle) -> Vec<String> {
    table
        .secondary_indexes()
        .map(|index| index_declaration(index, style))
        .collect()
}

fn index_declaration(index: &Index, style: AnnotationStyle) -> String {
    let annotation = match index.kind {
        IndexKind::Unique => "UniqueConstraint",
        _ => "Index",
    };
    match style {
        AnnotationStyle::Attribute => {
            let columns: Vec<_> = index
                .columns
                .iter()
                .map(|c| format!("'{}'", php_escape(c)))
                .collect();
            format!(
                "#[ORM\\{}(name: '{}', columns: [{}])]",
                annotation,
                php_escape(&index.name),
                columns.join(", ")
            )
        }
        AnnotationStyle::Docblock => {
            let columns: Vec<_> = index
                .columns
                .iter()
                .map(|c| format!("\"{}\"", annotation_escape(c)))
                .collect();
            format!(
                "@ORM\\{}(name=\"{}\", columns={{{}}})",
                annotation,
                annotation_escape(&index.name),
                columns.join(", ")
            )
        }
    }
}

/// Property declarations and accessor methods for every column
///
/// Primary-key columns only get a getter; keys that are not generated by
/// the database are assigned once, through the constructor.
pub fn build_property_declarations(
    table: &TableDescriptor,
    style: AnnotationStyle,
) -> Result<(String, String), EntigenError> {
    let specs = column_specs(table)?;

    let properties: Vec<String> = specs.iter().map(|spec| property(spec, style)).collect();

    let mut accessors = Vec::with_capacity(specs.len() * 2 + 1);
    let assigned: Vec<&ColumnSpec> = specs
        .iter()
        .filter(|spec| spec.is_primary_key && !spec.is_auto_generated)
        .collect();
    if !assigned.is_empty() {
        accessors.push(constructor(&assigned));
    }
    for spec in &specs {
        accessors.push(getter(spec));
        if !spec.is_primary_key {
            accessors.push(setter(spec));
        }
    }

    Ok((properties.join("\n\n"), accessors.join("\n\n")))
}

fn property(spec: &ColumnSpec, style: AnnotationStyle) -> String {
    let mut mapping = Vec::new();
    if spec.is_primary_key {
        mapping.push("Id".to_string());
        if spec.is_auto_generated {
            mapping.push("GeneratedValue".to_string());
        }
    }
    mapping.push(column_mapping(spec, style));

    let mut out = String::new();
    match style {
        AnnotationStyle::Attribute => {
            if !spec.notes.is_empty() {
                docblock(&mut out, spec.notes.iter().map(String::as_str));
            }
            for line in &mapping {
                let _ = writeln!(out, "{INDENT}#[ORM\\{line}]");
            }
        }
        AnnotationStyle::Docblock => {
            let annotations: Vec<String> = mapping.iter().map(|m| format!("@ORM\\{m}")).collect();
            let mut lines: Vec<&str> = spec.notes.iter().map(String::as_str).collect();
            if !lines.is_empty() {
                lines.push("");
            }
            lines.extend(annotations.iter().map(String::as_str));
            docblock(&mut out, lines.into_iter());
        }
    }

    let initializer = if spec.is_nullable { " = null" } else { "" };
    let _ = write!(
        out,
        "{INDENT}private {} ${}{};",
        spec.mapped.php, spec.property, initializer
    );
    out
}

fn column_mapping(spec: &ColumnSpec, style: AnnotationStyle) -> String {
    let mapped = &spec.mapped;
    let mut args = Vec::new();
    match style {
        AnnotationStyle::Attribute => {
            args.push(format!("name: '{}'", php_escape(&spec.name)));
            args.push(format!("type: Types::{}", mapped.doctrine.constant()));
            if let Some(length) = mapped.length {
                args.push(format!("length: {length}"));
            }
            if let Some(precision) = mapped.precision {
                args.push(format!("precision: {precision}"));
            }
            if let Some(scale) = mapped.scale {
                args.push(format!("scale: {scale}"));
            }
            if spec.is_nullable && !spec.is_primary_key {
                args.push("nullable: true".to_string());
            }
        }
        AnnotationStyle::Docblock => {
            args.push(format!("name=\"{}\"", annotation_escape(&spec.name)));
            args.push(format!("type=\"{}\"", mapped.doctrine.name()));
            if let Some(length) = mapped.length {
                args.push(format!("length={length}"));
            }
            if let Some(precision) = mapped.precision {
                args.push(format!("precision={precision}"));
            }
            if let Some(scale) = mapped.scale {
                args.push(format!("scale={scale}"));
            }
            if spec.is_nullable && !spec.is_primary_key {
                args.push("nullable=true".to_string());
            }
        }
    }
    format!("Column({})", args.join(", "))
}

fn constructor(assigned: &[&ColumnSpec]) -> String {
    let params: Vec<String> = assigned
        .iter()
        .map(|spec| format!("{} ${}", spec.strict_php_type(), spec.property))
        .collect();

    let mut out = format!(
        "{INDENT}public function __construct({})\n{INDENT}{{\n",
        params.join(", ")
    );
    for spec in assigned {
        let _ = writeln!(out, "{INDENT}{INDENT}$this->{0} = ${0};", spec.property);
    }
    let _ = write!(out, "{INDENT}}}");
    out
}

fn getter(spec: &ColumnSpec) -> String {
    format!(
        "{INDENT}public function get{}(): {}\n{INDENT}{{\n{INDENT}{INDENT}return $this->{};\n{INDENT}}}",
        spec.accessor_suffix(),
        spec.mapped.php,
        spec.property
    )
}

fn setter(spec: &ColumnSpec) -> String {
    format!(
        "{INDENT}public function set{suffix}({php} ${prop}): static\n{INDENT}{{\n{INDENT}{INDENT}$this->{prop} = ${prop};\n\n{INDENT}{INDENT}return $this;\n{INDENT}}}",
        suffix = spec.accessor_suffix(),
        php = spec.mapped.php,
        prop = spec.property
    )
}

fn docblock<'a>(out: &mut String, lines: impl Iterator<Item = &'a str>) {
    let _ = writeln!(out, "{INDENT}/**");
    for line in lines {
        if line.is_empty() {
            let _ = writeln!(out, "{INDENT} *");
        } else {
            let _ = writeln!(out, "{INDENT} * {line}");
        }
    }
    let _ = writeln!(out, "{INDENT} */");
}

/// Escape for a single-quoted PHP string
pub(crate) fn php_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Escape for a double-quoted Doctrine annotation string
pub(crate) fn annotation_escape(s: &str) -> String {
    s.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use pretty_assertions::assert_eq;

    fn users() -> TableDescriptor {
        TableDescriptor::new("tbl_user")
            .with_column(
                Column::new("id", DataType::Integer)
                    .primary_key()
                    .auto_generated(),
            )
            .with_column(Column::new("name", DataType::Varchar(Some(50))))
            .with_column(Column::new("email", DataType::Varchar(Some(100))).nullable())
            .with_index(Index::new("tbl_user_pkey", IndexKind::Primary, ["id"]))
            .with_index(Index::new("uniq_email", IndexKind::Unique, ["email"]))
            .with_index(Index::new("idx_name", IndexKind::Plain, ["name", "email"]))
    }

    #[test]
    fn test_index_declarations_attribute() {
        assert_eq!(
            build_index_declarations(&users(), AnnotationStyle::Attribute),
            [
                "#[ORM\\UniqueConstraint(name: 'uniq_email', columns: ['email'])]",
                "#[ORM\\Index(name: 'idx_name', columns: ['name', 'email'])]",
            ]
        );
    }

    #[test]
    fn test_index_declarations_docblock() {
        assert_eq!(
            build_index_declarations(&users(), AnnotationStyle::Docblock),
            [
                "@ORM\\UniqueConstraint(name=\"uniq_email\", columns={\"email\"})",
                "@ORM\\Index(name=\"idx_name\", columns={\"name\", \"email\"})",
            ]
        );
    }

    #[test]
    fn test_property_declarations_attribute() {
        let (properties, _) =
            build_property_declarations(&users(), AnnotationStyle::Attribute).unwrap();

        let expected = "    #[ORM\\Id]
    #[ORM\\GeneratedValue]
    #[ORM\\Column(name: 'id', type: Types::INTEGER)]
    private ?int $id = null;

    #[ORM\\Column(name: 'name', type: Types::STRING, length: 50)]
    private string $name;

    #[ORM\\Column(name: 'email', type: Types::STRING, length: 100, nullable: true)]
    private ?string $email = null;";
        assert_eq!(properties, expected);
    }

    #[test]
    fn test_property_declarations_docblock() {
        let table = TableDescriptor::new("tbl_order").with_column(
            Column::new("amount", DataType::Numeric(Some(10), Some(2))).with_comment("Total"),
        );
        let (properties, _) =
            build_property_declarations(&table, AnnotationStyle::Docblock).unwrap();

        let expected = "    /**
     * Total
     *
     * @ORM\\Column(name=\"amount\", type=\"decimal\", precision=10, scale=2)
     */
    private string $amount;";
        assert_eq!(properties, expected);
    }

    #[test]
    fn test_primary_key_has_no_setter() {
        let (_, accessors) =
            build_property_declarations(&users(), AnnotationStyle::Attribute).unwrap();

        assert!(accessors.contains("public function getId(): ?int"));
        assert!(!accessors.contains("setId"));
        assert!(accessors.contains("public function setName(string $name): static"));
        assert!(accessors.contains("public function setEmail(?string $email): static"));
        assert!(!accessors.contains("__construct"));
    }

    #[test]
    fn test_assigned_key_goes_through_constructor() {
        let table = TableDescriptor::new("country")
            .with_column(Column::new("iso_code", DataType::Char(Some(2))).primary_key())
            .with_column(Column::new("name", DataType::Text));
        let (_, accessors) =
            build_property_declarations(&table, AnnotationStyle::Attribute).unwrap();

        let expected = "    public function __construct(string $isoCode)
    {
        $this->isoCode = $isoCode;
    }

    public function getIsoCode(): string
    {
        return $this->isoCode;
    }

    public function getName(): string
    {
        return $this->name;
    }

    public function setName(string $name): static
    {
        $this->name = $name;

        return $this;
    }";
        assert_eq!(accessors, expected);
    }

    #[test]
    fn test_enum_and_reference_notes() {
        let table = TableDescriptor::new("orders")
            .with_column(Column::new("user_id", DataType::Integer).references("users", "id"))
            .with_column(Column::new(
                "status",
                DataType::Enum {
                    name: "order_status".to_string(),
                    values: vec!["open".to_string(), "paid".to_string()],
                },
            ));
        let (properties, _) =
            build_property_declarations(&table, AnnotationStyle::Attribute).unwrap();

        assert!(properties.contains("     * References users.id\n"));
        assert!(properties.contains("     * One of: 'open', 'paid'\n"));
    }

    #[test]
    fn test_unsupported_column_names_table_and_column() {
        let table = TableDescriptor::new("docs")
            .with_column(Column::new("body", DataType::Other("tsvector".to_string())));

        let err = build_property_declarations(&table, AnnotationStyle::Attribute).unwrap_err();
        match err {
            EntigenError::UnsupportedColumnType {
                table,
                column,
                data_type,
            } => {
                assert_eq!(table, "docs");
                assert_eq!(column, "body");
                assert_eq!(data_type, "tsvector");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_colliding_member_names_are_rejected() {
        let table = TableDescriptor::new("orders")
            .with_column(Column::new("user_id", DataType::Integer))
            .with_column(Column::new("userId", DataType::Integer));

        let err = build_property_declarations(&table, AnnotationStyle::Attribute).unwrap_err();
        match err {
            EntigenError::DuplicatePropertyName {
                table,
                property,
                columns,
            } => {
                assert_eq!(table, "orders");
                assert_eq!(property, "userId");
                assert_eq!(columns, ["user_id", "userId"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_member_names_clash_regardless_of_case() {
        let table = TableDescriptor::new("accounts")
            .with_column(Column::new("userid", DataType::Integer))
            .with_column(Column::new("user_id", DataType::Integer));

        assert!(matches!(
            column_specs(&table),
            Err(EntigenError::DuplicatePropertyName { .. })
        ));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(php_escape("it's"), "it\\'s");
        assert_eq!(annotation_escape("a\"b"), "a\"\"b");
    }
}
