//! Column type mapping
//!
//! Maps engine-neutral [`DataType`]s onto Doctrine column types and the
//! PHP type of the generated property.

use crate::schema::DataType;

/// Doctrine DBAL column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctrineType {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Decimal,
    Text,
    String,
    Date,
    Time,
    DateTime,
    DateTimeTz,
    Boolean,
    Blob,
    Guid,
    Json,
}

impl DoctrineType {
    /// Constant on `Doctrine\DBAL\Types\Types`
    pub fn constant(self) -> &'static str {
        match self {
            DoctrineType::SmallInt => "SMALLINT",
            DoctrineType::Integer => "INTEGER",
            DoctrineType::BigInt => "BIGINT",
            DoctrineType::Float => "FLOAT",
            DoctrineType::Decimal => "DECIMAL",
            DoctrineType::Text => "TEXT",
            DoctrineType::String => "STRING",
            DoctrineType::Date => "DATE_MUTABLE",
            DoctrineType::Time => "TIME_MUTABLE",
            DoctrineType::DateTime => "DATETIME_MUTABLE",
            DoctrineType::DateTimeTz => "DATETIMETZ_MUTABLE",
            DoctrineType::Boolean => "BOOLEAN",
            DoctrineType::Blob => "BLOB",
            DoctrineType::Guid => "GUID",
            DoctrineType::Json => "JSON",
        }
    }

    /// Registered type name, as used in docblock annotations
    pub fn name(self) -> &'static str {
        match self {
            DoctrineType::SmallInt => "smallint",
            DoctrineType::Integer => "integer",
            DoctrineType::BigInt => "bigint",
            DoctrineType::Float => "float",
            DoctrineType::Decimal => "decimal",
            DoctrineType::Text => "text",
            DoctrineType::String => "string",
            DoctrineType::Date => "date",
            DoctrineType::Time => "time",
            DoctrineType::DateTime => "datetime",
            DoctrineType::DateTimeTz => "datetimetz",
            DoctrineType::Boolean => "boolean",
            DoctrineType::Blob => "blob",
            DoctrineType::Guid => "guid",
            DoctrineType::Json => "json",
        }
    }
}

/// Result of mapping one column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub doctrine: DoctrineType,
    /// PHP type hint, nullable form included
    pub php: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// Allowed values of an enum column
    pub enum_values: Vec<String>,
}

/// The type has no mapping; carries the database type verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedType(pub String);

/// Map a column type to its Doctrine and PHP counterparts
///
/// Nullability turns `T` into `?T`; `mixed` already admits null and is
/// left alone.
pub fn map_type(data_type: &DataType, is_nullable: bool) -> Result<MappedType, UnsupportedType> {
    let mut length = None;
    let mut precision = None;
    let mut scale = None;
    let mut enum_values = Vec::new();

    let (doctrine, php) = match data_type {
        DataType::SmallInt => (DoctrineType::SmallInt, "int"),
        DataType::Integer => (DoctrineType::Integer, "int"),
        DataType::BigInt => (DoctrineType::BigInt, "string"),
        DataType::Real | DataType::DoublePrecision => (DoctrineType::Float, "float"),
        DataType::Numeric(p, s) => {
            precision = *p;
            scale = *s;
            (DoctrineType::Decimal, "string")
        }
        DataType::Text => (DoctrineType::Text, "string"),
        DataType::Varchar(len) | DataType::Char(len) => {
            length = *len;
            (DoctrineType::String, "string")
        }
        DataType::Enum { values, .. } => {
            enum_values = values.clone();
            (DoctrineType::String, "string")
        }
        DataType::Date => (DoctrineType::Date, "\\DateTimeInterface"),
        DataType::Time | DataType::TimeTz => (DoctrineType::Time, "\\DateTimeInterface"),
        DataType::Timestamp => (DoctrineType::DateTime, "\\DateTimeInterface"),
        DataType::TimestampTz => (DoctrineType::DateTimeTz, "\\DateTimeInterface"),
        DataType::Boolean => (DoctrineType::Boolean, "bool"),
        DataType::Binary => (DoctrineType::Blob, "mixed"),
        DataType::Uuid => (DoctrineType::Guid, "string"),
        DataType::Json | DataType::JsonBinary => (DoctrineType::Json, "array"),
        DataType::Other(raw) => return Err(UnsupportedType(raw.clone())),
    };

    let php = if is_nullable && php != "mixed" {
        format!("?{}", php)
    } else {
        php.to_string()
    };

    Ok(MappedType {
        doctrine,
        php,
        length,
        precision,
        scale,
        enum_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<DataType> {
        vec![
            DataType::SmallInt,
            DataType::Integer,
            DataType::BigInt,
            DataType::Boolean,
            DataType::Text,
            DataType::Varchar(Some(50)),
            DataType::Char(None),
            DataType::Real,
            DataType::DoublePrecision,
            DataType::Numeric(Some(10), Some(2)),
            DataType::Timestamp,
            DataType::TimestampTz,
            DataType::Date,
            DataType::Time,
            DataType::TimeTz,
            DataType::Uuid,
            DataType::Json,
            DataType::JsonBinary,
            DataType::Binary,
            DataType::Enum {
                name: "status".to_string(),
                values: vec!["draft".to_string(), "live".to_string()],
            },
        ]
    }

    #[test]
    fn test_map_simple_types() {
        let int = map_type(&DataType::Integer, false).unwrap();
        assert_eq!(int.doctrine, DoctrineType::Integer);
        assert_eq!(int.php, "int");

        let text = map_type(&DataType::Text, false).unwrap();
        assert_eq!(text.doctrine, DoctrineType::Text);
        assert_eq!(text.php, "string");

        let json = map_type(&DataType::JsonBinary, false).unwrap();
        assert_eq!(json.doctrine, DoctrineType::Json);
        assert_eq!(json.php, "array");
    }

    #[test]
    fn test_map_carries_length_and_precision() {
        let varchar = map_type(&DataType::Varchar(Some(50)), false).unwrap();
        assert_eq!(varchar.length, Some(50));

        let decimal = map_type(&DataType::Numeric(Some(10), Some(2)), false).unwrap();
        assert_eq!(decimal.doctrine, DoctrineType::Decimal);
        assert_eq!((decimal.precision, decimal.scale), (Some(10), Some(2)));
        assert_eq!(decimal.php, "string");
    }

    #[test]
    fn test_map_enum_keeps_values() {
        let mapped = map_type(
            &DataType::Enum {
                name: "status".to_string(),
                values: vec!["draft".to_string(), "live".to_string()],
            },
            false,
        )
        .unwrap();
        assert_eq!(mapped.doctrine, DoctrineType::String);
        assert_eq!(mapped.enum_values, ["draft", "live"]);
    }

    #[test]
    fn test_nullable_widens() {
        assert_eq!(map_type(&DataType::Integer, true).unwrap().php, "?int");
        assert_eq!(
            map_type(&DataType::Timestamp, true).unwrap().php,
            "?\\DateTimeInterface"
        );
        assert_eq!(map_type(&DataType::Binary, true).unwrap().php, "mixed");
    }

    #[test]
    fn test_unsupported_type_is_an_error() {
        assert_eq!(
            map_type(&DataType::Other("tsvector".to_string()), false),
            Err(UnsupportedType("tsvector".to_string()))
        );
    }

    #[test]
    fn test_mapping_is_total_and_deterministic() {
        for data_type in supported() {
            for nullable in [false, true] {
                let first = map_type(&data_type, nullable).unwrap();
                let second = map_type(&data_type, nullable).unwrap();
                assert!(!first.php.is_empty(), "{data_type:?}");
                assert_eq!(first, second);
                if nullable {
                    let strict = map_type(&data_type, false).unwrap();
                    assert!(first.php.ends_with(&strict.php), "{data_type:?}");
                }
            }
        }
    }
}
