//! Identifier casing
//!
//! Turns database identifiers (snake_case / lower-case table and column
//! names) into PHP identifiers.

/// Convert a table or column name into a PascalCase class name
///
/// Snake_case names are lower-cased and split on underscores, so
/// `USER_ACCOUNT`, `user_account` and `User_Account` all become
/// `UserAccount`. A name without underscores is a single word: only its
/// first letter changes. Applying the function to its own output is
/// therefore a no-op.
pub fn to_class_name(raw: &str) -> String {
    if !raw.contains('_') {
        return upper_first(raw);
    }
    raw.to_lowercase().split('_').map(upper_first).collect()
}

/// Convert a column name into a camelCase member name
///
/// Fully upper-case names (`ID`, `CREATED_AT`) are read as lower-case.
pub fn to_member_name(raw: &str) -> String {
    let class_name = if raw.chars().any(char::is_lowercase) {
        to_class_name(raw)
    } else {
        to_class_name(&raw.to_lowercase())
    };
    let mut chars = class_name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Strip `prefix` from a table name
///
/// Names that don't start with the prefix, or that consist of nothing
/// but the prefix, are returned unchanged.
pub fn strip_prefix<'a>(table_name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return table_name;
    }
    match table_name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => rest,
        _ => table_name,
    }
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
