//! SQL utility functions

/// Quote a value as a single-quoted SQL string literal
///
/// Embedded single quotes are doubled so user input cannot terminate the
/// literal early.
///
/// # Example
///
/// ```
/// use tracebridge_server::utils::sql::quote_literal;
///
/// assert_eq!(quote_literal("checkout"), "'checkout'");
/// assert_eq!(quote_literal("o'brien"), "'o''brien'");
/// ```
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote every value and join them with commas, preserving order
pub fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| quote_literal(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Map an attribute key to the backend's flattened column name
///
/// The backend flattens attribute keys by replacing everything outside
/// `[A-Za-z0-9_]` with `_` (`http.status_code` is stored as `http_status_code`).
pub fn column_name(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal_plain() {
        assert_eq!(quote_literal("hello"), "'hello'");
    }

    #[test]
    fn test_quote_literal_embedded_quote() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_quote_literal_empty() {
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_quote_list_preserves_order() {
        assert_eq!(quote_list(&["b", "a", "c"]), "'b','a','c'");
    }

    #[test]
    fn test_quote_list_single() {
        assert_eq!(quote_list(&["only"]), "'only'");
    }

    #[test]
    fn test_column_name_dotted_key() {
        assert_eq!(column_name("http.status_code"), "http_status_code");
    }

    #[test]
    fn test_column_name_rejects_injection() {
        assert_eq!(column_name("a' OR 1=1 --"), "a__OR_1_1___");
    }

    #[test]
    fn test_column_name_unchanged() {
        assert_eq!(column_name("service_name"), "service_name");
    }
}
