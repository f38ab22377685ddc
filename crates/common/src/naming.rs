//! Identifier sanitization and case conversion.
//!
//! Every name the engine emits (declaration names, enum keys, property keys,
//! variable names in generated statements) passes through this module.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Deserialize;

/// TypeScript reserved words that cannot be used as identifiers.
pub static TS_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "break",
        "case",
        "catch",
        "class",
        "const",
        "continue",
        "debugger",
        "default",
        "delete",
        "do",
        "else",
        "enum",
        "export",
        "extends",
        "false",
        "finally",
        "for",
        "function",
        "if",
        "import",
        "in",
        "instanceof",
        "new",
        "null",
        "return",
        "super",
        "switch",
        "this",
        "throw",
        "true",
        "try",
        "typeof",
        "var",
        "void",
        "while",
        "with",
        "yield",
        "let",
        "static",
        "implements",
        "interface",
        "package",
        "private",
        "protected",
        "public",
        "await",
        "async",
    ]
    .into_iter()
    .collect()
});

/// Naming convention applied to generated declaration names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingConvention {
    /// `PetOwner`
    #[default]
    PascalCase,
    /// `petOwner`
    CamelCase,
    /// `pet_owner`
    SnakeCase,
    /// Keep the source name, only strip characters that are not valid in identifiers.
    Preserve,
}

impl NamingConvention {
    /// Convert `name` into a valid TypeScript identifier following this convention.
    pub fn apply(self, name: &str) -> String {
        let converted = match self {
            NamingConvention::PascalCase => pascal_case(name),
            NamingConvention::CamelCase => camel_case(name),
            NamingConvention::SnakeCase => snake_case(name),
            NamingConvention::Preserve => name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect(),
        };
        make_identifier(converted)
    }
}

/// Prefix with `_` when the name is empty, starts with a digit, or is reserved.
fn make_identifier(mut name: String) -> String {
    if name.is_empty() {
        return "_empty".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) || TS_RESERVED_WORDS.contains(name.as_str())
    {
        name.insert(0, '_');
    }
    name
}

/// Check if an identifier needs bracket notation (or quoting) for property/key access.
///
/// Returns true if the name:
/// - Is empty
/// - Doesn't start with a letter, underscore, or dollar sign
/// - Contains characters other than alphanumeric, underscore, or dollar sign
pub fn needs_bracket_notation(name: &str) -> bool {
    name.is_empty()
        || !name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape a string for use in JavaScript/TypeScript string literals.
/// Escapes backslashes, double quotes and line breaks.
pub fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Quote a string if needed for use as a property key or enum key.
/// Returns the name quoted with escaped special characters if needed,
/// or the original name if it's a valid identifier.
pub fn quote_if_needed(name: &str) -> String {
    if needs_bracket_notation(name) {
        format!("\"{}\"", escape_js_string(name))
    } else {
        name.to_string()
    }
}

/// Format a property access expression (e.g., `body.foo` or `body["foo-bar"]`).
///
/// # Arguments
/// * `obj` - The object expression (e.g., "body")
/// * `prop` - The property name
/// * `required` - Whether the property is required (affects optional chaining)
pub fn format_param_access(obj: &str, prop: &str, required: bool) -> String {
    if needs_bracket_notation(prop) {
        if required {
            format!("{}[\"{}\"]", obj, escape_js_string(prop))
        } else {
            format!("{}?.[\"{}\"]", obj, escape_js_string(prop))
        }
    } else if required {
        format!("{obj}.{prop}")
    } else {
        format!("{obj}?.{prop}")
    }
}

/// Sanitize an identifier to be a valid TypeScript identifier.
/// - Replaces `-`, `.`, ` ` with separators and converts to camelCase
/// - Prepends `_` if starts with digit
/// - Escapes reserved words with `_` prefix
pub fn sanitize_ts_identifier(name: &str) -> String {
    if name.is_empty() {
        return "_empty".to_string();
    }

    // Split on separators (-, ., space) and convert to camelCase
    let parts: Vec<&str> = name.split(['-', '.', ' ', '/', '{', '}']).collect();

    let mut result = String::new();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if result.is_empty() {
            result.push_str(part);
        } else {
            result.push_str(&capitalize_first(part));
        }
    }

    let result: String = result
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();

    make_identifier(result)
}

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Convert a string to snake_case (for comparison purposes).
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Split a name into words on separators and case boundaries.
///
/// `"petOwner"`, `"pet-owner"` and `"PetOwner"` all split into `["pet"/"Pet", "Owner"/"owner"]`;
/// acronyms stay together (`"HTTPServer"` -> `["HTTP", "Server"]`).
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Convert a name to PascalCase. Acronyms are preserved.
pub fn pascal_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| capitalize_first(w))
        .collect()
}

/// Convert a name to camelCase.
pub fn camel_case(name: &str) -> String {
    let words = split_words(name);
    let mut result = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            if word.chars().all(|c| !c.is_lowercase()) {
                result.push_str(&word.to_lowercase());
            } else {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    result.extend(first.to_lowercase());
                    result.extend(chars);
                }
            }
        } else {
            result.push_str(&capitalize_first(word));
        }
    }
    result
}

/// Convert a name to snake_case.
pub fn snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_bracket_notation() {
        // Valid identifiers
        assert!(!needs_bracket_notation("foo"));
        assert!(!needs_bracket_notation("_foo"));
        assert!(!needs_bracket_notation("$foo"));
        assert!(!needs_bracket_notation("foo123"));
        assert!(!needs_bracket_notation("camelCase"));

        // Need bracket notation
        assert!(needs_bracket_notation(""));
        assert!(needs_bracket_notation("123foo"));
        assert!(needs_bracket_notation("foo-bar"));
        assert!(needs_bracket_notation("foo.bar"));
        assert!(needs_bracket_notation("foo bar"));
        assert!(needs_bracket_notation("foo:bar"));
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("hello"), "hello");
        assert_eq!(escape_js_string("hel\"lo"), "hel\\\"lo");
        assert_eq!(escape_js_string("hel\\lo"), "hel\\\\lo");
        assert_eq!(escape_js_string("a\nb"), "a\\nb");
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("foo"), "foo");
        assert_eq!(quote_if_needed("foo-bar"), "\"foo-bar\"");
        assert_eq!(quote_if_needed("123"), "\"123\"");
    }

    #[test]
    fn test_format_param_access() {
        assert_eq!(format_param_access("body", "foo", true), "body.foo");
        assert_eq!(format_param_access("body", "foo", false), "body?.foo");
        assert_eq!(
            format_param_access("body", "foo-bar", true),
            "body[\"foo-bar\"]"
        );
        assert_eq!(
            format_param_access("body", "foo-bar", false),
            "body?.[\"foo-bar\"]"
        );
    }

    #[test]
    fn test_sanitize_ts_identifier() {
        assert_eq!(sanitize_ts_identifier("foo"), "foo");
        assert_eq!(sanitize_ts_identifier("foo-bar"), "fooBar");
        assert_eq!(sanitize_ts_identifier("foo.bar"), "fooBar");
        assert_eq!(sanitize_ts_identifier("123foo"), "_123foo");
        assert_eq!(sanitize_ts_identifier("delete"), "_delete");
        assert_eq!(sanitize_ts_identifier("get_/pets/{id}"), "get_PetsId");
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(pascal_case("pet_owner"), "PetOwner");
        assert_eq!(pascal_case("petOwner"), "PetOwner");
        assert_eq!(pascal_case("PetOwner"), "PetOwner");
        assert_eq!(pascal_case("HTTPServer"), "HTTPServer");
        assert_eq!(pascal_case("user-id v2"), "UserIdV2");
        assert_eq!(camel_case("PetOwner"), "petOwner");
        assert_eq!(camel_case("HTTP_server"), "httpServer");
        assert_eq!(snake_case("PetOwner"), "pet_owner");
        assert_eq!(snake_case("HTTPServer"), "http_server");
    }

    #[test]
    fn test_pascal_case_is_idempotent() {
        for name in ["pet_owner", "HTTPServer", "a-b-c", "Already", "x2y"] {
            let once = pascal_case(name);
            assert_eq!(pascal_case(&once), once);
        }
    }

    #[test]
    fn test_naming_convention_apply() {
        assert_eq!(NamingConvention::PascalCase.apply("pet-owner"), "PetOwner");
        assert_eq!(NamingConvention::CamelCase.apply("PetOwner"), "petOwner");
        assert_eq!(NamingConvention::SnakeCase.apply("PetOwner"), "pet_owner");
        assert_eq!(NamingConvention::Preserve.apply("pet.owner"), "pet_owner");
        assert_eq!(NamingConvention::PascalCase.apply("2fa"), "_2fa");
        assert_eq!(NamingConvention::Preserve.apply("class"), "_class");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("FooBar"), "foo_bar");
        assert_eq!(to_snake_case("itemId"), "item_id");
    }
}
