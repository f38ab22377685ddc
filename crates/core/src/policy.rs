//! Output policy: the knobs a host passes to a generation run.
//!
//! The policy is plain serde data so the configuration-loading layer can build
//! it from any format; [`OutputPolicy::from_toml_str`] covers the common case.

use indexmap::IndexMap;
use serde::Deserialize;
use tsforge_common::NamingConvention;

use crate::error::GenerationError;

/// How discriminated unions are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscriminatedUnions {
    /// Plain union of the member types.
    #[default]
    Erase,
    /// Tag const enum plus one alias per tag, joined into a union.
    Collapse,
}

/// How arrays (and nested objects) are written into form bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayHandling {
    /// One `key` entry per element.
    #[default]
    Serialize,
    /// `key[0]`, `key[1]`... entries; nested objects become `key.field` entries.
    Explode,
    /// One `key[]` entry per element.
    SerializeWithBrackets,
}

/// Form-encoding settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FormDataPolicy {
    pub array_handling: ArrayHandling,
}

/// What to do with an array schema that has neither `items` nor `prefixItems`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UntypedArrays {
    /// `unknown[]` when the document dialect permits it, otherwise an error.
    #[default]
    FollowDialect,
    /// Always `unknown[]`.
    Allow,
}

/// Output policy for one generation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputPolicy {
    /// String format -> TypeScript type, merged over the built-in table.
    pub format_overrides: IndexMap<String, String>,
    /// Render `date` and `date-time` strings as `Date`.
    pub use_dates: bool,
    /// Render `int64` and `uint64` integers as `bigint`.
    pub use_bigint: bool,
    pub discriminated_unions: DiscriminatedUnions,
    /// Pad oneOf/anyOf object members with `key?: never` for sibling-only keys.
    pub union_add_missing_properties: bool,
    pub naming_convention: NamingConvention,
    pub form_data: FormDataPolicy,
    pub untyped_arrays: UntypedArrays,
    /// Promote inline combinator members to `<Name><Combinator><Ordinal>` declarations.
    pub alias_combined_types: bool,
    pub suppress_readonly_modifier: bool,
    /// Compile `x-brand` scalar schemas to branded declarations.
    pub use_branded_types: bool,
    /// Fail instead of dropping a declaration whose name is already taken.
    pub strict_duplicate_names: bool,
    /// Suffix for promoted array item declarations.
    pub item_suffix: String,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            format_overrides: IndexMap::new(),
            use_dates: false,
            use_bigint: false,
            discriminated_unions: DiscriminatedUnions::default(),
            union_add_missing_properties: false,
            naming_convention: NamingConvention::default(),
            form_data: FormDataPolicy::default(),
            untyped_arrays: UntypedArrays::default(),
            alias_combined_types: false,
            suppress_readonly_modifier: false,
            use_branded_types: false,
            strict_duplicate_names: false,
            item_suffix: "Item".to_string(),
        }
    }
}

impl OutputPolicy {
    /// Parse a policy from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, GenerationError> {
        Ok(toml::from_str(source)?)
    }

    /// TypeScript type substituted for a string `format`, if any.
    ///
    /// Caller overrides win over the built-in table.
    pub fn format_type(&self, format: &str) -> Option<String> {
        if let Some(ty) = self.format_overrides.get(format) {
            return Some(ty.clone());
        }
        match format {
            "binary" => Some("Blob".to_string()),
            "date" | "date-time" if self.use_dates => Some("Date".to_string()),
            _ => None,
        }
    }

    /// Apply the naming convention to a source name.
    pub fn type_name(&self, name: &str) -> String {
        self.naming_convention.apply(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = OutputPolicy::default();
        assert_eq!(policy.item_suffix, "Item");
        assert_eq!(policy.discriminated_unions, DiscriminatedUnions::Erase);
        assert_eq!(policy.form_data.array_handling, ArrayHandling::Serialize);
        assert_eq!(policy.naming_convention, NamingConvention::PascalCase);
    }

    #[test]
    fn test_from_toml_str() {
        let policy = OutputPolicy::from_toml_str(
            r#"
use-dates = true
discriminated-unions = "collapse"
naming-convention = "preserve"
untyped-arrays = "allow"

[form-data]
array-handling = "serialize-with-brackets"

[format-overrides]
uuid = "UUID"
"#,
        )
        .unwrap();

        assert!(policy.use_dates);
        assert_eq!(policy.discriminated_unions, DiscriminatedUnions::Collapse);
        assert_eq!(policy.naming_convention, NamingConvention::Preserve);
        assert_eq!(policy.untyped_arrays, UntypedArrays::Allow);
        assert_eq!(
            policy.form_data.array_handling,
            ArrayHandling::SerializeWithBrackets
        );
        assert_eq!(policy.item_suffix, "Item");
        assert_eq!(policy.format_type("uuid").as_deref(), Some("UUID"));
    }

    #[test]
    fn test_invalid_policy() {
        let err = OutputPolicy::from_toml_str("discriminated-unions = \"sometimes\"").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidPolicy(_)));
    }

    #[test]
    fn test_format_table() {
        let mut policy = OutputPolicy::default();
        assert_eq!(policy.format_type("binary").as_deref(), Some("Blob"));
        assert_eq!(policy.format_type("date-time"), None);
        policy.use_dates = true;
        assert_eq!(policy.format_type("date").as_deref(), Some("Date"));
        policy
            .format_overrides
            .insert("binary".into(), "File".into());
        assert_eq!(policy.format_type("binary").as_deref(), Some("File"));
    }
}
