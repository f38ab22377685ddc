//! Shared naming and type-text utilities for tsforge.
//!
//! This crate contains the pieces used both by the generation engine in
//! `tsforge-core` and by the emitters built on top of it:
//! - identifier sanitization and case conversion ([`naming`])
//! - bracket-aware manipulation of rendered TypeScript type text ([`text`])

pub mod naming;
pub mod text;

// Re-export commonly used items
pub use naming::{
    NamingConvention, camel_case, capitalize_first, escape_js_string, format_param_access,
    needs_bracket_notation, pascal_case, quote_if_needed, sanitize_ts_identifier, snake_case,
    to_snake_case,
};
pub use text::{dedupe_union, has_top_level_union, replace_identifier, split_top_level, wrap_union};
