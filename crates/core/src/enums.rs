//! Enum members and const-enum declarations.
//!
//! Enum keys come from `x-enumNames` / `x-enum-varnames` when they line up with
//! the values; otherwise strings are used verbatim (quoted when needed),
//! numbers become `NUMBER_<n>`, booleans `TRUE`/`FALSE` and null `NULL`.

use serde_json::Value;
use tsforge_common::quote_if_needed;

use crate::emit::Emit;
use crate::spec::SchemaObject;
use crate::types::{ConstEnumMember, TsLiteral, TsType, TsTypeDef, TypeDefKind};

/// Generate a key name for an enum value (used in const enum objects).
pub fn enum_value_key(value: &Value) -> String {
    match value {
        Value::String(s) => quote_if_needed(s),
        Value::Number(n) => {
            let text = n.to_string().replace('-', "MINUS_").replace(['.', '+'], "_");
            format!("NUMBER_{text}")
        }
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => "NULL".to_string(),
        Value::Array(_) | Value::Object(_) => quote_if_needed(&value.to_string()),
    }
}

/// Enum values of `schema`, deduplicated, in declaration order.
pub fn enum_values(schema: &SchemaObject) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::new();
    for value in schema.enum_values.iter().flatten() {
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
    values
}

/// Const-enum members for `schema`, excluding `null`.
pub fn enum_members(schema: &SchemaObject) -> Vec<ConstEnumMember> {
    let raw_values = schema.enum_values.clone().unwrap_or_default();
    let names = schema
        .extension_strings("x-enumNames")
        .or_else(|| schema.extension_strings("x-enum-varnames"))
        .filter(|names| names.len() == raw_values.len());
    let descriptions = schema
        .extension_strings("x-enum-descriptions")
        .filter(|d| d.len() == raw_values.len());

    let mut seen: Vec<&Value> = Vec::new();
    let mut members = Vec::new();
    for (i, value) in raw_values.iter().enumerate() {
        if value.is_null() || seen.contains(&value) {
            continue;
        }
        seen.push(value);
        let Some(literal) = TsLiteral::from_json(value) else {
            continue;
        };
        let key = names
            .as_ref()
            .map(|n| quote_if_needed(&n[i]))
            .unwrap_or_else(|| enum_value_key(value));
        let description = descriptions
            .as_ref()
            .map(|d| d[i].clone())
            .filter(|d| !d.is_empty());
        members.push(ConstEnumMember::Entry {
            key,
            value: literal,
            description,
        });
    }
    members
}

/// Union of the literal values of an enum, `null` included when present.
pub fn literal_union(values: &[Value]) -> String {
    let literals: Vec<TsType> = values
        .iter()
        .filter_map(TsLiteral::from_json)
        .map(TsType::Literal)
        .collect();
    if literals.is_empty() {
        return "never".to_string();
    }
    TsType::Union(literals).emit()
}

/// Render `export const Name = { ... } as const;` followed by its derived type.
pub fn enum_declaration(name: &str, members: Vec<ConstEnumMember>, nullable: bool) -> String {
    TsTypeDef {
        name: name.to_string(),
        kind: TypeDefKind::ConstEnum { members, nullable },
    }
    .emit()
}
