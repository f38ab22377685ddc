//! Scalar/value dispatch: the entry points that turn a schema node into a
//! [`CompiledValue`].
//!
//! Dispatch order is reference, combinator, type array, then a switch on the
//! primitive type. [`resolve_object`] adds promotion of inline objects and
//! enums to named declarations, and memoizes results per
//! `(schema, name, combined, document, declaration)`.

use std::collections::HashSet;

use tracing::trace;
use tsforge_common::split_top_level;

use crate::alias;
use crate::array;
use crate::brand;
use crate::combine;
use crate::context::{Context, ValueKey};
use crate::emit::Emit;
use crate::enums::{enum_declaration, enum_members, enum_values, literal_union};
use crate::error::GenerationError;
use crate::object;
use crate::resolver::{ResolvedRef, ref_sibling_nullable, resolve_schema_ref};
use crate::spec::{Combinator, Schema, SchemaObject, SchemaType};
use crate::types::{TsLiteral, TsType, TsTypeDef, TypeDefKind};
use crate::value::{CompiledValue, Declaration, ImportDescriptor, TypeCategory};

/// Compile a schema node without promoting it to a declaration.
pub fn compile_value(
    schema: &Schema,
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    match schema {
        Schema::Bool(true) => Ok(CompiledValue::unknown()),
        Schema::Bool(false) => Ok(CompiledValue::new("never", TypeCategory::Unknown)),
        Schema::Object(obj) => match &obj.reference {
            Some(reference) => compile_reference(obj, reference, ctx),
            None => compile_inline(obj, name, ctx),
        },
    }
}

/// Compile a schema node, promoting named inline objects and enums to their own declarations.
///
/// `prop_name` is the name a promoted declaration gets. Enums are not promoted
/// when `combined` is set, so combinator members stay joinable.
pub fn resolve_object(
    schema: &Schema,
    prop_name: Option<&str>,
    combined: bool,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let key = ValueKey {
        schema: serde_json::to_string(schema).unwrap_or_default(),
        name: prop_name.map(str::to_string),
        combined,
        document: ctx.document.clone(),
        declaration: ctx.declaration.clone(),
    };
    if let Some(hit) = ctx.state.values.get(&key) {
        trace!(name = prop_name.unwrap_or("<inline>"), "Value cache hit.");
        return Ok(hit.clone());
    }

    let compiled = compile_value(schema, prop_name, ctx)?;
    let result = match prop_name {
        Some(prop_name) => promote(compiled, prop_name, combined, ctx),
        None => compiled,
    };
    ctx.state.values.insert(key, result.clone());
    Ok(result)
}

fn promote(
    compiled: CompiledValue,
    prop_name: &str,
    combined: bool,
    ctx: &Context<'_>,
) -> CompiledValue {
    let is_compound_object = compiled.category == TypeCategory::Object
        && !compiled.is_enum
        && compiled.value.contains(['{', '&', '|']);

    if is_compound_object {
        let def = match &compiled.properties {
            Some(properties) => TsTypeDef {
                name: prop_name.to_string(),
                kind: TypeDefKind::Interface {
                    properties: properties.clone(),
                },
            },
            None => TsTypeDef {
                name: prop_name.to_string(),
                kind: TypeDefKind::TypeAlias {
                    ty: TsType::Ref(compiled.value.clone()),
                },
            },
        };
        return promoted(compiled, prop_name, def.emit(), TypeCategory::Object, ctx);
    }

    if compiled.is_enum && !combined && !compiled.is_ref && !compiled.enum_members.is_empty() {
        let nullable = has_null_member(&compiled.value);
        let body = enum_declaration(prop_name, compiled.enum_members.clone(), nullable);
        return promoted(compiled, prop_name, body, TypeCategory::Enum, ctx);
    }

    compiled
}

fn promoted(
    compiled: CompiledValue,
    prop_name: &str,
    body: String,
    category: TypeCategory,
    ctx: &Context<'_>,
) -> CompiledValue {
    let declaration = Declaration::new(prop_name, body, ctx.document.clone())
        .with_imports(compiled.imports.clone());

    let mut value = CompiledValue::new(prop_name, category);
    value.is_ref = compiled.is_ref;
    value.has_readonly_props = compiled.has_readonly_props;
    value.side_schemas = compiled.side_schemas;
    value.side_schemas.push(declaration);
    value.add_import(ImportDescriptor::new(prop_name, ctx.document.clone()));
    value.example = compiled.example;
    value.examples = compiled.examples;
    value
}

/// True when `value` has a top-level `null` member.
pub(crate) fn has_null_member(value: &str) -> bool {
    split_top_level(value, '|').iter().any(|m| m == "null")
}

fn compile_reference(
    node: &SchemaObject,
    reference: &str,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let resolved = resolve_schema_ref(reference, ctx)?;
    let name = ctx.policy.type_name(&resolved.name);
    let import = alias::import_for(&name, &resolved.document, ctx);

    let mut value = CompiledValue::new(import.local_name(), category_of(&resolved.schema));
    value.is_ref = true;
    value.is_enum = resolved
        .schema
        .as_object()
        .is_some_and(|target| target.enum_values.is_some());
    value.has_readonly_props = reference_has_readonly_props(&resolved, ctx)?;
    value.add_import(import);
    if ref_sibling_nullable(node) {
        value.make_nullable();
    }
    value.example = node
        .example
        .clone()
        .or_else(|| resolved.schema.as_object().and_then(|t| t.example.clone()));
    value.examples = node.examples.clone();
    Ok(value)
}

/// Type category of a schema, from its declared or inferred type.
pub(crate) fn category_of(schema: &Schema) -> TypeCategory {
    let Some(obj) = schema.as_object() else {
        return TypeCategory::Unknown;
    };
    match inferred_type(obj) {
        Some("number" | "integer") => TypeCategory::Number,
        Some("string") => TypeCategory::String,
        Some("boolean") => TypeCategory::Boolean,
        Some("array") => TypeCategory::Array,
        Some("null") => TypeCategory::Null,
        Some(_) => TypeCategory::Object,
        None if obj.combinator().is_some() || obj.reference.is_some() => TypeCategory::Object,
        None => TypeCategory::Unknown,
    }
}

/// The declared type, or the one implied by the keywords present.
pub(crate) fn inferred_type(obj: &SchemaObject) -> Option<&str> {
    if let Some(first) = obj.non_null_types().first().copied() {
        return Some(first);
    }
    if matches!(&obj.schema_type, Some(SchemaType::Single(t)) if t == "null") {
        return Some("null");
    }
    if !obj.properties.is_empty() || obj.additional_properties.is_some() {
        return Some("object");
    }
    if obj.items.is_some() || obj.prefix_items.is_some() {
        return Some("array");
    }
    let sample = obj
        .enum_values
        .as_ref()
        .and_then(|values| values.iter().find(|v| !v.is_null()))
        .or(obj.const_value.as_ref());
    match sample {
        Some(serde_json::Value::String(_)) => Some("string"),
        Some(serde_json::Value::Number(_)) => Some("number"),
        Some(serde_json::Value::Bool(_)) => Some("boolean"),
        _ => None,
    }
}

/// Compile a non-reference schema node.
pub(crate) fn compile_inline(
    obj: &SchemaObject,
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    trace!(
        name = name.unwrap_or("<inline>"),
        document = %ctx.document,
        "Compiling schema."
    );

    let mut compiled = if let Some((kind, members)) = obj.combinator() {
        combine::combine_schemas(obj, kind, members, name, ctx)?
    } else {
        let non_null = obj.non_null_types();
        if non_null.len() > 1 {
            compile_type_array(obj, &non_null, name, ctx)?
        } else {
            compile_scalar(obj, inferred_type(obj), name, ctx)?
        }
    };

    if obj.is_nullable() {
        compiled.make_nullable();
    }
    if compiled.example.is_none() {
        compiled.example = obj.example.clone();
    }
    if compiled.examples.is_none() {
        compiled.examples = obj.examples.clone();
    }
    Ok(compiled)
}

/// `type: [a, b]` compiles as `anyOf` of single-typed copies of the schema.
fn compile_type_array(
    obj: &SchemaObject,
    types: &[&str],
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let variants: Vec<Schema> = types
        .iter()
        .map(|t| {
            Schema::from(SchemaObject {
                schema_type: Some(SchemaType::Single((*t).to_string())),
                nullable: None,
                ..obj.clone()
            })
        })
        .collect();
    let synthetic = SchemaObject {
        any_of: Some(variants),
        ..SchemaObject::default()
    };
    let members = synthetic.any_of.clone().unwrap_or_default();
    combine::combine_schemas(&synthetic, Combinator::AnyOf, &members, name, ctx)
}

fn compile_scalar(
    obj: &SchemaObject,
    schema_type: Option<&str>,
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let compiled = match schema_type {
        Some("number" | "integer") => {
            let wide = matches!(obj.format.as_deref(), Some("int64" | "uint64"));
            let base = if ctx.policy.use_bigint && wide {
                "bigint"
            } else {
                "number"
            };
            literal_or(obj, base, TypeCategory::Number)
        }
        Some("boolean") => literal_or(obj, "boolean", TypeCategory::Boolean),
        Some("string") => {
            let base = string_base_type(obj, ctx);
            literal_or(obj, &base, TypeCategory::String)
        }
        Some("null") => return Ok(CompiledValue::new("null", TypeCategory::Null)),
        Some("array") => return array::compile_array(obj, name, ctx),
        _ => return object::compile_object(obj, name, ctx),
    };
    brand::apply_brand(obj, compiled, ctx)
}

fn string_base_type(obj: &SchemaObject, ctx: &Context<'_>) -> String {
    if let Some(ty) = obj.format.as_deref().and_then(|f| ctx.policy.format_type(f)) {
        return ty;
    }
    if obj.content_media_type.as_deref() == Some("application/octet-stream") {
        return "Blob".to_string();
    }
    "string".to_string()
}

/// Enum literal union, const literal, or the base type.
fn literal_or(obj: &SchemaObject, base: &str, category: TypeCategory) -> CompiledValue {
    if obj.enum_values.is_some() {
        let mut value = CompiledValue::new(literal_union(&enum_values(obj)), category);
        value.is_enum = true;
        value.enum_members = enum_members(obj);
        return value;
    }
    if let Some(literal) = obj.const_value.as_ref().and_then(TsLiteral::from_json) {
        return CompiledValue::new(literal.emit(), category);
    }
    CompiledValue::new(base, category)
}

/// Whether the target of a resolved reference has read-only properties anywhere below it.
///
/// Results are memoized per reference key for the whole run. A walk that comes
/// back empty clears every reference it visited, so shared targets are walked once.
pub(crate) fn reference_has_readonly_props(
    resolved: &ResolvedRef,
    ctx: &mut Context<'_>,
) -> Result<bool, GenerationError> {
    let mut visited = HashSet::new();
    let found = readonly_reference(resolved, ctx, &mut visited)?;
    if !found {
        for key in visited {
            ctx.state.readonly.insert(key, false);
        }
    }
    Ok(found)
}

fn readonly_reference(
    resolved: &ResolvedRef,
    ctx: &mut Context<'_>,
    visited: &mut HashSet<String>,
) -> Result<bool, GenerationError> {
    if let Some(&known) = ctx.state.readonly.get(&resolved.key) {
        return Ok(known);
    }
    if !visited.insert(resolved.key.clone()) {
        return Ok(false);
    }
    let found = ctx.in_document(&resolved.target_document, |ctx| {
        readonly_walk(&resolved.schema, ctx, visited)
    })?;
    if found {
        ctx.state.readonly.insert(resolved.key.clone(), true);
    }
    Ok(found)
}

fn readonly_walk(
    schema: &Schema,
    ctx: &mut Context<'_>,
    visited: &mut HashSet<String>,
) -> Result<bool, GenerationError> {
    let Some(obj) = schema.as_object() else {
        return Ok(false);
    };
    if let Some(reference) = &obj.reference {
        let resolved = resolve_schema_ref(reference, ctx)?;
        return readonly_reference(&resolved, ctx, visited);
    }

    if obj.properties.values().any(Schema::is_read_only) {
        return Ok(true);
    }
    let mut children: Vec<&Schema> = obj.properties.values().collect();
    children.extend(obj.items.as_deref());
    children.extend(obj.additional_properties.as_deref());
    children.extend(obj.prefix_items.iter().flatten());
    children.extend(obj.all_of.iter().flatten());
    children.extend(obj.one_of.iter().flatten());
    children.extend(obj.any_of.iter().flatten());
    for child in children {
        if readonly_walk(child, ctx, visited)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compile a component schema into its declarations.
///
/// Side declarations come first, followed by the declaration named `name`
/// (unless a side declaration already took that name, as combined enums do).
pub fn compile_declaration(
    name: &str,
    schema: &Schema,
    ctx: &mut Context<'_>,
) -> Result<Vec<Declaration>, GenerationError> {
    let decl_name = ctx.policy.type_name(name);
    let previous = ctx.declaration.replace(decl_name.clone());
    let compiled = compile_value(schema, Some(&decl_name), ctx);
    ctx.declaration = previous;
    let compiled = compiled?;

    let mut declarations = compiled.side_schemas.clone();
    if declarations.iter().any(|d| d.name == decl_name) {
        return Ok(declarations);
    }

    let def = if compiled.is_enum && !compiled.is_ref && !compiled.enum_members.is_empty() {
        TsTypeDef {
            name: decl_name.clone(),
            kind: TypeDefKind::ConstEnum {
                members: compiled.enum_members.clone(),
                nullable: has_null_member(&compiled.value),
            },
        }
    } else if let Some(properties) = &compiled.properties {
        TsTypeDef {
            name: decl_name.clone(),
            kind: TypeDefKind::Interface {
                properties: properties.clone(),
            },
        }
    } else {
        TsTypeDef {
            name: decl_name.clone(),
            kind: TypeDefKind::TypeAlias {
                ty: TsType::Ref(compiled.value.clone()),
            },
        }
    };

    declarations.push(
        Declaration::new(decl_name, def.emit(), ctx.document.clone())
            .with_imports(compiled.imports),
    );
    Ok(declarations)
}
