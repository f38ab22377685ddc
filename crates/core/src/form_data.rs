//! Request body form encoding.
//!
//! Builds the statements that populate a `FormData` (multipart) or
//! `URLSearchParams` (url-encoded) from a request body value:
//! - read-only properties are never written
//! - optional and nullable properties are guarded with `!== undefined` / `!== null`
//! - binary values are appended as-is; text files are wrapped in a `Blob`
//! - numbers and booleans are stringified with `.toString()`
//! - arrays and nested objects follow the policy's array handling
//! - references that recurse into themselves fall back to `JSON.stringify`

use indexmap::IndexMap;
use tracing::debug;
use tsforge_common::{format_param_access, pascal_case};

use crate::alias;
use crate::context::Context;
use crate::dispatch::inferred_type;
use crate::emit::emit_block;
use crate::error::GenerationError;
use crate::policy::ArrayHandling;
use crate::resolver::{ResolvedRef, resolve_schema};
use crate::spec::{Combinator, Encoding, Schema, SchemaObject};
use crate::types::{BinOp, TemplatePart, TsExpr, TsStmt, TsType};

/// Which form container a body is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Multipart,
    UrlEncoded,
}

impl FormKind {
    /// Form kind for a request body media type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "multipart/form-data" => Some(FormKind::Multipart),
            "application/x-www-form-urlencoded" => Some(FormKind::UrlEncoded),
            _ => None,
        }
    }

    /// Name of the variable holding the container.
    pub fn variable(self) -> &'static str {
        match self {
            FormKind::Multipart => "formData",
            FormKind::UrlEncoded => "formUrlEncoded",
        }
    }

    fn constructor(self) -> &'static str {
        match self {
            FormKind::Multipart => "FormData",
            FormKind::UrlEncoded => "URLSearchParams",
        }
    }
}

/// Generated form-population code for one request body.
#[derive(Debug, Clone)]
pub struct FormEncoding {
    pub kind: FormKind,
    /// Variable the populated container is bound to
    pub variable: String,
    pub statements: Vec<TsStmt>,
    /// `statements` rendered as TypeScript
    pub code: String,
}

/// Generate the statements writing `body` (a value of `schema`) into a form container.
///
/// `encodings` is the media type's per-property `encoding` map.
pub fn encode_form_body(
    schema: &Schema,
    body: &str,
    kind: FormKind,
    encodings: &IndexMap<String, Encoding>,
    ctx: &mut Context<'_>,
) -> Result<FormEncoding, GenerationError> {
    let encoder = FormEncoder {
        kind,
        encodings,
        arrays: ctx.policy.form_data.array_handling,
    };

    let mut statements = vec![TsStmt::Const {
        name: kind.variable().to_string(),
        ty: None,
        init: TsExpr::New {
            callee: Box::new(TsExpr::ident(kind.constructor())),
            args: Vec::new(),
        },
    }];

    let (concrete, resolved) = resolve_schema(schema, ctx)?;
    let writes = within(ctx, resolved.as_ref(), |ctx| {
        encoder.top_level(&concrete, body, ctx)
    })?;
    statements.extend(writes);

    debug!(
        body,
        kind = ?kind,
        statements = statements.len(),
        "Generated form encoding."
    );
    Ok(FormEncoding {
        kind,
        variable: kind.variable().to_string(),
        code: emit_block(&statements),
        statements,
    })
}

/// Run `f` inside the resolved reference's document with the reference marked as an ancestor.
fn within<'a, T>(
    ctx: &mut Context<'a>,
    resolved: Option<&ResolvedRef>,
    f: impl FnOnce(&mut Context<'a>) -> T,
) -> T {
    match resolved {
        Some(resolved) => ctx.in_document(&resolved.target_document, |ctx| {
            ctx.with_ancestor(&resolved.key, f)
        }),
        None => f(ctx),
    }
}

fn is_recursive(ctx: &Context<'_>, resolved: Option<&ResolvedRef>) -> bool {
    resolved.is_some_and(|r| ctx.is_ancestor(&r.key))
}

struct FormEncoder<'e> {
    kind: FormKind,
    encodings: &'e IndexMap<String, Encoding>,
    arrays: ArrayHandling,
}

impl FormEncoder<'_> {
    fn top_level(
        &self,
        schema: &Schema,
        body: &str,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        let Some(obj) = schema.as_object() else {
            return Ok(Vec::new());
        };
        let Some((Combinator::OneOf | Combinator::AnyOf, members)) = obj.combinator() else {
            return self.object_statements(obj, body, &[], 0, false, ctx);
        };

        let mut statements = Vec::new();
        for member in members {
            let (concrete, resolved) = resolve_schema(member, ctx)?;
            let Some(member_obj) = concrete.as_object() else {
                continue;
            };
            let Some(resolved) = resolved else {
                statements.extend(self.object_statements(member_obj, body, &[], 0, true, ctx)?);
                continue;
            };

            let type_name = ctx.policy.type_name(&resolved.name);
            let import = alias::import_for(&type_name, &resolved.document, ctx);
            let cast = format!("{body}{}", pascal_case(import.local_name()));
            statements.push(TsStmt::Const {
                name: cast.clone(),
                ty: None,
                init: TsExpr::Cast {
                    expr: Box::new(TsExpr::ident(body)),
                    ty: TsType::Ref(import.local_name().to_string()),
                },
            });
            let writes = within(ctx, Some(&resolved), |ctx| {
                self.object_statements(member_obj, &cast, &[], 0, true, ctx)
            })?;
            statements.extend(writes);
        }
        Ok(statements)
    }

    /// One guarded write per writable property of `obj`.
    fn object_statements(
        &self,
        obj: &SchemaObject,
        value: &str,
        prefix: &[TemplatePart],
        depth: usize,
        all_optional: bool,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        let (properties, required) = collect_properties(obj, ctx)?;
        let mut statements = Vec::new();

        for (key, prop) in &properties {
            if prop.is_read_only() {
                continue;
            }
            let (concrete, resolved) = resolve_schema(prop, ctx)?;
            if concrete.is_read_only() {
                continue;
            }

            let access = format_param_access(value, key, true);
            let mut form_key = prefix.to_vec();
            form_key.push(TemplatePart::Static(key.clone()));
            let content_type = if prefix.is_empty() {
                self.encodings.get(key).and_then(|e| e.content_type.clone())
            } else {
                None
            };

            let writes = if is_recursive(ctx, resolved.as_ref()) {
                vec![self.append(form_key, self.stringified(&access, None))]
            } else {
                within(ctx, resolved.as_ref(), |ctx| {
                    self.value_statements(&concrete, &access, form_key, depth, content_type, false, ctx)
                })?
            };

            let required = !all_optional && required.iter().any(|r| r == key);
            statements.extend(guarded(writes, &access, required, is_nullable(&concrete)));
        }
        Ok(statements)
    }

    /// Writes for one value. `element` is set for array elements, whose primitives are always stringified.
    #[allow(clippy::too_many_arguments)]
    fn value_statements(
        &self,
        schema: &Schema,
        access: &str,
        key: Vec<TemplatePart>,
        depth: usize,
        content_type: Option<String>,
        element: bool,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        let raw = TsExpr::Raw(access.to_string());
        let Some(obj) = schema.as_object() else {
            return Ok(vec![self.append(key, raw)]);
        };

        if let Some((kind, members)) = obj.combinator() {
            if kind == Combinator::AllOf {
                return self.object_value(obj, access, key, depth, content_type, ctx);
            }
            return self.union_value(members, access, key, content_type, ctx);
        }

        let stmt = match inferred_type(obj) {
            Some("string") if is_binary(obj) => self.append(key, raw),
            Some("string") => {
                let text_type = content_type.or_else(|| obj.content_media_type.clone());
                match text_type {
                    Some(ct) if self.kind == FormKind::Multipart => {
                        self.append(key, text_file(access, &ct))
                    }
                    _ if element => self.append(key, to_string(access)),
                    _ => self.append(key, raw),
                }
            }
            Some("number" | "integer" | "boolean") => self.append(key, to_string(access)),
            Some("array") => return self.array_statements(obj, access, key, depth, ctx),
            Some("object") => return self.object_value(obj, access, key, depth, content_type, ctx),
            _ => self.append(key, raw),
        };
        Ok(vec![stmt])
    }

    fn union_value(
        &self,
        members: &[Schema],
        access: &str,
        key: Vec<TemplatePart>,
        content_type: Option<String>,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        let mut primitive = 0;
        let mut objects = 0;
        let mut non_null = 0;
        for member in members {
            let (concrete, _) = resolve_schema(member, ctx)?;
            let Some(member) = concrete.as_object() else {
                continue;
            };
            match inferred_type(member) {
                Some("null") => continue,
                Some("number" | "integer" | "boolean") => primitive += 1,
                Some("object") => objects += 1,
                None if member.combinator().is_some() => objects += 1,
                _ => {}
            }
            non_null += 1;
        }

        let value = if primitive == 1 {
            to_string(access)
        } else if non_null > 0 && objects == non_null {
            self.stringified(access, content_type.as_deref())
        } else {
            TsExpr::Raw(access.to_string())
        };
        Ok(vec![self.append(key, value)])
    }

    fn object_value(
        &self,
        obj: &SchemaObject,
        access: &str,
        key: Vec<TemplatePart>,
        depth: usize,
        content_type: Option<String>,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        if self.arrays == ArrayHandling::Explode {
            let mut prefix = key;
            prefix.push(TemplatePart::Static(".".to_string()));
            return self.object_statements(obj, access, &prefix, depth, false, ctx);
        }
        Ok(vec![self.append(key, self.stringified(access, content_type.as_deref()))])
    }

    fn array_statements(
        &self,
        obj: &SchemaObject,
        access: &str,
        key: Vec<TemplatePart>,
        depth: usize,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<TsStmt>, GenerationError> {
        let suffix = if depth == 0 {
            String::new()
        } else {
            depth.to_string()
        };
        let value_var = format!("value{suffix}");
        let index_var = format!("index{suffix}");

        let (element_key, params) = match self.arrays {
            ArrayHandling::Explode => {
                let mut element_key = key;
                element_key.push(TemplatePart::Static("[".to_string()));
                element_key.push(TemplatePart::Dynamic(TsExpr::ident(index_var.clone())));
                element_key.push(TemplatePart::Static("]".to_string()));
                (element_key, vec![value_var.clone(), index_var])
            }
            ArrayHandling::SerializeWithBrackets => {
                let mut element_key = key;
                element_key.push(TemplatePart::Static("[]".to_string()));
                (element_key, vec![value_var.clone()])
            }
            ArrayHandling::Serialize => (key, vec![value_var.clone()]),
        };

        let body = match obj.items.as_deref() {
            Some(items) => {
                let (concrete, resolved) = resolve_schema(items, ctx)?;
                if is_recursive(ctx, resolved.as_ref()) {
                    vec![self.append(element_key, self.stringified(&value_var, None))]
                } else {
                    within(ctx, resolved.as_ref(), |ctx| {
                        self.value_statements(&concrete, &value_var, element_key, depth + 1, None, true, ctx)
                    })?
                }
            }
            None => vec![self.append(element_key, TsExpr::ident(value_var.clone()))],
        };

        Ok(vec![TsStmt::ForEach {
            collection: TsExpr::Raw(access.to_string()),
            params,
            body,
        }])
    }

    /// `JSON.stringify(value)`, wrapped in a JSON `Blob` for multipart bodies.
    fn stringified(&self, access: &str, content_type: Option<&str>) -> TsExpr {
        let json = TsExpr::ident("JSON").method("stringify", vec![TsExpr::Raw(access.to_string())]);
        match self.kind {
            FormKind::Multipart => blob(json, content_type.unwrap_or("application/json")),
            FormKind::UrlEncoded => json,
        }
    }

    fn append(&self, key: Vec<TemplatePart>, value: TsExpr) -> TsStmt {
        TsStmt::Expr(
            TsExpr::ident(self.kind.variable()).method("append", vec![key_expr(key), value]),
        )
    }
}

/// Own properties of `obj` plus those of its `allOf` members, with their `required` lists.
fn collect_properties(
    obj: &SchemaObject,
    ctx: &mut Context<'_>,
) -> Result<(IndexMap<String, Schema>, Vec<String>), GenerationError> {
    let mut properties = IndexMap::new();
    let mut required = Vec::new();

    for member in obj.all_of.iter().flatten() {
        let (concrete, resolved) = resolve_schema(member, ctx)?;
        if is_recursive(ctx, resolved.as_ref()) {
            continue;
        }
        let Some(member) = concrete.as_object() else {
            continue;
        };
        let (member_props, member_required) =
            within(ctx, resolved.as_ref(), |ctx| collect_properties(member, ctx))?;
        properties.extend(member_props);
        required.extend(member_required);
    }
    properties.extend(obj.properties.clone());
    required.extend(obj.required.iter().cloned());
    Ok((properties, required))
}

fn is_binary(obj: &SchemaObject) -> bool {
    obj.format.as_deref() == Some("binary")
        || obj.content_media_type.as_deref() == Some("application/octet-stream")
}

fn is_nullable(schema: &Schema) -> bool {
    let Some(obj) = schema.as_object() else {
        return false;
    };
    obj.is_nullable()
        || obj
            .one_of
            .iter()
            .chain(obj.any_of.iter())
            .flatten()
            .filter_map(Schema::as_object)
            .any(|m| m.types() == ["null"] || m.is_nullable())
}

fn guarded(writes: Vec<TsStmt>, access: &str, required: bool, nullable: bool) -> Vec<TsStmt> {
    let not = |literal: &str| {
        TsExpr::Raw(access.to_string()).bin(BinOp::StrictNotEqual, TsExpr::ident(literal))
    };
    let cond = match (required, nullable) {
        (true, false) => return writes,
        (true, true) => not("null"),
        (false, false) => not("undefined"),
        (false, true) => not("undefined").bin(BinOp::And, not("null")),
    };
    vec![TsStmt::If {
        cond,
        then_body: writes,
    }]
}

fn to_string(access: &str) -> TsExpr {
    TsExpr::Raw(access.to_string()).method("toString", Vec::new())
}

fn blob(content: TsExpr, content_type: &str) -> TsExpr {
    TsExpr::New {
        callee: Box::new(TsExpr::ident("Blob")),
        args: vec![
            TsExpr::Array(vec![content]),
            TsExpr::Object(vec![("type".to_string(), TsExpr::string(content_type))]),
        ],
    }
}

/// `x instanceof Blob ? x : new Blob([x], { type: "..." })`
fn text_file(access: &str, content_type: &str) -> TsExpr {
    let raw = TsExpr::Raw(access.to_string());
    TsExpr::Ternary {
        cond: Box::new(raw.clone().bin(BinOp::InstanceOf, TsExpr::ident("Blob"))),
        then_expr: Box::new(raw.clone()),
        else_expr: Box::new(blob(raw, content_type)),
    }
}

/// A string literal when every part is static, otherwise a template literal.
fn key_expr(parts: Vec<TemplatePart>) -> TsExpr {
    let mut merged: Vec<TemplatePart> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(TemplatePart::Static(last)), TemplatePart::Static(next)) => last.push_str(&next),
            (_, part) => merged.push(part),
        }
    }
    match merged.as_slice() {
        [] => TsExpr::string(""),
        [TemplatePart::Static(text)] => TsExpr::string(text.clone()),
        _ => TsExpr::Template(merged),
    }
}
