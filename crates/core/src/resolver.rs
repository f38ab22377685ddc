//! Reference resolution across a multi-document workspace.
//!
//! - Splits `doc#/pointer` references and resolves the document part relative
//!   to the referring document
//! - Decodes JSON pointer escapes (`~0`, `~1`) and percent-encoded characters
//! - Follows reference chains, recording each hop, and fails on loops
//! - Caches resolved schemas per `(document, reference)`

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::context::Context;
use crate::error::GenerationError;
use crate::spec::{RefOr, Schema, SchemaObject, SchemaType};
use crate::value::ImportDescriptor;

/// A resolved schema reference.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// The concrete schema at the end of the reference chain
    pub schema: Schema,
    /// Raw (unconverted) name of the first hop's target
    pub name: String,
    /// Document the first hop's target lives in
    pub document: String,
    /// Document the concrete schema lives in; nested references resolve against it
    pub target_document: String,
    /// Canonical `document#pointer` key of the first hop, used as the cycle-guard identity
    pub key: String,
    /// One import per hop, in traversal order
    pub imports: Vec<ImportDescriptor>,
}

/// Split a reference into its document part and pointer part.
pub fn split_reference(reference: &str) -> (&str, &str) {
    match reference.split_once('#') {
        Some((doc, pointer)) => (doc, pointer),
        None => (reference, ""),
    }
}

/// Decode a JSON pointer into its reference tokens.
pub fn decode_pointer(pointer: &str) -> Vec<String> {
    let pointer = pointer.strip_prefix('/').unwrap_or(pointer);
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .split('/')
        .map(|token| percent_decode(token).replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn percent_decode(token: &str) -> String {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3])
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| token.to_string())
}

/// Walk `tokens` down from `value`.
fn lookup<'v>(value: &'v Value, tokens: &[String]) -> Option<&'v Value> {
    tokens.iter().try_fold(value, |current, token| match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Locate the raw value a reference points to, returning it with its document key.
fn locate<'w>(
    reference: &str,
    from_document: &str,
    ctx: &Context<'w>,
) -> Option<(&'w Value, String, Vec<String>)> {
    let (doc_part, pointer) = split_reference(reference);
    let document = ctx.workspace.resolve_document_key(from_document, doc_part)?;
    let raw = ctx.workspace.document(&document)?.raw();
    let tokens = decode_pointer(pointer);
    let value = lookup(raw, &tokens)?;
    Some((value, document, tokens))
}

/// Resolve a schema reference, following reference chains to a concrete schema.
pub fn resolve_schema_ref(reference: &str, ctx: &mut Context<'_>) -> Result<ResolvedRef, GenerationError> {
    let cache_key = (ctx.document.clone(), reference.to_string());
    if let Some(hit) = ctx.state.refs.get(&cache_key) {
        trace!(reference, document = %ctx.document, "Reference cache hit.");
        return Ok(hit.clone());
    }

    let mut visited = HashSet::new();
    let mut imports = Vec::new();
    let mut current_ref = reference.to_string();
    let mut current_doc = ctx.document.clone();
    let mut first: Option<(String, String, String)> = None;
    let mut nullable = false;

    let (schema, target_document) = loop {
        let Some((value, document, tokens)) = locate(&current_ref, &current_doc, ctx) else {
            return Err(GenerationError::UnresolvedReference {
                reference: reference.to_string(),
                document: ctx.document.clone(),
            });
        };
        let key = format!("{}#/{}", document, tokens.join("/"));
        if !visited.insert(key.clone()) {
            return Err(GenerationError::ReferenceCycle {
                reference: reference.to_string(),
            });
        }

        let name = tokens.last().cloned().unwrap_or_else(|| document.clone());
        imports.push(ImportDescriptor::new(ctx.policy.type_name(&name), document.clone()));
        if first.is_none() {
            first = Some((name, document.clone(), key));
        }

        let schema: Schema =
            serde_json::from_value(value.clone()).map_err(|e| GenerationError::DocumentParse {
                document: document.clone(),
                message: format!("'{current_ref}' does not point at a schema: {e}"),
            })?;

        match schema.as_object().and_then(|obj| obj.reference.clone()) {
            Some(next) => {
                if let Some(obj) = schema.as_object() {
                    nullable |= obj.is_nullable();
                }
                current_ref = next;
                current_doc = document;
            }
            None => break (schema, document),
        }
    };

    let schema = if nullable { with_nullable(schema) } else { schema };
    let Some((name, document, key)) = first else {
        return Err(GenerationError::UnresolvedReference {
            reference: reference.to_string(),
            document: ctx.document.clone(),
        });
    };

    let resolved = ResolvedRef {
        schema,
        name,
        document,
        target_document,
        key,
        imports,
    };
    ctx.state.refs.insert(cache_key, resolved.clone());
    Ok(resolved)
}

/// Mark a resolved schema nullable, leaving the shared original untouched.
fn with_nullable(schema: Schema) -> Schema {
    match schema {
        Schema::Object(mut obj) => {
            obj.nullable = Some(true);
            Schema::Object(obj)
        }
        other => other,
    }
}

/// Whether the `$ref` node itself carries a nullable marker next to the pointer.
pub fn ref_sibling_nullable(node: &SchemaObject) -> bool {
    node.nullable == Some(true)
        || matches!(&node.schema_type, Some(SchemaType::Multiple(types)) if types.iter().any(|t| t == "null"))
}

/// Resolve `schema` if it is a reference, merging nullable siblings into the resolved copy.
///
/// Returns the concrete schema and, for references, the resolution record.
pub fn resolve_schema(
    schema: &Schema,
    ctx: &mut Context<'_>,
) -> Result<(Schema, Option<ResolvedRef>), GenerationError> {
    let Some(node) = schema.as_object() else {
        return Ok((schema.clone(), None));
    };
    let Some(reference) = &node.reference else {
        return Ok((schema.clone(), None));
    };
    let resolved = resolve_schema_ref(reference, ctx)?;
    let merged = if ref_sibling_nullable(node) {
        with_nullable(resolved.schema.clone())
    } else {
        resolved.schema.clone()
    };
    Ok((merged, Some(resolved)))
}

/// Resolve a parameter, request body or response that may be a `$ref`.
///
/// Returns the item and the document it lives in.
pub fn resolve_item<T>(item: &RefOr<T>, ctx: &Context<'_>) -> Result<(T, String), GenerationError>
where
    T: DeserializeOwned + Clone,
{
    let mut reference = match item {
        RefOr::Item(inner) => return Ok((inner.clone(), ctx.document.clone())),
        RefOr::Ref { reference } => reference.clone(),
    };
    let original = reference.clone();
    let mut from = ctx.document.clone();
    let mut visited = HashSet::new();

    loop {
        let Some((value, document, _)) = locate(&reference, &from, ctx) else {
            return Err(GenerationError::UnresolvedReference {
                reference: original,
                document: ctx.document.clone(),
            });
        };
        if !visited.insert(format!("{document}{reference}")) {
            return Err(GenerationError::ReferenceCycle { reference: original });
        }
        let next: RefOr<T> =
            serde_json::from_value(value.clone()).map_err(|e| GenerationError::DocumentParse {
                document: document.clone(),
                message: format!("'{reference}': {e}"),
            })?;
        match next {
            RefOr::Item(inner) => return Ok((inner, document)),
            RefOr::Ref { reference: next } => {
                reference = next;
                from = document;
            }
        }
    }
}
